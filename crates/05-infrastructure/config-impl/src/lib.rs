//! # Configuration Implementation
//! 
//! 配置属性的具体实现：分层合并、环境选择、引用解析与属性块绑定。
//! 
//! ## 主要组件
//! 
//! - [`PropertyBuilder`] - 属性构建器
//! - [`PropertyTree`] - 以点号路径寻址的配置树
//! - [`FileSource`] - 由 `config` 解析的 YAML / TOML / JSON 配置文件源
//! - [`CommandLineSource`] - 命令行参数源
//! - [`ProfileDiscovery`] - 配置文件发现
//! - [`PlaceholderResolver`] - `${...}` 引用解析

pub mod binder;
pub mod discovery;
pub mod manager;
pub mod placeholder;
pub mod providers;
pub mod tree;

pub use binder::overlay_block;
pub use discovery::*;
pub use manager::*;
pub use placeholder::*;
pub use providers::*;
pub use tree::*;

#[cfg(test)]
mod tests;
