//! # Configuration Abstractions
//! 
//! 配置属性抽象层，定义配置源与属性解析的核心接口和约定。
//! 
//! ## 核心接口
//! 
//! - [`PropertySource`] - 配置源接口
//! - [`PropertyResolver`] - 属性解析器接口
//! - [`PropertyResolverExt`] - 类型化属性块绑定

pub mod provider;
pub mod manager;

pub use provider::*;
pub use manager::*; 
