//! # Infrastructure Common
//!
//! 这个 crate 提供了组件容器与配置属性引擎共用的基础类型。
//!
//! ## 核心类型
//!
//! - [`TypeInfo`] / [`FieldInfo`] - 类型与字段元数据（替代运行时反射）
//! - [`ComponentKind`] - 组件种类（值、工厂、方法）
//! - [`ComponentScope`] - 组件作用域（单例、原型）
//! - [`PropertyBlock`] - 按前缀绑定的配置属性块
//! - [`DependencyError`] / [`ConfigError`] - 错误类型
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的显式注册，不依赖字符串标记
//! - 约定优于配置：名称由包名和小驼峰类型名推导

pub mod component;
pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use component::*;
pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
