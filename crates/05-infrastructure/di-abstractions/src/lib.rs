//! # Dependency Injection Abstractions
//! 
//! 依赖注入抽象层，定义组件描述、注册和依赖解析的核心接口。
//! 
//! ## 核心接口
//! 
//! - [`ComponentDescriptor`] - 组件描述符
//! - [`RawComponent`] / [`ComponentOptions`] - 类型化注册
//! - [`FactoryFn`] / [`MethodFn`] / [`Injectable`] / [`Configuration`] - 组件生产方式
//! - [`InjectionContext`] - 注入上下文
//! - [`DependencyResolver`] / [`TypeNameResolver`] - 依赖解析与命名
//! - [`InstanceStore`] - 实例存储

pub mod container;
pub mod context;
pub mod descriptor;
pub mod factory;
pub mod registry;
pub mod resolver;

pub use container::*;
pub use context::*;
pub use descriptor::*;
pub use factory::*;
pub use registry::*;
pub use resolver::*;
