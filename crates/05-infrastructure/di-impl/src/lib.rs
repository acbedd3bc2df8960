//! # 依赖注入具体实现
//!
//! 提供元数据提取、依赖图解析、实例容器、实例化引擎和作用域实例工厂的实现。
//!
//! ## 构建流程
//!
//! 1. [`MetadataExtractor`] 将原始组件规范化为描述符
//! 2. [`GraphResolver`] 匹配依赖名称并按 Kahn 算法排序
//! 3. [`InstantiationEngine`] 按顺序构建组件并存入 [`InstanceContainer`]
//! 4. [`ScopedInstanceFactory`] 按需构建单例和原型组件

pub mod container;
pub mod context;
pub mod engine;
pub mod extractor;
pub mod graph;
pub mod scoped;

pub use container::*;
pub use context::*;
pub use engine::*;
pub use extractor::*;
pub use graph::*;
pub use scoped::*;
