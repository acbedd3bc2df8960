//! # 基础设施组合层
//!
//! 将属性构建器与依赖注入实现组合为统一的应用上下文。
//!
//! ## 主要功能
//!
//! - **上下文构建器**: 配置目录、激活环境、命令行覆盖和日志
//! - **组件注册**: 值组件、工厂组件、配置组件和属性块
//! - **生命周期管理**: 单次构建、按名称/类型/能力查找、关闭
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::ApplicationContext;
//! use infrastructure_common::DependencyError;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! fn greeter() -> Result<Greeter, DependencyError> {
//!     Ok(Greeter {
//!         greeting: "hello".to_string(),
//!     })
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ApplicationContext::builder()
//!         .with_config_dir("config")
//!         .with_args(std::env::args().skip(1))
//!         .build()?;
//!
//!     context.register_factory(greeter)?;
//!     context.build()?;
//!
//!     let greeter = context.get_by_type::<Greeter>()?;
//!     println!("{}", greeter.greeting);
//!
//!     context.shutdown();
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod builder;


// 重新导出主要类型
pub use application::{ApplicationContext, ContextMetrics, ContextStatus};
pub use builder::{ApplicationContextBuilder, LoggingConfig};

// 重新导出常用类型
pub use di_abstractions::{ComponentOptions, RawComponent};
pub use di_impl::{BuildReport, ConditionalArg, ScopedArg};
pub use infrastructure_common::InfrastructureError;
