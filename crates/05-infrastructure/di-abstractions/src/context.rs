//! 注入上下文
//!
//! 生产函数通过注入上下文获取位置依赖、注入字段和属性块。

use infrastructure_common::{ConfigError, DependencyError, Instance, PropertyBlock};
use serde_json::Value;
use tracing::error;

use crate::factory::Dependency;

/// 注入上下文 trait
///
/// 对象安全，由实例化引擎在调用生产函数时提供
pub trait InjectionContext {
    /// 正在构建的组件标识
    fn component_name(&self) -> &str;

    /// 第 `index` 个依赖声明的名称
    fn requested(&self, index: usize) -> Option<&str>;

    /// 第 `index` 个依赖的实例，缺失时为 `None`
    fn dependency(&self, index: usize) -> Option<Instance>;

    /// 注入字段 `field` 对应依赖的实例
    fn field(&self, field: &str) -> Option<Instance>;

    /// `field` 是否声明为注入字段
    fn has_field(&self, field: &str) -> bool;

    /// 按名称查找实例
    fn lookup(&self, name: &str) -> Option<Instance>;

    /// 以 `defaults` 为底，叠加 `prefix` 下的配置
    fn bind_properties(&self, prefix: &str, defaults: Value) -> Result<Value, ConfigError>;
}

/// 类型化的注入辅助方法
pub trait InjectionContextExt: InjectionContext {
    /// 取第 `index` 个依赖并转换为 `D`
    ///
    /// `index` 超出声明的依赖个数时返回 [`DependencyError::InvalidTarget`]。
    fn resolve<D: Dependency>(&self, index: usize) -> Result<D, DependencyError> {
        let name = self.requested(index).ok_or_else(|| {
            DependencyError::invalid_target(
                format!("{}#{}", self.component_name(), index),
                "没有对应的依赖声明",
            )
        })?;
        D::from_instance(name, self.dependency(index))
    }

    /// 取注入字段 `field` 的依赖并转换为 `D`
    ///
    /// 未在 `fields()` 中声明为注入字段时返回 [`DependencyError::InvalidTarget`]。
    fn inject<D: Dependency>(&self, field: &str) -> Result<D, DependencyError> {
        let name = format!("{}.{}", self.component_name(), field);
        if !self.has_field(field) {
            return Err(DependencyError::invalid_target(name, "字段未声明为注入字段"));
        }
        D::from_instance(&name, self.field(field))
    }

    /// 绑定属性块
    fn try_properties<P: PropertyBlock>(&self) -> Result<P, DependencyError> {
        let binding_error = |source: ConfigError| DependencyError::PropertyBinding {
            name: self.component_name().to_string(),
            source,
        };
        let prefix = P::prefix();
        let defaults = serde_json::to_value(P::default_config())
            .map_err(|e| binding_error(ConfigError::decode_error(prefix, e.to_string())))?;
        let value = self.bind_properties(prefix, defaults).map_err(binding_error)?;
        P::from_properties(value).map_err(binding_error)
    }

    /// 绑定属性块，失败时记录错误并使用默认值
    fn properties<P: PropertyBlock>(&self) -> P {
        self.try_properties::<P>().unwrap_or_else(|e| {
            error!("属性块解码失败，使用默认值: {} ({})", P::prefix(), e);
            P::default_config()
        })
    }
}

impl<C: InjectionContext + ?Sized> InjectionContextExt for C {}
