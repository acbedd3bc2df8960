//! 属性解析器抽象接口

use infrastructure_common::{ConfigError, PropertyBlock};
use serde_json::Value;
use tracing::error;

/// 选择激活环境的环境变量
pub const ACTIVE_PROFILE_ENV: &str = "APP_PROFILES_ACTIVE";
/// 激活环境的属性键
pub const PROFILES_ACTIVE_KEY: &str = "app.profiles.active";
/// 引入环境配置白名单的属性键
pub const PROFILES_INCLUDE_KEY: &str = "app.profiles.include";
/// 默认的基础配置文件名
pub const DEFAULT_BASE_NAME: &str = "application";
/// 默认的配置目录
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// 属性解析器 trait
///
/// 合并后的配置树的读写入口，对象安全，供实例化引擎在注入时使用
pub trait PropertyResolver: Send + Sync {
    /// 获取属性值（已解析 `${...}` 引用）
    fn get_property(&self, path: &str) -> Option<Value>;

    /// 设置属性值，优先级最高
    fn set_property(&self, path: &str, value: Value);

    /// 设置默认值，已有值时不覆盖
    fn set_default_property(&self, path: &str, value: Value);

    /// 解析模板中的 `${path[:default]}` 引用
    fn replace(&self, template: &str) -> Value;

    /// 以 `defaults` 为底，叠加 `prefix` 下的配置
    fn bind_value(&self, prefix: &str, defaults: Value) -> Result<Value, ConfigError>;
}

/// 类型化属性块绑定
pub trait PropertyResolverExt: PropertyResolver {
    /// 将 `P::prefix()` 下的配置绑定到属性块
    fn bind<P: PropertyBlock>(&self) -> Result<P, ConfigError> {
        let prefix = P::prefix();
        let defaults = serde_json::to_value(P::default_config())
            .map_err(|e| ConfigError::decode_error(prefix, e.to_string()))?;
        P::from_properties(self.bind_value(prefix, defaults)?)
    }

    /// 绑定属性块，失败时记录错误并返回默认值
    fn bind_or_default<P: PropertyBlock>(&self) -> P {
        self.bind::<P>().unwrap_or_else(|e| {
            error!("属性块绑定失败，使用默认值: {} ({})", P::prefix(), e);
            P::default_config()
        })
    }
}

impl<R: PropertyResolver + ?Sized> PropertyResolverExt for R {}
