//! 配置属性块的基础接口定义

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// 配置属性块 trait
///
/// 属性块先由 `Default` 填充声明的默认值，再由合并后的配置树中
/// `prefix()` 下的内容覆盖。
pub trait PropertyBlock: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// 获取配置前缀
    fn prefix() -> &'static str;

    /// 获取默认配置
    fn default_config() -> Self {
        Self::default()
    }

    /// 从合并后的属性值弱类型解码
    ///
    /// 解码经由 `config::Value`：数字与布尔字符串按字段类型解析，
    /// 数字和布尔值可解码为字符串字段。
    fn from_properties(value: serde_json::Value) -> Result<Self, ConfigError> {
        let prefix = Self::prefix();
        config::Value::deserialize(value)
            .map_err(|e| ConfigError::decode_error(prefix, e.to_string()))?
            .try_deserialize::<Self>()
            .map_err(|e| ConfigError::decode_error(prefix, e.to_string()))
    }
}
