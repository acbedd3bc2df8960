//! 配置源抽象接口

use infrastructure_common::ConfigError;
use serde_json::Value;
use std::path::Path;

/// 配置源优先级，数值越大越晚合并（覆盖前者）
pub mod priority {
    /// 程序设置的默认值
    pub const DEFAULTS: i32 = 0;
    /// 基础配置文件
    pub const BASE: i32 = 100;
    /// 通过 `app.profiles.include` 引入的环境配置文件
    pub const INCLUDED_PROFILE: i32 = 200;
    /// 当前激活环境的配置文件
    pub const ACTIVE_PROFILE: i32 = 300;
    /// 外部覆盖文件
    pub const EXTERNAL: i32 = 400;
    /// 命令行参数
    pub const COMMAND_LINE: i32 = 500;
}

/// 配置源 trait
/// 
/// 每个配置源产出一棵以点号路径寻址的配置树片段
pub trait PropertySource: Send + Sync + std::fmt::Debug {
    /// 加载配置树片段
    fn load(&self) -> Result<Value, ConfigError>;
    
    /// 获取配置源名称
    fn name(&self) -> &str;
    
    /// 获取配置源优先级
    fn priority(&self) -> i32 {
        priority::DEFAULTS
    }
}

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// YAML (`.yml` / `.yaml`)
    Yaml,
    /// TOML (`.toml`)
    Toml,
    /// JSON (`.json`)
    Json,
}

impl ConfigFormat {
    /// 支持的扩展名
    pub const EXTENSIONS: [&'static str; 4] = ["yml", "yaml", "toml", "json"];

    /// 根据文件扩展名判断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yml" | "yaml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}
