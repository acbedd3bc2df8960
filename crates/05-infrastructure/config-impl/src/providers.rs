//! 配置源实现

use config::FileFormat;
use config_abstractions::{priority, ConfigFormat, PropertySource};
use infrastructure_common::ConfigError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::tree::PropertyTree;

/// 配置文件源，由 `config` 解析 YAML / TOML / JSON
#[derive(Debug, Clone)]
pub struct FileSource {
    file_path: PathBuf,
    name: String,
    priority: i32,
}

impl FileSource {
    /// 创建新的配置文件源
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let file_path = path.as_ref().to_path_buf();
        Self {
            name: file_path.display().to_string(),
            file_path,
            priority: priority::BASE,
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl PropertySource for FileSource {
    fn load(&self) -> Result<Value, ConfigError> {
        debug!("加载配置文件: {}", self.name);

        let format = ConfigFormat::from_path(&self.file_path).ok_or_else(|| {
            ConfigError::UnsupportedFormat {
                path: self.name.clone(),
            }
        })?;
        std::fs::metadata(&self.file_path).map_err(|e| ConfigError::FileReadError {
            path: self.name.clone(),
            source: e,
        })?;

        config::Config::builder()
            .add_source(config::File::from(self.file_path.as_path()).format(file_format(format)))
            .build()
            .and_then(|settings| settings.try_deserialize::<Value>())
            .map_err(|e| ConfigError::ParseError {
                path: self.name.clone(),
                source: Box::new(e),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 命令行参数源
///
/// 识别 `--path=value` 形式的参数：含逗号的值拆分为列表，
/// 不带值的 `--flag` 视为 `true`，其他参数忽略。
#[derive(Debug, Clone, Default)]
pub struct CommandLineSource {
    args: Vec<String>,
}

impl CommandLineSource {
    /// 创建命令行参数源
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// 解析单个参数
    fn parse_arg(arg: &str) -> Option<(&str, Value)> {
        let body = arg.strip_prefix("--")?;
        let (key, value) = match body.split_once('=') {
            Some((key, raw)) if raw.contains(',') => (
                key,
                Value::Array(
                    raw.split(',')
                        .map(|item| Value::String(item.trim().to_string()))
                        .collect(),
                ),
            ),
            Some((key, raw)) => (key, Value::String(raw.to_string())),
            None => (body, Value::Bool(true)),
        };

        let key = key.trim();
        (!key.is_empty()).then_some((key, value))
    }
}

impl PropertySource for CommandLineSource {
    fn load(&self) -> Result<Value, ConfigError> {
        let mut tree = PropertyTree::new();
        for arg in &self.args {
            match Self::parse_arg(arg) {
                Some((key, value)) => tree.set(key, value),
                None => debug!("忽略命令行参数: {}", arg),
            }
        }
        Ok(tree.into_value())
    }

    fn name(&self) -> &str {
        "command-line"
    }

    fn priority(&self) -> i32 {
        priority::COMMAND_LINE
    }
}

/// 程序内构造的静态配置源
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    value: Value,
    priority: i32,
}

impl StaticSource {
    /// 创建静态配置源
    pub fn new(name: impl Into<String>, value: Value, priority: i32) -> Self {
        Self {
            name: name.into(),
            value,
            priority,
        }
    }
}

impl PropertySource for StaticSource {
    fn load(&self) -> Result<Value, ConfigError> {
        Ok(PropertyTree::from_value(self.value.clone()).into_value())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

fn file_format(format: ConfigFormat) -> FileFormat {
    match format {
        ConfigFormat::Yaml => FileFormat::Yaml,
        ConfigFormat::Toml => FileFormat::Toml,
        ConfigFormat::Json => FileFormat::Json,
    }
}
