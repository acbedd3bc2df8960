//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {path}, 原因: {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置解析失败: {path}, 原因: {source}")]
    ParseError {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("不支持的配置文件格式: {path}")]
    UnsupportedFormat { path: String },

    #[error("配置目录扫描失败: {message}")]
    DiscoveryError { message: String },

    #[error("配置属性解码失败: {prefix}, 原因: {message}")]
    DecodeError { prefix: String, message: String },
}

impl ConfigError {
    /// 创建解码错误
    pub fn decode_error(prefix: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeError {
            prefix: prefix.into(),
            message: message.into(),
        }
    }
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("实例容器未初始化")]
    ContainerNotInitialized,

    #[error("目标无效: {name}, 原因: {message}")]
    InvalidTarget { name: String, message: String },

    #[error("检测到循环依赖: {}", .remainder.join(", "))]
    CircularDependency { remainder: Vec<String> },

    #[error("组件名称重复: {name}")]
    DuplicateName { name: String },

    #[error("组件未注册: {name}")]
    ComponentNotRegistered { name: String },

    #[error("组件创建失败: {name}, 原因: {source}")]
    ComponentCreationFailed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("类型不匹配: {name}, 期望 {expected}")]
    TypeMismatch { name: String, expected: String },

    #[error("容器已经构建，不支持重复构建")]
    AlreadyBuilt,

    #[error("属性绑定失败: {name}, 原因: {source}")]
    PropertyBinding {
        name: String,
        #[source]
        source: ConfigError,
    },
}

impl DependencyError {
    /// 创建组件创建失败错误
    pub fn creation_failed(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ComponentCreationFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// 创建无效目标错误
    pub fn invalid_target(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 是否为中止整个构建过程的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ContainerNotInitialized | Self::CircularDependency { .. } | Self::AlreadyBuilt
        )
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
