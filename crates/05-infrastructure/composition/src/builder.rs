//! 应用上下文构建器

use crate::application::ApplicationContext;
use config_abstractions::{PropertySource, DEFAULT_BASE_NAME, DEFAULT_CONFIG_DIR};
use config_impl::{PlaceholderResolver, PropertyBuilder};
use di_abstractions::{ContainerConfig, ConventionalNameResolver, TypeNameResolver};
use infrastructure_common::InfrastructureError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// 应用上下文构建器
///
/// 使用建造者模式配置属性来源、日志和容器选项
pub struct ApplicationContextBuilder {
    /// 配置目录
    config_dir: PathBuf,
    /// 基础配置文件名
    base_name: String,
    /// 显式指定的激活环境
    profile: Option<String>,
    /// 命令行参数
    args: Vec<String>,
    /// 外部覆盖文件
    override_files: Vec<PathBuf>,
    /// 自定义属性来源
    sources: Vec<Box<dyn PropertySource>>,
    /// 占位符解析器
    placeholder: Option<PlaceholderResolver>,
    /// 组件命名规则
    names: Arc<dyn TypeNameResolver>,
    /// 是否启用测试模式
    test_mode: bool,
    /// 日志配置，未设置时不初始化日志
    logging_config: Option<LoggingConfig>,
}

impl std::fmt::Debug for ApplicationContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContextBuilder")
            .field("config_dir", &self.config_dir)
            .field("base_name", &self.base_name)
            .field("profile", &self.profile)
            .field("args", &self.args)
            .field("override_files", &self.override_files)
            .field("test_mode", &self.test_mode)
            .field("logging_config", &self.logging_config)
            .finish_non_exhaustive()
    }
}

impl ApplicationContextBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            base_name: DEFAULT_BASE_NAME.to_string(),
            profile: None,
            args: Vec::new(),
            override_files: Vec::new(),
            sources: Vec::new(),
            placeholder: None,
            names: Arc::new(ConventionalNameResolver),
            test_mode: false,
            logging_config: None,
        }
    }

    /// 设置配置目录
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// 设置基础配置文件名
    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    /// 指定激活环境，优先于环境变量和配置文件
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// 设置命令行参数，`--key=value` 形式的参数覆盖配置文件
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// 添加外部覆盖文件
    pub fn with_override_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_files.push(path.into());
        self
    }

    /// 添加自定义属性来源
    pub fn with_property_source<S: PropertySource + 'static>(mut self, source: S) -> Self {
        info!("添加自定义属性来源: {}", source.name());
        self.sources.push(Box::new(source));
        self
    }

    /// 设置占位符解析器
    pub fn with_placeholder_resolver(mut self, placeholder: PlaceholderResolver) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// 设置组件命名规则
    pub fn with_name_resolver(mut self, names: Arc<dyn TypeNameResolver>) -> Self {
        self.names = names;
        self
    }

    /// 测试模式：允许同名实例覆盖
    pub fn test_mode(mut self) -> Self {
        self.test_mode = true;
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 创建应用上下文
    ///
    /// 属性在上下文构建时才加载，在此之前可以设置默认属性。
    pub fn build(self) -> Result<ApplicationContext, InfrastructureError> {
        // 只有在明确配置了日志时才初始化日志
        if let Some(config) = &self.logging_config {
            initialize_logging(config)?;
        }

        info!("创建应用上下文, 配置目录: {}", self.config_dir.display());

        let mut properties = PropertyBuilder::new(self.config_dir)
            .with_base_name(self.base_name)
            .with_args(self.args);
        for path in self.override_files {
            properties = properties.with_override_file(path);
        }
        for source in self.sources {
            properties = properties.with_source(source);
        }
        if let Some(placeholder) = self.placeholder {
            properties = properties.with_placeholder_resolver(placeholder);
        }

        let container_config = ContainerConfig {
            test_mode: self.test_mode,
        };
        Ok(ApplicationContext::new(
            container_config,
            properties,
            self.profile,
            self.names,
        ))
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 初始化日志系统
///
/// 全局订阅者已存在时保留原有订阅者
fn initialize_logging(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = match &config.filter {
        Some(directives) => {
            EnvFilter::try_new(directives).map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("日志过滤规则无效: {directives} ({e})"),
            })?
        }
        None => EnvFilter::default().add_directive(LevelFilter::from_level(config.level).into()),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    let result = if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    match result {
        Ok(()) => info!("日志系统初始化完成"),
        Err(e) => debug!("日志系统已由其他订阅者初始化: {}", e),
    }
    Ok(())
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 过滤规则（`EnvFilter` 语法），设置后忽略 `level`
    pub filter: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            filter: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 设置过滤规则
    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }
}
