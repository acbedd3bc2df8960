//! # 示例应用程序
//!
//! 演示组件注册、按环境加载配置属性、依赖装配和按请求构建的原型组件

use anyhow::Context;
use clap::Parser;
use infrastructure_composition::{ApplicationContext, LoggingConfig, ScopedArg};
use services::RequestId;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "组件容器与配置属性引擎示例应用")]
struct Args {
    /// 配置目录
    #[arg(short, long, default_value = "example-app/config")]
    config_dir: String,

    /// 激活环境
    #[arg(short, long)]
    profile: Option<String>,

    /// 日志级别或过滤规则
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 模拟的请求数
    #[arg(long, default_value_t = 3)]
    requests: u64,

    /// 构建完成后等待退出信号
    #[arg(long)]
    wait: bool,

    /// 属性覆盖，例如 `-- --server.port=9000`
    #[arg(last = true)]
    overrides: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let ctx = build_context(&args)?;
    register_components(&ctx)?;

    let report = ctx.build().context("构建应用上下文失败")?;
    for skipped in &report.skipped {
        warn!("组件未能构建: {} ({})", skipped.name, skipped.reason);
    }
    for external in &report.external {
        info!("外部依赖: {} <- {}", external.component, external.requested);
    }

    demonstrate_properties(&ctx);
    demonstrate_components(&ctx)?;
    demonstrate_requests(&ctx, args.requests)?;

    if args.wait {
        info!("等待退出信号");
        tokio::signal::ctrl_c().await?;
        info!("收到退出信号，正在关闭应用");
    }

    ctx.shutdown();
    info!("应用已关闭, 运行时间: {:?}", ctx.metrics().uptime());
    Ok(())
}

/// 创建应用上下文
fn build_context(args: &Args) -> anyhow::Result<ApplicationContext> {
    let mut builder = ApplicationContext::builder()
        .with_config_dir(&args.config_dir)
        .with_args(args.overrides.iter().cloned())
        .with_logging(LoggingConfig::default().with_filter(&args.log_level));
    if let Some(profile) = &args.profile {
        builder = builder.with_profile(profile);
    }
    Ok(builder.build()?)
}

/// 注册示例组件
fn register_components(ctx: &ApplicationContext) -> anyhow::Result<()> {
    ctx.register_properties::<services::ServerProperties>()?
        .register_properties::<services::DatabaseProperties>()?
        .register_properties::<services::CacheProperties>()?
        .register_factory(services::connect)?
        .register_configuration(services::CacheConfiguration)?
        .register_value(services::HttpServer::default())?
        .register_factory_with(services::request_handler, services::request_options())?;
    Ok(())
}

/// 演示配置属性
fn demonstrate_properties(ctx: &ApplicationContext) {
    info!("激活环境: {:?}", ctx.active_profile());
    if let Some(banner) = ctx.get_property("server.banner") {
        info!("服务横幅: {}", banner);
    }
    info!(
        "模板解析: {}",
        ctx.replace("${app.name}/${database.pool_size:1}")
    );
}

/// 演示组件装配
fn demonstrate_components(ctx: &ApplicationContext) -> anyhow::Result<()> {
    let server = ctx.get_by_type::<services::HttpServer>()?;
    let database = server
        .database
        .as_ref()
        .context("HttpServer 未注入数据库")?;
    info!(
        "HttpServer 监听 {}:{}, 数据库 {} (连接池 {})",
        server.properties.host, server.properties.port, database.url, database.pool_size
    );

    let cache = ctx.get_by_type::<services::Cache>()?;
    info!("缓存容量 {}, 过期时间 {} 秒", cache.capacity, cache.ttl_seconds);

    for descriptor in ctx.get_instances("store") {
        info!("存储组件: {} ({})", descriptor.name, descriptor.kind);
    }
    Ok(())
}

/// 演示按请求构建的原型组件
fn demonstrate_requests(ctx: &ApplicationContext, requests: u64) -> anyhow::Result<()> {
    for id in 0..requests {
        let handler = ctx.get_scoped_instance::<services::RequestHandler>(
            "services.requestHandler",
            vec![ScopedArg::new(RequestId(id))],
        )?;
        handler.handle();
    }

    // 同一条件键复用已构建的实例
    let first = ctx.get_scoped_instance::<services::RequestHandler>(
        "services.requestHandler",
        vec![ScopedArg::new(RequestId(0))],
    )?;
    info!("请求 {} 的处理器已复用", first.request_id.0);
    Ok(())
}

mod services {
    use di_abstractions::{
        ComponentOptions, Configuration, InjectionContext, InjectionContextExt, Injectable,
        ProducerRegistry,
    };
    use infrastructure_common::{ComponentScope, DependencyError, FieldInfo, PropertyBlock};
    use infrastructure_composition::ConditionalArg;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use tracing::info;

    /// 服务配置
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ServerProperties {
        pub host: String,
        pub port: u16,
    }

    impl Default for ServerProperties {
        fn default() -> Self {
            Self {
                host: "127.0.0.1".to_string(),
                port: 8080,
            }
        }
    }

    impl PropertyBlock for ServerProperties {
        fn prefix() -> &'static str {
            "server"
        }
    }

    /// 数据库配置
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct DatabaseProperties {
        pub url: String,
        pub pool_size: u32,
    }

    impl Default for DatabaseProperties {
        fn default() -> Self {
            Self {
                url: "postgres://localhost/adsp".to_string(),
                pool_size: 10,
            }
        }
    }

    impl PropertyBlock for DatabaseProperties {
        fn prefix() -> &'static str {
            "database"
        }
    }

    /// 缓存配置
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CacheProperties {
        pub capacity: usize,
        pub ttl_seconds: u64,
    }

    impl Default for CacheProperties {
        fn default() -> Self {
            Self {
                capacity: 128,
                ttl_seconds: 30,
            }
        }
    }

    impl PropertyBlock for CacheProperties {
        fn prefix() -> &'static str {
            "cache"
        }
    }

    #[derive(Debug)]
    pub struct Database {
        pub url: String,
        pub pool_size: u32,
    }

    /// 按数据库配置创建连接
    pub fn connect(properties: Arc<DatabaseProperties>) -> Result<Database, DependencyError> {
        info!("连接数据库: {}", properties.url);
        Ok(Database {
            url: properties.url.clone(),
            pool_size: properties.pool_size,
        })
    }

    #[derive(Debug)]
    pub struct Cache {
        pub capacity: usize,
        pub ttl_seconds: u64,
    }

    /// 生产缓存组件的配置组件
    pub struct CacheConfiguration;

    impl Injectable for CacheConfiguration {}

    impl Configuration for CacheConfiguration {
        fn producers(registry: &mut ProducerRegistry<Self>) {
            registry.method_with(
                "Cache",
                |_: &Self, properties: Arc<CacheProperties>| -> Result<Cache, DependencyError> {
                    Ok(Cache {
                        capacity: properties.capacity,
                        ttl_seconds: properties.ttl_seconds,
                    })
                },
                ComponentOptions::new().with_capability("store"),
            );
        }
    }

    /// 字段注入数据库、注入时绑定服务配置的值组件
    #[derive(Default)]
    pub struct HttpServer {
        pub database: Option<Arc<Database>>,
        pub properties: ServerProperties,
    }

    impl Injectable for HttpServer {
        fn fields() -> Vec<FieldInfo> {
            vec![
                FieldInfo::inject::<Database>("database"),
                FieldInfo::of::<ServerProperties>("properties"),
            ]
        }

        fn inject(&mut self, ctx: &dyn InjectionContext) -> Result<(), DependencyError> {
            self.database = ctx.inject("database")?;
            self.properties = ctx.properties();
            Ok(())
        }
    }

    /// 请求编号，作为原型组件的条件参数
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RequestId(pub u64);

    impl ConditionalArg for RequestId {
        fn conditional_key(&self) -> String {
            self.0.to_string()
        }
    }

    /// 每个请求编号一个实例
    #[derive(Debug)]
    pub struct RequestHandler {
        pub request_id: RequestId,
        pub database: Arc<Database>,
    }

    impl RequestHandler {
        pub fn handle(&self) {
            info!("处理请求 {} (数据库 {})", self.request_id.0, self.database.url);
        }
    }

    pub fn request_handler(
        request_id: Arc<RequestId>,
        database: Arc<Database>,
    ) -> Result<RequestHandler, DependencyError> {
        Ok(RequestHandler {
            request_id: *request_id,
            database,
        })
    }

    /// 请求编号由调用方以条件参数提供
    pub fn request_options() -> ComponentOptions {
        ComponentOptions::new().with_scope(ComponentScope::Prototype)
    }
}
