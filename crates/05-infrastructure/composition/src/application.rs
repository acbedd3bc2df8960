//! 应用上下文
//!
//! 组件注册、属性构建、依赖解析和实例化的统一入口。上下文是显式构造、
//! 按引用传递的对象，多个上下文可以同时存在。

use crate::builder::ApplicationContextBuilder;
use config_abstractions::{PropertyResolver, PropertyResolverExt};
use config_impl::PropertyBuilder;
use di_abstractions::{
    downcast, ComponentDescriptor, ComponentOptions, Configuration, ContainerConfig, DependencyResolver,
    FactoryFn, Injectable, RawComponent, TypeNameResolver,
};
use di_impl::{
    BuildReport, GraphResolver, InstanceContainer, InstantiationEngine, MetadataExtractor, ScopedArg,
    ScopedInstanceFactory,
};
use infrastructure_common::{
    DependencyError, InfrastructureError, Instance, PropertyBlock, TypeInfo,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// 上下文运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextStatus {
    /// 接受组件注册
    Registering,
    /// 正在构建，不再接受注册
    Building,
    /// 已构建，可查找实例
    Running,
    /// 构建失败
    Failed,
    /// 已关闭
    Stopped,
}

/// 上下文统计信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextMetrics {
    /// 构建完成时间
    pub built_at: Option<chrono::DateTime<chrono::Utc>>,
    /// 关闭时间
    pub stopped_at: Option<chrono::DateTime<chrono::Utc>>,
    /// 已注册的原始组件数量
    pub registered_components_count: usize,
    /// 提取出的描述符数量
    pub descriptor_count: usize,
}

impl ContextMetrics {
    /// 计算运行时间
    pub fn uptime(&self) -> Option<chrono::Duration> {
        match (self.built_at, self.stopped_at) {
            (Some(start), Some(stop)) => Some(stop - start),
            (Some(start), None) => Some(chrono::Utc::now() - start),
            _ => None,
        }
    }
}

/// 构建完成后的运行时
struct Runtime {
    container: Arc<InstanceContainer>,
    scoped: Arc<ScopedInstanceFactory>,
}

enum ContextState {
    Registering(Vec<RawComponent>),
    Building,
    Running(Runtime),
    Failed,
    Stopped,
}

impl ContextState {
    fn status(&self) -> ContextStatus {
        match self {
            Self::Registering(_) => ContextStatus::Registering,
            Self::Building => ContextStatus::Building,
            Self::Running(_) => ContextStatus::Running,
            Self::Failed => ContextStatus::Failed,
            Self::Stopped => ContextStatus::Stopped,
        }
    }
}

/// 应用上下文
pub struct ApplicationContext {
    container_config: ContainerConfig,
    properties: Arc<PropertyBuilder>,
    profile: Option<String>,
    names: Arc<dyn TypeNameResolver>,
    state: RwLock<ContextState>,
    metrics: RwLock<ContextMetrics>,
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("container_config", &self.container_config)
            .field("profile", &self.profile)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ApplicationContext {
    /// 创建上下文构建器
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// 内部构造函数
    pub(crate) fn new(
        container_config: ContainerConfig,
        properties: PropertyBuilder,
        profile: Option<String>,
        names: Arc<dyn TypeNameResolver>,
    ) -> Self {
        Self {
            container_config,
            properties: Arc::new(properties),
            profile,
            names,
            state: RwLock::new(ContextState::Registering(Vec::new())),
            metrics: RwLock::new(ContextMetrics::default()),
        }
    }

    /// 注册原始组件
    pub fn register(&self, raw: RawComponent) -> Result<&Self, DependencyError> {
        match &mut *self.state.write() {
            ContextState::Registering(pending) => {
                pending.push(raw);
                self.metrics.write().registered_components_count += 1;
                Ok(self)
            }
            ContextState::Stopped => Err(DependencyError::ContainerNotInitialized),
            ContextState::Building | ContextState::Running(_) | ContextState::Failed => {
                Err(DependencyError::AlreadyBuilt)
            }
        }
    }

    /// 注册值组件
    pub fn register_value<T: Injectable>(&self, value: T) -> Result<&Self, DependencyError> {
        self.register(RawComponent::value(value))
    }

    /// 注册带选项的值组件
    pub fn register_value_with<T: Injectable>(
        &self,
        value: T,
        options: ComponentOptions,
    ) -> Result<&Self, DependencyError> {
        self.register(RawComponent::value(value).with_options(options))
    }

    /// 注册工厂组件
    pub fn register_factory<F, Args>(&self, factory: F) -> Result<&Self, DependencyError>
    where
        F: FactoryFn<Args>,
        Args: 'static,
    {
        self.register(RawComponent::factory(factory))
    }

    /// 注册带选项的工厂组件
    pub fn register_factory_with<F, Args>(
        &self,
        factory: F,
        options: ComponentOptions,
    ) -> Result<&Self, DependencyError>
    where
        F: FactoryFn<Args>,
        Args: 'static,
    {
        self.register(RawComponent::factory(factory).with_options(options))
    }

    /// 注册配置组件，其生产方法一并注册
    pub fn register_configuration<C: Configuration>(
        &self,
        configuration: C,
    ) -> Result<&Self, DependencyError> {
        self.register(RawComponent::configuration(configuration))
    }

    /// 注册属性块组件
    pub fn register_properties<P: PropertyBlock>(&self) -> Result<&Self, DependencyError> {
        self.register(RawComponent::properties::<P>())
    }

    /// 构建上下文
    ///
    /// 依次构建属性、提取描述符、解析依赖并实例化组件。只能调用一次，
    /// 构建期间的注册和重复构建返回 [`DependencyError::AlreadyBuilt`]。
    pub fn build(&self) -> Result<BuildReport, InfrastructureError> {
        let pending = {
            let mut state = self.state.write();
            match std::mem::replace(&mut *state, ContextState::Building) {
                ContextState::Registering(pending) => pending,
                previous => {
                    let error = if matches!(previous, ContextState::Stopped) {
                        DependencyError::ContainerNotInitialized
                    } else {
                        DependencyError::AlreadyBuilt
                    };
                    *state = previous;
                    return Err(error.into());
                }
            }
        };

        info!("开始构建应用上下文: {} 个组件", pending.len());
        match self.build_runtime(pending) {
            Ok((runtime, report, descriptor_count)) => {
                {
                    let mut state = self.state.write();
                    if !matches!(*state, ContextState::Building) {
                        error!("应用上下文在构建期间已关闭");
                        runtime.scoped.clear();
                        runtime.container.clear();
                        return Err(DependencyError::ContainerNotInitialized.into());
                    }
                    *state = ContextState::Running(runtime);
                }
                let mut metrics = self.metrics.write();
                metrics.built_at = Some(chrono::Utc::now());
                metrics.descriptor_count = descriptor_count;
                info!("应用上下文构建完成");
                Ok(report)
            }
            Err(e) => {
                error!("应用上下文构建失败: {}", e);
                let mut state = self.state.write();
                if matches!(*state, ContextState::Building) {
                    *state = ContextState::Failed;
                }
                Err(e)
            }
        }
    }

    fn build_runtime(
        &self,
        pending: Vec<RawComponent>,
    ) -> Result<(Runtime, BuildReport, usize), InfrastructureError> {
        if !self.properties.is_built() {
            if let Err(e) = self.properties.build(self.profile.as_deref()) {
                error!("属性构建失败，组件使用已加载的属性继续构建: {}", e);
            }
        }

        let extractor = MetadataExtractor::new(Arc::clone(&self.names));
        let descriptors: Vec<ComponentDescriptor> = pending
            .into_iter()
            .flat_map(|raw| extractor.extract(raw))
            .collect();
        let descriptor_count = descriptors.len();

        let resolution = GraphResolver::new(Arc::clone(&self.names)).resolve(descriptors)?;

        let properties: Arc<dyn PropertyResolver> = self.properties.clone();
        let container = Arc::new(InstanceContainer::new(self.container_config.clone()));
        let report = InstantiationEngine::new(Arc::clone(&container))
            .with_properties(Arc::clone(&properties))
            .build(resolution)?;
        let scoped = Arc::new(ScopedInstanceFactory::new(
            Arc::clone(&container),
            Some(properties),
        ));

        Ok((Runtime { container, scoped }, report, descriptor_count))
    }

    fn runtime<R>(&self, f: impl FnOnce(&Runtime) -> R) -> Result<R, DependencyError> {
        match &*self.state.read() {
            ContextState::Running(runtime) => Ok(f(runtime)),
            _ => Err(DependencyError::ContainerNotInitialized),
        }
    }

    fn scoped(&self) -> Result<Arc<ScopedInstanceFactory>, DependencyError> {
        self.runtime(|runtime| Arc::clone(&runtime.scoped))
    }

    /// 按名称取实例，作用域组件按需构建
    pub fn get_instance(&self, name: &str) -> Result<Instance, DependencyError> {
        self.scoped()?.get_instance(name, Vec::new())
    }

    /// 按名称取实例并转换为 `T`
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, DependencyError> {
        downcast(name, self.get_instance(name)?)
    }

    /// 按类型的规范化名称取实例
    pub fn get_by_type<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, DependencyError> {
        self.get(&TypeInfo::of::<T>().normalized_name())
    }

    /// 带有指定能力的组件
    pub fn get_instances(&self, capability: &str) -> Vec<Arc<ComponentDescriptor>> {
        self.runtime(|runtime| runtime.container.get_by_capability(capability))
            .unwrap_or_default()
    }

    /// 按条件参数取作用域实例
    pub fn get_scoped_instance<T: Send + Sync + 'static>(
        &self,
        name: &str,
        args: Vec<ScopedArg>,
    ) -> Result<Arc<T>, DependencyError> {
        self.scoped()?.get::<T>(name, args)
    }

    /// 实例容器
    pub fn container(&self) -> Result<Arc<InstanceContainer>, DependencyError> {
        self.runtime(|runtime| Arc::clone(&runtime.container))
    }

    /// 获取属性值
    pub fn get_property(&self, path: &str) -> Option<Value> {
        self.properties.get_property(path)
    }

    /// 设置属性值，优先级最高
    pub fn set_property(&self, path: &str, value: impl Into<Value>) -> &Self {
        self.properties.set_property(path, value.into());
        self
    }

    /// 设置默认属性值
    pub fn set_default_property(&self, path: &str, value: impl Into<Value>) -> &Self {
        self.properties.set_default_property(path, value.into());
        self
    }

    /// 绑定属性块，失败时使用默认值
    pub fn properties<P: PropertyBlock>(&self) -> P {
        self.properties.bind_or_default::<P>()
    }

    /// 解析模板中的 `${path[:default]}` 引用
    pub fn replace(&self, template: &str) -> Value {
        self.properties.replace(template)
    }

    /// 当前激活的环境
    pub fn active_profile(&self) -> Option<String> {
        self.properties.active_profile()
    }

    /// 属性构建器
    pub fn property_builder(&self) -> &Arc<PropertyBuilder> {
        &self.properties
    }

    /// 运行状态
    pub fn status(&self) -> ContextStatus {
        self.state.read().status()
    }

    /// 统计信息
    pub fn metrics(&self) -> ContextMetrics {
        self.metrics.read().clone()
    }

    /// 关闭上下文，释放所有实例
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), ContextState::Stopped);
        if let ContextState::Running(runtime) = previous {
            runtime.scoped.clear();
            runtime.container.clear();
        }
        self.metrics.write().stopped_at = Some(chrono::Utc::now());
        info!("应用上下文已关闭");
    }
}
