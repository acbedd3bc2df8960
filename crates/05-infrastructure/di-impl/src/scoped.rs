//! 作用域实例工厂
//!
//! 显式指定作用域的组件在构建阶段只登记描述符，由这里按需实例化：
//! 单例组件只构建一次，结果记录在描述符上；原型组件按条件键各构建一次，
//! 结果保存在该条件键对应的作用域容器中。

use chrono::{DateTime, Utc};
use config_abstractions::PropertyResolver;
use dashmap::DashMap;
use di_abstractions::{downcast, ComponentDescriptor, InstanceEntry, InstanceStore};
use infrastructure_common::{ComponentScope, DependencyError, Instance, TypeInfo};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::container::InstanceContainer;
use crate::context::BuildContext;

/// 条件键各段之间的分隔符
const KEY_SEPARATOR: &str = "-";

/// 可作为原型组件条件参数的值
pub trait ConditionalArg: Send + Sync + 'static {
    /// 参与条件键的文本
    fn conditional_key(&self) -> String;
}

macro_rules! impl_conditional_arg {
    ($($ty:ty),*) => {
        $(
            impl ConditionalArg for $ty {
                fn conditional_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_conditional_arg!(String, &'static str, bool, i32, i64, u32, u64);

/// 原型组件的条件参数
///
/// 参数以名称存入作用域容器，供生产函数按依赖名称取用；
/// 所有参数的键依次拼接成条件键。
#[derive(Debug, Clone)]
pub struct ScopedArg {
    name: String,
    key: String,
    value: Instance,
}

impl ScopedArg {
    /// 以类型的规范化名称作为参数名
    pub fn new<T: ConditionalArg>(value: T) -> Self {
        Self::named(TypeInfo::of::<T>().normalized_name(), value)
    }

    /// 指定参数名
    pub fn named<T: ConditionalArg>(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            key: value.conditional_key(),
            value: Arc::new(value),
        }
    }

    /// 参数名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 参与条件键的文本
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 参数值
    pub fn value(&self) -> &Instance {
        &self.value
    }
}

/// 由组件标识和参数键组成的条件键
///
/// 每段写作 `<字节长度>:<文本>`，参数键中含分隔符也不会与其他参数组合混淆。
pub fn conditional_key(name: &str, args: &[ScopedArg]) -> String {
    std::iter::once(name)
        .chain(args.iter().map(ScopedArg::key))
        .map(|part| format!("{}:{}", part.len(), part))
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// 作用域容器：一个条件键对应的短生命周期实例容器
#[derive(Debug)]
pub struct ScopedContainer {
    id: Uuid,
    created_at: DateTime<Utc>,
    conditional_key: String,
    container: InstanceContainer,
    instance: OnceCell<Instance>,
}

impl ScopedContainer {
    /// 创建作用域容器并存入条件参数
    pub fn new(conditional_key: impl Into<String>, args: Vec<ScopedArg>) -> Result<Self, DependencyError> {
        let container = InstanceContainer::default();
        for arg in args {
            container.set(InstanceEntry::instance(arg.name, arg.value))?;
        }

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            conditional_key: conditional_key.into(),
            container,
            instance: OnceCell::new(),
        })
    }

    /// 容器 ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 创建时间
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 条件键
    pub fn conditional_key(&self) -> &str {
        &self.conditional_key
    }

    /// 条件参数所在的容器
    pub fn container(&self) -> &InstanceContainer {
        &self.container
    }

    /// 已构建的原型实例
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.get()
    }

    /// 返回原型实例，尚未构建时构建；同一条件键的并发请求只构建一次
    fn get_or_build(
        &self,
        descriptor: &ComponentDescriptor,
        global: &InstanceContainer,
        properties: Option<&dyn PropertyResolver>,
    ) -> Result<Instance, DependencyError> {
        self.instance
            .get_or_try_init(|| {
                debug!(
                    "构建原型组件: {} (条件键: {}, 作用域: {})",
                    descriptor.name, self.conditional_key, self.id
                );
                let sources: [&dyn InstanceStore; 2] = [&self.container, global];
                descriptor.produce(&BuildContext::new(descriptor, &sources, properties))
            })
            .map(Arc::clone)
    }
}

/// 作用域实例工厂
pub struct ScopedInstanceFactory {
    global: Arc<InstanceContainer>,
    properties: Option<Arc<dyn PropertyResolver>>,
    scopes: DashMap<String, Arc<ScopedContainer>>,
}

impl std::fmt::Debug for ScopedInstanceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedInstanceFactory")
            .field("global", &self.global)
            .field("has_properties", &self.properties.is_some())
            .field("scopes", &self.scopes.len())
            .finish()
    }
}

impl ScopedInstanceFactory {
    /// 创建工厂
    pub fn new(global: Arc<InstanceContainer>, properties: Option<Arc<dyn PropertyResolver>>) -> Self {
        Self {
            global,
            properties,
            scopes: DashMap::new(),
        }
    }

    /// 按名称取实例
    ///
    /// 未指定作用域的组件直接返回已构建的实例；单例组件首次请求时构建；
    /// 原型组件按 `args` 得到的条件键构建或复用。
    pub fn get_instance(&self, name: &str, args: Vec<ScopedArg>) -> Result<Instance, DependencyError> {
        let not_registered = || DependencyError::ComponentNotRegistered {
            name: name.to_string(),
        };
        let entry = self.global.get_entry(name).ok_or_else(not_registered)?;
        let Some(descriptor) = entry.descriptor.clone() else {
            return entry.current_value().ok_or_else(not_registered);
        };

        match descriptor.scope {
            ComponentScope::Unspecified => entry.current_value().ok_or_else(not_registered),
            ComponentScope::Singleton => {
                let sources: [&dyn InstanceStore; 1] = [self.global.as_ref()];
                descriptor.get_or_try_build(|| {
                    debug!("按需构建单例组件: {}", descriptor.name);
                    descriptor.produce(&BuildContext::new(
                        &descriptor,
                        &sources,
                        self.properties.as_deref(),
                    ))
                })
            }
            ComponentScope::Prototype => self.prototype(&descriptor, args),
        }
    }

    /// 按名称取实例并转换为 `T`
    pub fn get<T: Send + Sync + 'static>(
        &self,
        name: &str,
        args: Vec<ScopedArg>,
    ) -> Result<Arc<T>, DependencyError> {
        downcast(name, self.get_instance(name, args)?)
    }

    /// 作用域容器数量
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// 条件键对应的作用域容器
    pub fn scope(&self, conditional_key: &str) -> Option<Arc<ScopedContainer>> {
        self.scopes.get(conditional_key).map(|scope| Arc::clone(scope.value()))
    }

    /// 释放所有作用域容器
    pub fn clear(&self) {
        let count = self.scopes.len();
        self.scopes.clear();
        info!("已释放 {} 个作用域容器", count);
    }

    fn prototype(
        &self,
        descriptor: &ComponentDescriptor,
        args: Vec<ScopedArg>,
    ) -> Result<Instance, DependencyError> {
        let key = conditional_key(&descriptor.name, &args);
        let scope = match self.scope(&key) {
            Some(scope) => scope,
            None => {
                let created = Arc::new(ScopedContainer::new(key.clone(), args)?);
                Arc::clone(self.scopes.entry(key).or_insert(created).value())
            }
        };
        scope.get_or_build(descriptor, &self.global, self.properties.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{DeclaredDependency, InjectionContext, InjectionContextExt, Producer};
    use infrastructure_common::ComponentKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod tenant {
        use super::*;

        #[derive(Debug, Clone, PartialEq)]
        pub struct TenantId(pub String);

        impl ConditionalArg for TenantId {
            fn conditional_key(&self) -> String {
                self.0.clone()
            }
        }

        #[derive(Debug)]
        pub struct Session {
            pub tenant: TenantId,
            pub serial: usize,
        }
    }

    use tenant::{Session, TenantId};

    fn factory_with(scope: ComponentScope, calls: Arc<AtomicUsize>) -> ScopedInstanceFactory {
        let producer: Producer = Arc::new(move |ctx: &dyn InjectionContext| {
            let tenant = ctx.resolve::<Arc<TenantId>>(0)?;
            let serial = calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Session {
                tenant: (*tenant).clone(),
                serial,
            }) as Instance)
        });
        let mut descriptor = ComponentDescriptor::new(
            "tenant.session",
            ComponentKind::Factory,
            TypeInfo::of::<Session>(),
            producer,
        );
        descriptor.dependencies = vec![DeclaredDependency::new("tenant.tenantId")];
        descriptor.scope = scope;

        let global = Arc::new(InstanceContainer::default());
        global
            .set(InstanceEntry::deferred(Arc::new(descriptor)))
            .unwrap();
        ScopedInstanceFactory::new(global, None)
    }

    #[test]
    fn test_conditional_key() {
        let args = vec![ScopedArg::new(TenantId("a".into())), ScopedArg::named("n", 7u64)];
        assert_eq!(conditional_key("tenant.session", &args), "14:tenant.session-1:a-1:7");
        assert_eq!(conditional_key("tenant.session", &[]), "14:tenant.session");
        assert_eq!(args[0].name(), "tenant.tenantId");
    }

    #[test]
    fn test_prototype_per_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = factory_with(ComponentScope::Prototype, Arc::clone(&calls));

        let a1 = factory
            .get::<Session>("tenant.session", vec![ScopedArg::new(TenantId("a".into()))])
            .unwrap();
        let b = factory
            .get::<Session>("tenant.session", vec![ScopedArg::new(TenantId("b".into()))])
            .unwrap();
        let a2 = factory
            .get::<Session>("tenant.session", vec![ScopedArg::new(TenantId("a".into()))])
            .unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(a1.tenant, TenantId("a".into()));
        assert_eq!(b.tenant, TenantId("b".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(factory.scope_count(), 2);

        let scope = factory.scope("14:tenant.session-1:a").unwrap();
        assert_eq!(scope.conditional_key(), "14:tenant.session-1:a");
        assert!(scope.instance().is_some());
        assert!(scope.container().contains("tenant.tenantId"));
    }

    #[test]
    fn test_argument_boundaries_are_part_of_key() {
        let joined = vec![ScopedArg::new(TenantId("a-b".into()))];
        let split = vec![
            ScopedArg::new(TenantId("a".into())),
            ScopedArg::named("tenant.region", "b".to_string()),
        ];
        assert_ne!(
            conditional_key("tenant.session", &joined),
            conditional_key("tenant.session", &split)
        );

        let calls = Arc::new(AtomicUsize::new(0));
        let factory = factory_with(ComponentScope::Prototype, Arc::clone(&calls));
        let first = factory.get::<Session>("tenant.session", joined).unwrap();
        let second = factory.get::<Session>("tenant.session", split).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.tenant, TenantId("a-b".into()));
        assert_eq!(second.tenant, TenantId("a".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_prototype_missing_arg_fails_without_caching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = factory_with(ComponentScope::Prototype, Arc::clone(&calls));

        let err = factory.get::<Session>("tenant.session", Vec::new()).unwrap_err();
        assert!(matches!(err, DependencyError::ComponentNotRegistered { .. }));
        assert!(factory.scope("14:tenant.session").unwrap().instance().is_none());
    }

    #[test]
    fn test_singleton_built_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = factory_with(ComponentScope::Singleton, Arc::clone(&calls));
        factory
            .global
            .set(InstanceEntry::instance("tenant.tenantId", Arc::new(TenantId("g".into()))))
            .unwrap();

        let first = factory.get::<Session>("tenant.session", Vec::new()).unwrap();
        let second = factory
            .get::<Session>("tenant.session", vec![ScopedArg::new(TenantId("ignored".into()))])
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.tenant, TenantId("g".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(factory.scope_count(), 0);
    }

    #[test]
    fn test_unknown_name() {
        let factory = ScopedInstanceFactory::new(Arc::new(InstanceContainer::default()), None);
        assert!(matches!(
            factory.get_instance("nope.missing", Vec::new()),
            Err(DependencyError::ComponentNotRegistered { .. })
        ));
    }

    #[test]
    fn test_clear_releases_scopes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = factory_with(ComponentScope::Prototype, Arc::clone(&calls));
        factory
            .get::<Session>("tenant.session", vec![ScopedArg::new(TenantId("a".into()))])
            .unwrap();
        factory.clear();
        assert_eq!(factory.scope_count(), 0);

        factory
            .get::<Session>("tenant.session", vec![ScopedArg::new(TenantId("a".into()))])
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
