//! 元数据提取器
//!
//! 将原始组件规范化为描述符：确定名称、种类、作用域和依赖名称。
//! 提取过程是纯函数，相同输入总是得到相同输出。

use di_abstractions::{
    ComponentDescriptor, ConventionalNameResolver, DeclaredDependency, OwnerFields, RawComponent,
    TypeNameResolver,
};
use infrastructure_common::{lower_camel, ComponentKind, ComponentScope, TypeInfo};
use std::sync::Arc;
use tracing::{debug, warn};

/// 元数据提取器
#[derive(Clone)]
pub struct MetadataExtractor {
    names: Arc<dyn TypeNameResolver>,
}

impl std::fmt::Debug for MetadataExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataExtractor").finish_non_exhaustive()
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new(Arc::new(ConventionalNameResolver))
    }
}

impl MetadataExtractor {
    /// 使用指定的命名规则创建提取器
    pub fn new(names: Arc<dyn TypeNameResolver>) -> Self {
        Self { names }
    }

    /// 提取描述符
    ///
    /// 配置组件产出自身的描述符，以及每个生产方法（递归地）的方法描述符。
    pub fn extract(&self, raw: RawComponent) -> Vec<ComponentDescriptor> {
        let mut descriptors = Vec::new();
        self.extract_into(raw, None, &mut descriptors);
        descriptors
    }

    fn extract_into(
        &self,
        raw: RawComponent,
        owner: Option<&str>,
        descriptors: &mut Vec<ComponentDescriptor>,
    ) {
        let RawComponent {
            kind,
            declared_type,
            parameters,
            fields,
            method_name,
            options,
            producer,
            methods,
        } = raw;

        if kind == ComponentKind::Method && owner.is_none() {
            warn!(
                "生产方法缺少所属配置组件，已忽略: {}",
                method_name.as_deref().unwrap_or("<unnamed>")
            );
            return;
        }

        let name = match options.name.as_deref() {
            Some(explicit) => self
                .names
                .explicit_name(declared_type.package_name(), explicit),
            None => self.names.component_name(&declared_type),
        };

        let mut descriptor = ComponentDescriptor::new(name, kind, declared_type, producer);
        descriptor.scope = match (kind, options.scope) {
            (ComponentKind::Value, ComponentScope::Prototype) => {
                warn!("值组件不支持原型作用域，按单例处理: {}", descriptor.name);
                ComponentScope::Singleton
            }
            (_, scope) => scope,
        };
        descriptor.capabilities = options
            .capabilities
            .iter()
            .map(|capability| lower_camel(capability))
            .collect();
        descriptor.method_name = method_name;
        descriptor.owner = owner.map(str::to_string);

        match kind {
            ComponentKind::Factory | ComponentKind::Method => {
                if let Some(owner) = owner {
                    descriptor.dependencies.push(DeclaredDependency::new(owner));
                }
                descriptor.dependencies.extend(parameters.iter().map(|parameter| {
                    DeclaredDependency::new(self.parameter_dependency(parameter, options.owner.as_ref()))
                }));
            }
            ComponentKind::Value => {
                descriptor.dependencies.extend(
                    fields
                        .iter()
                        .filter(|field| field.is_injected())
                        .map(|field| {
                            let target = field.injection_target().map_or_else(
                                || self.names.component_name(&field.type_info),
                                str::to_string,
                            );
                            DeclaredDependency::field(target, &field.name)
                        }),
                );
            }
        }
        descriptor
            .dependencies
            .extend(options.depends_on.iter().map(DeclaredDependency::new));

        debug!(
            "提取组件元数据: {} ({}), 依赖: {:?}",
            descriptor.name,
            descriptor.kind,
            descriptor.dependency_names().collect::<Vec<_>>()
        );

        let owner_name = descriptor.name.clone();
        descriptors.push(descriptor);
        for method in methods {
            self.extract_into(method, Some(&owner_name), descriptors);
        }
    }

    /// 参数依赖名称：优先匹配所属类型的同类型字段
    fn parameter_dependency(&self, parameter: &TypeInfo, owner: Option<&OwnerFields>) -> String {
        owner
            .and_then(|owner| {
                owner
                    .field_for(parameter)
                    .map(|field| self.names.field_dependency_name(&owner.package, field))
            })
            .unwrap_or_else(|| self.names.component_name(parameter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{
        ComponentOptions, Configuration, Injectable, ProducerRegistry,
    };
    use infrastructure_common::{DependencyError, FieldInfo};

    mod repository {
        pub struct UserRepo;
        pub struct AuditLog;
    }

    mod service {
        use super::*;

        pub struct UserService;

        pub struct Handler {
            pub service: Option<Arc<UserService>>,
        }

        impl Injectable for Handler {
            fn fields() -> Vec<FieldInfo> {
                vec![
                    FieldInfo::inject::<UserService>("service"),
                    FieldInfo::inject_named::<repository::AuditLog>("audit", "audit.primary"),
                    FieldInfo::of::<String>("label"),
                ]
            }
        }

        pub struct ServiceOwner;

        impl Injectable for ServiceOwner {
            fn fields() -> Vec<FieldInfo> {
                vec![FieldInfo::of::<repository::UserRepo>("primary_repo")]
            }
        }
    }

    mod config {
        use super::*;

        pub struct Client;
        pub struct Pool;

        pub struct AppConfiguration;

        impl Injectable for AppConfiguration {}

        impl Configuration for AppConfiguration {
            fn producers(registry: &mut ProducerRegistry<Self>) {
                registry
                    .method("client", |_: &Self| -> Result<Client, DependencyError> { Ok(Client) })
                    .method("pool", |_: &Self, _c: Arc<Client>| -> Result<Pool, DependencyError> {
                        Ok(Pool)
                    });
            }
        }
    }

    fn new_service(_repo: Arc<repository::UserRepo>) -> Result<service::UserService, DependencyError> {
        Ok(service::UserService)
    }

    #[test]
    fn test_factory_naming_and_parameters() {
        let extractor = MetadataExtractor::default();
        let descriptors = extractor.extract(RawComponent::factory(new_service));

        assert_eq!(descriptors.len(), 1);
        let d = &descriptors[0];
        assert_eq!(d.name, "service.userService");
        assert_eq!(d.package_name, "service");
        assert_eq!(d.short_name, "userService");
        assert_eq!(d.dependency_names().collect::<Vec<_>>(), vec!["repository.userRepo"]);
    }

    #[test]
    fn test_factory_parameter_matches_owner_field() {
        let extractor = MetadataExtractor::default();
        let raw = RawComponent::factory(new_service)
            .with_options(ComponentOptions::new().with_owner::<service::ServiceOwner>());
        let descriptors = extractor.extract(raw);

        assert_eq!(
            descriptors[0].dependency_names().collect::<Vec<_>>(),
            vec!["service.primaryRepo"]
        );
    }

    #[test]
    fn test_explicit_name_qualification() {
        let extractor = MetadataExtractor::default();
        let plain = extractor.extract(
            RawComponent::factory(new_service).with_options(ComponentOptions::new().with_name("users")),
        );
        let qualified = extractor.extract(
            RawComponent::factory(new_service)
                .with_options(ComponentOptions::new().with_name("custom.users")),
        );

        assert_eq!(plain[0].name, "service.users");
        assert_eq!(qualified[0].name, "custom.users");
        assert_eq!(qualified[0].package_name, "custom");
    }

    #[test]
    fn test_value_inject_fields_and_depends_on() {
        let extractor = MetadataExtractor::default();
        let raw = RawComponent::value(service::Handler { service: None }).with_options(
            ComponentOptions::new()
                .with_depends_on("repository.userRepo, audit.secondary")
                .with_capability("HttpHandler"),
        );
        let d = &extractor.extract(raw)[0];

        assert_eq!(
            d.dependency_names().collect::<Vec<_>>(),
            vec![
                "service.userService",
                "audit.primary",
                "repository.userRepo",
                "audit.secondary"
            ]
        );
        assert_eq!(d.dependencies[0].field.as_deref(), Some("service"));
        assert_eq!(d.dependencies[2].field, None);
        assert_eq!(d.capabilities, vec!["httpHandler".to_string()]);
    }

    #[test]
    fn test_configuration_yields_method_descriptors() {
        let extractor = MetadataExtractor::default();
        let descriptors = extractor.extract(RawComponent::configuration(config::AppConfiguration));

        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["config.appConfiguration", "config.client", "config.pool"]);

        let pool = &descriptors[2];
        assert_eq!(pool.kind, ComponentKind::Method);
        assert_eq!(pool.owner.as_deref(), Some("config.appConfiguration"));
        assert_eq!(
            pool.dependency_names().collect::<Vec<_>>(),
            vec!["config.appConfiguration", "config.client"]
        );
    }

    #[test]
    fn test_value_prototype_downgraded() {
        let extractor = MetadataExtractor::default();
        let raw = RawComponent::value(service::Handler { service: None })
            .with_options(ComponentOptions::new().with_scope(ComponentScope::Prototype));
        assert_eq!(extractor.extract(raw)[0].scope, ComponentScope::Singleton);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = MetadataExtractor::default();
        let first = extractor.extract(RawComponent::configuration(config::AppConfiguration));
        let second = extractor.extract(RawComponent::configuration(config::AppConfiguration));

        let describe = |ds: &[ComponentDescriptor]| {
            ds.iter()
                .map(|d| (d.name.clone(), d.dependency_names().map(str::to_string).collect::<Vec<_>>()))
                .collect::<Vec<_>>()
        };
        assert_eq!(describe(&first[..]), describe(&second[..]));
    }
}
