//! 构建上下文
//!
//! 实例化时交给生产函数的 [`InjectionContext`] 实现。依赖按解析后的名称
//! 依次在各个实例存储中查找；尚未构建的单例组件在首次被依赖时构建。

use config_abstractions::PropertyResolver;
use di_abstractions::{ComponentDescriptor, InjectionContext, InstanceEntry, InstanceStore};
use infrastructure_common::{ComponentScope, ConfigError, Instance};
use serde_json::Value;
use tracing::{debug, error};

/// 构建上下文
pub struct BuildContext<'a> {
    descriptor: &'a ComponentDescriptor,
    sources: &'a [&'a dyn InstanceStore],
    properties: Option<&'a dyn PropertyResolver>,
}

impl<'a> BuildContext<'a> {
    /// 创建上下文，`sources` 按查找顺序排列
    pub fn new(
        descriptor: &'a ComponentDescriptor,
        sources: &'a [&'a dyn InstanceStore],
        properties: Option<&'a dyn PropertyResolver>,
    ) -> Self {
        Self {
            descriptor,
            sources,
            properties,
        }
    }

    /// 以单例方式构建描述符，并发调用只构建一次
    pub fn build_singleton(&self, descriptor: &ComponentDescriptor) -> Option<Instance> {
        let result = descriptor.get_or_try_build(|| {
            debug!("按需构建单例组件: {}", descriptor.name);
            descriptor.produce(&BuildContext::new(descriptor, self.sources, self.properties))
        });
        match result {
            Ok(instance) => Some(instance),
            Err(e) => {
                error!("单例组件构建失败: {} ({})", descriptor.name, e);
                None
            }
        }
    }

    fn instance_of(&self, entry: InstanceEntry) -> Option<Instance> {
        if let Some(value) = entry.current_value() {
            return Some(value);
        }
        let descriptor = entry.descriptor?;
        match descriptor.scope {
            ComponentScope::Singleton => self.build_singleton(&descriptor),
            scope => {
                debug!(
                    "组件 {} 的作用域为 {}，不能作为 {} 的依赖直接注入",
                    entry.name, scope, self.descriptor.name
                );
                None
            }
        }
    }
}

impl InjectionContext for BuildContext<'_> {
    fn component_name(&self) -> &str {
        &self.descriptor.name
    }

    fn requested(&self, index: usize) -> Option<&str> {
        self.descriptor
            .dependencies
            .get(index)
            .map(|dependency| dependency.name.as_str())
    }

    fn dependency(&self, index: usize) -> Option<Instance> {
        let name = match self.descriptor.resolved_dependencies.get(index) {
            Some(resolved) => resolved.lookup_name(),
            None => self.requested(index)?,
        };
        self.lookup(name)
    }

    fn field(&self, field: &str) -> Option<Instance> {
        let index = self
            .descriptor
            .dependencies
            .iter()
            .position(|dependency| dependency.field.as_deref() == Some(field))?;
        self.dependency(index)
    }

    fn has_field(&self, field: &str) -> bool {
        self.descriptor
            .dependencies
            .iter()
            .any(|dependency| dependency.field.as_deref() == Some(field))
    }

    fn lookup(&self, name: &str) -> Option<Instance> {
        self.sources
            .iter()
            .find_map(|source| source.get_entry(name))
            .and_then(|entry| self.instance_of(entry))
    }

    fn bind_properties(&self, prefix: &str, defaults: Value) -> Result<Value, ConfigError> {
        match self.properties {
            Some(properties) => properties.bind_value(prefix, defaults),
            None => Ok(defaults),
        }
    }
}
