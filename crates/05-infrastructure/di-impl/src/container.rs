//! 实例容器实现
//!
//! 以名称为键保存实例条目，同时维护能力标记索引。

use dashmap::DashMap;
use di_abstractions::{ComponentDescriptor, ContainerConfig, InstanceEntry, InstanceStore};
use infrastructure_common::{lower_camel, DependencyError, Instance};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// 实例容器
#[derive(Debug, Default)]
pub struct InstanceContainer {
    config: ContainerConfig,
    entries: RwLock<HashMap<String, InstanceEntry>>,
    capabilities: DashMap<String, Vec<Arc<ComponentDescriptor>>>,
}

impl InstanceContainer {
    /// 创建容器
    pub fn new(config: ContainerConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            capabilities: DashMap::new(),
        }
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 带有指定能力的组件，按存入顺序排列
    pub fn get_by_capability(&self, capability: &str) -> Vec<Arc<ComponentDescriptor>> {
        self.capabilities
            .get(&lower_camel(capability))
            .map(|descriptors| descriptors.value().clone())
            .unwrap_or_default()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 所有条目名称，按字典序排列
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// 清空所有条目和能力索引
    pub fn clear(&self) {
        let count = {
            let mut entries = self.entries.write();
            let count = entries.len();
            entries.clear();
            count
        };
        self.capabilities.clear();
        debug!("实例容器已清空: {} 个条目", count);
    }

    fn index_capabilities(&self, descriptor: &Arc<ComponentDescriptor>) {
        for capability in &descriptor.capabilities {
            let mut indexed = self.capabilities.entry(capability.clone()).or_default();
            indexed.retain(|existing| existing.name != descriptor.name);
            indexed.push(Arc::clone(descriptor));
        }
    }

    fn unindex_capabilities(&self, descriptor: &ComponentDescriptor) {
        for capability in &descriptor.capabilities {
            if let Some(mut indexed) = self.capabilities.get_mut(capability) {
                indexed.retain(|existing| existing.name != descriptor.name);
            }
        }
    }
}

impl InstanceStore for InstanceContainer {
    fn set(&self, entry: InstanceEntry) -> Result<(), DependencyError> {
        let previous = {
            let mut entries = self.entries.write();
            if entries.contains_key(&entry.name) && !self.config.test_mode {
                error!("实例名称重复: {}", entry.name);
                return Err(DependencyError::DuplicateName {
                    name: entry.name.clone(),
                });
            }
            entries.insert(entry.name.clone(), entry.clone())
        };

        if let Some(previous) = previous {
            debug!("测试模式下覆盖实例: {}", previous.name);
            if let Some(descriptor) = &previous.descriptor {
                self.unindex_capabilities(descriptor);
            }
        }
        if let Some(descriptor) = &entry.descriptor {
            self.index_capabilities(descriptor);
        }
        Ok(())
    }

    fn get(&self, name: &str) -> Option<Instance> {
        self.entries.read().get(name)?.current_value()
    }

    fn get_entry(&self, name: &str) -> Option<InstanceEntry> {
        self.entries.read().get(name).cloned()
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    fn items(&self) -> HashMap<String, Instance> {
        self.entries
            .read()
            .iter()
            .filter_map(|(name, entry)| Some((name.clone(), entry.current_value()?)))
            .collect()
    }
}
