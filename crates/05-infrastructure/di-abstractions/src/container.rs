//! 实例容器抽象接口
//!
//! 以名称为键的实例存储，每个名称对应唯一的条目

use infrastructure_common::{DependencyError, Instance, TypeInfo};
use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::ComponentDescriptor;
use crate::factory::downcast;

/// 容器条目
#[derive(Debug, Clone)]
pub struct InstanceEntry {
    /// 条目名称
    pub name: String,
    /// 组件描述符，直接存入的实例没有描述符
    pub descriptor: Option<Arc<ComponentDescriptor>>,
    /// 实例，按需构建的作用域组件在首次请求前为空
    pub value: Option<Instance>,
}

impl InstanceEntry {
    /// 直接存入的实例
    pub fn instance(name: impl Into<String>, value: Instance) -> Self {
        Self {
            name: name.into(),
            descriptor: None,
            value: Some(value),
        }
    }

    /// 已构建的组件
    pub fn built(descriptor: Arc<ComponentDescriptor>, value: Instance) -> Self {
        Self {
            name: descriptor.name.clone(),
            descriptor: Some(descriptor),
            value: Some(value),
        }
    }

    /// 仅登记描述符，按需构建
    pub fn deferred(descriptor: Arc<ComponentDescriptor>) -> Self {
        Self {
            name: descriptor.name.clone(),
            value: None,
            descriptor: Some(descriptor),
        }
    }

    /// 当前可用的实例，作用域组件取其已构建的实例
    pub fn current_value(&self) -> Option<Instance> {
        self.value.clone().or_else(|| {
            self.descriptor
                .as_ref()
                .and_then(|descriptor| descriptor.built_instance().cloned())
        })
    }
}

/// 实例存储 trait
pub trait InstanceStore: Send + Sync {
    /// 存入条目，名称冲突时返回 `DuplicateName`（测试模式下覆盖）
    fn set(&self, entry: InstanceEntry) -> Result<(), DependencyError>;

    /// 按名称取实例，不存在时为 `None`
    fn get(&self, name: &str) -> Option<Instance>;

    /// 按名称取条目
    fn get_entry(&self, name: &str) -> Option<InstanceEntry>;

    /// 是否包含名称
    fn contains(&self, name: &str) -> bool {
        self.get_entry(name).is_some()
    }

    /// 所有实例的快照
    fn items(&self) -> HashMap<String, Instance>;
}

/// 类型化的存取辅助方法
pub trait InstanceStoreExt: InstanceStore {
    /// 存入实例，未指定名称时使用类型的规范化名称
    fn set_instance<T: Send + Sync + 'static>(
        &self,
        name: Option<&str>,
        value: Arc<T>,
    ) -> Result<(), DependencyError> {
        let name = name.map_or_else(|| TypeInfo::of::<T>().normalized_name(), str::to_string);
        self.set(InstanceEntry::instance(name, value))
    }

    /// 按名称取实例并转换为 `T`
    fn get_typed<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(|instance| downcast(name, instance).ok())
    }

    /// 按类型的规范化名称取实例
    fn get_by_type<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get_typed(&TypeInfo::of::<T>().normalized_name())
    }
}

impl<S: InstanceStore + ?Sized> InstanceStoreExt for S {}

/// 容器配置
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    /// 测试模式：允许同名条目覆盖
    pub test_mode: bool,
}

impl ContainerConfig {
    /// 测试模式配置
    pub fn test() -> Self {
        Self { test_mode: true }
    }
}
