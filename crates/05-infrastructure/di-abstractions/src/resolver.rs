//! 依赖解析抽象接口
//!
//! 提供依赖图解析和组件命名的扩展点

use infrastructure_common::{lower_camel, qualify, DependencyError, FieldInfo, TypeInfo};
use std::sync::Arc;

use crate::descriptor::ComponentDescriptor;

/// 依赖解析器 trait
///
/// 将描述符排成拓扑顺序：每个组件都排在它所依赖的已注册组件之后
pub trait DependencyResolver: Send + Sync {
    /// 解析依赖并排序
    fn resolve(&self, descriptors: Vec<ComponentDescriptor>) -> Result<Resolution, DependencyError>;
}

/// 解析结果
#[derive(Debug, Default)]
pub struct Resolution {
    /// 拓扑排序后的描述符
    pub ordered: Vec<Arc<ComponentDescriptor>>,
    /// 未在已注册组件中找到的依赖
    pub external: Vec<ExternalDependency>,
}

impl Resolution {
    /// 按标识查找描述符
    pub fn find(&self, name: &str) -> Option<&Arc<ComponentDescriptor>> {
        self.ordered.iter().find(|descriptor| descriptor.name == name)
    }

    /// 排序后的组件标识
    pub fn names(&self) -> Vec<&str> {
        self.ordered.iter().map(|descriptor| descriptor.identity()).collect()
    }
}

/// 外部依赖：假定由容器之外提供
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDependency {
    /// 声明该依赖的组件
    pub component: String,
    /// 依赖名称
    pub requested: String,
}

/// 类型到组件名称的映射规则
///
/// 元数据提取器通过它为组件和依赖命名，可替换以改变命名约定
pub trait TypeNameResolver: Send + Sync {
    /// 组件名称：`包名.小驼峰类型名`
    fn component_name(&self, type_info: &TypeInfo) -> String {
        type_info.normalized_name()
    }

    /// 显式名称，不含分隔符时以包名限定
    fn explicit_name(&self, package: &str, name: &str) -> String {
        qualify(package, name)
    }

    /// 由所属类型字段推导的依赖名称
    fn field_dependency_name(&self, owner_package: &str, field: &FieldInfo) -> String {
        qualify(owner_package, &lower_camel(&field.name))
    }

    /// 由生产方法名推导的名称
    fn method_name(&self, owner_package: &str, method: &str) -> String {
        qualify(owner_package, &lower_camel(method))
    }
}

/// 默认命名约定
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalNameResolver;

impl TypeNameResolver for ConventionalNameResolver {}
