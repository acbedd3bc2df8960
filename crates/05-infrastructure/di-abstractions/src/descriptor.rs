//! 组件描述符
//!
//! 描述符是一个可注册组件的规范化元数据，在提取阶段创建，
//! 解析阶段补全依赖目标，实例化阶段记录构建结果。

use infrastructure_common::{
    ComponentKind, ComponentScope, DependencyError, Instance, TypeInfo, NAME_SEPARATOR,
};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

use crate::context::InjectionContext;

/// 组件生产函数
pub type Producer =
    Arc<dyn Fn(&dyn InjectionContext) -> Result<Instance, DependencyError> + Send + Sync>;

/// 声明的依赖
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    /// 依赖名称
    pub name: String,
    /// 声明该依赖的注入字段
    pub field: Option<String>,
}

impl DeclaredDependency {
    /// 按名称声明的依赖
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
        }
    }

    /// 由注入字段声明的依赖
    pub fn field(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: Some(field.into()),
        }
    }
}

/// 解析后的依赖
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// 声明的依赖名称
    pub requested: String,
    /// 匹配到的组件标识，`None` 表示外部依赖
    pub target: Option<String>,
}

impl ResolvedDependency {
    /// 是否为外部依赖
    pub fn is_external(&self) -> bool {
        self.target.is_none()
    }

    /// 查找实例时使用的名称
    pub fn lookup_name(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.requested)
    }
}

/// 组件描述符
pub struct ComponentDescriptor {
    /// 组件标识：`包名.短名称`
    pub name: String,
    /// 短名称
    pub short_name: String,
    /// 包名
    pub package_name: String,
    /// 组件种类
    pub kind: ComponentKind,
    /// 产出实例的类型
    pub declared_type: TypeInfo,
    /// 声明的依赖，按位置排列
    pub dependencies: Vec<DeclaredDependency>,
    /// 解析后的依赖，与 `dependencies` 一一对应
    pub resolved_dependencies: Vec<ResolvedDependency>,
    /// 作用域
    pub scope: ComponentScope,
    /// 能力标记（小驼峰形式）
    pub capabilities: Vec<String>,
    /// 生产方法名称（仅方法组件）
    pub method_name: Option<String>,
    /// 所属配置组件的标识（仅方法组件）
    pub owner: Option<String>,
    producer: Producer,
    built_instance: OnceCell<Instance>,
}

impl ComponentDescriptor {
    /// 创建描述符，`name` 的最后一个分隔符之前为包名
    pub fn new(
        name: impl Into<String>,
        kind: ComponentKind,
        declared_type: TypeInfo,
        producer: Producer,
    ) -> Self {
        let name = name.into();
        let (package_name, short_name) = match name.rsplit_once(NAME_SEPARATOR) {
            Some((package, short)) => (package.to_string(), short.to_string()),
            None => (String::new(), name.clone()),
        };

        Self {
            name,
            short_name,
            package_name,
            kind,
            declared_type,
            dependencies: Vec::new(),
            resolved_dependencies: Vec::new(),
            scope: ComponentScope::Unspecified,
            capabilities: Vec::new(),
            method_name: None,
            owner: None,
            producer,
            built_instance: OnceCell::new(),
        }
    }

    /// 组件标识
    pub fn identity(&self) -> &str {
        &self.name
    }

    /// 声明的依赖名称
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|dependency| dependency.name.as_str())
    }

    /// 所属配置组件的包名
    pub fn owner_package(&self) -> Option<&str> {
        let owner = self.owner.as_deref()?;
        Some(owner.rsplit_once(NAME_SEPARATOR).map_or("", |(package, _)| package))
    }

    /// 是否显式指定了作用域
    pub fn is_scoped(&self) -> bool {
        self.scope.is_explicit()
    }

    /// 是否带有指定能力
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// 调用生产函数
    pub fn produce(&self, ctx: &dyn InjectionContext) -> Result<Instance, DependencyError> {
        (self.producer)(ctx)
    }

    /// 已构建的实例
    pub fn built_instance(&self) -> Option<&Instance> {
        self.built_instance.get()
    }

    /// 记录构建结果，已有结果时返回 `false`
    pub fn set_built_instance(&self, instance: Instance) -> bool {
        self.built_instance.set(instance).is_ok()
    }

    /// 返回已构建的实例，尚未构建时调用 `build`，并发调用只会构建一次
    pub fn get_or_try_build<F>(&self, build: F) -> Result<Instance, DependencyError>
    where
        F: FnOnce() -> Result<Instance, DependencyError>,
    {
        self.built_instance.get_or_try_init(build).map(Arc::clone)
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("declared_type", &self.declared_type.module_path)
            .field("dependencies", &self.dependencies)
            .field("resolved_dependencies", &self.resolved_dependencies)
            .field("scope", &self.scope)
            .field("capabilities", &self.capabilities)
            .field("method_name", &self.method_name)
            .field("owner", &self.owner)
            .field("built", &self.built_instance.get().is_some())
            .finish()
    }
}
