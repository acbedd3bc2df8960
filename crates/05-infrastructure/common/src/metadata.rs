//! 元数据定义
//!
//! 提供类型和字段的元数据信息，以及组件命名约定

use std::any::TypeId;
use std::fmt;

/// 名称分隔符
pub const NAME_SEPARATOR: char = '.';

/// 被视为间接引用的包装类型，命名时会被剥离
const INDIRECTIONS: &[&str] = &[
    "alloc::sync::Arc<",
    "alloc::boxed::Box<",
    "alloc::rc::Rc<",
    "core::option::Option<",
    "std::sync::Arc<",
    "std::boxed::Box<",
    "std::rc::Rc<",
    "std::option::Option<",
];

/// 类型信息
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// 类型名称（不含模块路径和泛型参数）
    pub name: String,
    /// 类型ID
    pub id: TypeId,
    /// 去除间接引用后的完整路径
    pub module_path: String,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        let module_path = base_path(std::any::type_name::<T>());
        let name = module_path
            .rsplit("::")
            .next()
            .unwrap_or(module_path.as_str())
            .to_string();

        Self {
            name,
            id: TypeId::of::<T>(),
            module_path,
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// 包名：类型路径中紧邻类型名的模块段
    pub fn package_name(&self) -> &str {
        let mut segments = self.module_path.rsplit("::");
        segments.next();
        segments.next().unwrap_or("")
    }

    /// 小驼峰形式的类型名
    pub fn lower_camel_name(&self) -> String {
        lower_camel(&self.name)
    }

    /// 规范化名称: `包名.小驼峰类型名`
    pub fn normalized_name(&self) -> String {
        qualify(self.package_name(), &self.lower_camel_name())
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl std::hash::Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.module_path)
    }
}

/// 字段信息
///
/// 描述组件的一个字段。`inject` 为 `Some` 表示字段带有注入标记：
/// 空字符串表示目标名称由字段类型推导，否则为显式目标名称。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// 字段名称
    pub name: String,
    /// 字段类型（已剥离间接引用）
    pub type_info: TypeInfo,
    /// 注入标记
    pub inject: Option<String>,
}

impl FieldInfo {
    /// 普通字段，仅用于工厂参数匹配
    pub fn of<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_info: TypeInfo::of::<T>(),
            inject: None,
        }
    }

    /// 带注入标记的字段，目标名称由字段类型推导
    pub fn inject<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_info: TypeInfo::of::<T>(),
            inject: Some(String::new()),
        }
    }

    /// 带注入标记的字段，显式指定目标名称
    pub fn inject_named<T: ?Sized + 'static>(
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_info: TypeInfo::of::<T>(),
            inject: Some(target.into()),
        }
    }

    /// 是否带有注入标记
    pub fn is_injected(&self) -> bool {
        self.inject.is_some()
    }

    /// 显式注入目标名称（非空时）
    pub fn injection_target(&self) -> Option<&str> {
        self.inject.as_deref().filter(|target| !target.is_empty())
    }
}

/// 转换为小驼峰命名
///
/// `UserService` -> `userService`，`user_repo` -> `userRepo`
pub fn lower_camel(name: &str) -> String {
    if !name.contains(['_', '-']) {
        return lower_first(name);
    }

    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .enumerate()
        .map(|(index, part)| {
            if index == 0 {
                lower_first(part)
            } else {
                upper_first(part)
            }
        })
        .collect()
}

/// 以包名限定名称；已包含分隔符的名称保持不变
pub fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() || name.contains(NAME_SEPARATOR) {
        name.to_string()
    } else {
        format!("{package}{NAME_SEPARATOR}{name}")
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 剥离引用、trait object 和智能指针包装，并去除泛型参数
fn base_path(type_name: &str) -> String {
    let mut current = type_name.trim();

    loop {
        let before = current;
        current = current.trim_start_matches('&').trim_start();
        current = current.strip_prefix("mut ").unwrap_or(current);
        current = current.strip_prefix("dyn ").unwrap_or(current);

        for wrapper in INDIRECTIONS {
            if let Some(inner) = current
                .strip_prefix(wrapper)
                .and_then(|rest| rest.strip_suffix('>'))
            {
                current = inner;
                break;
            }
        }

        if current == before {
            break;
        }
    }

    let current = current.split(" + ").next().unwrap_or(current);
    let current = current.split('<').next().unwrap_or(current);
    current.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    mod services {
        pub struct UserService;
        pub trait Repository {}
    }

    #[test]
    fn test_type_info_strips_indirection() {
        let plain = TypeInfo::of::<services::UserService>();
        let wrapped = TypeInfo::of::<Arc<services::UserService>>();

        assert_eq!(plain.short_name(), "UserService");
        assert_eq!(plain.package_name(), "services");
        assert_eq!(wrapped.short_name(), "UserService");
        assert_eq!(wrapped.module_path, plain.module_path);
    }

    #[test]
    fn test_type_info_trait_object() {
        let info = TypeInfo::of::<Arc<dyn services::Repository + Send + Sync>>();
        assert_eq!(info.short_name(), "Repository");
        assert_eq!(info.normalized_name(), "services.repository");
    }

    #[test]
    fn test_type_info_generic_arguments_removed() {
        let info = TypeInfo::of::<Vec<String>>();
        assert_eq!(info.short_name(), "Vec");
        assert_eq!(info.normalized_name(), "vec.vec");
    }

    #[test]
    fn test_lower_camel() {
        assert_eq!(lower_camel("UserService"), "userService");
        assert_eq!(lower_camel("user_repo"), "userRepo");
        assert_eq!(lower_camel("http-client"), "httpClient");
        assert_eq!(lower_camel(""), "");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("services", "userService"), "services.userService");
        assert_eq!(qualify("services", "other.userService"), "other.userService");
        assert_eq!(qualify("", "userService"), "userService");
    }

    #[test]
    fn test_field_info_injection_target() {
        let derived = FieldInfo::inject::<services::UserService>("user_service");
        let named = FieldInfo::inject_named::<services::UserService>("svc", "custom.svc");
        let plain = FieldInfo::of::<services::UserService>("svc");

        assert!(derived.is_injected());
        assert_eq!(derived.injection_target(), None);
        assert_eq!(named.injection_target(), Some("custom.svc"));
        assert!(!plain.is_injected());
    }
}
