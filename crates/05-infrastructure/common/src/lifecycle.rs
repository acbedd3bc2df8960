//! 组件生命周期管理

use std::fmt;
use std::str::FromStr;

use crate::errors::DependencyError;

/// 组件作用域
///
/// 未指定作用域的组件在构建阶段直接实例化；显式指定作用域的组件
/// 在构建阶段只登记描述符，按需实例化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentScope {
    /// 未指定 - 构建时立即创建，整个容器共享
    #[default]
    Unspecified,
    /// 单例模式 - 首次请求时创建，之后复用
    Singleton,
    /// 原型模式 - 每个条件键创建一个实例
    Prototype,
}

impl ComponentScope {
    /// 是否显式指定了作用域
    pub fn is_explicit(self) -> bool {
        !matches!(self, Self::Unspecified)
    }

    /// 作用域的文本形式
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::Singleton => "singleton",
            Self::Prototype => "prototype",
        }
    }
}

impl fmt::Display for ComponentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentScope {
    type Err = DependencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Self::Unspecified),
            "singleton" => Ok(Self::Singleton),
            "prototype" => Ok(Self::Prototype),
            other => Err(DependencyError::invalid_target(
                other,
                "未知的作用域，可选值: singleton, prototype",
            )),
        }
    }
}
