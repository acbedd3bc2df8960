//! 组件基础定义

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 已构建的组件实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 组件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// 值组件 - 直接注入字段，不调用构造函数
    Value,
    /// 工厂组件 - 以依赖为位置参数调用工厂函数
    Factory,
    /// 方法组件 - 以所属配置实例为接收者调用生产方法
    Method,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Value => "value",
            Self::Factory => "factory",
            Self::Method => "method",
        };
        f.write_str(text)
    }
}
