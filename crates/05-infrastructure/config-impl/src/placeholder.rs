//! `${path[:default]}` 引用解析

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::tree::{is_scalar, scalar_text, PropertyTree};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^{}]+)\}").expect("占位符正则表达式无效"));

/// 嵌套引用的最大解析深度
pub const MAX_RESOLVE_DEPTH: usize = 8;

/// 环境变量查询函数
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// 引用解析器
///
/// 查找顺序：全大写名称优先取环境变量，其次取配置树中的值，
/// 再次取环境变量，然后取默认值，都没有时为空串。
#[derive(Clone)]
pub struct PlaceholderResolver {
    env: EnvLookup,
    max_depth: usize,
}

impl fmt::Debug for PlaceholderResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceholderResolver")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Default for PlaceholderResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderResolver {
    /// 使用进程环境变量创建解析器
    pub fn new() -> Self {
        Self::with_env_lookup(|name| std::env::var(name).ok())
    }

    /// 使用自定义环境变量查询创建解析器
    pub fn with_env_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            env: Arc::new(lookup),
            max_depth: MAX_RESOLVE_DEPTH,
        }
    }

    /// 查询环境变量
    pub fn env(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|value| !value.is_empty())
    }

    /// 文本中是否包含引用
    pub fn contains_placeholder(text: &str) -> bool {
        PLACEHOLDER.is_match(text)
    }

    /// 解析模板
    ///
    /// 模板恰好是一个引用时保留被引用值的类型；被引用值为列表或映射时，
    /// 该值整体替换模板。
    pub fn resolve(&self, template: &str, tree: &PropertyTree) -> Value {
        self.resolve_at(template, tree, 0)
    }

    /// 递归解析值中的所有字符串
    pub fn resolve_value(&self, value: &Value, tree: &PropertyTree) -> Value {
        self.resolve_value_at(value, tree, 0)
    }

    fn resolve_value_at(&self, value: &Value, tree: &PropertyTree, depth: usize) -> Value {
        match value {
            Value::String(text) => self.resolve_at(text, tree, depth),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_value_at(item, tree, depth))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.resolve_value_at(item, tree, depth)))
                    .collect::<Map<_, _>>(),
            ),
            other => other.clone(),
        }
    }

    fn resolve_at(&self, template: &str, tree: &PropertyTree, depth: usize) -> Value {
        if depth >= self.max_depth || !Self::contains_placeholder(template) {
            return Value::String(template.to_string());
        }

        if let Some(captures) = PLACEHOLDER.captures(template) {
            let whole = captures.get(0).map_or(0..0, |m| m.range());
            if whole == (0..template.len()) {
                return self.lookup(&captures[1], tree, depth);
            }
        }

        let mut text = String::with_capacity(template.len());
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(template) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            match self.lookup(&captures[1], tree, depth) {
                structured @ (Value::Array(_) | Value::Object(_)) => return structured,
                value => {
                    text.push_str(&template[last..whole.start()]);
                    text.push_str(&scalar_text(&value));
                    last = whole.end();
                }
            }
        }
        text.push_str(&template[last..]);
        Value::String(text)
    }

    fn lookup(&self, expression: &str, tree: &PropertyTree, depth: usize) -> Value {
        let (path, default) = match expression.split_once(':') {
            Some((path, default)) => (path.trim(), Some(default)),
            None => (expression.trim(), None),
        };

        if is_env_style(path) {
            if let Some(value) = self.env(path) {
                return Value::String(value);
            }
        }

        match tree.get(path) {
            Some(Value::String(text)) => return self.resolve_at(text, tree, depth + 1),
            Some(value) if is_scalar(value) => return value.clone(),
            Some(value @ (Value::Array(_) | Value::Object(_))) => {
                return self.resolve_value_at(value, tree, depth + 1)
            }
            _ => {}
        }

        if let Some(value) = self.env(path) {
            return Value::String(value);
        }

        match default {
            Some(default) => self.resolve_at(default, tree, depth + 1),
            None => Value::String(String::new()),
        }
    }
}

/// 全大写的名称按环境变量优先处理
fn is_env_style(path: &str) -> bool {
    path.chars().any(char::is_alphabetic) && !path.chars().any(char::is_lowercase)
}
