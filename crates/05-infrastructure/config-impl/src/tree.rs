//! 配置树
//!
//! 以点号路径寻址的嵌套键值树。作为 `config` 的配置源参与分层合并：
//! 映射逐键深度合并，标量与列表整体替换。

use serde::Deserialize;
use serde_json::{Map, Value};

/// 路径分隔符
pub const PATH_SEPARATOR: char = '.';

/// 以点号路径寻址的配置树
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTree {
    root: Value,
}

impl Default for PropertyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyTree {
    /// 创建空配置树
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// 从映射创建配置树，其他值得到空树
    pub fn from_value(value: Value) -> Self {
        match value {
            root @ Value::Object(_) => Self { root },
            _ => Self::new(),
        }
    }

    /// 整棵树的根节点
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// 取出根节点
    pub fn into_value(self) -> Value {
        self.root
    }

    /// 是否为空树
    pub fn is_empty(&self) -> bool {
        self.root.as_object().map_or(true, Map::is_empty)
    }

    /// 按路径取值，空路径返回根节点
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if path.is_empty() {
            return Some(&self.root);
        }

        let mut current = &self.root;
        for segment in path.split(PATH_SEPARATOR) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// 路径上是否存在非空值
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some_and(|value| !value.is_null())
    }

    /// 按路径设置值，沿途缺失或非映射的节点会被替换为映射
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path
            .trim()
            .split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            current = ensure_object(current)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(current).insert(last.to_string(), value);
    }

    /// 仅当路径上没有值时设置，返回是否写入
    pub fn set_default(&mut self, path: &str, value: Value) -> bool {
        if self.contains(path) {
            return false;
        }
        self.set(path, value);
        true
    }

    /// 所有叶子节点的点号路径，列表视为叶子
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_leaf_paths(&self.root, String::new(), &mut paths);
        paths
    }
}

/// 是否为标量值
pub fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// 标量值的文本形式，空值为空串
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl config::Source for PropertyTree {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new(self.clone())
    }

    /// 顶层键按 `config` 的路径表达式展开，`a.b: 1` 等价于 `a: { b: 1 }`
    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        config::Value::deserialize(self.root.clone())
            .map_err(|e| config::ConfigError::Foreign(Box::new(e)))?
            .into_table()
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("节点刚被替换为映射"),
    }
}

fn collect_leaf_paths(value: &Value, prefix: String, paths: &mut Vec<String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}{PATH_SEPARATOR}{key}")
                };
                collect_leaf_paths(child, path, paths);
            }
        }
        _ if !prefix.is_empty() => paths.push(prefix),
        _ => {}
    }
}
