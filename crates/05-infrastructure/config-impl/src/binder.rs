//! 属性块叠加
//!
//! 以属性块默认值为底，用 `config` 的默认值与覆盖层叠加配置树片段。
//! 字符串到数字和布尔值的转换留给 [`PropertyBlock::from_properties`]，
//! 这里只补齐 `config` 不处理的形状：标量对应列表字段时转为列表，
//! 空串对应数字或布尔字段时取零值，空值不覆盖默认值。
//!
//! [`PropertyBlock::from_properties`]: infrastructure_common::PropertyBlock::from_properties

use infrastructure_common::ConfigError;
use serde::Deserialize;
use serde_json::{Map, Number, Value};

/// 叠加时属性块所在的键
const BLOCK_KEY: &str = "block";

/// 以 `defaults` 为底叠加 `overlay`
pub fn overlay_block(prefix: &str, defaults: Value, overlay: Value) -> Result<Value, ConfigError> {
    let overlay = conform(&defaults, overlay);
    let decode_error = |e: config::ConfigError| ConfigError::decode_error(prefix, e.to_string());
    let to_config = |value: Value| {
        config::Value::deserialize(value).map_err(|e| ConfigError::decode_error(prefix, e.to_string()))
    };

    let mut builder = config::Config::builder()
        .set_default(BLOCK_KEY, to_config(defaults)?)
        .map_err(decode_error)?;
    if !overlay.is_null() {
        builder = builder
            .set_override(BLOCK_KEY, to_config(overlay)?)
            .map_err(decode_error)?;
    }
    builder
        .build()
        .and_then(|settings| settings.get::<Value>(BLOCK_KEY))
        .map_err(decode_error)
}

/// 按默认值的形状整理覆盖值
fn conform(defaults: &Value, overlay: Value) -> Value {
    match (defaults, overlay) {
        (Value::Object(defaults), Value::Object(overlay)) => Value::Object(
            overlay
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| {
                    let value = match defaults.get(&key) {
                        Some(default) => conform(default, value),
                        None => value,
                    };
                    (key, value)
                })
                .collect::<Map<String, Value>>(),
        ),
        (Value::Array(defaults), overlay) => to_list(defaults.first(), overlay),
        (Value::Number(number), Value::String(text)) if text.trim().is_empty() => zero_like(number),
        (Value::Bool(_), Value::String(text)) if text.trim().is_empty() => Value::Bool(false),
        (Value::Null, Value::String(text)) if text.is_empty() => Value::Null,
        (_, overlay) => overlay,
    }
}

fn to_list(element: Option<&Value>, overlay: Value) -> Value {
    let items = match overlay {
        Value::Array(items) => items,
        Value::String(text) if text.trim().is_empty() => Vec::new(),
        Value::String(text) if text.contains(',') => text
            .split(',')
            .map(|item| Value::String(item.trim().to_string()))
            .collect(),
        Value::Object(map) => return Value::Object(map),
        Value::Null => return Value::Null,
        scalar => vec![scalar],
    };

    match element {
        Some(element) => Value::Array(items.into_iter().map(|item| conform(element, item)).collect()),
        None => Value::Array(items),
    }
}

fn zero_like(target: &Number) -> Value {
    if target.is_f64() {
        Number::from_f64(0.0).map_or(Value::Null, Value::Number)
    } else {
        Value::Number(0.into())
    }
}
