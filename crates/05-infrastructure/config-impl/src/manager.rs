//! 属性构建器实现
//!
//! 发现并合并各层配置源，解析激活环境，提供属性的读写与绑定。

use config_abstractions::{
    priority, PropertyResolver, PropertyResolverExt, PropertySource, ACTIVE_PROFILE_ENV,
    DEFAULT_BASE_NAME, DEFAULT_CONFIG_DIR, PROFILES_ACTIVE_KEY, PROFILES_INCLUDE_KEY,
};
use infrastructure_common::{ConfigError, PropertyBlock};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::binder::overlay_block;
use crate::discovery::{DiscoveredFiles, ProfileDiscovery};
use crate::placeholder::PlaceholderResolver;
use crate::providers::{CommandLineSource, FileSource};
use crate::tree::{is_scalar, scalar_text, PropertyTree};

/// 参与合并的配置层
#[derive(Debug)]
struct Layer {
    name: String,
    priority: i32,
    value: Value,
}

/// 构建器的可变状态
#[derive(Debug, Default)]
struct PropertyState {
    /// 程序设置的默认值
    defaults: PropertyTree,
    /// 运行时设置的值，优先级最高
    runtime: PropertyTree,
    /// 合并后的配置树
    merged: PropertyTree,
    active_profile: Option<String>,
    built: bool,
}

impl PropertyState {
    fn recompute_unbuilt(&mut self) {
        match merge_layers(&self.defaults, &mut [], &self.runtime, None) {
            Ok(merged) => self.merged = merged,
            Err(e) => error!("默认值合并失败: {}", e),
        }
    }
}

/// 属性构建器
///
/// 合并顺序（后者覆盖前者）：默认值、基础文件、引入的环境文件、
/// 激活环境文件、外部覆盖文件、命令行参数、运行时设置。
pub struct PropertyBuilder {
    config_dir: PathBuf,
    base_name: String,
    args: Vec<String>,
    override_files: Vec<PathBuf>,
    sources: Vec<Box<dyn PropertySource>>,
    placeholder: PlaceholderResolver,
    state: RwLock<PropertyState>,
}

impl std::fmt::Debug for PropertyBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("PropertyBuilder")
            .field("config_dir", &self.config_dir)
            .field("base_name", &self.base_name)
            .field("sources_count", &self.sources.len())
            .field("active_profile", &state.active_profile)
            .field("built", &state.built)
            .finish()
    }
}

impl Default for PropertyBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR)
    }
}

impl PropertyBuilder {
    /// 创建属性构建器
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            base_name: DEFAULT_BASE_NAME.to_string(),
            args: Vec::new(),
            override_files: Vec::new(),
            sources: Vec::new(),
            placeholder: PlaceholderResolver::new(),
            state: RwLock::new(PropertyState::default()),
        }
    }

    /// 设置基础配置文件名
    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    /// 设置命令行参数
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// 添加外部覆盖文件
    pub fn with_override_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_files.push(path.into());
        self
    }

    /// 添加自定义配置源，按其优先级参与合并
    pub fn with_source(mut self, source: Box<dyn PropertySource>) -> Self {
        self.sources.push(source);
        self
    }

    /// 设置引用解析器，可替换环境变量查询
    pub fn with_placeholder_resolver(mut self, placeholder: PlaceholderResolver) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// 配置目录
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// 是否已完成构建
    pub fn is_built(&self) -> bool {
        self.state.read().built
    }

    /// 激活的环境名
    pub fn active_profile(&self) -> Option<String> {
        self.state.read().active_profile.clone()
    }

    /// 合并后的配置树快照
    pub fn snapshot(&self) -> PropertyTree {
        self.state.read().merged.clone()
    }

    /// 所有叶子属性路径
    pub fn keys(&self) -> Vec<String> {
        self.state.read().merged.leaf_paths()
    }

    /// 加载属性块
    pub fn load<P: PropertyBlock>(&self) -> Result<P, ConfigError> {
        self.bind::<P>()
    }

    /// 发现并合并所有配置源
    ///
    /// `profile` 显式指定激活环境，优先于环境变量和配置中的
    /// `app.profiles.active`。目录扫描失败或格式错误的文件记录日志后跳过，
    /// 使用其余已加载的配置层继续构建。
    pub fn build(&self, profile: Option<&str>) -> Result<(), ConfigError> {
        let discovered = ProfileDiscovery::new(&self.config_dir, &self.base_name)
            .discover()
            .unwrap_or_else(|e| {
                error!("配置文件发现失败，继续使用其他配置源: {}", e);
                DiscoveredFiles::default()
            });
        let mut state = self.state.write();

        let mut layers: Vec<Layer> = discovered
            .base
            .iter()
            .filter_map(|path| self.load_file(path, priority::BASE))
            .collect();
        layers.extend(self.load_source(&CommandLineSource::new(self.args.iter().cloned())));
        for source in &self.sources {
            layers.extend(self.load_source(source.as_ref()));
        }

        let probe = merge_layers(&state.defaults, &mut layers, &state.runtime, None)?;
        let active = self.determine_active_profile(profile, &probe);
        let includes = self.include_list(&probe);

        let mut included: Vec<&str> = includes
            .iter()
            .map(String::as_str)
            .filter(|name| Some(*name) != active.as_deref())
            .filter(|name| {
                let found = !discovered.profile(name).is_empty();
                if !found {
                    warn!("引入的环境配置文件不存在: {}", name);
                }
                found
            })
            .collect();
        included.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        included.dedup();
        for name in &included {
            for path in discovered.profile(name) {
                layers.extend(self.load_file(path, priority::INCLUDED_PROFILE));
            }
        }

        if let Some(active) = active.as_deref() {
            let files = discovered.profile(active);
            if files.is_empty() {
                debug!("激活环境没有对应的配置文件: {}", active);
            }
            for path in files {
                layers.extend(self.load_file(path, priority::ACTIVE_PROFILE));
            }
        }

        for path in &self.override_files {
            if path.is_file() {
                layers.extend(self.load_file(path, priority::EXTERNAL));
            } else {
                warn!("外部覆盖文件不存在，已跳过: {}", path.display());
            }
        }

        let merged = merge_layers(&state.defaults, &mut layers, &state.runtime, active.as_deref())?;
        let merged = PropertyTree::from_value(self.placeholder.resolve_value(merged.root(), &merged));

        info!(
            "配置构建完成: 激活环境={}, 引入环境={:?}, 配置层数={}",
            active.as_deref().unwrap_or("<none>"),
            included,
            layers.len()
        );
        for layer in &layers {
            debug!("配置层: {} (优先级 {})", layer.name, layer.priority);
        }

        state.merged = merged;
        state.active_profile = active;
        state.built = true;
        Ok(())
    }

    fn load_file(&self, path: &Path, priority: i32) -> Option<Layer> {
        self.load_source(&FileSource::new(path).with_priority(priority))
    }

    fn load_source(&self, source: &dyn PropertySource) -> Option<Layer> {
        match source.load() {
            Ok(value) => Some(Layer {
                name: source.name().to_string(),
                priority: source.priority(),
                value,
            }),
            Err(e) => {
                error!("配置源加载失败，已跳过: {}", e);
                None
            }
        }
    }

    fn determine_active_profile(&self, explicit: Option<&str>, probe: &PropertyTree) -> Option<String> {
        explicit
            .map(str::trim)
            .filter(|profile| !profile.is_empty())
            .map(str::to_string)
            .or_else(|| self.placeholder.env(ACTIVE_PROFILE_ENV))
            .or_else(|| {
                probe
                    .get(PROFILES_ACTIVE_KEY)
                    .map(|value| self.placeholder.resolve_value(value, probe))
                    .filter(is_scalar)
                    .map(|value| scalar_text(&value).trim().to_string())
                    .filter(|profile| !profile.is_empty())
            })
    }

    fn include_list(&self, probe: &PropertyTree) -> Vec<String> {
        let Some(value) = probe.get(PROFILES_INCLUDE_KEY) else {
            return Vec::new();
        };

        let names: Vec<String> = match self.placeholder.resolve_value(value, probe) {
            Value::Array(items) => items.iter().map(scalar_text).collect(),
            Value::String(text) => text.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        };
        names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// 按优先级稳定排序后由 `config` 依次叠加
///
/// 默认值在最底层，运行时设置在最顶层，激活环境名最后写回。
fn merge_layers(
    defaults: &PropertyTree,
    layers: &mut [Layer],
    runtime: &PropertyTree,
    active: Option<&str>,
) -> Result<PropertyTree, ConfigError> {
    layers.sort_by_key(|layer| layer.priority);

    let merge_error = |e: config::ConfigError| ConfigError::ParseError {
        path: "<merged>".to_string(),
        source: Box::new(e),
    };
    let mut builder = config::Config::builder().add_source(defaults.clone());
    for layer in layers.iter() {
        builder = builder.add_source(PropertyTree::from_value(layer.value.clone()));
    }
    builder = builder.add_source(runtime.clone());
    if let Some(active) = active {
        builder = builder
            .set_override(PROFILES_ACTIVE_KEY, active)
            .map_err(merge_error)?;
    }

    let merged = builder
        .build()
        .and_then(|settings| settings.try_deserialize::<Value>())
        .map_err(merge_error)?;
    Ok(PropertyTree::from_value(merged))
}

impl PropertyResolver for PropertyBuilder {
    fn get_property(&self, path: &str) -> Option<Value> {
        let state = self.state.read();
        state
            .merged
            .get(path)
            .filter(|value| !value.is_null())
            .map(|value| self.placeholder.resolve_value(value, &state.merged))
    }

    fn set_property(&self, path: &str, value: Value) {
        debug!("设置属性: {}", path);
        let mut state = self.state.write();
        state.runtime.set(path, value.clone());
        state.merged.set(path, value);
    }

    fn set_default_property(&self, path: &str, value: Value) {
        let mut state = self.state.write();
        state.defaults.set(path, value.clone());
        if state.built {
            state.merged.set_default(path, value);
        } else {
            state.recompute_unbuilt();
        }
    }

    fn replace(&self, template: &str) -> Value {
        let state = self.state.read();
        self.placeholder.resolve(template, &state.merged)
    }

    fn bind_value(&self, prefix: &str, defaults: Value) -> Result<Value, ConfigError> {
        let state = self.state.read();
        let overlay = state
            .merged
            .get(prefix)
            .map(|value| self.placeholder.resolve_value(value, &state.merged))
            .unwrap_or(Value::Null);
        overlay_block(prefix, defaults, overlay)
    }
}
