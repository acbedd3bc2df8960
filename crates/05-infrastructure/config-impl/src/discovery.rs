//! 配置文件发现
//!
//! 递归遍历配置目录，查找 `<base>.<ext>` 基础文件和 `<base>-<profile>.<ext>`
//! 环境文件。同一类文件按目录深度排序，浅层在前，深层文件后合并。

use config_abstractions::ConfigFormat;
use infrastructure_common::ConfigError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// 发现结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFiles {
    /// 基础配置文件
    pub base: Vec<PathBuf>,
    /// 环境名 -> 环境配置文件
    pub profiles: BTreeMap<String, Vec<PathBuf>>,
}

impl DiscoveredFiles {
    /// 已发现的环境名
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// 指定环境的配置文件
    pub fn profile(&self, name: &str) -> &[PathBuf] {
        self.profiles.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// 配置文件发现器
#[derive(Debug, Clone)]
pub struct ProfileDiscovery {
    config_dir: PathBuf,
    base_name: String,
}

impl ProfileDiscovery {
    /// 创建发现器
    pub fn new(config_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
            base_name: base_name.into(),
        }
    }

    /// 配置目录
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// 扫描配置目录及其子目录，目录不存在时返回空结果
    ///
    /// 无法读取的条目记录日志后跳过。
    pub fn discover(&self) -> Result<DiscoveredFiles, ConfigError> {
        let mut discovered = DiscoveredFiles::default();
        if !self.config_dir.is_dir() {
            debug!("配置目录不存在，跳过文件发现: {}", self.config_dir.display());
            return Ok(discovered);
        }

        let dir = glob::Pattern::escape(&self.config_dir.to_string_lossy());
        let pattern = format!(
            "{}/**/{}*",
            dir.trim_end_matches('/'),
            glob::Pattern::escape(&self.base_name)
        );
        let entries = glob::glob(&pattern).map_err(|e| ConfigError::DiscoveryError {
            message: format!("{pattern}: {e}"),
        })?;

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    error!("配置目录条目无法读取，已跳过: {}", e);
                    continue;
                }
            };
            if !path.is_file() || ConfigFormat::from_path(&path).is_none() {
                continue;
            }

            match self.classify(&path) {
                Some(None) => discovered.base.push(path),
                Some(Some(profile)) => discovered.profiles.entry(profile).or_default().push(path),
                None => debug!("忽略无关文件: {}", path.display()),
            }
        }

        let depth = |path: &PathBuf| path.components().count();
        discovered.base.sort_by_key(|path| (depth(path), path.clone()));
        for files in discovered.profiles.values_mut() {
            files.sort_by_key(|path| (depth(path), path.clone()));
        }

        debug!(
            "发现 {} 个基础配置文件, {} 个环境",
            discovered.base.len(),
            discovered.profiles.len()
        );
        Ok(discovered)
    }

    /// `Some(None)` 为基础文件，`Some(Some(profile))` 为环境文件
    fn classify(&self, path: &Path) -> Option<Option<String>> {
        let stem = path.file_stem()?.to_str()?;
        if stem == self.base_name {
            return Some(None);
        }

        let profile = stem.strip_prefix(&self.base_name)?.strip_prefix('-')?;
        (!profile.is_empty()).then(|| Some(profile.to_string()))
    }
}
