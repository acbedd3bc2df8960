//! 实例化引擎
//!
//! 按拓扑顺序调用生产函数，把结果存入实例容器。单个组件构建失败只会跳过
//! 该组件，依赖它的组件在取用时才会失败。

use config_abstractions::PropertyResolver;
use di_abstractions::{ExternalDependency, InstanceEntry, InstanceStore, Resolution};
use infrastructure_common::DependencyError;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::container::InstanceContainer;
use crate::context::BuildContext;

/// 被跳过的组件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedComponent {
    /// 组件标识
    pub name: String,
    /// 失败原因
    pub reason: String,
}

/// 构建报告
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// 已构建的组件，按构建顺序排列
    pub built: Vec<String>,
    /// 构建失败而被跳过的组件
    pub skipped: Vec<SkippedComponent>,
    /// 按需构建的作用域组件
    pub deferred: Vec<String>,
    /// 外部依赖
    pub external: Vec<ExternalDependency>,
}

impl BuildReport {
    /// 是否所有组件都已构建或登记
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// 实例化引擎
pub struct InstantiationEngine {
    container: Arc<InstanceContainer>,
    properties: Option<Arc<dyn PropertyResolver>>,
}

impl std::fmt::Debug for InstantiationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantiationEngine")
            .field("container", &self.container)
            .field("has_properties", &self.properties.is_some())
            .finish()
    }
}

impl InstantiationEngine {
    /// 创建引擎
    pub fn new(container: Arc<InstanceContainer>) -> Self {
        Self {
            container,
            properties: None,
        }
    }

    /// 设置属性来源
    pub fn with_properties(mut self, properties: Arc<dyn PropertyResolver>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// 目标容器
    pub fn container(&self) -> &Arc<InstanceContainer> {
        &self.container
    }

    /// 按解析顺序构建所有组件
    pub fn build(&self, resolution: Resolution) -> Result<BuildReport, DependencyError> {
        let Resolution { ordered, external } = resolution;
        info!("开始实例化: {} 个组件", ordered.len());

        let sources: [&dyn InstanceStore; 1] = [self.container.as_ref()];
        let mut report = BuildReport {
            external,
            ..BuildReport::default()
        };

        for descriptor in ordered {
            if descriptor.is_scoped() {
                debug!("登记{}组件，按需构建: {}", descriptor.scope, descriptor.name);
                let name = descriptor.name.clone();
                self.record(
                    &mut report,
                    &name,
                    self.container.set(InstanceEntry::deferred(descriptor)),
                    |report| report.deferred.push(name.clone()),
                )?;
                continue;
            }

            debug!("实例化组件: {} ({})", descriptor.name, descriptor.kind);
            let ctx = BuildContext::new(&descriptor, &sources, self.properties.as_deref());
            let stored = descriptor.produce(&ctx).and_then(|instance| {
                descriptor.set_built_instance(Arc::clone(&instance));
                self.container
                    .set(InstanceEntry::built(Arc::clone(&descriptor), instance))
            });
            let name = descriptor.name.clone();
            self.record(&mut report, &name, stored, |report| {
                report.built.push(name.clone())
            })?;
        }

        info!(
            "实例化完成: 构建 {} 个, 按需 {} 个, 跳过 {} 个, 外部依赖 {} 个",
            report.built.len(),
            report.deferred.len(),
            report.skipped.len(),
            report.external.len()
        );
        Ok(report)
    }

    /// 记录单个组件的结果，只有致命错误会中止构建
    fn record(
        &self,
        report: &mut BuildReport,
        name: &str,
        result: Result<(), DependencyError>,
        on_success: impl FnOnce(&mut BuildReport),
    ) -> Result<(), DependencyError> {
        match result {
            Ok(()) => {
                on_success(report);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("组件构建失败，已跳过: {} ({})", name, e);
                report.skipped.push(SkippedComponent {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
                Ok(())
            }
        }
    }
}
