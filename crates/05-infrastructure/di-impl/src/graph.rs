//! 依赖图解析
//!
//! 按名称匹配依赖，再用 Kahn 算法分批拓扑排序。同一批次内保持注册顺序，
//! 没有就绪节点而仍有剩余节点时报告循环依赖。

use di_abstractions::{
    ComponentDescriptor, ConventionalNameResolver, DependencyResolver, ExternalDependency,
    Resolution, ResolvedDependency, TypeNameResolver,
};
use infrastructure_common::{lower_camel, ComponentKind, DependencyError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 依赖图节点，仅在解析期间存在
#[derive(Debug)]
struct DependencyNode {
    /// 尚未满足的内部依赖（描述符下标）
    pending: BTreeSet<usize>,
    /// 依赖本节点的节点
    dependents: Vec<usize>,
}

/// 基于 Kahn 算法的依赖解析器
#[derive(Clone)]
pub struct GraphResolver {
    names: Arc<dyn TypeNameResolver>,
}

impl std::fmt::Debug for GraphResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphResolver").finish_non_exhaustive()
    }
}

impl Default for GraphResolver {
    fn default() -> Self {
        Self::new(Arc::new(ConventionalNameResolver))
    }
}

impl GraphResolver {
    /// 使用指定的命名规则创建解析器
    pub fn new(names: Arc<dyn TypeNameResolver>) -> Self {
        Self { names }
    }

    /// 查找依赖名称对应的描述符下标
    ///
    /// 匹配顺序：组件标识、短名称、包名、生产方法名；每一级都取注册顺序中的第一个。
    fn find_target(&self, descriptors: &[ComponentDescriptor], requested: &str) -> Option<usize> {
        let rules: [&dyn Fn(&ComponentDescriptor) -> bool; 4] = [
            &|d: &ComponentDescriptor| d.name == requested,
            &|d: &ComponentDescriptor| d.short_name == requested,
            &|d: &ComponentDescriptor| d.package_name == requested,
            &|d: &ComponentDescriptor| self.matches_method(d, requested),
        ];

        rules
            .iter()
            .find_map(|rule| descriptors.iter().position(|d| rule(d)))
    }

    fn matches_method(&self, descriptor: &ComponentDescriptor, requested: &str) -> bool {
        if descriptor.kind != ComponentKind::Method {
            return false;
        }
        descriptor.method_name.as_deref().is_some_and(|method| {
            requested == lower_camel(method)
                || requested
                    == self
                        .names
                        .method_name(descriptor.owner_package().unwrap_or(""), method)
        })
    }

    /// 按 Kahn 算法分批排序，返回描述符下标序列
    fn sort(nodes: &mut [DependencyNode]) -> Vec<usize> {
        let mut emitted = vec![false; nodes.len()];
        let mut order = Vec::with_capacity(nodes.len());
        let mut ready: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.pending.is_empty())
            .map(|(index, _)| index)
            .collect();

        while !ready.is_empty() {
            let batch = std::mem::take(&mut ready);
            debug!("依赖解析批次: {:?}", batch);

            for &index in &batch {
                emitted[index] = true;
                order.push(index);
            }

            let mut next = BTreeSet::new();
            for &index in &batch {
                let dependents = std::mem::take(&mut nodes[index].dependents);
                for dependent in dependents {
                    let node = &mut nodes[dependent];
                    node.pending.remove(&index);
                    if node.pending.is_empty() && !emitted[dependent] {
                        next.insert(dependent);
                    }
                }
            }
            ready = next.into_iter().collect();
        }

        order
    }
}

impl DependencyResolver for GraphResolver {
    fn resolve(
        &self,
        mut descriptors: Vec<ComponentDescriptor>,
    ) -> Result<Resolution, DependencyError> {
        info!("开始解析依赖: {} 个组件", descriptors.len());

        let names: Vec<String> = descriptors.iter().map(|d| d.name.clone()).collect();
        let targets: Vec<Vec<Option<usize>>> = descriptors
            .iter()
            .map(|descriptor| {
                descriptor
                    .dependency_names()
                    .map(|requested| self.find_target(&descriptors, requested))
                    .collect()
            })
            .collect();

        let mut external = Vec::new();
        let mut nodes: Vec<DependencyNode> = descriptors
            .iter()
            .map(|_| DependencyNode {
                pending: BTreeSet::new(),
                dependents: Vec::new(),
            })
            .collect();

        for (index, (descriptor, targets)) in descriptors.iter_mut().zip(&targets).enumerate() {
            descriptor.resolved_dependencies = descriptor
                .dependencies
                .iter()
                .zip(targets)
                .map(|(dependency, target)| ResolvedDependency {
                    requested: dependency.name.clone(),
                    target: target.map(|target| names[target].clone()),
                })
                .collect();

            for (dependency, target) in descriptor.dependencies.iter().zip(targets) {
                match target {
                    Some(target) => {
                        nodes[index].pending.insert(*target);
                    }
                    None => {
                        warn!(
                            "未找到依赖 {}（组件 {}），视为外部依赖",
                            dependency.name, descriptor.name
                        );
                        external.push(ExternalDependency {
                            component: descriptor.name.clone(),
                            requested: dependency.name.clone(),
                        });
                    }
                }
            }
        }

        for index in 0..nodes.len() {
            let pending: Vec<usize> = nodes[index].pending.iter().copied().collect();
            for target in pending {
                nodes[target].dependents.push(index);
            }
        }

        let order = Self::sort(&mut nodes);
        if order.len() < descriptors.len() {
            let remainder: Vec<String> = nodes
                .iter()
                .enumerate()
                .filter(|(index, _)| !order.contains(index))
                .map(|(index, _)| names[index].clone())
                .collect();
            error!("检测到循环依赖: {:?}", remainder);
            return Err(DependencyError::CircularDependency { remainder });
        }

        let mut slots: Vec<Option<ComponentDescriptor>> =
            descriptors.into_iter().map(Some).collect();
        let ordered: Vec<Arc<ComponentDescriptor>> = order
            .iter()
            .filter_map(|&index| slots[index].take())
            .map(Arc::new)
            .collect();

        info!(
            "依赖解析完成: {} 个组件, {} 个外部依赖",
            ordered.len(),
            external.len()
        );
        Ok(Resolution { ordered, external })
    }
}
