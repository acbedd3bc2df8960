//! 组件注册
//!
//! [`RawComponent`] 是注册阶段的原始组件，由元数据提取器规范化为描述符。
//! 注册选项以类型化方式给出名称、作用域、显式依赖和能力标记。

use infrastructure_common::{
    ComponentKind, ComponentScope, DependencyError, FieldInfo, Instance, PropertyBlock, TypeInfo,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::context::InjectionContextExt;
use crate::descriptor::Producer;
use crate::factory::{collect_producers, Configuration, FactoryFn, Injectable, MethodFn};

/// 工厂参数匹配所用的所属类型字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerFields {
    /// 所属类型的包名
    pub package: String,
    /// 所属类型的字段
    pub fields: Vec<FieldInfo>,
}

impl OwnerFields {
    /// 取类型 `O` 的字段
    pub fn of<O: Injectable>() -> Self {
        Self {
            package: TypeInfo::of::<O>().package_name().to_string(),
            fields: O::fields(),
        }
    }

    /// 按参数类型查找字段
    pub fn field_for(&self, parameter: &TypeInfo) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.type_info == *parameter)
    }
}

/// 注册选项
#[derive(Debug, Clone, Default)]
pub struct ComponentOptions {
    /// 显式名称，不含分隔符时以包名限定
    pub name: Option<String>,
    /// 作用域
    pub scope: ComponentScope,
    /// 显式依赖
    pub depends_on: Vec<String>,
    /// 能力标记
    pub capabilities: Vec<String>,
    /// 所属类型字段
    pub owner: Option<OwnerFields>,
}

impl ComponentOptions {
    /// 创建空选项
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 指定作用域
    pub fn with_scope(mut self, scope: ComponentScope) -> Self {
        self.scope = scope;
        self
    }

    /// 追加显式依赖，多个名称以逗号分隔
    pub fn with_depends_on(mut self, names: &str) -> Self {
        self.depends_on.extend(
            names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// 追加能力标记
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// 以类型 `O` 的字段匹配工厂参数
    pub fn with_owner<O: Injectable>(mut self) -> Self {
        self.owner = Some(OwnerFields::of::<O>());
        self
    }

    /// 以给定字段匹配工厂参数
    pub fn with_owner_fields(mut self, package: impl Into<String>, fields: Vec<FieldInfo>) -> Self {
        self.owner = Some(OwnerFields {
            package: package.into(),
            fields,
        });
        self
    }
}

/// 原始组件
pub struct RawComponent {
    /// 组件种类
    pub kind: ComponentKind,
    /// 产出实例的类型
    pub declared_type: TypeInfo,
    /// 工厂或生产方法的参数类型（不含接收者）
    pub parameters: Vec<TypeInfo>,
    /// 值组件的字段
    pub fields: Vec<FieldInfo>,
    /// 生产方法名称
    pub method_name: Option<String>,
    /// 注册选项
    pub options: ComponentOptions,
    /// 生产函数
    pub producer: Producer,
    /// 配置组件的生产方法
    pub methods: Vec<RawComponent>,
}

impl RawComponent {
    /// 值组件：不调用构造函数，构建时注入字段
    pub fn value<T: Injectable>(value: T) -> Self {
        let slot = Mutex::new(Some(value));
        let producer: Producer = Arc::new(move |ctx| {
            let mut value = slot.lock().take().ok_or_else(|| {
                DependencyError::creation_failed(ctx.component_name(), "值组件只能构建一次")
            })?;
            value.inject(ctx)?;
            Ok(Arc::new(value) as Instance)
        });

        Self::new(ComponentKind::Value, TypeInfo::of::<T>(), producer).with_fields(T::fields())
    }

    /// 已构造好的共享实例，不做字段注入
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        let instance: Instance = Arc::new(value);
        let producer: Producer = Arc::new(move |_| Ok(Arc::clone(&instance)));
        Self::new(ComponentKind::Value, TypeInfo::of::<T>(), producer)
    }

    /// 工厂组件：以依赖为位置参数调用工厂函数
    pub fn factory<F, Args>(factory: F) -> Self
    where
        F: FactoryFn<Args>,
        Args: 'static,
    {
        let producer: Producer =
            Arc::new(move |ctx| Ok(Arc::new(factory.call(ctx, 0)?) as Instance));
        let mut raw = Self::new(ComponentKind::Factory, TypeInfo::of::<F::Output>(), producer);
        raw.parameters = F::parameters();
        raw
    }

    /// 配置组件：自身为值组件，生产方法展开为方法组件
    pub fn configuration<C: Configuration>(configuration: C) -> Self {
        let mut raw = Self::value(configuration);
        raw.methods = collect_producers::<C>();
        raw
    }

    /// 属性块组件：默认值叠加 `P::prefix()` 下的配置
    pub fn properties<P: PropertyBlock>() -> Self {
        let producer: Producer = Arc::new(|ctx| Ok(Arc::new(ctx.properties::<P>()) as Instance));
        Self::new(ComponentKind::Value, TypeInfo::of::<P>(), producer)
    }

    /// 方法组件：以所属配置组件为接收者调用生产方法
    ///
    /// 第 0 个依赖固定为所属组件。
    pub fn method<C, M, Args>(name: &str, method: M, options: ComponentOptions) -> Self
    where
        C: Injectable,
        M: MethodFn<C, Args>,
        Args: 'static,
    {
        let producer: Producer = Arc::new(move |ctx| {
            let owner = ctx.resolve::<Arc<C>>(0)?;
            Ok(Arc::new(method.call(&owner, ctx, 1)?) as Instance)
        });

        let mut raw = Self::new(ComponentKind::Method, TypeInfo::of::<M::Output>(), producer);
        raw.parameters = M::parameters();
        raw.method_name = Some(name.to_string());
        raw.options = options;
        if raw.options.owner.is_none() {
            raw.options.owner = Some(OwnerFields::of::<C>());
        }
        raw
    }

    /// 设置注册选项
    pub fn with_options(mut self, options: ComponentOptions) -> Self {
        self.options = options;
        self
    }

    fn new(kind: ComponentKind, declared_type: TypeInfo, producer: Producer) -> Self {
        Self {
            kind,
            declared_type,
            parameters: Vec::new(),
            fields: Vec::new(),
            method_name: None,
            options: ComponentOptions::default(),
            producer,
            methods: Vec::new(),
        }
    }

    fn with_fields(mut self, fields: Vec<FieldInfo>) -> Self {
        self.fields = fields;
        self
    }
}

impl fmt::Debug for RawComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawComponent")
            .field("kind", &self.kind)
            .field("declared_type", &self.declared_type.module_path)
            .field("parameters", &self.parameters)
            .field("fields", &self.fields)
            .field("method_name", &self.method_name)
            .field("options", &self.options)
            .field("methods", &self.methods)
            .finish()
    }
}
