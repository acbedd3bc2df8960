//! 组件工厂抽象接口
//!
//! 以类型化注册代替运行时反射：工厂函数和生产方法的参数类型在
//! 注册时由 trait 实现给出，字段注入由 [`Injectable`] 实现声明。

use infrastructure_common::{DependencyError, FieldInfo, Instance, TypeInfo};
use std::error::Error;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::{InjectionContext, InjectionContextExt};
use crate::registry::{ComponentOptions, RawComponent};

/// 可作为工厂参数的依赖类型
///
/// `Arc<T>` 要求依赖存在；`Option<Arc<T>>` 允许依赖缺失（外部依赖未提供时为 `None`）。
pub trait Dependency: Sized + Send + Sync + 'static {
    /// 依赖的目标类型（已剥离包装）
    fn type_info() -> TypeInfo;

    /// 从实例转换
    fn from_instance(name: &str, instance: Option<Instance>) -> Result<Self, DependencyError>;
}

impl<T: Send + Sync + 'static> Dependency for Arc<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn from_instance(name: &str, instance: Option<Instance>) -> Result<Self, DependencyError> {
        let instance = instance.ok_or_else(|| DependencyError::ComponentNotRegistered {
            name: name.to_string(),
        })?;
        downcast(name, instance)
    }
}

impl<T: Send + Sync + 'static> Dependency for Option<Arc<T>> {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn from_instance(name: &str, instance: Option<Instance>) -> Result<Self, DependencyError> {
        instance.map(|instance| downcast(name, instance)).transpose()
    }
}

/// 将实例转换为具体类型
pub fn downcast<T: Send + Sync + 'static>(
    name: &str,
    instance: Instance,
) -> Result<Arc<T>, DependencyError> {
    instance
        .downcast::<T>()
        .map_err(|_| DependencyError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// 工厂函数
///
/// 为参数均实现 [`Dependency`]、返回 `Result<T, E>` 的函数实现，
/// 依赖按参数位置注入。
pub trait FactoryFn<Args>: Send + Sync + 'static {
    /// 产出的实例类型
    type Output: Send + Sync + 'static;

    /// 参数类型
    fn parameters() -> Vec<TypeInfo>;

    /// 以上下文中第 `offset` 个依赖起的位置依赖调用
    fn call(
        &self,
        ctx: &dyn InjectionContext,
        offset: usize,
    ) -> Result<Self::Output, DependencyError>;
}

/// 生产方法
///
/// 以配置组件 `O` 为接收者的工厂函数
pub trait MethodFn<O, Args>: Send + Sync + 'static {
    /// 产出的实例类型
    type Output: Send + Sync + 'static;

    /// 参数类型（不含接收者）
    fn parameters() -> Vec<TypeInfo>;

    /// 以接收者和第 `offset` 个依赖起的位置依赖调用
    fn call(
        &self,
        owner: &O,
        ctx: &dyn InjectionContext,
        offset: usize,
    ) -> Result<Self::Output, DependencyError>;
}

macro_rules! impl_producer_fns {
    ($($arg:ident),*) => {
        impl<Func, T, E, $($arg,)*> FactoryFn<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Result<T, E> + Send + Sync + 'static,
            T: Send + Sync + 'static,
            E: Into<Box<dyn Error + Send + Sync>>,
            $($arg: Dependency,)*
        {
            type Output = T;

            fn parameters() -> Vec<TypeInfo> {
                vec![$(<$arg as Dependency>::type_info()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(
                &self,
                ctx: &dyn InjectionContext,
                offset: usize,
            ) -> Result<T, DependencyError> {
                let mut index = offset;
                $(
                    let $arg = ctx.resolve::<$arg>(index)?;
                    index += 1;
                )*
                (self)($($arg),*)
                    .map_err(|e| DependencyError::creation_failed(ctx.component_name(), e))
            }
        }

        impl<Func, O, T, E, $($arg,)*> MethodFn<O, ($($arg,)*)> for Func
        where
            Func: Fn(&O, $($arg),*) -> Result<T, E> + Send + Sync + 'static,
            O: 'static,
            T: Send + Sync + 'static,
            E: Into<Box<dyn Error + Send + Sync>>,
            $($arg: Dependency,)*
        {
            type Output = T;

            fn parameters() -> Vec<TypeInfo> {
                vec![$(<$arg as Dependency>::type_info()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(
                &self,
                owner: &O,
                ctx: &dyn InjectionContext,
                offset: usize,
            ) -> Result<T, DependencyError> {
                let mut index = offset;
                $(
                    let $arg = ctx.resolve::<$arg>(index)?;
                    index += 1;
                )*
                (self)(owner, $($arg),*)
                    .map_err(|e| DependencyError::creation_failed(ctx.component_name(), e))
            }
        }
    };
}

impl_producer_fns!();
impl_producer_fns!(A1);
impl_producer_fns!(A1, A2);
impl_producer_fns!(A1, A2, A3);
impl_producer_fns!(A1, A2, A3, A4);
impl_producer_fns!(A1, A2, A3, A4, A5);
impl_producer_fns!(A1, A2, A3, A4, A5, A6);
impl_producer_fns!(A1, A2, A3, A4, A5, A6, A7);
impl_producer_fns!(A1, A2, A3, A4, A5, A6, A7, A8);

/// 可注入字段的值组件
pub trait Injectable: Send + Sync + 'static {
    /// 字段元数据，带注入标记的字段成为依赖
    fn fields() -> Vec<FieldInfo>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// 填充注入字段和属性块
    fn inject(&mut self, _ctx: &dyn InjectionContext) -> Result<(), DependencyError> {
        Ok(())
    }
}

/// 配置组件
///
/// 配置组件自身作为值组件注册，其生产方法在注册时展开为方法组件，
/// 与普通组件一起参与依赖解析。
pub trait Configuration: Injectable + Sized {
    /// 登记生产方法
    fn producers(registry: &mut ProducerRegistry<Self>);
}

/// 生产方法登记表
pub struct ProducerRegistry<C> {
    methods: Vec<RawComponent>,
    _owner: PhantomData<fn(&C)>,
}

impl<C: Injectable> Default for ProducerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Injectable> ProducerRegistry<C> {
    /// 创建登记表
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
            _owner: PhantomData,
        }
    }

    /// 登记生产方法
    pub fn method<M, Args>(&mut self, name: &str, method: M) -> &mut Self
    where
        M: MethodFn<C, Args>,
        Args: 'static,
    {
        self.method_with(name, method, ComponentOptions::default())
    }

    /// 登记带注册选项的生产方法
    pub fn method_with<M, Args>(
        &mut self,
        name: &str,
        method: M,
        options: ComponentOptions,
    ) -> &mut Self
    where
        M: MethodFn<C, Args>,
        Args: 'static,
    {
        self.methods.push(RawComponent::method::<C, M, Args>(name, method, options));
        self
    }

    /// 登记产出配置组件的生产方法，产出组件的生产方法递归展开
    pub fn configuration<M, Args>(&mut self, name: &str, method: M) -> &mut Self
    where
        M: MethodFn<C, Args>,
        M::Output: Configuration,
        Args: 'static,
    {
        let mut raw = RawComponent::method::<C, M, Args>(name, method, ComponentOptions::default());
        raw.methods = collect_producers::<M::Output>();
        self.methods.push(raw);
        self
    }

    /// 已登记的生产方法
    pub fn into_methods(self) -> Vec<RawComponent> {
        self.methods
    }
}

/// 展开配置组件的生产方法
pub fn collect_producers<C: Configuration>() -> Vec<RawComponent> {
    let mut registry = ProducerRegistry::<C>::new();
    C::producers(&mut registry);
    registry.into_methods()
}
