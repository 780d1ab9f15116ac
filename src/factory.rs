//! Adapts plain functions into [Provider]s and [Decorator]s.
//!
//! A factory is any `Fn` taking 0 to 8 parameters in the shapes accepted by
//! [Injectable](crate::inject::Injectable) and returning the component. The
//! adapters here wire its parameters to resolution requests and trap panics
//! at the invocation boundary:
//!
//! * a plain `Fn(..) -> R` registers as-is,
//! * [fallible] adapts `Fn(..) -> Result<R, E>`,
//! * [closeable] captures a shutdown hook for components implementing
//!   [Closeable],
//! * [decorator] turns a `Fn(Arc<T>, ..) -> T` into a decorator for the
//!   component named by [Options::decorate](crate::options::Options::decorate),
//! * [static_value] wraps a fixed value as a zero-argument factory.

use crate::collector::ResolvedValue;
use crate::error::{BoxError, RegistrationError, ResolutionError};
use crate::inject::{DependencyDescriptor, Injectable};
use crate::name::{match_type, Name, TypeKey};
use crate::options::Options;
use crate::provider::{
    CloseFn, Closeable, ComponentValue, Constructed, Decorator, DecoratorPtr, Provider,
    ProviderPtr,
};
use crate::request::Request;
use std::any::type_name;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Error raised while invoking a factory body.
pub enum FactoryError {
    /// Converting a resolved dependency to its parameter shape failed.
    Resolution(ResolutionError),
    /// The factory body itself reported failure.
    Failed(BoxError),
}

/// A function usable as a component factory. Implemented for `Fn`s of arity
/// 0..=8 whose parameters are [Injectable] shapes, and for [Fallible]
/// wrappers around `Result`-returning functions.
pub trait FactoryFn<Args>: Send + Sync + 'static {
    type Component: Send + Sync + 'static;

    /// Resolution requests for the parameters, honoring the positional
    /// descriptor overrides.
    fn requests(descriptors: &[DependencyDescriptor]) -> Result<Vec<Request>, RegistrationError>;

    /// Invokes the factory with resolved dependencies in positional order.
    fn invoke(&self, dependencies: Vec<ResolvedValue>) -> Result<Self::Component, FactoryError>;
}

/// A function usable as a decorator: its first parameter is the component to
/// decorate and its return type is that same component type.
pub trait DecoratorFn<Args>: Send + Sync + 'static {
    type Component: Send + Sync + 'static;

    fn requests(descriptors: &[DependencyDescriptor]) -> Result<Vec<Request>, RegistrationError>;

    fn invoke(
        &self,
        current: Arc<Self::Component>,
        dependencies: Vec<ResolvedValue>,
    ) -> Result<Self::Component, FactoryError>;
}

/// Wrapper produced by [fallible].
pub struct Fallible<Fun>(Fun);

/// Adapts a factory returning `Result<R, E>`; an `Err` surfaces as a
/// factory failure carrying the target component name.
pub fn fallible<Fun>(factory: Fun) -> Fallible<Fun> {
    Fallible(factory)
}

/// Wrapper produced by [closeable].
pub struct CloseableFactory<Fun>(Fun);

/// Registers the factory's component with a shutdown hook; the component
/// type must implement [Closeable].
pub fn closeable<Fun>(factory: Fun) -> CloseableFactory<Fun> {
    CloseableFactory(factory)
}

/// Wrapper produced by [decorator].
pub struct DecoratorFactory<Fun>(Fun);

/// Marks a factory as a decorator. The target component name comes from
/// [Options::decorate](crate::options::Options::decorate).
pub fn decorator<Fun>(factory: Fun) -> DecoratorFactory<Fun> {
    DecoratorFactory(factory)
}

/// Wraps a fixed value as a zero-argument factory.
pub fn static_value<T: Clone + Send + Sync + 'static>(
    value: T,
) -> impl Fn() -> T + Send + Sync + 'static {
    move || value.clone()
}

fn short_dependency_list() -> FactoryError {
    FactoryError::Failed("dependency list shorter than declared parameters".into())
}

macro_rules! impl_factory_fns {
    ($($param:ident),*) => {
        impl<Fun, Out, $($param),*> FactoryFn<($($param,)*)> for Fun
        where
            Fun: Fn($($param),*) -> Out + Send + Sync + 'static,
            Out: Send + Sync + 'static,
            $($param: Injectable,)*
        {
            type Component = Out;

            #[allow(unused_mut, unused_variables)]
            fn requests(
                descriptors: &[DependencyDescriptor],
            ) -> Result<Vec<Request>, RegistrationError> {
                let mut requests = Vec::new();
                let mut index = 0usize;
                $(
                    let descriptor = descriptors.get(index).cloned().unwrap_or_default();
                    requests.push(
                        $param::request(&descriptor).map_err(|e| e.at_parameter(index))?,
                    );
                    index += 1;
                )*
                Ok(requests)
            }

            #[allow(unused_mut, unused_variables)]
            fn invoke(
                &self,
                dependencies: Vec<ResolvedValue>,
            ) -> Result<Out, FactoryError> {
                let mut values = dependencies.into_iter();
                Ok((self)($(
                    $param::extract(values.next().ok_or_else(short_dependency_list)?)
                        .map_err(FactoryError::Resolution)?
                ),*))
            }
        }

        impl<Fun, Out, Error, $($param),*> FactoryFn<($($param,)*)> for Fallible<Fun>
        where
            Fun: Fn($($param),*) -> Result<Out, Error> + Send + Sync + 'static,
            Out: Send + Sync + 'static,
            Error: Into<BoxError> + 'static,
            $($param: Injectable,)*
        {
            type Component = Out;

            #[allow(unused_mut, unused_variables)]
            fn requests(
                descriptors: &[DependencyDescriptor],
            ) -> Result<Vec<Request>, RegistrationError> {
                let mut requests = Vec::new();
                let mut index = 0usize;
                $(
                    let descriptor = descriptors.get(index).cloned().unwrap_or_default();
                    requests.push(
                        $param::request(&descriptor).map_err(|e| e.at_parameter(index))?,
                    );
                    index += 1;
                )*
                Ok(requests)
            }

            #[allow(unused_mut, unused_variables)]
            fn invoke(
                &self,
                dependencies: Vec<ResolvedValue>,
            ) -> Result<Out, FactoryError> {
                let mut values = dependencies.into_iter();
                (self.0)($(
                    $param::extract(values.next().ok_or_else(short_dependency_list)?)
                        .map_err(FactoryError::Resolution)?
                ),*)
                .map_err(|e| FactoryError::Failed(e.into()))
            }
        }
    };
}

impl_factory_fns!();
impl_factory_fns!(P1);
impl_factory_fns!(P1, P2);
impl_factory_fns!(P1, P2, P3);
impl_factory_fns!(P1, P2, P3, P4);
impl_factory_fns!(P1, P2, P3, P4, P5);
impl_factory_fns!(P1, P2, P3, P4, P5, P6);
impl_factory_fns!(P1, P2, P3, P4, P5, P6, P7);
impl_factory_fns!(P1, P2, P3, P4, P5, P6, P7, P8);

macro_rules! impl_decorator_fns {
    ($($param:ident),*) => {
        impl<Fun, Out, $($param),*> DecoratorFn<(Out, $($param,)*)> for Fun
        where
            Fun: Fn(Arc<Out>, $($param),*) -> Out + Send + Sync + 'static,
            Out: Send + Sync + 'static,
            $($param: Injectable,)*
        {
            type Component = Out;

            #[allow(unused_mut, unused_variables)]
            fn requests(
                descriptors: &[DependencyDescriptor],
            ) -> Result<Vec<Request>, RegistrationError> {
                let mut requests = Vec::new();
                let mut index = 0usize;
                $(
                    let descriptor = descriptors.get(index).cloned().unwrap_or_default();
                    requests.push(
                        $param::request(&descriptor).map_err(|e| e.at_parameter(index))?,
                    );
                    index += 1;
                )*
                Ok(requests)
            }

            #[allow(unused_mut, unused_variables)]
            fn invoke(
                &self,
                current: Arc<Out>,
                dependencies: Vec<ResolvedValue>,
            ) -> Result<Out, FactoryError> {
                let mut values = dependencies.into_iter();
                Ok((self)(current, $(
                    $param::extract(values.next().ok_or_else(short_dependency_list)?)
                        .map_err(FactoryError::Resolution)?
                ),*))
            }
        }

        impl<Fun, Out, Error, $($param),*> DecoratorFn<(Out, $($param,)*)> for Fallible<Fun>
        where
            Fun: Fn(Arc<Out>, $($param),*) -> Result<Out, Error> + Send + Sync + 'static,
            Out: Send + Sync + 'static,
            Error: Into<BoxError> + 'static,
            $($param: Injectable,)*
        {
            type Component = Out;

            #[allow(unused_mut, unused_variables)]
            fn requests(
                descriptors: &[DependencyDescriptor],
            ) -> Result<Vec<Request>, RegistrationError> {
                let mut requests = Vec::new();
                let mut index = 0usize;
                $(
                    let descriptor = descriptors.get(index).cloned().unwrap_or_default();
                    requests.push(
                        $param::request(&descriptor).map_err(|e| e.at_parameter(index))?,
                    );
                    index += 1;
                )*
                Ok(requests)
            }

            #[allow(unused_mut, unused_variables)]
            fn invoke(
                &self,
                current: Arc<Out>,
                dependencies: Vec<ResolvedValue>,
            ) -> Result<Out, FactoryError> {
                let mut values = dependencies.into_iter();
                (self.0)(current, $(
                    $param::extract(values.next().ok_or_else(short_dependency_list)?)
                        .map_err(FactoryError::Resolution)?
                ),*)
                .map_err(|e| FactoryError::Failed(e.into()))
            }
        }
    };
}

impl_decorator_fns!();
impl_decorator_fns!(P1);
impl_decorator_fns!(P1, P2);
impl_decorator_fns!(P1, P2, P3);
impl_decorator_fns!(P1, P2, P3, P4);
impl_decorator_fns!(P1, P2, P3, P4, P5);
impl_decorator_fns!(P1, P2, P3, P4, P5, P6);
impl_decorator_fns!(P1, P2, P3, P4, P5, P6, P7);

/// Provider backed by a factory function.
pub struct FactoryProvider<Fun, Args> {
    name: Name,
    factory: Fun,
    requests: Vec<Request>,
    priority: i32,
    description: String,
    close: Option<CloseFn>,
    _args: PhantomData<fn() -> Args>,
}

impl<Fun, Args> FactoryProvider<Fun, Args>
where
    Fun: FactoryFn<Args>,
    Args: 'static,
{
    pub(crate) fn new(
        factory: Fun,
        options: &Options,
        close: Option<CloseFn>,
    ) -> Result<Self, RegistrationError> {
        let requests = Fun::requests(&options.dependencies)?;
        let name = Name::new(
            options
                .named
                .clone()
                .unwrap_or_else(|| default_name::<Fun>()),
            TypeKey::of::<Fun::Component>(),
        );

        Ok(Self {
            name,
            factory,
            requests,
            priority: options.priority,
            description: options.description.clone(),
            close,
            _args: PhantomData,
        })
    }
}

impl<Fun, Args> Provider for FactoryProvider<Fun, Args>
where
    Fun: FactoryFn<Args>,
    Args: 'static,
{
    fn can_provide(&self, name: &Name) -> bool {
        name.name() == self.name.name() && match_type(name.ty(), self.name.ty())
    }

    fn provide(
        &self,
        name: &Name,
        dependencies: Vec<ResolvedValue>,
    ) -> Result<Constructed, ResolutionError> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.factory.invoke(dependencies)));
        let component = unwrap_factory_outcome(name, outcome)?;

        let value: ComponentValue = Arc::new(component);
        Ok(Constructed {
            value,
            close: self.close.clone(),
        })
    }

    fn dependencies(&self) -> Vec<Request> {
        self.requests.clone()
    }

    fn list_providable_names(&self) -> Vec<Name> {
        vec![self.name.clone()]
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Decorator backed by a factory function whose first parameter is the
/// component to decorate.
pub struct FactoryDecorator<Fun, Args> {
    name: Name,
    factory: Fun,
    requests: Vec<Request>,
    priority: i32,
    description: String,
    _args: PhantomData<fn() -> Args>,
}

impl<Fun, Args> FactoryDecorator<Fun, Args>
where
    Fun: DecoratorFn<Args>,
    Args: 'static,
{
    pub(crate) fn new(
        factory: Fun,
        target: String,
        options: &Options,
    ) -> Result<Self, RegistrationError> {
        let requests = Fun::requests(&options.dependencies)?;
        Ok(Self {
            name: Name::new(target, TypeKey::of::<Fun::Component>()),
            factory,
            requests,
            priority: options.priority,
            description: options.description.clone(),
            _args: PhantomData,
        })
    }
}

impl<Fun, Args> Decorator for FactoryDecorator<Fun, Args>
where
    Fun: DecoratorFn<Args>,
    Args: 'static,
{
    fn for_name(&self) -> Name {
        self.name.clone()
    }

    fn decorate(
        &self,
        current: ComponentValue,
        dependencies: Vec<ResolvedValue>,
    ) -> Result<ComponentValue, ResolutionError> {
        let current = current
            .downcast::<Fun::Component>()
            .map_err(|_| ResolutionError::TypeMismatch {
                request: format!("decorator for {}", self.name),
                expected: type_name::<Fun::Component>(),
            })?;

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.factory.invoke(current, dependencies)
        }));
        let component = unwrap_factory_outcome(&self.name, outcome)?;

        Ok(Arc::new(component))
    }

    fn dependencies(&self) -> Vec<Request> {
        self.requests.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

fn unwrap_factory_outcome<T>(
    name: &Name,
    outcome: Result<Result<T, FactoryError>, Box<dyn std::any::Any + Send>>,
) -> Result<T, ResolutionError> {
    match outcome {
        Ok(Ok(component)) => Ok(component),
        Ok(Err(FactoryError::Resolution(error))) => Err(error),
        Ok(Err(FactoryError::Failed(error))) => Err(ResolutionError::Factory {
            name: name.clone(),
            source: error,
        }),
        Err(payload) => Err(ResolutionError::FactoryPanic {
            name: name.clone(),
            message: panic_message(payload),
        }),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

fn default_name<T>() -> String {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

/// A type-erased registrable, ready for insertion into the resolver.
pub enum Registrable {
    Provider(ProviderPtr),
    Decorator(DecoratorPtr),
}

/// Conversion into a [Registrable]. The marker parameter keeps the blanket
/// impls for factory functions, provider objects and decorator objects
/// coherent; it is always inferred.
pub trait IntoRegistrable<Marker> {
    fn into_registrable(self, options: &Options) -> Result<Registrable, RegistrationError>;
}

pub mod marker {
    pub struct Factory;
    pub struct CloseableFactory;
    pub struct DecoratorFactory;
    pub struct ProviderObject;
    pub struct DecoratorObject;
}

impl<Fun, Args> IntoRegistrable<(marker::Factory, Args)> for Fun
where
    Fun: FactoryFn<Args>,
    Args: 'static,
{
    fn into_registrable(self, options: &Options) -> Result<Registrable, RegistrationError> {
        if options.decorate.is_some() {
            return Err(RegistrationError::NotADecorator);
        }
        Ok(Registrable::Provider(Arc::new(FactoryProvider::new(
            self, options, None,
        )?)))
    }
}

impl<Fun, Args> IntoRegistrable<(marker::CloseableFactory, Args)> for CloseableFactory<Fun>
where
    Fun: FactoryFn<Args>,
    Fun::Component: Closeable,
    Args: 'static,
{
    fn into_registrable(self, options: &Options) -> Result<Registrable, RegistrationError> {
        if options.decorate.is_some() {
            return Err(RegistrationError::NotADecorator);
        }
        let close: CloseFn = Arc::new(close_component::<Fun::Component>);
        Ok(Registrable::Provider(Arc::new(FactoryProvider::new(
            self.0,
            options,
            Some(close),
        )?)))
    }
}

impl<Fun, Args> IntoRegistrable<(marker::DecoratorFactory, Args)> for DecoratorFactory<Fun>
where
    Fun: DecoratorFn<Args>,
    Args: 'static,
{
    fn into_registrable(self, options: &Options) -> Result<Registrable, RegistrationError> {
        let target = options
            .decorate
            .clone()
            .ok_or(RegistrationError::MissingDecorateTarget)?;
        Ok(Registrable::Decorator(Arc::new(FactoryDecorator::new(
            self.0, target, options,
        )?)))
    }
}

impl<P> IntoRegistrable<marker::ProviderObject> for P
where
    P: Provider + 'static,
{
    fn into_registrable(self, options: &Options) -> Result<Registrable, RegistrationError> {
        if options.decorate.is_some() {
            return Err(RegistrationError::NotADecorator);
        }
        Ok(Registrable::Provider(Arc::new(self)))
    }
}

impl<D> IntoRegistrable<marker::DecoratorObject> for D
where
    D: Decorator + 'static,
{
    fn into_registrable(self, _options: &Options) -> Result<Registrable, RegistrationError> {
        Ok(Registrable::Decorator(Arc::new(self)))
    }
}

fn close_component<T: Closeable + Send + Sync + 'static>(
    value: &ComponentValue,
) -> Result<(), BoxError> {
    match value.downcast_ref::<T>() {
        Some(component) => component.close(),
        None => Err("stored component is not of the registered type".into()),
    }
}
