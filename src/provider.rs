//! Contracts every registrable must satisfy: providers produce components,
//! decorators wrap components already produced.

use crate::collector::ResolvedValue;
use crate::error::{BoxError, ResolutionError};
use crate::name::Name;
use crate::request::Request;
#[cfg(test)]
use mockall::automock;
use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

/// A type-erased component. A component declared with type `T` is the erased
/// `Arc<T>`; typed access downcasts back to `Arc<T>`, so handing the same
/// component to many consumers shares one allocation.
pub type ComponentValue = Arc<dyn Any + Send + Sync>;

/// Close hook invoked against the stored component value on shutdown.
pub type CloseFn = Arc<dyn Fn(&ComponentValue) -> Result<(), BoxError> + Send + Sync>;

/// Capability for components holding resources that must be released when
/// the resolver shuts down. Declared at registration through
/// [closeable](crate::factory::closeable).
pub trait Closeable {
    fn close(&self) -> Result<(), BoxError>;
}

/// A freshly produced component together with its optional close hook.
pub struct Constructed {
    pub value: ComponentValue,
    pub close: Option<CloseFn>,
}

impl Constructed {
    pub fn new(value: ComponentValue) -> Self {
        Self { value, close: None }
    }

    pub fn with_close(value: ComponentValue, close: CloseFn) -> Self {
        Self {
            value,
            close: Some(close),
        }
    }
}

/// A registrable that can produce one or more components.
#[cfg_attr(test, automock)]
pub trait Provider: Send + Sync {
    /// Whether this provider can produce the component identified by `name`.
    fn can_provide(&self, name: &Name) -> bool;

    /// Produces the component for `name`. `dependencies` holds the resolved
    /// values for [Provider::dependencies], in declaration order. Called at
    /// most once per name for the lifetime of a resolver.
    fn provide(
        &self,
        name: &Name,
        dependencies: Vec<ResolvedValue>,
    ) -> Result<Constructed, ResolutionError>;

    /// Requests this provider needs resolved before it can produce anything.
    fn dependencies(&self) -> Vec<Request>;

    /// Every name this provider is able to produce.
    fn list_providable_names(&self) -> Vec<Name>;

    fn priority(&self) -> i32;

    fn description(&self) -> String;
}

/// A registrable that wraps an already-built component under a given name.
pub trait Decorator: Send + Sync {
    /// The name this decorator applies to.
    fn for_name(&self) -> Name;

    /// Wraps `current`, returning the value to store in its place. The
    /// returned component keeps the declared type of the decorated one.
    fn decorate(
        &self,
        current: ComponentValue,
        dependencies: Vec<ResolvedValue>,
    ) -> Result<ComponentValue, ResolutionError>;

    fn dependencies(&self) -> Vec<Request>;

    fn priority(&self) -> i32;

    fn description(&self) -> String;
}

pub type ProviderPtr = Arc<dyn Provider>;
pub type DecoratorPtr = Arc<dyn Decorator>;

/// Providers sort highest priority first.
pub(crate) fn by_descending_priority(a: &ProviderPtr, b: &ProviderPtr) -> Ordering {
    b.priority().cmp(&a.priority())
}

/// Decorators sort lowest priority first; the chain applies in ascending
/// order, each decorator observing the previous one's output.
pub(crate) fn by_ascending_priority(a: &DecoratorPtr, b: &DecoratorPtr) -> Ordering {
    a.priority().cmp(&b.priority())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_priority(priority: i32) -> ProviderPtr {
        let mut provider = MockProvider::new();
        provider.expect_priority().return_const(priority);
        Arc::new(provider)
    }

    #[test]
    fn should_order_providers_by_descending_priority() {
        let high = provider_with_priority(100);
        let low = provider_with_priority(0);
        assert_eq!(by_descending_priority(&high, &low), Ordering::Less);
        assert_eq!(by_descending_priority(&low, &high), Ordering::Greater);
        assert_eq!(by_descending_priority(&low, &low), Ordering::Equal);
    }
}
