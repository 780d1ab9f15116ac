//! Registration options.

use crate::condition::Condition;
use crate::inject::DependencyDescriptor;

/// Configuration accepted by the register family of operations.
///
/// ```
/// use armature::{Inject, Options, When};
///
/// let options = Options::default()
///     .named("primary_greeter")
///     .priority(100)
///     .dependencies([Inject::named("greeting"), Inject::auto()])
///     .when(When::component("APP_ENV").equals("dev"))
///     .description("greeter used during development");
/// # let _ = options;
/// ```
#[derive(Default, Clone, Debug)]
pub struct Options {
    pub(crate) named: Option<String>,
    pub(crate) priority: i32,
    pub(crate) dependencies: Vec<DependencyDescriptor>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) decorate: Option<String>,
    pub(crate) description: String,
}

impl Options {
    /// Component name; defaults to the factory's type name, last segment.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.named = Some(name.into());
        self
    }

    /// Registration priority; higher wins when several providers claim the
    /// same name. Defaults to 0.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Per-parameter dependency descriptors, positional. Parameters without
    /// a descriptor resolve automatically by type.
    pub fn dependencies(
        mut self,
        descriptors: impl IntoIterator<Item = DependencyDescriptor>,
    ) -> Self {
        self.dependencies = descriptors.into_iter().collect();
        self
    }

    /// Adds a gating condition. All conditions must hold for the
    /// registration to take effect; otherwise it is silently skipped.
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Marks the registrable as a decorator for the named component.
    pub fn decorate(mut self, target: impl Into<String>) -> Self {
        self.decorate = Some(target.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
