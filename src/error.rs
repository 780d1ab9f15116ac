//! Errors related to registering and resolving components.

use crate::name::Name;
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Boxed error type accepted from factories, close hooks and runnables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [Resolver::register](crate::resolver::Resolver::register).
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// A dependency descriptor does not fit the parameter it targets, e.g. a
    /// `multiple` descriptor on a unique parameter.
    #[error("failed to build dependency for parameter {index}:\n\t{reason}")]
    InvalidDependency { index: usize, reason: String },

    /// A decorator registrable was handed in without a `decorate` target.
    #[error("no decorate option provided")]
    MissingDecorateTarget,

    /// The `decorate` option was set for a plain factory or provider.
    #[error("the decorate option requires a decorator registrable")]
    NotADecorator,

    /// Evaluating a gating condition failed (the referent resolution errored,
    /// as opposed to the referent merely being absent, which is a no-op).
    #[error("failed to evaluate condition on component {component:?}:\n\t{source}")]
    Condition {
        component: String,
        source: Box<ResolutionError>,
    },
}

impl RegistrationError {
    /// Rewrites the parameter index on dependency errors, which shape
    /// checks produce without positional context.
    pub(crate) fn at_parameter(self, index: usize) -> Self {
        match self {
            RegistrationError::InvalidDependency { reason, .. } => {
                RegistrationError::InvalidDependency { index, reason }
            }
            other => other,
        }
    }
}

/// Errors surfaced by the resolve family of operations.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("no providers found for {request}")]
    NoProvider { request: String },

    #[error("multiple providers found for {request}, expected one and only one, got {count}")]
    Ambiguous { request: String, count: usize },

    /// A component transitively depends on itself. The chain lists every
    /// name on the cycle, ending with the revisited one.
    #[error("dependency cycle detected: {}", .chain.iter().map(ToString::to_string).join(" -> "))]
    Cycle { chain: Vec<Name> },

    #[error("failed to resolve dependency {request} for component {name}:\n\t{source}")]
    Dependency {
        request: String,
        name: Name,
        source: Box<ResolutionError>,
    },

    /// The factory or decorator body returned an error.
    #[error("failed to provide component {name}:\n\t{source}")]
    Factory { name: Name, source: BoxError },

    /// The factory or decorator body panicked.
    #[error("panic calling provider for {name}: {message}")]
    FactoryPanic { name: Name, message: String },

    /// A resolved value could not be converted to the requested type.
    #[error("resolved value for {request} is not of type {expected}")]
    TypeMismatch {
        request: String,
        expected: &'static str,
    },

    /// Two components collected into a keyed mapping share a name.
    #[error("duplicate component name {name:?} while collecting a keyed mapping")]
    DuplicateMapKey { name: String },
}

/// Aggregate error returned by [Resolver::close](crate::resolver::Resolver::close)
/// when one or more stored components failed to close.
#[derive(Debug)]
pub struct CloseError {
    failures: Vec<(Name, BoxError)>,
}

impl CloseError {
    pub(crate) fn new(failures: Vec<(Name, BoxError)>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[(Name, BoxError)] {
        &self.failures
    }
}

impl Display for CloseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "failed to close {} component(s):", self.failures.len())?;
        for (name, error) in &self.failures {
            writeln!(f, "\t{name}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CloseError {}

/// Aggregate error from running registered runnables.
#[derive(Debug)]
pub struct RunError {
    failures: Vec<BoxError>,
}

impl RunError {
    pub(crate) fn new(failures: Vec<BoxError>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[BoxError] {
        &self.failures
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} runnable(s) failed:", self.failures.len())?;
        for error in &self.failures {
            writeln!(f, "\t{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RunError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;

    #[test]
    fn should_render_cycle_chain() {
        let err = ResolutionError::Cycle {
            chain: vec![
                Name::of::<String>("a"),
                Name::of::<String>("b"),
                Name::of::<String>("a"),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("(a, String) -> (b, String) -> (a, String)"));
    }

    #[test]
    fn should_render_nested_failures_with_indentation() {
        let inner = ResolutionError::NoProvider {
            request: "<type ~= String>".to_string(),
        };
        let outer = ResolutionError::Dependency {
            request: "<type ~= String>".to_string(),
            name: Name::of::<i32>("outer"),
            source: Box::new(inner),
        };
        let message = outer.to_string();
        assert!(message.contains("failed to resolve dependency"));
        assert!(message.contains("no providers found"));
    }

    #[test]
    fn should_list_every_close_failure() {
        let err = CloseError::new(vec![
            (Name::of::<String>("a"), "boom".into()),
            (Name::of::<String>("b"), "bang".into()),
        ]);
        let message = err.to_string();
        assert!(message.contains("2 component(s)"));
        assert!(message.contains("boom"));
        assert!(message.contains("bang"));
    }
}
