//! Dependency descriptors and the typed parameter shapes they apply to.
//!
//! A factory parameter is one of four shapes:
//!
//! * `Arc<T>` — a unique dependency, resolved by type or by name,
//! * `Option<Arc<T>>` — a unique dependency that may be absent,
//! * `Vec<Arc<T>>` — every component whose type matches `T`,
//! * `HashMap<String, Arc<T>>` — the same, keyed by component name.
//!
//! Descriptors built through [Inject] refine the default (`auto`) behavior
//! of a parameter, e.g. selecting a component by name.

use crate::collector::{Collector, ResolvedValue};
use crate::error::{RegistrationError, ResolutionError};
use crate::name::{Name, TypeKey};
use crate::query::Query;
use crate::request::Request;
use crate::validator::Validator;
use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

/// How a single factory parameter is resolved.
#[derive(Clone, Debug)]
pub enum DependencyDescriptor {
    /// Resolve by the parameter's type.
    Auto { optional: bool },
    /// Resolve the component with this name and the parameter's type.
    Named { name: String, optional: bool },
    /// Resolve every component whose type matches the parameter's element
    /// type. Inherently optional: no matches produce an empty collection.
    Multiple,
}

impl DependencyDescriptor {
    /// Marks the dependency as optional: absence resolves to `None` instead
    /// of failing. The parameter must be an `Option<Arc<_>>`.
    pub fn optional(self) -> Self {
        match self {
            DependencyDescriptor::Auto { .. } => DependencyDescriptor::Auto { optional: true },
            DependencyDescriptor::Named { name, .. } => DependencyDescriptor::Named {
                name,
                optional: true,
            },
            DependencyDescriptor::Multiple => DependencyDescriptor::Multiple,
        }
    }
}

impl Default for DependencyDescriptor {
    fn default() -> Self {
        DependencyDescriptor::Auto { optional: false }
    }
}

/// Namespace for dependency descriptor builders.
pub struct Inject;

impl Inject {
    pub fn auto() -> DependencyDescriptor {
        DependencyDescriptor::default()
    }

    pub fn named(name: impl Into<String>) -> DependencyDescriptor {
        DependencyDescriptor::Named {
            name: name.into(),
            optional: false,
        }
    }

    pub fn multiple() -> DependencyDescriptor {
        DependencyDescriptor::Multiple
    }
}

/// A parameter shape accepted by factory functions. Maps a descriptor to the
/// [Request] resolving it, and converts the collected value back into the
/// typed parameter.
pub trait Injectable: Sized + 'static {
    fn request(descriptor: &DependencyDescriptor) -> Result<Request, RegistrationError>;

    fn extract(resolved: ResolvedValue) -> Result<Self, ResolutionError>;
}

fn invalid(reason: &str) -> RegistrationError {
    RegistrationError::InvalidDependency {
        index: 0,
        reason: reason.to_string(),
    }
}

fn mismatch<T>(shape: &str) -> ResolutionError {
    ResolutionError::TypeMismatch {
        request: shape.to_string(),
        expected: type_name::<T>(),
    }
}

fn downcast<T: Send + Sync + 'static>(
    value: crate::provider::ComponentValue,
    shape: &str,
) -> Result<Arc<T>, ResolutionError> {
    value.downcast::<T>().map_err(|_| mismatch::<T>(shape))
}

impl<T: Send + Sync + 'static> Injectable for Arc<T> {
    fn request(descriptor: &DependencyDescriptor) -> Result<Request, RegistrationError> {
        let ty = TypeKey::of::<T>();
        match descriptor {
            DependencyDescriptor::Auto { optional: false } => Ok(Request::new(
                ty,
                Query::ByType(ty),
                Validator::UniqueMandatory,
                Collector::Unique,
            )),
            DependencyDescriptor::Named {
                name,
                optional: false,
            } => Ok(Request::new(
                ty,
                Query::ByName(Name::new(name.clone(), ty)),
                Validator::UniqueMandatory,
                Collector::Unique,
            )),
            DependencyDescriptor::Auto { optional: true }
            | DependencyDescriptor::Named { optional: true, .. } => Err(invalid(
                "optional dependencies must use an Option<Arc<_>> parameter",
            )),
            DependencyDescriptor::Multiple => Err(invalid(
                "multiple dependencies must use a Vec<Arc<_>> or HashMap<String, Arc<_>> parameter",
            )),
        }
    }

    fn extract(resolved: ResolvedValue) -> Result<Self, ResolutionError> {
        match resolved {
            ResolvedValue::Unique(value) => downcast::<T>(value, "unique dependency"),
            _ => Err(mismatch::<T>("unique dependency")),
        }
    }
}

impl<T: Send + Sync + 'static> Injectable for Option<Arc<T>> {
    fn request(descriptor: &DependencyDescriptor) -> Result<Request, RegistrationError> {
        let ty = TypeKey::of::<T>();
        match descriptor {
            DependencyDescriptor::Auto { .. } => Ok(Request::new(
                ty,
                Query::ByType(ty),
                Validator::UniqueOptional,
                Collector::Unique,
            )),
            DependencyDescriptor::Named { name, .. } => Ok(Request::new(
                ty,
                Query::ByName(Name::new(name.clone(), ty)),
                Validator::UniqueOptional,
                Collector::Unique,
            )),
            DependencyDescriptor::Multiple => Err(invalid(
                "multiple dependencies must use a Vec<Arc<_>> or HashMap<String, Arc<_>> parameter",
            )),
        }
    }

    fn extract(resolved: ResolvedValue) -> Result<Self, ResolutionError> {
        match resolved {
            ResolvedValue::Missing => Ok(None),
            ResolvedValue::Unique(value) => {
                downcast::<T>(value, "optional dependency").map(Some)
            }
            _ => Err(mismatch::<T>("optional dependency")),
        }
    }
}

impl<T: Send + Sync + 'static> Injectable for Vec<Arc<T>> {
    fn request(descriptor: &DependencyDescriptor) -> Result<Request, RegistrationError> {
        let ty = TypeKey::of::<T>();
        match descriptor {
            DependencyDescriptor::Auto { .. } | DependencyDescriptor::Multiple => Ok(Request::new(
                ty,
                Query::ByType(ty),
                Validator::Multiple,
                Collector::MultipleAsSlice,
            )),
            DependencyDescriptor::Named { .. } => Err(invalid(
                "named dependencies resolve a single component; use Arc<Vec<_>> for a named collection",
            )),
        }
    }

    fn extract(resolved: ResolvedValue) -> Result<Self, ResolutionError> {
        match resolved {
            ResolvedValue::Slice(values) => values
                .into_iter()
                .map(|value| downcast::<T>(value, "slice dependency"))
                .collect(),
            _ => Err(mismatch::<T>("slice dependency")),
        }
    }
}

impl<T: Send + Sync + 'static> Injectable for HashMap<String, Arc<T>> {
    fn request(descriptor: &DependencyDescriptor) -> Result<Request, RegistrationError> {
        let ty = TypeKey::of::<T>();
        match descriptor {
            DependencyDescriptor::Auto { .. } | DependencyDescriptor::Multiple => Ok(Request::new(
                ty,
                Query::ByType(ty),
                Validator::Multiple,
                Collector::MultipleAsMap,
            )),
            DependencyDescriptor::Named { .. } => Err(invalid(
                "named dependencies resolve a single component; use Arc<HashMap<_, _>> for a named mapping",
            )),
        }
    }

    fn extract(resolved: ResolvedValue) -> Result<Self, ResolutionError> {
        match resolved {
            ResolvedValue::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| Ok((key, downcast::<T>(value, "map dependency")?)))
                .collect(),
            _ => Err(mismatch::<T>("map dependency")),
        }
    }
}
