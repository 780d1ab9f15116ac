//! Concurrent store of constructed components.

use crate::error::CloseError;
use crate::name::Name;
use crate::provider::{CloseFn, ComponentValue};
use dashmap::DashMap;

/// A stored component: the erased value plus the close hook captured at
/// registration, if the component declared one.
#[derive(Clone)]
pub struct StoredComponent {
    pub value: ComponentValue,
    pub close: Option<CloseFn>,
}

/// Concurrent map from [Name] to constructed component. Entries are never
/// replaced: once a component is stored, every subsequent resolution
/// observes the same value. The only removal is the drain performed by
/// [ComponentStore::close_all] on shutdown.
#[derive(Default)]
pub struct ComponentStore {
    inner: DashMap<Name, StoredComponent>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `component` under `name` unless an entry already exists; the
    /// first write wins.
    pub fn put(&self, name: Name, component: StoredComponent) {
        self.inner.entry(name).or_insert(component);
    }

    pub fn get(&self, name: &Name) -> Option<ComponentValue> {
        self.inner.get(name).map(|entry| entry.value.clone())
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.inner.contains_key(name)
    }

    /// Names of every stored component, for diagnostics.
    pub fn names(&self) -> Vec<Name> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Drains the store, invoking the close hook of every component that has
    /// one and collecting their failures. Draining also drops the strong
    /// handle the resolver stores for itself, which would otherwise keep the
    /// whole graph alive.
    pub fn close_all(&self) -> Result<(), CloseError> {
        let mut failures = Vec::new();

        let names: Vec<Name> = self.names();
        for name in names {
            let Some((name, component)) = self.inner.remove(&name) else {
                continue;
            };
            if let Some(close) = component.close {
                if let Err(error) = close(&component.value) {
                    failures.push((name, error));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CloseError::new(failures))
        }
    }
}
