//! Provider exposing environment variables as string components.

use crate::collector::ResolvedValue;
use crate::error::ResolutionError;
use crate::name::{match_type, Name, TypeKey};
use crate::provider::{Constructed, Provider};
use crate::request::Request;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Provides every environment variable as a `String` component under the
/// variable's own name. [Provider::can_provide] consults the live
/// environment, while the name listing is snapshotted on first use.
#[derive(Default)]
pub struct EnvProvider {
    names: OnceCell<Vec<Name>>,
}

impl EnvProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> &[Name] {
        self.names.get_or_init(|| {
            std::env::vars()
                .map(|(key, _)| Name::of::<String>(key))
                .collect()
        })
    }
}

impl Provider for EnvProvider {
    fn can_provide(&self, name: &Name) -> bool {
        !name.name().is_empty()
            && match_type(name.ty(), TypeKey::of::<String>())
            && std::env::var(name.name()).is_ok()
    }

    fn provide(
        &self,
        name: &Name,
        _dependencies: Vec<ResolvedValue>,
    ) -> Result<Constructed, ResolutionError> {
        let value = std::env::var(name.name()).map_err(|err| ResolutionError::Factory {
            name: name.clone(),
            source: Box::new(err),
        })?;
        Ok(Constructed::new(Arc::new(value)))
    }

    fn dependencies(&self) -> Vec<Request> {
        Vec::new()
    }

    fn list_providable_names(&self) -> Vec<Name> {
        self.snapshot().to_vec()
    }

    fn priority(&self) -> i32 {
        0
    }

    fn description(&self) -> String {
        "provides environment variables as string components".to_string()
    }
}
