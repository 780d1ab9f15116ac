//! Queries locate candidate components: either values already in the store,
//! or the providers responsible for building them.

use crate::name::{match_type, Name, TypeKey};
use crate::provider::{ComponentValue, ProviderPtr};
use crate::resolver::Resolver;
use derivative::Derivative;
use fxhash::FxHashSet;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// How a resolution step looks up candidates.
#[derive(Clone, Debug)]
pub enum Query {
    /// All components whose type matches, regardless of name.
    ByType(TypeKey),
    /// The single component with the given identity.
    ByName(Name),
}

/// A single candidate found by a query: the component is carried directly
/// when it was already built, otherwise the responsible provider is.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct QueryResult {
    pub name: Name,
    #[derivative(Debug = "ignore")]
    pub source: ResultSource,
}

#[derive(Clone)]
pub enum ResultSource {
    Stored(ComponentValue),
    Provider(ProviderPtr),
}

impl Query {
    /// Finds all candidates for this query. Providers are consulted highest
    /// priority first over a consistent snapshot; results are de-duplicated
    /// by [Name], so when several providers claim the same name, the
    /// highest-priority one wins.
    pub(crate) fn find(&self, resolver: &Resolver) -> Vec<QueryResult> {
        match self {
            Query::ByType(ty) => Self::find_by_type(resolver, *ty),
            Query::ByName(name) => Self::find_by_name(resolver, name),
        }
    }

    fn find_by_type(resolver: &Resolver, ty: TypeKey) -> Vec<QueryResult> {
        let mut claimed: FxHashSet<Name> = FxHashSet::default();
        let mut results = Vec::new();

        for provider in resolver.providers().all().iter() {
            for name in provider.list_providable_names() {
                if !match_type(ty, name.ty()) || claimed.contains(&name) {
                    continue;
                }
                claimed.insert(name.clone());

                let source = match resolver.store().get(&name) {
                    Some(value) => ResultSource::Stored(value),
                    None => ResultSource::Provider(Arc::clone(provider)),
                };
                results.push(QueryResult { name, source });
            }
        }

        results
    }

    fn find_by_name(resolver: &Resolver, name: &Name) -> Vec<QueryResult> {
        if let Some(value) = resolver.store().get(name) {
            return vec![QueryResult {
                name: name.clone(),
                source: ResultSource::Stored(value),
            }];
        }

        for provider in resolver.providers().all().iter() {
            if provider.can_provide(name) {
                return vec![QueryResult {
                    name: name.clone(),
                    source: ResultSource::Provider(Arc::clone(provider)),
                }];
            }
        }

        Vec::new()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Query::ByType(ty) => write!(f, "<type ~= {ty}>"),
            Query::ByName(name) => {
                write!(f, "<type ~= {} and name = {}>", name.ty(), name.name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_queries() {
        assert_eq!(
            Query::ByType(TypeKey::of::<String>()).to_string(),
            "<type ~= String>"
        );
        assert_eq!(
            Query::ByName(Name::of::<String>("db.url")).to_string(),
            "<type ~= String and name = db.url>"
        );
    }
}
