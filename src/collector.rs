//! Collectors materialize the final value of a resolution step from the
//! validated result set, building components through their providers when
//! the store does not hold them yet.

use crate::error::ResolutionError;
use crate::provider::ComponentValue;
use crate::query::{QueryResult, ResultSource};
use crate::resolver::Resolver;
use crate::tracker::Tracker;
use fxhash::FxHashSet;
use std::fmt::{self, Display, Formatter};

/// Shape of the value a resolution step produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collector {
    /// A single component, or nothing when the validator allowed zero.
    Unique,
    /// One entry per result, in iteration order.
    MultipleAsSlice,
    /// One entry per result, keyed by the component's name string.
    MultipleAsMap,
}

/// The type-erased outcome of collecting a request. Typed parameter shapes
/// convert this into the value handed to a factory.
pub enum ResolvedValue {
    Missing,
    Unique(ComponentValue),
    Slice(Vec<ComponentValue>),
    Map(Vec<(String, ComponentValue)>),
}

impl Collector {
    pub(crate) fn collect(
        &self,
        resolver: &Resolver,
        results: Vec<QueryResult>,
        tracker: &mut Tracker,
    ) -> Result<ResolvedValue, ResolutionError> {
        match self {
            Collector::Unique => {
                let mut results = results;
                match results.len() {
                    0 => Ok(ResolvedValue::Missing),
                    1 => {
                        let result = results.remove(0);
                        Ok(ResolvedValue::Unique(materialize(
                            resolver, result, tracker,
                        )?))
                    }
                    count => Err(ResolutionError::Ambiguous {
                        request: self.to_string(),
                        count,
                    }),
                }
            }
            Collector::MultipleAsSlice => {
                let mut values = Vec::with_capacity(results.len());
                for result in results {
                    values.push(materialize(resolver, result, tracker)?);
                }
                Ok(ResolvedValue::Slice(values))
            }
            Collector::MultipleAsMap => {
                let mut seen: FxHashSet<String> = FxHashSet::default();
                let mut entries = Vec::with_capacity(results.len());
                for result in results {
                    let key = result.name.name().to_string();
                    if !seen.insert(key.clone()) {
                        return Err(ResolutionError::DuplicateMapKey { name: key });
                    }
                    let value = materialize(resolver, result, tracker)?;
                    entries.push((key, value));
                }
                Ok(ResolvedValue::Map(entries))
            }
        }
    }
}

fn materialize(
    resolver: &Resolver,
    result: QueryResult,
    tracker: &mut Tracker,
) -> Result<ComponentValue, ResolutionError> {
    match result.source {
        ResultSource::Stored(value) => Ok(value),
        ResultSource::Provider(provider) => {
            resolver.provide_using(&provider, &result.name, tracker)
        }
    }
}

impl Display for Collector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Collector::Unique => "<unique>",
            Collector::MultipleAsSlice => "<multiple as slice>",
            Collector::MultipleAsMap => "<multiple as map>",
        };
        f.write_str(text)
    }
}
