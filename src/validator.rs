//! Cardinality checks on query results.

use crate::error::ResolutionError;
use crate::query::{Query, QueryResult};
use std::fmt::{self, Display, Formatter};

/// Enforces how many candidates a request may legally produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validator {
    /// Exactly one candidate.
    UniqueMandatory,
    /// Zero or one candidate.
    UniqueOptional,
    /// Any number of candidates.
    Multiple,
}

impl Validator {
    pub(crate) fn validate(
        &self,
        query: &Query,
        results: &[QueryResult],
    ) -> Result<(), ResolutionError> {
        match self {
            Validator::UniqueMandatory => {
                if results.is_empty() {
                    return Err(ResolutionError::NoProvider {
                        request: query.to_string(),
                    });
                }
                Self::reject_ambiguous(query, results)
            }
            Validator::UniqueOptional => Self::reject_ambiguous(query, results),
            Validator::Multiple => Ok(()),
        }
    }

    fn reject_ambiguous(query: &Query, results: &[QueryResult]) -> Result<(), ResolutionError> {
        if results.len() > 1 {
            return Err(ResolutionError::Ambiguous {
                request: query.to_string(),
                count: results.len(),
            });
        }
        Ok(())
    }
}

impl Display for Validator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Validator::UniqueMandatory => "<unique mandatory>",
            Validator::UniqueOptional => "<unique optional>",
            Validator::Multiple => "<multiple>",
        };
        f.write_str(text)
    }
}
