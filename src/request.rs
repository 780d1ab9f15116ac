//! A complete description of one resolution step.

use crate::collector::Collector;
use crate::name::TypeKey;
use crate::query::Query;
use crate::validator::Validator;
use std::fmt::{self, Display, Formatter};

/// Bundle consumed by resolution: the element type being produced, the query
/// locating candidates, the validator enforcing cardinality, and the
/// collector shaping the final value.
#[derive(Clone, Debug)]
pub struct Request {
    unitary: TypeKey,
    query: Query,
    validator: Validator,
    collector: Collector,
}

impl Request {
    pub fn new(unitary: TypeKey, query: Query, validator: Validator, collector: Collector) -> Self {
        Self {
            unitary,
            query,
            validator,
            collector,
        }
    }

    #[inline]
    pub fn unitary(&self) -> TypeKey {
        self.unitary
    }

    #[inline]
    pub fn query(&self) -> &Query {
        &self.query
    }

    #[inline]
    pub fn validator(&self) -> Validator {
        self.validator
    }

    #[inline]
    pub fn collector(&self) -> Collector {
        self.collector
    }
}

impl Display for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{q={} v={} c={}}}",
            self.query, self.validator, self.collector
        )
    }
}
