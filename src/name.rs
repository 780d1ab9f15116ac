//! Component identity: a string name paired with a type descriptor.

use std::any::{type_name, Any, TypeId};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Runtime descriptor for a component type: the [TypeId] used for matching
/// plus the type name used for diagnostics. Equality and hashing consider
/// only the id, so two keys obtained for the same type in different ways
/// always compare equal.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name, including module paths.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&abbreviate(self.name))
    }
}

/// Identity of a component: a name and the provided type. Lookups by name
/// and by type both go through this pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    name: String,
    ty: TypeKey,
}

impl Name {
    pub fn new(name: impl Into<String>, ty: TypeKey) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn of<T: Any + ?Sized>(name: impl Into<String>) -> Self {
        Self::new(name, TypeKey::of::<T>())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> TypeKey {
        self.ty
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.name, self.ty)
    }
}

/// Checks whether a component of `provided` type satisfies a query for
/// `query` type. Abstract matching is expressed by declaring trait-object
/// component types, so plain id equality is the whole relation.
#[inline]
pub fn match_type(query: TypeKey, provided: TypeKey) -> bool {
    query == provided
}

/// Strips module paths from a type name while keeping generic structure:
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
fn abbreviate(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        match c {
            ':' => segment.clear(),
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' => {
                out.push_str(&segment);
                segment.clear();
                out.push(c);
            }
            _ => segment.push(c),
        }
    }
    out.push_str(&segment);
    out
}
