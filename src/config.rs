//! Exposes the fields of a configuration struct as named components.
//!
//! A configuration type declares its fields through [ConfigFields], most
//! conveniently with the [config_fields!](crate::config_fields) macro. Each
//! field becomes a component named by its dotted path, starting with the
//! struct's type name:
//!
//! ```
//! use armature::config::{ConfigFieldProvider, ConfigFields};
//! use armature::{config_fields, Options, Resolver};
//! use std::sync::Arc;
//!
//! #[derive(Clone)]
//! struct ServerConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! config_fields!(ServerConfig {
//!     host: String,
//!     port: u16,
//! });
//!
//! let resolver = Resolver::new();
//! resolver
//!     .must_register(
//!         || ServerConfig { host: "localhost".into(), port: 8080 },
//!         Options::default().named("server_config"),
//!     )
//!     .must_register(ConfigFieldProvider::<ServerConfig>::new(), Options::default());
//!
//! let port = resolver.resolve_named::<u16>("ServerConfig.port").unwrap();
//! assert_eq!(*port, 8080);
//! ```

use crate::collector::{Collector, ResolvedValue};
use crate::error::ResolutionError;
use crate::inject::Injectable;
use crate::name::{match_type, Name, TypeKey};
use crate::provider::{ComponentValue, Constructed, Provider};
use crate::query::Query;
use crate::request::Request;
use crate::validator::Validator;
use fxhash::FxHashMap;
use once_cell::sync::OnceCell;
use std::any::type_name;
use std::sync::Arc;

/// One exposed configuration field: its dotted path, its type, and the
/// extractor reading it from a live configuration value.
pub struct ConfigField<C> {
    pub path: String,
    pub ty: TypeKey,
    pub extract: Box<dyn Fn(&C) -> ComponentValue + Send + Sync>,
}

/// Enumerates the fields a configuration struct exposes as components.
/// Usually implemented through [config_fields!](crate::config_fields); field
/// paths start with the struct's type name (`"ServerConfig.port"`). Fields
/// left out of the declaration are simply not exposed.
pub trait ConfigFields: Send + Sync + 'static {
    fn config_fields() -> Vec<ConfigField<Self>>
    where
        Self: Sized;
}

/// Provider serving each declared field of `C` as a named component. The
/// configuration value itself is an ordinary dependency, resolved by type on
/// first construction.
pub struct ConfigFieldProvider<C: ConfigFields> {
    fields: OnceCell<FxHashMap<String, ConfigField<C>>>,
    requests: Vec<Request>,
}

impl<C: ConfigFields> ConfigFieldProvider<C> {
    pub fn new() -> Self {
        let ty = TypeKey::of::<C>();
        Self {
            fields: OnceCell::new(),
            requests: vec![Request::new(
                ty,
                Query::ByType(ty),
                Validator::UniqueMandatory,
                Collector::Unique,
            )],
        }
    }

    fn field_map(&self) -> &FxHashMap<String, ConfigField<C>> {
        self.fields.get_or_init(|| {
            C::config_fields()
                .into_iter()
                .map(|field| (field.path.clone(), field))
                .collect()
        })
    }
}

impl<C: ConfigFields> Default for ConfigFieldProvider<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ConfigFields> Provider for ConfigFieldProvider<C> {
    fn can_provide(&self, name: &Name) -> bool {
        self.field_map()
            .get(name.name())
            .is_some_and(|field| match_type(name.ty(), field.ty))
    }

    fn provide(
        &self,
        name: &Name,
        dependencies: Vec<ResolvedValue>,
    ) -> Result<Constructed, ResolutionError> {
        let mut dependencies = dependencies.into_iter();
        let config: Arc<C> = Injectable::extract(dependencies.next().ok_or_else(|| {
            ResolutionError::Factory {
                name: name.clone(),
                source: "missing configuration dependency".into(),
            }
        })?)?;

        let field =
            self.field_map()
                .get(name.name())
                .ok_or_else(|| ResolutionError::Factory {
                    name: name.clone(),
                    source: format!("{} exposes no field {:?}", type_name::<C>(), name.name())
                        .into(),
                })?;
        if !match_type(name.ty(), field.ty) {
            return Err(ResolutionError::TypeMismatch {
                request: name.to_string(),
                expected: field.ty.type_name(),
            });
        }

        Ok(Constructed::new((field.extract)(config.as_ref())))
    }

    fn dependencies(&self) -> Vec<Request> {
        self.requests.clone()
    }

    fn list_providable_names(&self) -> Vec<Name> {
        self.field_map()
            .values()
            .map(|field| Name::new(field.path.clone(), field.ty))
            .collect()
    }

    fn priority(&self) -> i32 {
        0
    }

    fn description(&self) -> String {
        format!("provides the fields of {} as components", type_name::<C>())
    }
}

/// Implements [ConfigFields] for a struct, exposing the listed fields under
/// their dotted paths. Nested structs compose paths:
///
/// ```
/// use armature::config_fields;
///
/// #[derive(Clone)]
/// struct PoolConfig {
///     size: usize,
/// }
///
/// #[derive(Clone)]
/// struct DbConfig {
///     url: String,
///     pool: PoolConfig,
/// }
///
/// config_fields!(DbConfig {
///     url: String,
///     pool: PoolConfig {
///         size: usize,
///     },
/// });
/// // exposes "DbConfig.url" and "DbConfig.pool.size"
/// ```
///
/// Listed leaf fields must be `Clone + Send + Sync + 'static`. A nested
/// struct can also be listed as a leaf to expose it whole.
#[macro_export]
macro_rules! config_fields {
    ($ty:ident { $($body:tt)* }) => {
        impl $crate::config::ConfigFields for $ty {
            fn config_fields() -> ::std::vec::Vec<$crate::config::ConfigField<Self>> {
                let mut fields = ::std::vec::Vec::new();
                $crate::config_fields!(
                    @walk $ty, fields,
                    ::std::string::String::from(::core::stringify!($ty)),
                    (::std::boxed::Box::new(|config: &$ty| config)
                        as ::std::boxed::Box<dyn for<'a> ::std::ops::Fn(&'a $ty) -> &'a $ty + ::std::marker::Send + ::std::marker::Sync>),
                    $($body)*
                );
                fields
            }
        }
    };

    (@walk $root:ident, $fields:ident, $prefix:expr, ($get:expr), $name:ident : $fty:ty { $($nested:tt)* } $(, $($rest:tt)*)?) => {
        {
            let prefix = ::std::format!("{}.{}", $prefix, ::core::stringify!($name));
            let get = $get;
            $crate::config_fields!(
                @walk $root, $fields, prefix,
                (::std::boxed::Box::new(move |config: &$root| &(get)(config).$name)
                    as ::std::boxed::Box<dyn for<'a> ::std::ops::Fn(&'a $root) -> &'a $fty + ::std::marker::Send + ::std::marker::Sync>),
                $($nested)*
            );
        }
        $($crate::config_fields!(@walk $root, $fields, $prefix, ($get), $($rest)*);)?
    };

    (@walk $root:ident, $fields:ident, $prefix:expr, ($get:expr), $name:ident : $fty:ty $(, $($rest:tt)*)?) => {
        {
            let get = $get;
            $fields.push($crate::config::ConfigField {
                path: ::std::format!("{}.{}", $prefix, ::core::stringify!($name)),
                ty: $crate::name::TypeKey::of::<$fty>(),
                extract: ::std::boxed::Box::new(move |config: &$root| {
                    ::std::sync::Arc::new((get)(config).$name.clone())
                        as $crate::provider::ComponentValue
                }),
            });
        }
        $($crate::config_fields!(@walk $root, $fields, $prefix, ($get), $($rest)*);)?
    };

    (@walk $root:ident, $fields:ident, $prefix:expr, ($get:expr) $(,)?) => {};
}
