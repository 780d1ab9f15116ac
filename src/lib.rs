//! A runtime dependency-injection container.
//!
//! Components are produced by *providers* — usually plain factory functions
//! — registered with a name, a priority and optional dependency descriptors.
//! Resolution finds the candidate providers, recursively resolves their
//! dependencies (detecting cycles), constructs each component exactly once,
//! applies any registered *decorators* in priority order and caches the
//! result for the lifetime of the resolver.
//!
//! ```
//! use armature::{Inject, Options, Resolver};
//! use std::sync::Arc;
//!
//! struct Mailer {
//!     sender: Arc<String>,
//! }
//!
//! let resolver = Resolver::new();
//! resolver
//!     .must_register(
//!         || "noreply@example.com".to_string(),
//!         Options::default().named("sender_address"),
//!     )
//!     .must_register(
//!         |sender: Arc<String>| Mailer { sender },
//!         Options::default()
//!             .named("mailer")
//!             .dependencies([Inject::named("sender_address")]),
//!     );
//!
//! let mailer = resolver.resolve::<Mailer>().unwrap();
//! assert_eq!(*mailer.sender, "noreply@example.com");
//! ```
//!
//! Factory parameters declare what they need by shape: `Arc<T>` for a unique
//! dependency, `Option<Arc<T>>` for an optional one, `Vec<Arc<T>>` or
//! `HashMap<String, Arc<T>>` for every component of a type. Registration is
//! safe to race with resolution; all resolver operations take `&self`.

pub mod collector;
pub mod condition;
pub mod config;
pub mod cow_list;
pub mod env;
pub mod error;
pub mod factory;
pub mod inject;
pub mod lock;
pub mod name;
pub mod options;
pub mod provider;
pub mod query;
pub mod request;
pub mod resolver;
pub mod runner;
pub mod store;
pub mod tracker;
pub mod validator;

pub use condition::When;
pub use env::EnvProvider;
pub use error::{BoxError, CloseError, RegistrationError, ResolutionError};
pub use factory::{closeable, decorator, fallible, static_value};
pub use inject::Inject;
pub use name::{Name, TypeKey};
pub use options::Options;
pub use provider::{Closeable, ComponentValue, Constructed, Decorator, Provider};
pub use resolver::{
    FallibleInitializer, Initializer, Resolver, RESOLVER_COMPONENT_NAME,
};
pub use runner::{Runnable, RunnableFn, RunnablePtr};
