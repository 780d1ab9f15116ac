//! The resolver: registration, resolution, decoration, initialization and
//! shutdown of components.

use crate::collector::{Collector, ResolvedValue};
use crate::cow_list::SortedCowList;
use crate::error::{BoxError, CloseError, RegistrationError, ResolutionError};
use crate::factory::{IntoRegistrable, Registrable};
use crate::inject::Injectable;
use crate::lock::LockManager;
use crate::name::{match_type, Name, TypeKey};
use crate::options::Options;
use crate::provider::{
    by_ascending_priority, by_descending_priority, ComponentValue, Constructed, DecoratorPtr,
    Provider, ProviderPtr,
};
use crate::query::Query;
use crate::request::Request;
use crate::store::{ComponentStore, StoredComponent};
use crate::tracker::Tracker;
use crate::validator::Validator;
use dashmap::DashMap;
use itertools::Itertools;
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Name under which every resolver registers itself, so factories can accept
/// an `Arc<Resolver>` dependency and perform dynamic look-ups at runtime.
pub const RESOLVER_COMPONENT_NAME: &str = "armature.resolver";

/// Side-effect initialization thunk. Register factories returning this type
/// and run them all with [Resolver::initialize].
pub struct Initializer(Box<dyn Fn() + Send + Sync>);

impl Initializer {
    pub fn new(run: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Box::new(run))
    }

    pub fn run(&self) {
        (self.0)()
    }
}

/// Fallible initialization thunk; failures abort [Resolver::initialize].
pub struct FallibleInitializer(Box<dyn Fn() -> Result<(), BoxError> + Send + Sync>);

impl FallibleInitializer {
    pub fn new(run: impl Fn() -> Result<(), BoxError> + Send + Sync + 'static) -> Self {
        Self(Box::new(run))
    }

    pub fn run(&self) -> Result<(), BoxError> {
        (self.0)()
    }
}

/// A dependency-injection container: providers and decorators are registered
/// declaratively, components are constructed lazily on first resolution and
/// cached for the resolver's lifetime.
///
/// All operations take `&self` and are safe to call from concurrent threads.
///
/// ```
/// use armature::{Options, Resolver};
/// use std::sync::Arc;
///
/// struct Greeter {
///     greeting: Arc<String>,
/// }
///
/// let resolver = Resolver::new();
/// resolver
///     .must_register(|| "hello".to_string(), Options::default().named("greeting"))
///     .must_register(
///         |greeting: Arc<String>| Greeter { greeting },
///         Options::default().named("greeter"),
///     );
///
/// let greeter = resolver.resolve::<Greeter>().unwrap();
/// assert_eq!(*greeter.greeting, "hello");
/// ```
pub struct Resolver {
    providers: SortedCowList<ProviderPtr>,
    decorators: DashMap<Name, Arc<SortedCowList<DecoratorPtr>>>,
    store: ComponentStore,
    locks: LockManager,
}

impl Resolver {
    pub fn new() -> Arc<Self> {
        let resolver = Arc::new(Self {
            providers: SortedCowList::new(by_descending_priority),
            decorators: DashMap::new(),
            store: ComponentStore::new(),
            locks: LockManager::new(),
        });

        // registered so factories can take Arc<Resolver> as a dependency and
        // re-enter the resolver at runtime
        let this = Arc::downgrade(&resolver);
        resolver
            .providers
            .add(Arc::new(SelfProvider { resolver: this }) as ProviderPtr);

        resolver
    }

    /// Registers a factory function, a [Provider](crate::provider::Provider)
    /// object or a [Decorator](crate::provider::Decorator) object. When any
    /// gating condition in `options` does not hold, the registration is
    /// silently skipped.
    pub fn register<M>(
        &self,
        registrable: impl IntoRegistrable<M>,
        options: Options,
    ) -> Result<(), RegistrationError> {
        let registrable = registrable.into_registrable(&options)?;

        if !self.conditions_hold(&options)? {
            debug!("skipping registration, conditions not met");
            return Ok(());
        }

        match registrable {
            Registrable::Provider(provider) => {
                debug!(
                    names = %provider.list_providable_names().iter().join(", "),
                    priority = provider.priority(),
                    "registering provider"
                );
                self.providers.add(provider);
            }
            Registrable::Decorator(decorator) => {
                let name = decorator.for_name();
                debug!(component = %name, priority = decorator.priority(), "registering decorator");
                let list = Arc::clone(
                    self.decorators
                        .entry(name)
                        .or_insert_with(|| Arc::new(SortedCowList::new(by_ascending_priority)))
                        .value(),
                );
                list.add(decorator);
            }
        }

        Ok(())
    }

    /// Chainable [register](Resolver::register) that aborts on error.
    pub fn must_register<M>(
        &self,
        registrable: impl IntoRegistrable<M>,
        options: Options,
    ) -> &Self {
        if let Err(err) = self.register(registrable, options) {
            error!(%err, "failed to register provider");
            panic!("failed to register provider: {err}");
        }
        self
    }

    /// Resolves the unique component of type `T`.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolutionError> {
        let ty = TypeKey::of::<T>();
        self.resolve_shaped::<Arc<T>>(Request::new(
            ty,
            Query::ByType(ty),
            Validator::UniqueMandatory,
            Collector::Unique,
        ))
    }

    /// Resolves the component identified by `(name, T)`.
    pub fn resolve_named<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ResolutionError> {
        let ty = TypeKey::of::<T>();
        self.resolve_shaped::<Arc<T>>(Request::new(
            ty,
            Query::ByName(Name::new(name, ty)),
            Validator::UniqueMandatory,
            Collector::Unique,
        ))
    }

    /// Resolves every component of type `T`, one per distinct name. An empty
    /// result is not an error.
    pub fn resolve_all<T: Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, ResolutionError> {
        let ty = TypeKey::of::<T>();
        self.resolve_shaped::<Vec<Arc<T>>>(Request::new(
            ty,
            Query::ByType(ty),
            Validator::Multiple,
            Collector::MultipleAsSlice,
        ))
    }

    /// Like [resolve](Resolver::resolve), but an absent component yields
    /// `Ok(None)` instead of an error. Every other failure still surfaces.
    pub fn try_resolve<T: Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ResolutionError> {
        let ty = TypeKey::of::<T>();
        self.resolve_shaped::<Option<Arc<T>>>(Request::new(
            ty,
            Query::ByType(ty),
            Validator::UniqueOptional,
            Collector::Unique,
        ))
    }

    /// Like [resolve_named](Resolver::resolve_named), but an absent
    /// component yields `Ok(None)`.
    pub fn try_resolve_named<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>, ResolutionError> {
        let ty = TypeKey::of::<T>();
        self.resolve_shaped::<Option<Arc<T>>>(Request::new(
            ty,
            Query::ByName(Name::new(name, ty)),
            Validator::UniqueOptional,
            Collector::Unique,
        ))
    }

    pub fn must_resolve<T: Send + Sync + 'static>(&self) -> Arc<T> {
        unwrap_resolved(self.resolve::<T>())
    }

    pub fn must_resolve_named<T: Send + Sync + 'static>(&self, name: &str) -> Arc<T> {
        unwrap_resolved(self.resolve_named::<T>(name))
    }

    pub fn must_resolve_all<T: Send + Sync + 'static>(&self) -> Vec<Arc<T>> {
        unwrap_resolved(self.resolve_all::<T>())
    }

    /// Resolves and runs all registered [Initializer]s, then all
    /// [FallibleInitializer]s, stopping at the first failure.
    pub fn initialize(&self) -> Result<(), BoxError> {
        let initializers = self.resolve_all::<Initializer>()?;
        let fallible = self.resolve_all::<FallibleInitializer>()?;

        for initializer in &initializers {
            initializer.run();
        }
        for initializer in &fallible {
            initializer.run()?;
        }

        Ok(())
    }

    pub fn must_initialize(&self) {
        if let Err(err) = self.initialize() {
            error!(%err, "failed to initialize");
            panic!("failed to initialize: {err}");
        }
    }

    /// Closes every stored component exposing a close hook, joining their
    /// failures. Also drains the store, dropping the cached components.
    pub fn close(&self) -> Result<(), CloseError> {
        self.store.close_all()
    }

    /// Human-readable dump of registered providers and stored components.
    pub fn describe(&self) -> String {
        let providers = self.providers.all();
        let provider_lines = providers
            .iter()
            .map(|provider| {
                let names = provider.list_providable_names().iter().join(", ");
                let description = provider.description();
                let description = if description.is_empty() {
                    "<no description>".to_string()
                } else {
                    description
                };
                format!(
                    "- [priority {}] {description}: {names}",
                    provider.priority()
                )
            })
            .join("\n");

        let stored_lines = self
            .store
            .names()
            .iter()
            .map(ToString::to_string)
            .sorted()
            .join("\n- ");
        let stored_lines = if stored_lines.is_empty() {
            "<none>".to_string()
        } else {
            format!("- {stored_lines}")
        };

        format!("providers:\n{provider_lines}\nstored components:\n{stored_lines}")
    }

    pub(crate) fn providers(&self) -> &SortedCowList<ProviderPtr> {
        &self.providers
    }

    pub(crate) fn store(&self) -> &ComponentStore {
        &self.store
    }

    fn resolve_shaped<S: Injectable>(&self, request: Request) -> Result<S, ResolutionError> {
        let mut tracker = Tracker::new();
        let resolved = self.resolve_request(&request, &mut tracker)?;
        S::extract(resolved)
    }

    pub(crate) fn resolve_request(
        &self,
        request: &Request,
        tracker: &mut Tracker,
    ) -> Result<ResolvedValue, ResolutionError> {
        let results = request.query().find(self);
        request.validator().validate(request.query(), &results)?;
        request.collector().collect(self, results, tracker)
    }

    /// Constructs the component for `name` through `provider`, applying its
    /// decorator chain and caching the result. Exactly one construction
    /// happens per name: concurrent resolutions serialize on the per-name
    /// mutex and re-check the store before building.
    pub(crate) fn provide_using(
        &self,
        provider: &ProviderPtr,
        name: &Name,
        tracker: &mut Tracker,
    ) -> Result<ComponentValue, ResolutionError> {
        tracker.push(name)?;

        let lock = self.locks.lock_for(name);
        let guard = lock.lock();

        if let Some(existing) = self.store.get(name) {
            drop(guard);
            tracker.pop();
            return Ok(existing);
        }

        let result = self.construct(provider, name, tracker);
        drop(guard);
        if result.is_ok() {
            self.locks.release(name);
        }
        tracker.pop();

        result
    }

    fn construct(
        &self,
        provider: &ProviderPtr,
        name: &Name,
        tracker: &mut Tracker,
    ) -> Result<ComponentValue, ResolutionError> {
        debug!(component = %name, "constructing component");

        let constructed = self.invoke_provider(provider, name, tracker)?;
        let mut current = constructed.value;

        let decorators = self
            .decorators
            .get(name)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(decorators) = decorators {
            for decorator in decorators.all().iter() {
                let dependencies =
                    self.resolve_dependencies(decorator.dependencies(), name, tracker)?;
                current = decorator.decorate(current, dependencies)?;
            }
        }

        self.store.put(
            name.clone(),
            StoredComponent {
                value: current.clone(),
                close: constructed.close,
            },
        );

        Ok(current)
    }

    fn invoke_provider(
        &self,
        provider: &ProviderPtr,
        name: &Name,
        tracker: &mut Tracker,
    ) -> Result<Constructed, ResolutionError> {
        let dependencies = self.resolve_dependencies(provider.dependencies(), name, tracker)?;
        provider.provide(name, dependencies)
    }

    /// Resolves each request with its own tracker branch, so sibling
    /// sub-resolutions do not observe each other's descents while a true
    /// cycle through the shared ancestors is still detected.
    fn resolve_dependencies(
        &self,
        requests: Vec<Request>,
        name: &Name,
        tracker: &Tracker,
    ) -> Result<Vec<ResolvedValue>, ResolutionError> {
        let mut dependencies = Vec::with_capacity(requests.len());
        for request in &requests {
            let mut branch = tracker.branch();
            let value = self.resolve_request(request, &mut branch).map_err(|err| {
                ResolutionError::Dependency {
                    request: request.to_string(),
                    name: name.clone(),
                    source: Box::new(err),
                }
            })?;
            dependencies.push(value);
        }
        Ok(dependencies)
    }

    fn conditions_hold(&self, options: &Options) -> Result<bool, RegistrationError> {
        for condition in &options.conditions {
            let referent = self
                .try_resolve_named::<String>(condition.component())
                .map_err(|err| RegistrationError::Condition {
                    component: condition.component().to_string(),
                    source: Box::new(err),
                })?;

            let holds = match referent {
                Some(value) => condition.operator.holds(value.as_str(), &condition.value),
                None => false,
            };
            if !holds {
                debug!(%condition, "condition does not hold");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn unwrap_resolved<T>(resolved: Result<T, ResolutionError>) -> T {
    match resolved {
        Ok(value) => value,
        Err(err) => {
            error!(%err, "failed to resolve");
            panic!("failed to resolve: {err}");
        }
    }
}

struct SelfProvider {
    resolver: Weak<Resolver>,
}

impl Provider for SelfProvider {
    fn can_provide(&self, name: &Name) -> bool {
        name.name() == RESOLVER_COMPONENT_NAME
            && match_type(name.ty(), TypeKey::of::<Resolver>())
    }

    fn provide(
        &self,
        name: &Name,
        _dependencies: Vec<ResolvedValue>,
    ) -> Result<Constructed, ResolutionError> {
        let resolver = self
            .resolver
            .upgrade()
            .ok_or_else(|| ResolutionError::Factory {
                name: name.clone(),
                source: "the resolver was dropped".into(),
            })?;
        Ok(Constructed::new(resolver))
    }

    fn dependencies(&self) -> Vec<Request> {
        Vec::new()
    }

    fn list_providable_names(&self) -> Vec<Name> {
        vec![Name::of::<Resolver>(RESOLVER_COMPONENT_NAME)]
    }

    fn priority(&self) -> i32 {
        0
    }

    fn description(&self) -> String {
        "the resolver itself, available for dynamic look-ups".to_string()
    }
}
