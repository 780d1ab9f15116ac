use armature::{
    closeable, fallible, static_value, BoxError, Closeable, EnvProvider, FallibleInitializer,
    Inject, Initializer, Options, Resolver, When, RESOLVER_COMPONENT_NAME,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct TestService {
    name: String,
}

#[derive(Debug)]
struct TestRepository {
    data: String,
}

#[derive(Debug)]
struct TestController {
    service: Arc<TestService>,
    repo: Arc<TestRepository>,
}

fn new_test_service() -> TestService {
    TestService {
        name: "test-service".to_string(),
    }
}

fn new_test_repository() -> TestRepository {
    TestRepository {
        data: "test-data".to_string(),
    }
}

fn new_test_controller(service: Arc<TestService>, repo: Arc<TestRepository>) -> TestController {
    TestController { service, repo }
}

#[test]
fn should_return_the_same_instance_on_multiple_resolves() {
    let resolver = Resolver::new();
    resolver
        .register(new_test_service, Options::default())
        .unwrap();

    let first = resolver.resolve::<TestService>().unwrap();
    let second = resolver.resolve::<TestService>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn should_fail_when_no_provider_is_registered() {
    let resolver = Resolver::new();

    let err = resolver.resolve::<TestService>().unwrap_err();
    assert!(err.to_string().contains("no providers found"));
}

#[test]
fn should_fail_when_the_factory_returns_an_error() {
    let resolver = Resolver::new();
    resolver
        .register(
            fallible(|| -> Result<TestService, BoxError> {
                Err("provider intentionally failed".into())
            }),
            Options::default(),
        )
        .unwrap();

    let err = resolver.resolve::<TestService>().unwrap_err();
    assert!(err.to_string().contains("provider intentionally failed"));
}

#[test]
fn should_fail_when_a_dependency_cannot_be_resolved() {
    let resolver = Resolver::new();
    resolver
        .register(new_test_controller, Options::default())
        .unwrap();

    let err = resolver.resolve::<TestController>().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("failed to resolve dependency"));
    assert!(message.contains("no providers found"));
}

#[test]
fn should_fail_when_multiple_providers_claim_the_same_type() {
    let resolver = Resolver::new();
    for name in ["first", "second"] {
        resolver
            .register(new_test_service, Options::default().named(name))
            .unwrap();
    }

    let err = resolver.resolve::<TestService>().unwrap_err();
    assert!(err.to_string().contains("multiple providers found"));
}

#[test]
fn should_resolve_all_components_of_a_type() {
    let resolver = Resolver::new();
    resolver
        .register(
            || TestService {
                name: "test-service-1".to_string(),
            },
            Options::default().named("first"),
        )
        .unwrap();
    resolver
        .register(
            || TestService {
                name: "test-service-2".to_string(),
            },
            Options::default().named("second"),
        )
        .unwrap();

    let mut names: Vec<String> = resolver
        .resolve_all::<TestService>()
        .unwrap()
        .iter()
        .map(|service| service.name.clone())
        .collect();
    names.sort();

    assert_eq!(names, ["test-service-1", "test-service-2"]);
}

#[test]
fn should_resolve_all_with_no_matches_as_an_empty_list() {
    let resolver = Resolver::new();
    assert!(resolver.resolve_all::<TestService>().unwrap().is_empty());
}

#[test]
fn should_resolve_a_transitive_dependency_graph() {
    //       A
    //      / \
    //     B   C
    //      \ /
    //       D
    let resolver = Resolver::new();
    let d_invocations = Arc::new(AtomicUsize::new(0));

    resolver
        .register(
            |b: Arc<String>, c: Arc<String>| format!("A({b},{c})"),
            Options::default()
                .named("A")
                .dependencies([Inject::named("B"), Inject::named("C")]),
        )
        .unwrap();
    resolver
        .register(
            |d: Arc<String>| format!("B({d})"),
            Options::default()
                .named("B")
                .dependencies([Inject::named("D")]),
        )
        .unwrap();
    resolver
        .register(
            |d: Arc<String>| format!("C({d})"),
            Options::default()
                .named("C")
                .dependencies([Inject::named("D")]),
        )
        .unwrap();
    let counted = Arc::clone(&d_invocations);
    resolver
        .register(
            move || {
                counted.fetch_add(1, Ordering::SeqCst);
                "D".to_string()
            },
            Options::default().named("D"),
        )
        .unwrap();

    let value = resolver.resolve_named::<String>("A").unwrap();

    assert_eq!(*value, "A(B(D),C(D))");
    assert_eq!(d_invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn should_not_care_about_registration_order() {
    let resolver = Resolver::new();
    resolver
        .register(new_test_controller, Options::default())
        .unwrap();
    resolver
        .register(new_test_service, Options::default())
        .unwrap();
    resolver
        .register(new_test_repository, Options::default())
        .unwrap();

    let controller = resolver.resolve::<TestController>().unwrap();
    assert_eq!(controller.service.name, "test-service");
    assert_eq!(controller.repo.data, "test-data");
}

#[test]
fn should_detect_circular_dependencies() {
    let resolver = Resolver::new();
    resolver
        .register(
            |_repo: Arc<TestRepository>| TestService {
                name: "circular-a".to_string(),
            },
            Options::default()
                .named("A")
                .dependencies([Inject::named("B")]),
        )
        .unwrap();
    resolver
        .register(
            |_service: Arc<TestService>| TestRepository {
                data: "circular-b".to_string(),
            },
            Options::default()
                .named("B")
                .dependencies([Inject::named("A")]),
        )
        .unwrap();

    let err = resolver.resolve::<TestService>().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("dependency cycle detected"));
    assert!(message.contains("A"));
    assert!(message.contains("B"));
}

struct NameSupplier {
    name: String,
}

fn supplier(name: &str) -> impl Fn() -> NameSupplier + Send + Sync + 'static {
    let name = name.to_string();
    move || NameSupplier { name: name.clone() }
}

#[test]
fn should_prefer_the_highest_priority_provider() {
    let resolver = Resolver::new();
    resolver
        .register(supplier("Peyrard"), Options::default().named("lastName"))
        .unwrap();
    resolver
        .register(
            supplier("Arshinov"),
            Options::default().named("lastName").priority(100),
        )
        .unwrap();
    resolver
        .register(
            supplier("Waldo"),
            Options::default().named("lastName").priority(10),
        )
        .unwrap();

    assert_eq!(resolver.resolve::<NameSupplier>().unwrap().name, "Arshinov");
    assert_eq!(
        resolver
            .resolve_named::<NameSupplier>("lastName")
            .unwrap()
            .name,
        "Arshinov"
    );

    let all = resolver.resolve_all::<NameSupplier>().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Arshinov");
}

#[test]
fn should_prefer_the_first_registered_among_equal_priorities() {
    let resolver = Resolver::new();
    resolver
        .register(supplier("first"), Options::default().named("lastName"))
        .unwrap();
    resolver
        .register(supplier("second"), Options::default().named("lastName"))
        .unwrap();

    assert_eq!(resolver.resolve::<NameSupplier>().unwrap().name, "first");
}

#[test]
fn should_resolve_named_dependencies_positionally() {
    struct Complex {
        foo: String,
        answer: i32,
        bar: String,
    }

    let resolver = Resolver::new();
    resolver
        .register(
            |foo: Arc<String>, answer: Arc<i32>, bar: Arc<String>| Complex {
                foo: (*foo).clone(),
                answer: *answer,
                bar: (*bar).clone(),
            },
            Options::default().named("complex").dependencies([
                Inject::named("myFoo"),
                Inject::auto(),
                Inject::named("myBar"),
            ]),
        )
        .unwrap();
    resolver
        .register(
            static_value("this is the foo string".to_string()),
            Options::default().named("myFoo"),
        )
        .unwrap();
    resolver
        .register(
            static_value("this is the bar string".to_string()),
            Options::default().named("myBar"),
        )
        .unwrap();
    resolver
        .register(static_value(42), Options::default().named("answer"))
        .unwrap();

    let complex = resolver.resolve::<Complex>().unwrap();
    assert_eq!(complex.foo, "this is the foo string");
    assert_eq!(complex.answer, 42);
    assert_eq!(complex.bar, "this is the bar string");
}

#[test]
fn should_collect_multiple_dependencies_as_a_slice() {
    struct TokenHolder {
        tokens: Vec<Arc<String>>,
    }

    let resolver = Resolver::new();
    resolver
        .register(
            |tokens: Vec<Arc<String>>| TokenHolder { tokens },
            Options::default()
                .named("holder")
                .dependencies([Inject::multiple()]),
        )
        .unwrap();
    resolver
        .register(
            static_value("foo token".to_string()),
            Options::default().named("myFoo"),
        )
        .unwrap();
    resolver
        .register(
            static_value("bar token".to_string()),
            Options::default().named("myBar"),
        )
        .unwrap();
    resolver
        .register(static_value(42), Options::default().named("answer"))
        .unwrap();

    let holder = resolver.resolve::<TokenHolder>().unwrap();
    let mut tokens: Vec<&str> = holder.tokens.iter().map(|t| t.as_str()).collect();
    tokens.sort();
    assert_eq!(tokens, ["bar token", "foo token"]);
}

#[test]
fn should_collect_multiple_dependencies_as_a_map() {
    struct TokenHolder {
        tokens: HashMap<String, Arc<String>>,
    }

    let resolver = Resolver::new();
    resolver
        .register(
            |tokens: HashMap<String, Arc<String>>| TokenHolder { tokens },
            Options::default()
                .named("holder")
                .dependencies([Inject::multiple()]),
        )
        .unwrap();
    resolver
        .register(
            static_value("foo".to_string()),
            Options::default().named("myFoo"),
        )
        .unwrap();
    resolver
        .register(
            static_value("bar".to_string()),
            Options::default().named("myBar"),
        )
        .unwrap();
    resolver
        .register(static_value(42), Options::default().named("answer"))
        .unwrap();

    let holder = resolver.resolve::<TokenHolder>().unwrap();
    assert_eq!(holder.tokens.len(), 2);
    assert_eq!(holder.tokens["myFoo"].as_str(), "foo");
    assert_eq!(holder.tokens["myBar"].as_str(), "bar");
}

#[test]
fn should_treat_a_registered_collection_as_a_regular_component() {
    struct TokenHolder {
        tokens: Arc<Vec<String>>,
    }

    let resolver = Resolver::new();
    resolver
        .register(
            |tokens: Arc<Vec<String>>| TokenHolder { tokens },
            Options::default().named("holder"),
        )
        .unwrap();
    resolver
        .register(
            || vec![
                "hello".to_string(),
                "Augustin".to_string(),
                "how are you?".to_string(),
            ],
            Options::default().named("some strings"),
        )
        .unwrap();

    let holder = resolver.resolve::<TokenHolder>().unwrap();
    assert_eq!(holder.tokens.len(), 3);
    assert_eq!(holder.tokens[0], "hello");
}

#[test]
fn should_skip_missing_optional_dependencies() {
    let resolver = Resolver::new();
    resolver
        .register(
            static_value("bar".to_string()),
            Options::default().named("bar"),
        )
        .unwrap();
    resolver
        .register(
            |foo: Option<Arc<String>>, bar: Option<Arc<String>>| {
                let foo = foo.map(|v| (*v).clone()).unwrap_or_default();
                let bar = bar.map(|v| (*v).clone()).unwrap_or_default();
                format!("{foo}{bar}")
            },
            Options::default().named("foobar").dependencies([
                Inject::named("foo").optional(),
                Inject::named("bar").optional(),
            ]),
        )
        .unwrap();

    let value = resolver.resolve_named::<String>("foobar").unwrap();
    assert_eq!(*value, "bar");
}

#[test]
fn should_try_resolve_to_none_when_absent() {
    let resolver = Resolver::new();
    assert!(resolver.try_resolve::<TestService>().unwrap().is_none());
}

#[test]
fn should_try_resolve_to_some_when_present() {
    let resolver = Resolver::new();
    resolver
        .register(new_test_service, Options::default())
        .unwrap();

    let service = resolver.try_resolve::<TestService>().unwrap().unwrap();
    assert_eq!(service.name, "test-service");
}

#[test]
fn should_surface_factory_errors_through_try_resolve() {
    let resolver = Resolver::new();
    resolver
        .register(
            fallible(|| -> Result<TestService, BoxError> {
                Err("provider intentionally failed".into())
            }),
            Options::default(),
        )
        .unwrap();

    let err = resolver.try_resolve::<TestService>().unwrap_err();
    assert!(err.to_string().contains("provider intentionally failed"));
}

#[test]
fn should_return_the_same_singleton_through_try_resolve() {
    let resolver = Resolver::new();
    resolver
        .register(new_test_service, Options::default())
        .unwrap();

    let resolved = resolver.resolve::<TestService>().unwrap();
    let tried = resolver.try_resolve::<TestService>().unwrap().unwrap();
    assert!(Arc::ptr_eq(&resolved, &tried));
}

#[test]
fn should_inject_the_resolver_itself() {
    let resolver = Resolver::new();
    resolver
        .register(
            fallible(|r: Arc<Resolver>| -> Result<TestService, BoxError> {
                let name = r.resolve_named::<String>("str.foo")?;
                Ok(TestService {
                    name: (*name).clone(),
                })
            }),
            Options::default().named("dynamic"),
        )
        .unwrap();
    resolver
        .register(
            static_value("hello world".to_string()),
            Options::default().named("str.foo"),
        )
        .unwrap();

    let service = resolver.resolve::<TestService>().unwrap();
    assert_eq!(service.name, "hello world");
}

#[test]
fn should_register_conditionally_when_the_condition_holds() {
    let resolver = Resolver::new();
    resolver
        .register(
            static_value("My App [PROD MODE]".to_string()),
            Options::default().named("short_description"),
        )
        .unwrap();
    resolver
        .register(
            static_value("dev".to_string()),
            Options::default().named("APP_ENV"),
        )
        .unwrap();

    resolver
        .register(
            static_value("My App [DEV MODE]".to_string()),
            Options::default()
                .named("short_description")
                .priority(100)
                .when(When::component("APP_ENV").equals("dev")),
        )
        .unwrap();

    let value = resolver
        .resolve_named::<String>("short_description")
        .unwrap();
    assert_eq!(*value, "My App [DEV MODE]");
}

#[test]
fn should_skip_registration_when_the_condition_does_not_hold() {
    let resolver = Resolver::new();
    resolver
        .register(
            static_value("My App [PROD MODE]".to_string()),
            Options::default().named("short_description"),
        )
        .unwrap();
    resolver
        .register(
            static_value("production".to_string()),
            Options::default().named("APP_ENV"),
        )
        .unwrap();

    resolver
        .register(
            static_value("My App [DEV MODE]".to_string()),
            Options::default()
                .named("short_description")
                .priority(100)
                .when(When::component("APP_ENV").not_equals("production")),
        )
        .unwrap();

    let value = resolver
        .resolve_named::<String>("short_description")
        .unwrap();
    assert_eq!(*value, "My App [PROD MODE]");
}

#[test]
fn should_skip_registration_when_the_condition_referent_is_missing() {
    let resolver = Resolver::new();
    resolver
        .register(
            static_value("fallback".to_string()),
            Options::default().named("greeting"),
        )
        .unwrap();
    resolver
        .register(
            static_value("conditional".to_string()),
            Options::default()
                .named("greeting")
                .priority(100)
                .when(When::component("MISSING_FLAG").equals("on")),
        )
        .unwrap();

    assert_eq!(*resolver.resolve_named::<String>("greeting").unwrap(), "fallback");
}

#[test]
fn should_chain_must_register() {
    let resolver = Resolver::new();
    resolver
        .must_register(new_test_service, Options::default())
        .must_register(new_test_repository, Options::default())
        .must_register(new_test_controller, Options::default());

    let controller = resolver.must_resolve::<TestController>();
    assert_eq!(controller.service.name, "test-service");
}

#[test]
#[should_panic(expected = "failed to register")]
fn should_panic_in_must_register_on_invalid_registrations() {
    let resolver = Resolver::new();
    resolver.must_register(
        |_ignored: Arc<String>| 0_i32,
        Options::default().dependencies([Inject::multiple()]),
    );
}

struct CloseCounting {
    closed: Arc<AtomicUsize>,
}

impl Closeable for CloseCounting {
    fn close(&self) -> Result<(), BoxError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn should_close_only_instantiated_components() {
    let closed = Arc::new(AtomicUsize::new(0));
    let resolver = Resolver::new();

    for name in ["a", "b", "c"] {
        let closed = Arc::clone(&closed);
        resolver
            .register(
                closeable(move || CloseCounting {
                    closed: Arc::clone(&closed),
                }),
                Options::default().named(name),
            )
            .unwrap();
    }

    resolver.resolve_named::<CloseCounting>("a").unwrap();
    resolver.resolve_named::<CloseCounting>("b").unwrap();

    resolver.close().unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[test]
fn should_close_cleanly_without_closeables() {
    let resolver = Resolver::new();
    resolver
        .register(new_test_service, Options::default())
        .unwrap();
    resolver.resolve::<TestService>().unwrap();

    assert!(resolver.close().is_ok());
}

#[test]
fn should_run_initializers_before_fallible_ones() {
    let resolver = Resolver::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["init1", "init2"] {
        let order = Arc::clone(&order);
        resolver
            .register(
                move || {
                    let order = Arc::clone(&order);
                    let label = name.to_string();
                    Initializer::new(move || order.lock().unwrap().push(label.clone()))
                },
                Options::default().named(name),
            )
            .unwrap();
    }
    let captured = Arc::clone(&order);
    resolver
        .register(
            move || {
                let order = Arc::clone(&captured);
                FallibleInitializer::new(move || {
                    order.lock().unwrap().push("fallible".to_string());
                    Ok(())
                })
            },
            Options::default().named("fallible init"),
        )
        .unwrap();

    resolver.initialize().unwrap();

    let order = order.lock().unwrap();
    assert_eq!(order.len(), 3);
    assert_eq!(order[2], "fallible");
    assert!(order[..2].contains(&"init1".to_string()));
    assert!(order[..2].contains(&"init2".to_string()));
}

#[test]
fn should_surface_the_first_fallible_initializer_error() {
    let resolver = Resolver::new();
    resolver
        .register(
            || FallibleInitializer::new(|| Err("boot failed".into())),
            Options::default().named("boot"),
        )
        .unwrap();

    let err = resolver.initialize().unwrap_err();
    assert!(err.to_string().contains("boot failed"));
}

#[test]
fn should_resolve_environment_variables_through_the_env_provider() {
    std::env::set_var("ARMATURE_IT_VAR", "from-environment");
    let resolver = Resolver::new();
    resolver
        .register(EnvProvider::new(), Options::default())
        .unwrap();

    let value = resolver.resolve_named::<String>("ARMATURE_IT_VAR").unwrap();
    assert_eq!(*value, "from-environment");
}

#[test]
fn should_describe_registered_providers_and_stored_components() {
    let resolver = Resolver::new();
    resolver
        .register(
            new_test_service,
            Options::default()
                .named("svc")
                .description("the test service"),
        )
        .unwrap();
    resolver.resolve::<TestService>().unwrap();

    let description = resolver.describe();
    assert!(description.contains("the test service"));
    assert!(description.contains("svc"));
    assert!(description.contains(RESOLVER_COMPONENT_NAME));
    assert!(description.contains("stored components:"));
}

#[test]
fn should_build_concurrent_singletons_exactly_once() {
    let resolver = Resolver::new();
    let build_count = Arc::new(AtomicUsize::new(0));

    let counted = Arc::clone(&build_count);
    resolver
        .register(
            move || {
                // keep the first builder busy long enough for the second
                // resolution to land on the per-name mutex
                std::thread::sleep(Duration::from_millis(50));
                let index = counted.fetch_add(1, Ordering::SeqCst) + 1;
                format!("service-{index}")
            },
            Options::default().named("myService"),
        )
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let results: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                let barrier = Arc::clone(&barrier);
                scope.spawn(move || {
                    barrier.wait();
                    (*resolver.resolve_named::<String>("myService").unwrap()).clone()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(results, ["service-1", "service-1"]);
    assert_eq!(build_count.load(Ordering::SeqCst), 1);
}

#[test]
fn should_allow_concurrent_registration_and_resolution() {
    let resolver = Resolver::new();
    let target = "foobar-5";

    let registrar = Arc::clone(&resolver);
    let handle = std::thread::spawn(move || {
        for index in 1..=20 {
            let value = format!("foobar-{index}");
            registrar
                .register(
                    static_value(value.clone()),
                    Options::default().named(value),
                )
                .unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }
    });

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut found = None;
    while Instant::now() < deadline {
        if let Some(value) = resolver.try_resolve_named::<String>(target).unwrap() {
            found = Some((*value).clone());
            break;
        }
    }
    handle.join().unwrap();

    assert_eq!(found.as_deref(), Some(target));
}
