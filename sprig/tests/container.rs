use sprig::application::Application;
use sprig::config::ApplicationConfig;
use sprig::error::{Diagnostic, InjectionWarningReason, InstantiationError};
use sprig::injector::Autowired;
use std::sync::Arc;

mod beans {
    use sprig::injector::Autowired;
    use sprig::{bean_interface, injectable, Bean};
    use std::io::{Error, ErrorKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[injectable]
    pub trait Counter {
        fn increment(&self) -> usize;
    }

    #[injectable]
    pub trait Reader {
        fn value(&self) -> usize;
    }

    #[derive(Bean, Default)]
    #[service]
    pub struct CountingService {
        count: AtomicUsize,
    }

    #[bean_interface]
    impl Counter for CountingService {
        fn increment(&self) -> usize {
            self.count.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    #[bean_interface]
    impl Reader for CountingService {
        fn value(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    #[derive(Bean, Default)]
    #[service(name = "namedService")]
    pub struct NamedService;

    #[derive(Bean, Default)]
    #[service]
    pub struct LonelyService;

    #[derive(Bean, Default)]
    #[component]
    pub struct User {
        #[autowired]
        pub counter: Autowired<dyn Counter + Send + Sync>,
        #[autowired(name = "namedService")]
        pub named: Autowired<NamedService>,
    }

    #[derive(Bean, Default)]
    #[component(name = "left")]
    pub struct Left {
        #[autowired(name = "right")]
        pub right: Autowired<Right>,
    }

    #[derive(Bean, Default)]
    #[component(name = "right")]
    pub struct Right {
        #[autowired(name = "left")]
        pub left: Autowired<Left>,
    }

    #[derive(Bean, Default)]
    #[component]
    pub struct Lacking {
        #[autowired(name = "missing")]
        pub missing: Autowired<NamedService>,
    }

    #[derive(Bean)]
    #[component]
    #[bean(constructor = "Broken::connect")]
    pub struct Broken;

    impl Broken {
        fn connect() -> Result<Self, Error> {
            Err(Error::new(ErrorKind::ConnectionRefused, "no database"))
        }
    }

    #[derive(Bean, Default)]
    pub struct Unmarked;
}

use beans::*;

fn application() -> Application {
    Application::start(
        ApplicationConfig::new(concat!(module_path!(), "::beans")).with_tracing_logger(false),
    )
    .unwrap()
}

#[test]
fn should_register_marked_types_under_derived_keys() {
    let application = application();

    assert_eq!(
        application.container().keys(),
        vec![
            "container::beans::Counter",
            "container::beans::Lacking",
            "container::beans::Reader",
            "container::beans::User",
            "left",
            "namedService",
            "right",
        ]
    );
    assert!(application
        .container()
        .bean_typed::<NamedService>("namedService")
        .is_some());
}

#[test]
fn should_share_service_between_interfaces() {
    let application = application();
    let container = application.container();

    let counter = container
        .bean_typed::<dyn Counter + Send + Sync>("container::beans::Counter")
        .unwrap();
    let reader = container
        .bean_typed::<dyn Reader + Send + Sync>("container::beans::Reader")
        .unwrap();

    assert_eq!(counter.increment(), 1);
    assert_eq!(reader.value(), 1);
    assert!(container
        .bean("container::beans::Counter")
        .unwrap()
        .is_same_instance(container.bean("container::beans::Reader").unwrap()));
}

#[test]
fn should_inject_registered_instances() {
    let application = application();
    let container = application.container();

    let user = container
        .bean_typed::<User>("container::beans::User")
        .unwrap();
    let named = container.bean_typed::<NamedService>("namedService").unwrap();
    let reader = container
        .bean_typed::<dyn Reader + Send + Sync>("container::beans::Reader")
        .unwrap();

    assert!(Arc::ptr_eq(Autowired::get(&user.named).unwrap(), &named));

    user.counter.increment();
    user.counter.increment();
    assert_eq!(reader.value(), 2);
}

#[test]
fn should_resolve_circular_dependencies() {
    let application = application();
    let container = application.container();

    let left = container.bean_typed::<Left>("left").unwrap();
    let right = container.bean_typed::<Right>("right").unwrap();

    assert!(Arc::ptr_eq(Autowired::get(&left.right).unwrap(), &right));
    assert!(Arc::ptr_eq(Autowired::get(&right.left).unwrap(), &left));
    assert!(Arc::ptr_eq(Autowired::get(&left.right.left).unwrap(), &left));
}

#[test]
fn should_report_startup_problems() {
    let application = application();
    let diagnostics = application.diagnostics();

    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        Diagnostic::Instantiation(InstantiationError::ConstructorError { type_name, .. })
            if type_name == "container::beans::Broken"
    )));
    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        Diagnostic::OrphanService(name) if name == "container::beans::LonelyService"
    )));
    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        Diagnostic::Injection(warning)
            if warning.owner == "container::beans::Lacking"
                && warning.reason == InjectionWarningReason::MissingBean("missing".to_string())
    )));
    assert_eq!(diagnostics.len(), 3);

    let lacking = application
        .container()
        .bean_typed::<Lacking>("container::beans::Lacking")
        .unwrap();
    assert!(!Autowired::is_injected(&lacking.missing));
}

#[test]
fn should_skip_unmarked_types() {
    let application = application();

    assert!(!application.container().contains("container::beans::Unmarked"));
    assert!(application
        .container()
        .beans()
        .iter()
        .all(|bean| bean.descriptor().name != "container::beans::Unmarked"));
}
