use sprig::application::Application;
use sprig::config::ApplicationConfig;
use sprig_web_axum::config::ServerConfig;
use sprig_web_axum::server::Server;

mod service {
    use sprig::{bean_interface, injectable, Bean};

    // services are looked up by the interfaces they implement, so we need an injectable trait
    #[injectable]
    pub trait DemoService {
        fn get(&self, name: &str) -> String;
    }

    // a service without an explicit name is registered under each of its interfaces - here, under
    // the fully-qualified name of DemoService
    #[derive(Bean, Default)]
    #[service]
    pub struct DemoServiceImpl;

    #[bean_interface]
    impl DemoService for DemoServiceImpl {
        fn get(&self, name: &str) -> String {
            format!("My name is {name}")
        }
    }
}

mod model {
    use sprig::Bean;
    use std::sync::Mutex;

    // beans are shared between concurrently handled requests, so any mutable state needs to be
    // synchronized
    #[derive(Bean, Default)]
    #[component]
    pub struct User {
        name: Mutex<String>,
    }

    impl User {
        pub fn set_name(&self, name: &str) {
            if let Ok(mut current) = self.name.lock() {
                *current = name.to_string();
            }
        }

        pub fn name(&self) -> String {
            self.name
                .lock()
                .map(|name| name.clone())
                .unwrap_or_default()
        }
    }
}

mod web {
    use crate::model::User;
    use crate::service::DemoService;
    use sprig::http::Response;
    use sprig::injector::Autowired;
    use sprig::{routes, Bean};

    #[derive(Bean, Default)]
    #[controller]
    #[request_mapping("/demo")]
    pub struct DemoController {
        // injected by the fully-qualified name of the trait
        #[autowired]
        demo_service: Autowired<dyn DemoService + Send + Sync>,
        // components without a name are injected by their fully-qualified type name
        #[autowired]
        user: Autowired<User>,
    }

    #[routes]
    impl DemoController {
        // try: curl "http://localhost:8080/demo/query?name=Ada"
        #[request_mapping("/query")]
        pub fn query(&self, response: &mut dyn Response, name: String) {
            self.user.set_name(&name);
            response.write(&self.demo_service.get(&name));
        }

        // try: curl "http://localhost:8080/demo/user"
        #[request_mapping("/user")]
        pub fn user(&self) -> String {
            self.user.name()
        }
    }
}

//noinspection DuplicatedCode
// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
#[tokio::main]
async fn main() {
    // scan this example for beans; in a real application, the configuration would usually be read
    // from a settings file with ApplicationConfig::from_location()
    let application = Application::start(ApplicationConfig::new(module_path!()))
        .expect("error starting application");

    Server::for_application(&application, &ServerConfig::default())
        .expect("error binding server")
        .run()
        .await
        .expect("error running server");
}
