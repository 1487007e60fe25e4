use sprig::application::Application;
use sprig::config::ApplicationConfig;
use sprig::injector::Autowired;
use sprig::{bean_interface, injectable, Bean};

// this is a trait we would like to use in our bean
#[injectable]
trait Greeter {
    fn greet(&self) -> String;
}

// this is a service implementing the above trait; since it has no explicit name, it can be looked up
// by the fully-qualified name of every registered interface
#[derive(Bean, Default)]
#[service]
struct EnglishGreeter;

#[bean_interface]
impl Greeter for EnglishGreeter {
    fn greet(&self) -> String {
        "Hello world!".to_string()
    }
}

// this is a component with a dependency, available under its fully-qualified name
#[derive(Bean, Default)]
#[component]
struct Welcome {
    // dependencies are injected after all beans are created
    #[autowired]
    greeter: Autowired<dyn Greeter + Send + Sync>,
}

// explicitly named beans are looked up by their name
#[derive(Bean)]
#[component(name = "motd")]
#[bean(constructor = "MessageOfTheDay::load")]
struct MessageOfTheDay {
    message: String,
}

impl MessageOfTheDay {
    // custom constructors can fail - such beans are skipped and reported
    fn load() -> Result<Self, std::env::VarError> {
        Ok(Self {
            message: std::env::var("USER").map(|user| format!("Welcome back, {user}"))?,
        })
    }
}

//noinspection DuplicatedCode
// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let application = Application::start(ApplicationConfig::new(module_path!()))
        .expect("error starting application");

    let welcome = application
        .container()
        .bean_typed::<Welcome>(concat!(module_path!(), "::Welcome"))
        .expect("missing Welcome bean");

    // prints "Hello world!"
    println!("{}", welcome.greeter.greet());

    match application.container().bean_typed::<MessageOfTheDay>("motd") {
        Some(motd) => println!("{}", motd.message),
        None => println!("Startup diagnostics: {:?}", application.diagnostics()),
    }
}
