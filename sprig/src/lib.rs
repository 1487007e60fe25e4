//! Minimal inversion-of-control container with marker-driven request dispatching.
//!
//! Application types declare their intent with markers - a type is a *controller*, a *service* or
//! a *component*, a field should be *autowired*, a method handles a *request mapping*. On startup,
//! the [Application](application::Application) scans a configured module path for marked types,
//! creates exactly one instance of each, populates autowired fields and maps controller methods to
//! request paths. The resulting [Dispatcher](dispatcher::Dispatcher) then routes requests coming
//! from any transport implementing the narrow [http] boundary.
//!
//! ```
//! use sprig::application::Application;
//! use sprig::config::ApplicationConfig;
//! use sprig::http::{BufferedResponse, SimpleRequest};
//!
//! mod web {
//!     use sprig::{routes, Bean};
//!
//!     #[derive(Bean, Default)]
//!     #[controller]
//!     #[request_mapping("/demo")]
//!     pub struct DemoController;
//!
//!     #[routes]
//!     impl DemoController {
//!         #[request_mapping("/query")]
//!         pub fn query(&self, name: String) -> String {
//!             format!("Hello {name}")
//!         }
//!     }
//! }
//!
//! let application = Application::start(
//!     ApplicationConfig::new(module_path!()).with_tracing_logger(false),
//! )
//! .unwrap();
//!
//! let mut response = BufferedResponse::default();
//! application.dispatcher().handle(
//!     &SimpleRequest::new("/demo/query").with_parameter("name", "Ada"),
//!     &mut response,
//! );
//!
//! assert_eq!(response.body(), "Hello Ada");
//! ```
//!
//! ### Features
//!
//! * `derive` - re-export the marker macros from `sprig-derive` (enabled by default)

pub mod application;
pub mod config;
pub mod container;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod injector;
pub mod route;
pub mod scanner;

#[cfg(feature = "derive")]
pub use sprig_derive::{bean_interface, injectable, routes, Bean};
