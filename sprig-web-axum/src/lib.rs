//! HTTP transport for the [sprig] dispatcher based on axum.
//!
//! Every `GET` and `POST` request, on any path, is turned into a [sprig::http::Request] and handed
//! to the dispatcher of a started [Application](sprig::application::Application). The outcome
//! determines the status: `200` for handled requests, `404` for unmapped paths, `500` for failed
//! handlers and `503` when the application has no routes at all. Other methods get `405`.
//!
//! ### Simple usage example
//!
//! ```no_run
//! use sprig::application::Application;
//! use sprig::config::ApplicationConfig;
//! use sprig::{routes, Bean};
//! use sprig_web_axum::config::ServerConfig;
//! use sprig_web_axum::server::Server;
//!
//! #[derive(Bean, Default)]
//! #[controller]
//! pub struct HelloController;
//!
//! #[routes]
//! impl HelloController {
//!     // responds to http://localhost:8080/hello?name=world
//!     #[request_mapping("/hello")]
//!     pub fn hello(&self, name: String) -> String {
//!         format!("Hello {name}!")
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let application =
//!         Application::start(ApplicationConfig::new(module_path!())).expect("invalid config");
//!
//!     Server::for_application(&application, &ServerConfig::default())
//!         .expect("unable to bind server")
//!         .run()
//!         .await
//!         .expect("error running server");
//! }
//! ```

pub mod config;
pub mod router;
pub mod server;

pub use axum;
