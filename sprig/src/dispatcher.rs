//! Per-request dispatching: path normalization, route lookup, argument binding and handler
//! invocation.
//!
//! Handler methods are registered with `#[routes]` and may declare, in any order:
//!
//! * `&dyn Request` - receives the inbound request,
//! * `&mut dyn Response` - receives the response handle,
//! * `String`, `&str` or `Option<String>` - receives the bound query value,
//! * anything else implementing [Default] - receives the default value.
//!
//! The bound query value is the same for all textual parameters: the *last* query parameter, with
//! multiple values joined by a comma. Parameter names are not taken into account.
//!
//! Handlers return `()`, `String`, `&str`, or a [Result] of those. Returned text is appended to
//! the response; errors and panics turn into a `500` response.

use crate::container::Container;
use crate::descriptor::{MethodDescriptor, ParameterKind};
use crate::error::{panic_message, DispatchError, ErrorPtr};
use crate::http::{QueryParameters, Request, Response};
use crate::route::{normalize, Route, RouteTable};
use derive_more::Constructor;
use itertools::Itertools;
use std::error::Error;
use std::iter;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Body written for unmatched paths.
pub const NOT_FOUND_BODY: &str = "404 Not Found!!!";

/// Prefix of the body written for failed dispatches.
pub const FAILURE_BODY_PREFIX: &str = "500 Exception,Details:\r\n";

/// Dispatcher lifecycle state.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DispatcherState {
    /// No routes - requests are dropped.
    Uninitialized,
    Ready,
}

/// Result of dispatching a single request.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DispatchOutcome {
    /// The dispatcher is not initialized and nothing was written.
    Dropped,
    NotFound,
    Handled,
    Failed,
}

/// Single positional handler argument.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Argument {
    Request,
    Response,
    Text(Option<String>),
    Default,
}

/// Arguments for a single handler call, together with the request and response they refer to.
pub struct Invocation<'a> {
    request: &'a dyn Request,
    response: &'a mut dyn Response,
    arguments: Vec<Argument>,
}

impl<'a> Invocation<'a> {
    pub fn new(
        request: &'a dyn Request,
        response: &'a mut dyn Response,
        arguments: Vec<Argument>,
    ) -> Self {
        Self {
            request,
            response,
            arguments,
        }
    }

    /// The request, if the argument at given position is a request argument.
    pub fn request_at(&self, index: usize) -> Result<&'a dyn Request, DispatchError> {
        match self.arguments.get(index) {
            Some(Argument::Request) => Ok(self.request),
            _ => Err(DispatchError::ArgumentMismatch {
                index,
                expected: "request",
            }),
        }
    }

    /// The response, if the argument at given position is a response argument.
    pub fn response_at(
        &mut self,
        index: usize,
    ) -> Result<&mut (dyn Response + 'a), DispatchError> {
        match self.arguments.get(index) {
            Some(Argument::Response) => Ok(&mut *self.response),
            _ => Err(DispatchError::ArgumentMismatch {
                index,
                expected: "response",
            }),
        }
    }

    /// The bound value, if the argument at given position is a textual argument.
    pub fn text_at(&self, index: usize) -> Result<Option<String>, DispatchError> {
        match self.arguments.get(index) {
            Some(Argument::Text(value)) => Ok(value.clone()),
            _ => Err(DispatchError::ArgumentMismatch {
                index,
                expected: "text",
            }),
        }
    }

    /// Checks if the argument at given position should be default-initialized.
    pub fn default_at(&self, index: usize) -> Result<(), DispatchError> {
        match self.arguments.get(index) {
            Some(Argument::Default) => Ok(()),
            _ => Err(DispatchError::ArgumentMismatch {
                index,
                expected: "default",
            }),
        }
    }

    /// The response handle, regardless of arguments.
    #[inline]
    pub fn response(&mut self) -> &mut (dyn Response + 'a) {
        &mut *self.response
    }
}

/// Values which can be returned from handlers.
pub trait HandlerOutput {
    fn write_into(self, response: &mut dyn Response) -> Result<(), ErrorPtr>;
}

impl HandlerOutput for () {
    #[inline]
    fn write_into(self, _response: &mut dyn Response) -> Result<(), ErrorPtr> {
        Ok(())
    }
}

impl HandlerOutput for String {
    #[inline]
    fn write_into(self, response: &mut dyn Response) -> Result<(), ErrorPtr> {
        response.write(&self);
        Ok(())
    }
}

impl HandlerOutput for &str {
    #[inline]
    fn write_into(self, response: &mut dyn Response) -> Result<(), ErrorPtr> {
        response.write(self);
        Ok(())
    }
}

impl<T: HandlerOutput, E: Error + Send + Sync + 'static> HandlerOutput for Result<T, E> {
    fn write_into(self, response: &mut dyn Response) -> Result<(), ErrorPtr> {
        self.map_err(|error| Arc::new(error) as ErrorPtr)
            .and_then(|output| output.write_into(response))
    }
}

/// Computes the value bound to every textual parameter: the last parameter in iteration order,
/// with its values joined like `[a, b]` and then stripped of brackets and of whitespace following
/// commas.
pub fn bind_text(parameters: &QueryParameters) -> Option<String> {
    parameters.iter().last().map(|(_, values)| {
        let joined = values.join(", ").replace(&['[', ']'][..], "");
        let mut result = String::with_capacity(joined.len());
        let mut after_comma = false;

        for c in joined.chars() {
            if !(after_comma && is_separator_whitespace(c)) {
                result.push(c);
            }

            after_comma = c == ',';
        }

        result
    })
}

// ascii whitespace, including vertical tab
fn is_separator_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Builds positional arguments for given handler.
pub fn bind_arguments(method: &MethodDescriptor, request: &dyn Request) -> Vec<Argument> {
    let text = bind_text(request.parameters());
    method
        .parameters
        .iter()
        .map(|kind| match kind {
            ParameterKind::Request => Argument::Request,
            ParameterKind::Response => Argument::Response,
            ParameterKind::Text => Argument::Text(text.clone()),
            ParameterKind::Other => Argument::Default,
        })
        .collect()
}

/// Renders an error and its sources as a frame list: `[error, source, source of source]`.
pub fn render_frames(error: &(dyn Error + 'static)) -> String {
    let frames = iter::successors(Some(error), |&error| error.source())
        .map(|error| error.to_string())
        .join(", ");

    format!("[{frames}]")
}

/// Routes requests to handler methods of beans. Shared read-only between concurrent requests.
#[derive(Constructor, Clone, Debug, Default)]
pub struct Dispatcher {
    container: Arc<Container>,
    routes: Arc<RouteTable>,
}

impl Dispatcher {
    #[inline]
    pub fn state(&self) -> DispatcherState {
        if self.routes.is_empty() {
            DispatcherState::Uninitialized
        } else {
            DispatcherState::Ready
        }
    }

    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }

    #[inline]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Handles a single request. Never panics because of a failing handler.
    pub fn handle(&self, request: &dyn Request, response: &mut dyn Response) -> DispatchOutcome {
        if self.state() == DispatcherState::Uninitialized {
            debug!("Dropping request for {} - no routes.", request.path());
            return DispatchOutcome::Dropped;
        }

        let path = self.resolve_path(request);
        let Some(route) = self.routes.route(&path) else {
            debug!("No route for {path}.");
            response.write(NOT_FOUND_BODY);
            return DispatchOutcome::NotFound;
        };

        match self.invoke(route, request, response) {
            Ok(()) => DispatchOutcome::Handled,
            Err(error) => {
                error!("Error dispatching {path}: {error}");
                response.write(&format!("{FAILURE_BODY_PREFIX}{}", render_frames(&error)));
                DispatchOutcome::Failed
            }
        }
    }

    fn resolve_path(&self, request: &dyn Request) -> String {
        let path = request.path();
        normalize(path.strip_prefix(request.context_path()).unwrap_or(path))
    }

    fn invoke(
        &self,
        route: &Route,
        request: &dyn Request,
        response: &mut dyn Response,
    ) -> Result<(), DispatchError> {
        let arguments = bind_arguments(&route.method, request);
        let bean = self
            .container
            .bean(&route.bean_key)
            .ok_or_else(|| DispatchError::MissingBean(route.bean_key.clone()))?;

        let mut invocation = Invocation::new(request, response, arguments);
        catch_unwind(AssertUnwindSafe(|| {
            (route.method.invoke)(&**bean.instance(), &mut invocation)
        }))
        .unwrap_or_else(|payload| {
            Err(DispatchError::Panic {
                method: route.handler_name(),
                message: panic_message(payload.as_ref()),
            })
        })
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::dispatcher::HandlerOutput;
    use crate::error::DispatchError;
    use crate::http::Response;

    /// Writes handler output, attributing errors to the handler.
    pub fn complete<O: HandlerOutput>(
        method: &str,
        output: O,
        response: &mut dyn Response,
    ) -> Result<(), DispatchError> {
        output
            .write_into(response)
            .map_err(|source| DispatchError::Handler {
                method: method.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::container::Container;
    use crate::descriptor::{
        BeanAnyPtr, InstantiationFailure, MethodDescriptor, ParameterKind, Role, RoleMarker,
        TypeCatalog,
    };
    use crate::dispatcher::{
        bind_arguments, bind_text, render_frames, Argument, DispatchOutcome, Dispatcher,
        DispatcherState, Invocation, FAILURE_BODY_PREFIX, NOT_FOUND_BODY,
    };
    use crate::error::DispatchError;
    use crate::http::{BufferedResponse, MockResponse, QueryParameters, SimpleRequest};
    use crate::route::RouteTable;
    use crate::test_support::descriptor;
    use mockall::predicate::*;
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Default)]
    struct EchoController;

    impl EchoController {
        fn echo(&self, response: &mut dyn crate::http::Response, name: String) {
            response.write(&format!("Hello {name}"));
        }
    }

    fn construct() -> Result<BeanAnyPtr, InstantiationFailure> {
        Ok(Arc::new(EchoController) as BeanAnyPtr)
    }

    fn invoke_echo(
        bean: &(dyn Any + Send + Sync),
        invocation: &mut Invocation<'_>,
    ) -> Result<(), DispatchError> {
        let target = bean
            .downcast_ref::<EchoController>()
            .ok_or(DispatchError::IncompatibleBean("EchoController"))?;
        let name = invocation.text_at(1)?.unwrap_or_default();
        target.echo(invocation.response_at(0)?, name);
        Ok(())
    }

    fn invoke_panicking(
        _bean: &(dyn Any + Send + Sync),
        _invocation: &mut Invocation<'_>,
    ) -> Result<(), DispatchError> {
        panic!("handler exploded");
    }

    fn method(name: &'static str, path: &'static str) -> MethodDescriptor {
        MethodDescriptor {
            name,
            path,
            declaring_type: "EchoController",
            parameters: vec![ParameterKind::Response, ParameterKind::Text],
            invoke: invoke_echo,
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut controller = descriptor("app::web::EchoController");
        controller.roles = vec![RoleMarker {
            role: Role::Controller,
            name: None,
        }];
        controller.request_mapping = Some("/demo");
        controller.constructor = construct;
        controller.methods = vec![
            method("echo", "/echo"),
            MethodDescriptor {
                invoke: invoke_panicking,
                ..method("explode", "/explode")
            },
        ];

        let catalog = TypeCatalog::new([controller]);
        let (container, _) = Container::build(&catalog, &["app::web::EchoController"]);
        let (routes, _) = RouteTable::build(&container);

        Dispatcher::new(Arc::new(container), Arc::new(routes))
    }

    #[test]
    fn should_bind_last_parameter() {
        let parameters: QueryParameters = [("first", "a"), ("second", "b"), ("second", "c")]
            .into_iter()
            .collect();
        assert_eq!(bind_text(&parameters), Some("b,c".to_string()));
        assert_eq!(bind_text(&QueryParameters::default()), None);
    }

    #[test]
    fn should_strip_brackets_and_spaces_after_commas() {
        let parameters: QueryParameters = [("name", "[a], b,  c")].into_iter().collect();
        assert_eq!(bind_text(&parameters), Some("a,b, c".to_string()));
    }

    #[test]
    fn should_keep_non_ascii_whitespace_after_commas() {
        let parameters: QueryParameters = [("name", "a,\u{a0}b,\u{0B}c,\td")].into_iter().collect();
        assert_eq!(bind_text(&parameters), Some("a,\u{a0}b,c,d".to_string()));
    }

    #[test]
    fn should_bind_same_value_to_all_textual_parameters() {
        let method = MethodDescriptor {
            parameters: vec![
                ParameterKind::Text,
                ParameterKind::Request,
                ParameterKind::Text,
                ParameterKind::Other,
                ParameterKind::Response,
            ],
            ..method("many", "/many")
        };
        let request = SimpleRequest::new("/")
            .with_parameter("a", "1")
            .with_parameter("b", "2");

        assert_eq!(
            bind_arguments(&method, &request),
            vec![
                Argument::Text(Some("2".to_string())),
                Argument::Request,
                Argument::Text(Some("2".to_string())),
                Argument::Default,
                Argument::Response,
            ]
        );
    }

    #[test]
    fn should_reject_mismatched_arguments() {
        let request = SimpleRequest::new("/");
        let mut response = BufferedResponse::default();
        let mut invocation = Invocation::new(
            &request,
            &mut response,
            vec![Argument::Request, Argument::Text(None)],
        );

        assert!(invocation.request_at(0).is_ok());
        assert!(invocation.text_at(1).is_ok());
        assert!(matches!(
            invocation.response_at(0),
            Err(DispatchError::ArgumentMismatch { index: 0, .. })
        ));
        assert!(invocation.default_at(5).is_err());
    }

    #[test]
    fn should_drop_requests_when_uninitialized() {
        let dispatcher = Dispatcher::default();
        let mut response = MockResponse::new();
        response.expect_write().times(0);

        assert_eq!(dispatcher.state(), DispatcherState::Uninitialized);
        assert_eq!(
            dispatcher.handle(&SimpleRequest::new("/demo/echo"), &mut response),
            DispatchOutcome::Dropped
        );
    }

    #[test]
    fn should_write_not_found() {
        let dispatcher = dispatcher();
        let mut response = MockResponse::new();
        response
            .expect_write()
            .with(eq(NOT_FOUND_BODY))
            .times(1)
            .return_const(());

        assert_eq!(dispatcher.state(), DispatcherState::Ready);
        assert_eq!(
            dispatcher.handle(&SimpleRequest::new("/demo/missing"), &mut response),
            DispatchOutcome::NotFound
        );
    }

    #[test]
    fn should_invoke_handler() {
        let dispatcher = dispatcher();
        let mut response = BufferedResponse::default();

        let outcome = dispatcher.handle(
            &SimpleRequest::new("/app//demo///echo")
                .with_context_path("/app")
                .with_parameter("name", "World"),
            &mut response,
        );

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(response.body(), "Hello World");
    }

    #[test]
    fn should_strip_context_path_with_trailing_separator() {
        let dispatcher = dispatcher();
        let mut response = BufferedResponse::default();

        let outcome = dispatcher.handle(
            &SimpleRequest::new("/app/demo/echo")
                .with_context_path("/app/")
                .with_parameter("name", "World"),
            &mut response,
        );

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(response.body(), "Hello World");
    }

    #[test]
    fn should_report_panicking_handler() {
        let dispatcher = dispatcher();
        let mut response = BufferedResponse::default();

        let outcome = dispatcher.handle(&SimpleRequest::new("/demo/explode"), &mut response);

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(response.body().starts_with(FAILURE_BODY_PREFIX));
        assert!(response.body().contains("handler exploded"));
    }

    #[test]
    fn should_render_error_chain() {
        let error = DispatchError::Handler {
            method: "A::b".to_string(),
            source: Arc::new(DispatchError::MissingBean("c".to_string())),
        };

        assert_eq!(
            render_frames(&error),
            "[Handler A::b failed, Cannot find handler bean: c]"
        );
    }
}
