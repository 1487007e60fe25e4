use config::ConfigError;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Shared pointer to an arbitrary error, usually coming from user code.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Errors which make startup impossible.
#[derive(Error, Clone, Debug)]
pub enum ConfigurationError {
    #[error("Cannot read settings source '{location}': {source}")]
    UnreadableSettings {
        location: String,
        #[source]
        source: Arc<ConfigError>,
    },
    #[error("Missing required property: {0}")]
    MissingProperty(String),
    #[error("Cannot resolve scan package: {0}")]
    UnresolvedScanPackage(String),
}

/// A discovered type which could not be turned into a bean.
#[derive(Error, Clone, Debug)]
pub enum InstantiationError {
    #[error("Type {0} is not registered in the type catalog")]
    UnknownType(String),
    #[error("Error constructing {type_name}: {source}")]
    ConstructorError {
        type_name: String,
        #[source]
        source: ErrorPtr,
    },
    #[error("Constructor of {type_name} panicked: {message}")]
    ConstructorPanic { type_name: String, message: String },
}

/// Failure to set a single injected field.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum InjectionError {
    #[error("Bean of type {0} cannot own the injected field")]
    IncompatibleOwner(String),
    #[error("Bean {key} cannot be assigned to a field of type {target}")]
    IncompatibleDependency { key: String, target: String },
}

/// A dependency which could not be resolved during injection. The field is left empty.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("Cannot inject {owner}.{field} - {reason}")]
pub struct InjectionWarning {
    pub owner: String,
    pub field: String,
    pub reason: InjectionWarningReason,
}

#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum InjectionWarningReason {
    #[error("no bean named {0}")]
    MissingBean(String),
    #[error("{0}")]
    Rejected(InjectionError),
}

/// Two handler methods mapped to the same path. The later one wins.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("Route {path} mapped to {previous} is replaced by {replacement}")]
pub struct RouteCollisionWarning {
    pub path: String,
    pub previous: String,
    pub replacement: String,
}

/// Errors raised while binding arguments or invoking a handler for a single request.
#[derive(Error, Clone, Debug)]
pub enum DispatchError {
    #[error("Cannot find handler bean: {0}")]
    MissingBean(String),
    #[error("Bean cannot be used as {0}")]
    IncompatibleBean(&'static str),
    #[error("Argument {index} is not a {expected} argument")]
    ArgumentMismatch {
        index: usize,
        expected: &'static str,
    },
    #[error("Handler {method} failed")]
    Handler {
        method: String,
        #[source]
        source: ErrorPtr,
    },
    #[error("Handler {method} panicked: {message}")]
    Panic { method: String, message: String },
}

/// Non-fatal events collected while starting up. Each one isolates a single bean, field or route.
#[derive(Error, Clone, Debug)]
pub enum Diagnostic {
    #[error(transparent)]
    Instantiation(#[from] InstantiationError),
    #[error(transparent)]
    Injection(#[from] InjectionWarning),
    #[error(transparent)]
    RouteCollision(#[from] RouteCollisionWarning),
    #[error("Bean key {key} is already taken - {type_name} is not registered under it")]
    DuplicateBeanKey { key: String, type_name: String },
    #[error("Service {0} has no name and implements no interface - it cannot be looked up")]
    OrphanService(String),
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
