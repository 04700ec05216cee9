//! Error types for the IoC container

use std::fmt;

use thiserror::Error;

use crate::builder::BuilderState;
use crate::key::Discriminator;

/// Result type alias for IoC operations
pub type DiResult<T> = Result<T, DiError>;

/// A constructor that was skipped during auto-wiring, with the reason it was skipped
#[derive(Debug)]
pub struct ConstructorFailure {
    /// Constructor signature, e.g. `UserService::new(Logger, Database)`
    pub constructor: String,
    /// Why one of its parameters could not be resolved
    pub error: DiError,
}

impl fmt::Display for ConstructorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.constructor, self.error)
    }
}

/// Errors that can occur during registration or resolution
#[derive(Error, Debug)]
pub enum DiError {
    /// The (type, key) pair already has a factory
    #[error("Service already registered: {service_type}{}", describe_key(.key))]
    AlreadyRegistered {
        service_type: &'static str,
        key: Option<Discriminator>,
    },

    /// No registration is compatible with the request
    #[error("Service not registered: {service_type}{}", describe_key(.key))]
    NotRegistered {
        service_type: &'static str,
        key: Option<Discriminator>,
    },

    /// More than one registration is assignable to the requested type
    #[error(
        "Service is ambiguous: {service_type}{} matches {}",
        describe_key(.key),
        .candidates.join(", ")
    )]
    Ambiguous {
        service_type: &'static str,
        key: Option<Discriminator>,
        candidates: Vec<&'static str>,
    },

    /// A factory re-entered an entry that is still being constructed
    #[error("Circular dependency detected: {path}")]
    CycleDetected {
        service_type: &'static str,
        key: Option<Discriminator>,
        path: String,
    },

    /// A builder operation was called outside its legal lifecycle state
    #[error("Invalid builder state: cannot {operation} while {state}")]
    InvalidBuilderState {
        operation: &'static str,
        state: BuilderState,
    },

    /// Every constructor of an auto-wired type had an unresolvable parameter
    #[error(
        "Can't find any appropriate constructor for {service_type}{}: {}",
        describe_key(.key),
        describe_failures(.failures)
    )]
    NoAppropriateConstructor {
        service_type: &'static str,
        key: Option<Discriminator>,
        failures: Vec<ConstructorFailure>,
    },

    /// A specific constructor parameter could not be resolved
    #[error(
        "Can't resolve parameter {index} of type {parameter_type} in {constructor} for {service_type}{}",
        describe_key(.key)
    )]
    ParameterNotResolved {
        service_type: &'static str,
        key: Option<Discriminator>,
        constructor: String,
        index: usize,
        parameter_type: &'static str,
        #[source]
        source: Box<DiError>,
    },

    /// An auto-wired type was registered without any constructor
    #[error("{service_type} should define at least one constructor")]
    NoConstructors {
        service_type: &'static str,
        key: Option<Discriminator>,
    },

    /// The session exceeded the configured resolution depth
    #[error("Resolution depth limit {limit} exceeded at {service_type}{}", describe_key(.key))]
    DepthExceeded {
        service_type: &'static str,
        key: Option<Discriminator>,
        limit: usize,
    },

    /// A constructor pulled an argument of the wrong type or past the end of its arguments
    #[error("Argument {index} of {constructor} is not a {expected}")]
    ArgumentMismatch {
        constructor: String,
        index: usize,
        expected: &'static str,
    },

    /// A user factory failed to produce its instance
    #[error("Failed to create service: {service_type}: {reason}")]
    ServiceCreationFailed {
        service_type: &'static str,
        reason: String,
    },

    /// Configuration error
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DiError {
    /// Convenience constructor for factories that fail on their own terms
    pub fn creation_failed<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        DiError::ServiceCreationFailed {
            service_type: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// The requested type the error is about, if any
    pub fn service_type(&self) -> Option<&'static str> {
        match self {
            DiError::AlreadyRegistered { service_type, .. }
            | DiError::NotRegistered { service_type, .. }
            | DiError::Ambiguous { service_type, .. }
            | DiError::CycleDetected { service_type, .. }
            | DiError::NoAppropriateConstructor { service_type, .. }
            | DiError::ParameterNotResolved { service_type, .. }
            | DiError::NoConstructors { service_type, .. }
            | DiError::DepthExceeded { service_type, .. }
            | DiError::ServiceCreationFailed { service_type, .. } => Some(*service_type),
            _ => None,
        }
    }

    /// The discriminator the error is about, if any
    pub fn key(&self) -> Option<&Discriminator> {
        match self {
            DiError::AlreadyRegistered { key, .. }
            | DiError::NotRegistered { key, .. }
            | DiError::Ambiguous { key, .. }
            | DiError::CycleDetected { key, .. }
            | DiError::NoAppropriateConstructor { key, .. }
            | DiError::ParameterNotResolved { key, .. }
            | DiError::NoConstructors { key, .. }
            | DiError::DepthExceeded { key, .. } => key.as_ref(),
            _ => None,
        }
    }
}

fn describe_key(key: &Option<Discriminator>) -> String {
    match key {
        Some(key) => format!(" (key: {})", key),
        None => String::new(),
    }
}

fn describe_failures(failures: &[ConstructorFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
