//! Error types used by signals and their handlers.
//!
//! This module defines two main error enums:
//!
//! - [`SignalError`]: errors raised to the caller of a signal operation
//!   (connect, disconnect, fire) or of instance construction.
//! - [`HandlerError`]: errors raised by an individual handler invocation;
//!   stored in that handler's slot of [`Results`](crate::Results).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.

use std::sync::Arc;

use thiserror::Error;

/// # Errors returned synchronously by signal operations.
///
/// These are configuration or call-site faults. They are never deferred into a
/// [`Results`](crate::Results) aggregate.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// The subscriber cannot be invoked with the signal's calling convention
    /// (dead weak handle, or declared for a signal with different argument/result types).
    #[error("invalid handler '{handler}': {reason}")]
    InvalidHandler {
        /// Handler name (or method name).
        handler: String,
        /// What made it unusable.
        reason: String,
    },

    /// A handler was declared against a signal name that neither the declaring
    /// class nor any of its ancestors defines.
    #[error("cannot find a signal named '{signal}' (declared in '{class}')")]
    UnknownSignal {
        /// Requested signal name.
        signal: String,
        /// Class where the lookup started.
        class: String,
    },

    /// A wrapper was asynchronous where the calling context required a synchronous result.
    #[error("wrapper for '{operation}' on signal {signal:?} returned a pending result in a synchronous call")]
    WrapperContract {
        /// Intercepted operation (`connect`, `disconnect` or `fire`).
        operation: &'static str,
        /// Signal name, if any.
        signal: Option<String>,
    },

    /// The signal's argument validator rejected the fire arguments.
    #[error("arguments rejected by validator of signal {signal:?}: {reason}")]
    Validation {
        /// Signal name, if any.
        signal: Option<String>,
        /// Validator message.
        reason: String,
    },
}

impl SignalError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use sigvisor::SignalError;
    ///
    /// let err = SignalError::UnknownSignal { signal: "click".into(), class: "Button".into() };
    /// assert_eq!(err.as_label(), "signal_unknown");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SignalError::InvalidHandler { .. } => "signal_invalid_handler",
            SignalError::UnknownSignal { .. } => "signal_unknown",
            SignalError::WrapperContract { .. } => "signal_wrapper_contract",
            SignalError::Validation { .. } => "signal_validation",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SignalError::InvalidHandler { handler, reason } => {
                format!("invalid handler {handler}: {reason}")
            }
            SignalError::UnknownSignal { signal, class } => {
                format!("unknown signal {signal} on {class}")
            }
            SignalError::WrapperContract { operation, signal } => {
                format!("async {operation} wrapper on {signal:?}")
            }
            SignalError::Validation { signal, reason } => {
                format!("validation on {signal:?}: {reason}")
            }
        }
    }

    pub(crate) fn invalid_handler(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        SignalError::InvalidHandler {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}

/// # Errors produced by a single handler invocation.
///
/// A failing handler only poisons its own slot: siblings keep running and the
/// failure surfaces when the slot is read or the aggregate is joined.
/// Cheap to clone so that every joiner observes the same failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("handler '{handler}' failed: {error}")]
    Failed {
        /// Handler name.
        handler: Arc<str>,
        /// The error the handler returned.
        error: Arc<anyhow::Error>,
    },

    /// The handler panicked; the panic was caught.
    #[error("handler '{handler}' panicked: {info}")]
    Panicked {
        /// Handler name.
        handler: Arc<str>,
        /// Panic payload rendered as text.
        info: String,
    },

    /// The pending computation was cancelled by the unit of work it was enlisted into.
    #[error("handler '{handler}' cancelled")]
    Cancelled {
        /// Handler name.
        handler: Arc<str>,
    },
}

impl HandlerError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use sigvisor::HandlerError;
    ///
    /// let err = HandlerError::Cancelled { handler: "audit".into() };
    /// assert_eq!(err.as_label(), "handler_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
            HandlerError::Cancelled { .. } => "handler_cancelled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Failed { error, .. } => format!("error: {error}"),
            HandlerError::Panicked { info, .. } => format!("panic: {info}"),
            HandlerError::Cancelled { .. } => "cancelled".to_string(),
        }
    }

    /// Name of the handler whose invocation failed.
    pub fn handler(&self) -> &str {
        match self {
            HandlerError::Failed { handler, .. }
            | HandlerError::Panicked { handler, .. }
            | HandlerError::Cancelled { handler } => handler,
        }
    }

    pub(crate) fn failed(handler: &Arc<str>, error: anyhow::Error) -> Self {
        HandlerError::Failed {
            handler: Arc::clone(handler),
            error: Arc::new(error),
        }
    }

    pub(crate) fn panicked(handler: &Arc<str>, payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        HandlerError::Panicked {
            handler: Arc::clone(handler),
            info,
        }
    }
}
