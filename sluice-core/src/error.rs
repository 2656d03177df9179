// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for sluice pipelines
//!
//! Every stage, channel and terminal consumer reports failures through
//! [`SluiceError`]. The type is `Clone` because a single fault recorded on a
//! channel is handed to every reader of that channel.
//!
//! # Examples
//!
//! ```
//! use sluice_core::{Result, SluiceError};
//!
//! fn batch_size(size: usize) -> Result<usize> {
//!     if size == 0 {
//!         return Err(SluiceError::invalid_argument("size", "must be at least 1"));
//!     }
//!     Ok(size)
//! }
//!
//! assert!(batch_size(0).is_err());
//! ```

use std::any::Any;
use std::error::Error;
use std::sync::Arc;

/// Root error type for all sluice operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SluiceError {
    /// A stage or channel was configured with an unusable value
    ///
    /// Raised synchronously when the stage is created, never from inside a
    /// running pipeline.
    #[error("Invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument
        argument: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// A user callback (mapper, predicate source, action) returned an error
    ///
    /// The original error is kept as the source so callers can downcast it.
    #[error("Stage fault: {0}")]
    StageFault(#[source] Arc<dyn Error + Send + Sync>),

    /// A user callback panicked while a stage was running
    #[error("Stage callback panicked: {context}")]
    CallbackPanic {
        /// Panic payload, when it was a string
        context: String,
    },

    /// The channel no longer accepts writes
    ///
    /// Either it was completed, or every reader has been dropped.
    #[error("Channel closed")]
    ChannelClosed,

    /// The pipeline was cancelled through a [`CancellationToken`](crate::CancellationToken)
    #[error("Operation cancelled")]
    Cancelled,
}

impl SluiceError {
    /// Create an invalid argument error
    pub fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    /// Wrap an error produced by user code
    pub fn stage_fault(error: impl Error + Send + Sync + 'static) -> Self {
        Self::StageFault(Arc::new(error))
    }

    /// Build a [`SluiceError::CallbackPanic`] from a caught panic payload
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let context = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::CallbackPanic { context }
    }

    /// Returns `true` for errors that mean "downstream went away"
    ///
    /// Stages treat a closed output as a quiet stop, not as a fault.
    #[must_use]
    pub const fn is_channel_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed)
    }

    /// Returns the user error carried by a [`SluiceError::StageFault`], if any
    #[must_use]
    pub fn user_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            Self::StageFault(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

/// Specialized Result type for sluice operations
pub type Result<T> = std::result::Result<T, SluiceError>;

/// Conversion of arbitrary errors into [`SluiceError::StageFault`]
///
/// Implemented for every `std::error::Error + Send + Sync + 'static`, which
/// is what user callbacks are required to return. A [`SluiceError`] converts
/// to itself, so a callback can report cancellation or pass on an upstream
/// fault unchanged.
pub trait IntoSluiceError {
    /// Convert this error into a stage fault
    fn into_sluice_error(self) -> SluiceError;
}

impl<E: Error + Send + Sync + 'static> IntoSluiceError for E {
    fn into_sluice_error(self) -> SluiceError {
        if let Some(fault) = (&self as &dyn Any).downcast_ref::<SluiceError>() {
            return fault.clone();
        }
        SluiceError::stage_fault(self)
    }
}
