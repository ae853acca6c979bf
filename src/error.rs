// Gateway Telemetry - Errors
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Error conditions surfaced by the collectors.
//!
//! Timeouts are deliberately absent: a command that overruns its deadline is
//! killed and its partial output is handed back as a normal result.

use std::io;

/// Result type used by collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Caller-supplied value rejected before any external process was started.
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidInput {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("I/O error on {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("background task failed: {0}")]
    Task(String),
}

impl CollectorError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this is a validation failure rather than a collection failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}
