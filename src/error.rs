// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the CompGeom engine
//!
//! Geometry defects (open meshes, degenerate facets, ambiguous rays) are never
//! errors: they are repaired or discarded and counted in
//! [`Diagnostics`](crate::engine::Diagnostics). Only caller mistakes and
//! cancellation surface here.

use thiserror::Error;

/// Errors returned by the engine entry points.
#[derive(Debug, Error)]
pub enum CompGeomError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {details}")]
    InvalidConfig {
        /// Which setting is wrong and why.
        details: String,
    },

    /// An input part cannot be used at all.
    #[error("invalid input part '{part}': {details}")]
    InvalidInput {
        /// Name of the offending part.
        part: String,
        /// Description of the problem.
        details: String,
    },

    /// The run was cancelled through a [`CancelToken`](crate::engine::CancelToken).
    #[error("operation cancelled")]
    Cancelled,
}

impl CompGeomError {
    pub(crate) fn config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }
}

/// Result type for engine operations.
pub type CompGeomResult<T> = Result<T, CompGeomError>;
