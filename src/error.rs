// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Construction-time error taxonomy (§7). Distinct from [`crate::unknown_tracker`]'s
//! semantic-imprecision records: these are the only errors that make
//! analysis construction fail outright.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unrecognized context-sensitivity policy: {0:?}")]
    InvalidContextPolicy(String),
    #[error("max_iterations must be > 0, got {0}")]
    NonPositiveMaxIterations(i64),
    #[error("max_points_to_size must be > 0 when set, got {0}")]
    NonPositiveMaxPointsToSize(i64),
    #[error("max_import_depth must be >= -1, got {0}")]
    InvalidMaxImportDepth(i64),
    #[error("invalid log level: {0:?}")]
    InvalidLogLevel(String),
}
