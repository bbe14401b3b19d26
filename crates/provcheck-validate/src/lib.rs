//! Cross-validation of provenance query results against ground truth.
//!
//! [`TruthLoader`] reads the per-tool `summary.json` reference data into a
//! [`TruthTable`] keyed by `(tool, key parameter)`. [`CrossValidator`] maps a
//! [`ResultTable`](provcheck_query::ResultTable) onto the same keys and checks
//! that both cover the same runs with values within tolerance. With several
//! provenance documents, each is held to the truth of the tools it mentions and
//! [`CrossValidator::check_coverage`] checks that every tool is covered somewhere.
//!
//! [`FixedParameterFilter`] scopes both sides to the same subset of runs (by
//! default, linear elements).

mod truth;
mod validator;

pub use truth::{
    numeric, FixedParameterFilter, RunSummary, TruthEntry, TruthError, TruthKey, TruthLoader,
    TruthTable, DEFAULT_KEY_PARAMETER, DEFAULT_METRIC, DEFAULT_TRUTH_FILE,
};
pub use validator::{normalize_tool, CrossValidator, ValidationError, DEFAULT_TOLERANCE};
