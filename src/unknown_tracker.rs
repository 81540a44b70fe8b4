// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Unknown/imprecision tracker (C12). See
//! `original_source/pythonstan/analysis/pointer/kcfa/unknown_tracker.py`.

use std::collections::HashMap;

use serde::Serialize;

/// A categorized event where the analysis had to fall back to an
/// over-approximation rather than precise information.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKind {
    /// A call's callee points-to set was empty.
    CalleeEmpty,
    /// A call's callee points-to set contained a non-callable object.
    CalleeNonCallable,
    /// A function reference could not be found in the scope registry.
    FunctionNotInRegistry,
    /// A call/import could not be resolved due to a missing dependency.
    MissingDependencies,
    /// An attribute access could not be statically resolved to a field.
    DynamicAttribute,
    /// A field load resolved to an empty points-to set.
    FieldLoadEmpty,
    /// An import statement's module could not be resolved.
    ImportNotFound,
    /// Context selection/allocation context construction failed.
    AllocContextFailure,
    /// Translating an IR body raised an error; treated as no constraints.
    TranslationError,
    /// A call was missing an expected argument.
    MissingArgument,
    /// A points-to set exceeded `max_points_to_size` and was widened.
    PointsToSetWidened,
    /// C3 linearization had no consistent merge for a class's bases.
    MroMergeFailed,
}

impl UnknownKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UnknownKind::CalleeEmpty => "callee_empty",
            UnknownKind::CalleeNonCallable => "callee_non_callable",
            UnknownKind::FunctionNotInRegistry => "function_not_in_registry",
            UnknownKind::MissingDependencies => "missing_dependencies",
            UnknownKind::DynamicAttribute => "dynamic_attribute",
            UnknownKind::FieldLoadEmpty => "field_load_empty",
            UnknownKind::ImportNotFound => "import_not_found",
            UnknownKind::AllocContextFailure => "alloc_context_failure",
            UnknownKind::TranslationError => "translation_error",
            UnknownKind::MissingArgument => "missing_argument",
            UnknownKind::PointsToSetWidened => "points_to_set_widened",
            UnknownKind::MroMergeFailed => "mro_merge_failed",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UnknownRecord {
    pub kind: UnknownKind,
    pub location: String,
    pub message: String,
    pub context: Option<String>,
}

#[derive(Default)]
pub struct UnknownTracker {
    enabled: bool,
    log_details: bool,
    records: Vec<UnknownRecord>,
    counts_by_kind: HashMap<UnknownKind, usize>,
}

impl UnknownTracker {
    pub fn new(enabled: bool, log_details: bool) -> Self {
        UnknownTracker { enabled, log_details, records: Vec::new(), counts_by_kind: HashMap::new() }
    }

    pub fn record(&mut self, kind: UnknownKind, location: impl Into<String>, message: impl Into<String>, context: Option<String>) {
        if !self.enabled {
            return;
        }
        let location = location.into();
        let message = message.into();
        if self.log_details {
            log::info!("unknown[{}] at {}: {}", kind.as_str(), location, message);
        }
        *self.counts_by_kind.entry(kind).or_insert(0) += 1;
        self.records.push(UnknownRecord { kind, location, message, context });
    }

    pub fn get_summary(&self) -> HashMap<String, usize> {
        let mut summary = HashMap::new();
        summary.insert("total_unknowns".to_string(), self.records.len());
        for (kind, count) in &self.counts_by_kind {
            summary.insert(format!("unknown_{}", kind.as_str()), *count);
        }
        summary
    }

    pub fn get_detailed_report(&self) -> &[UnknownRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tracker_records_nothing() {
        let mut t = UnknownTracker::new(false, false);
        t.record(UnknownKind::CalleeEmpty, "loc", "msg", None);
        assert!(t.get_detailed_report().is_empty());
        assert_eq!(t.get_summary()["total_unknowns"], 0);
    }

    #[test]
    fn enabled_tracker_counts_by_kind() {
        let mut t = UnknownTracker::new(true, false);
        t.record(UnknownKind::CalleeEmpty, "a", "first", None);
        t.record(UnknownKind::CalleeEmpty, "b", "second", None);
        t.record(UnknownKind::MroMergeFailed, "c", "third", None);
        let summary = t.get_summary();
        assert_eq!(summary["total_unknowns"], 3);
        assert_eq!(summary["unknown_callee_empty"], 2);
        assert_eq!(summary["unknown_mro_merge_failed"], 1);
        assert_eq!(t.get_detailed_report().len(), 3);
    }

    #[test]
    fn as_str_round_trips_every_variant_to_a_distinct_name() {
        let kinds = [
            UnknownKind::CalleeEmpty,
            UnknownKind::CalleeNonCallable,
            UnknownKind::FunctionNotInRegistry,
            UnknownKind::MissingDependencies,
            UnknownKind::DynamicAttribute,
            UnknownKind::FieldLoadEmpty,
            UnknownKind::ImportNotFound,
            UnknownKind::AllocContextFailure,
            UnknownKind::TranslationError,
            UnknownKind::MissingArgument,
            UnknownKind::PointsToSetWidened,
            UnknownKind::MroMergeFailed,
        ];
        let mut seen = std::collections::HashSet::new();
        for kind in kinds {
            assert!(seen.insert(kind.as_str()), "duplicate as_str for {kind:?}");
        }
    }
}
