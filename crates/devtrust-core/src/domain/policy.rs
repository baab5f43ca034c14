//! Combinators that collapse ordered probe results into one verdict.
//!
//! Two evaluation strategies exist:
//!
//! - [`first_match`] – for the emulator and root categories.  Results are
//!   pulled lazily from an iterator and evaluation stops at the first
//!   triggered result, so probes after it are never run.
//! - [`join_active`] – for the developer-options category.  Every result is
//!   consumed and the details of all triggered results are joined.
//!
//! Declared probe order is the tie-break in both cases.  Callers fix it at
//! construction time and never reorder it, so the reason reported for a given
//! device state is deterministic.

use super::verdict::{DetectionCategory, DetectionVerdict, SignalResult};

/// Separator between details in a non-short-circuiting reason.
pub const REASON_SEPARATOR: &str = ", ";

/// How a policy turns its probe results into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Stop at the first triggered probe.
    FirstMatch,
    /// Run every probe and join the details of all triggered ones.
    AllActive,
}

impl EvaluationMode {
    /// Mode used by each detection category.
    pub fn for_category(category: DetectionCategory) -> Self {
        match category {
            DetectionCategory::Emulator | DetectionCategory::Root => EvaluationMode::FirstMatch,
            DetectionCategory::DeveloperOptions => EvaluationMode::AllActive,
        }
    }
}

/// Returns the first triggered result, consuming the iterator only up to it.
pub fn first_match<I>(results: I) -> Option<SignalResult>
where
    I: IntoIterator<Item = SignalResult>,
{
    results.into_iter().find(|r| r.triggered)
}

/// Joins the details of every triggered result with [`REASON_SEPARATOR`].
///
/// Returns `None` when nothing triggered.  A single triggered result yields its
/// detail unchanged (no stray separator).
pub fn join_active<I>(results: I) -> Option<String>
where
    I: IntoIterator<Item = SignalResult>,
{
    let active: Vec<String> = results
        .into_iter()
        .filter(|r| r.triggered)
        .map(|r| r.detail)
        .collect();
    if active.is_empty() {
        None
    } else {
        Some(active.join(REASON_SEPARATOR))
    }
}

/// Builds a verdict from an optional reason.
pub fn verdict_from(category: DetectionCategory, reason: Option<String>) -> DetectionVerdict {
    match reason {
        Some(r) => DetectionVerdict::detected(category, r),
        None => DetectionVerdict::clear(category),
    }
}

/// Evaluates `results` according to the category's [`EvaluationMode`].
pub fn evaluate<I>(category: DetectionCategory, results: I) -> DetectionVerdict
where
    I: IntoIterator<Item = SignalResult>,
{
    let reason = match EvaluationMode::for_category(category) {
        EvaluationMode::FirstMatch => first_match(results).map(|r| r.detail),
        EvaluationMode::AllActive => join_active(results),
    };
    verdict_from(category, reason)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_first_match_stops_at_first_trigger() {
        // Arrange
        let evaluated = Cell::new(0);
        let outcomes = [false, true, true, false];

        // Act
        let hit = first_match(outcomes.iter().enumerate().map(|(i, &t)| {
            evaluated.set(evaluated.get() + 1);
            if t {
                SignalResult::triggered(format!("probe {i}"))
            } else {
                SignalResult::clear()
            }
        }));

        // Assert
        assert_eq!(hit.unwrap().detail, "probe 1");
        assert_eq!(evaluated.get(), 2, "probes after the first hit must not run");
    }

    #[test]
    fn test_first_match_returns_none_on_exhaustion() {
        let hit = first_match(vec![SignalResult::clear(), SignalResult::clear()]);
        assert!(hit.is_none());
    }

    #[test]
    fn test_join_active_single_result_has_no_separator() {
        let reason = join_active(vec![
            SignalResult::triggered("USB debugging enabled"),
            SignalResult::clear(),
        ]);
        assert_eq!(reason.as_deref(), Some("USB debugging enabled"));
    }

    #[test]
    fn test_join_active_joins_in_declared_order() {
        let reason = join_active(vec![
            SignalResult::triggered("a"),
            SignalResult::triggered("b"),
        ]);
        assert_eq!(reason.as_deref(), Some("a, b"));
    }

    #[test]
    fn test_join_active_runs_every_probe() {
        let evaluated = Cell::new(0);
        let _ = join_active((0..3).map(|_| {
            evaluated.set(evaluated.get() + 1);
            SignalResult::triggered("x")
        }));
        assert_eq!(evaluated.get(), 3);
    }

    #[test]
    fn test_evaluate_clear_uses_sentinel() {
        let v = evaluate(DetectionCategory::Emulator, vec![SignalResult::clear()]);
        assert!(!v.detected);
        assert_eq!(v.reason, DetectionCategory::Emulator.clear_reason());
    }

    #[test]
    fn test_developer_options_mode_is_all_active() {
        assert_eq!(
            EvaluationMode::for_category(DetectionCategory::DeveloperOptions),
            EvaluationMode::AllActive
        );
        assert_eq!(
            EvaluationMode::for_category(DetectionCategory::Root),
            EvaluationMode::FirstMatch
        );
    }
}
