//! Consent gate between planning and apply
//!
//! Kept free of I/O: the interactive prompt is passed in as a callback so the
//! decision can be exercised without a terminal.

use crate::planner::Plan;

/// Whether the applier may run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Apply the plan
    Proceed,
    /// Leave the cluster untouched
    Abstain,
}

/// Decide whether to apply a plan.
///
/// An empty plan never proceeds. Pre-authorization (`--apply`) proceeds
/// without asking. Without a terminal nobody can answer, so the run
/// abstains. Otherwise `confirm` is asked and its answer is final.
pub fn decide<F>(plan: &Plan, tty_available: bool, preauthorized: bool, confirm: F) -> Decision
where
    F: FnOnce(&Plan) -> bool,
{
    if plan.is_empty() {
        return Decision::Abstain;
    }
    if preauthorized {
        return Decision::Proceed;
    }
    if !tty_available {
        return Decision::Abstain;
    }
    if confirm(plan) {
        Decision::Proceed
    } else {
        Decision::Abstain
    }
}
