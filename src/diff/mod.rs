//! Diff engine - Comparison logic and plan generation

mod compare;
mod plan;

pub use compare::{
    compare_states, compare_states_with, is_unchanged, CompareMode, MTIME_TOLERANCE_MS,
};
pub use plan::{generate_sync_plan, DiffPlan, PlanStats};
