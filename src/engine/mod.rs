//! Execution engine for netform
//!
//! The engine orchestrates:
//! 1. Planning - compare manifest and state with the controller
//! 2. Diffing - show per-field changes
//! 3. Executing - apply changes in dependency order, saving state per step

pub mod differ;
pub mod executor;
pub mod lifecycle;
pub mod planner;

pub use executor::{ExecuteOptions, ExecuteSummary, Executor};
pub use planner::{Action, Plan, Planner};
