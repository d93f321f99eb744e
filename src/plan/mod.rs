//! Output planning
//!
//! Path computation and the skip-newer policy. Both run in the
//! single-threaded planning phase, before anything is dispatched.

pub mod paths;
pub mod skip;

pub use paths::PathPlanner;
pub use skip::should_skip;
