pub mod build;
pub mod chart_ops;
pub mod dates;
pub mod flatten;
pub mod step_ops;
