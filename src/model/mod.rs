pub mod config;
pub mod flat;
pub mod step;
pub mod workspace;

pub use config::*;
pub use flat::*;
pub use step::*;
pub use workspace::*;
