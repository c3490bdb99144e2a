pub mod config;
pub mod verification;

pub use config::*;
pub use verification::*;
