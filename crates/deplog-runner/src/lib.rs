//! Runs the per-variant pipeline and fans it out across a package's extras.

pub mod config;
pub mod doctor;
pub mod pipeline;
pub mod plan;
pub mod publisher;
pub mod scheduler;
pub mod summary;

pub use config::*;
pub use doctor::doctor;
pub use pipeline::*;
pub use plan::*;
pub use publisher::*;
pub use scheduler::*;
pub use summary::*;
