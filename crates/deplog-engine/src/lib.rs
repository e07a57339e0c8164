//! Container engine plumbing: image builds, sandboxed runs, scratch directories.

pub mod cli;
pub mod engine;
pub mod scratch;
pub mod script;

pub use cli::*;
pub use engine::*;
pub use scratch::*;
pub use script::*;
