//! Turns captured `pip freeze` / `pipdeptree` text into a dependency log.
//!
//! The package under test is removed from its own freeze listing and shown
//! version-less in the tree, so a new release of the package does not by
//! itself change the log.

pub mod extract;
pub mod log;
pub mod self_package;

pub use extract::*;
pub use log::*;
pub use self_package::*;
