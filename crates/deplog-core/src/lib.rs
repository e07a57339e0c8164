pub mod error;
pub mod ids;
pub mod job;
pub mod policy;
pub mod variant;

pub use error::*;
pub use ids::*;
pub use job::*;
pub use policy::*;
pub use variant::*;
