//! Data models

pub mod location;
pub mod office;
pub mod attendance;

pub use location::*;
pub use office::*;
pub use attendance::*;
