//! Safe SQL builder: identifiers from entity descriptions only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
