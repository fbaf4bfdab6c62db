//! Data shapes crossing the repository boundary.

pub mod entity;
pub mod params;
