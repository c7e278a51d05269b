//! Team entity.

pub mod model;

pub use model::Team;
