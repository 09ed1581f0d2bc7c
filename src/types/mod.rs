//! Data types shared across the grid engine.

mod geometry;
mod state;
mod value;

pub use geometry::*;
pub use state::*;
pub use value::*;
