mod positions_model;
mod positions_traits;

pub use positions_model::*;
pub use positions_traits::*;
