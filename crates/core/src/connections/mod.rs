mod connections_model;
mod connections_traits;

pub use connections_model::*;
pub use connections_traits::*;
