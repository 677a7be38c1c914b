mod model;
mod repository;

pub use model::ConnectionDB;
pub use repository::ConnectionRepository;
