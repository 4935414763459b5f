pub mod models;
pub mod pricing;
pub mod repository;

pub use models::{Hall, Movie, Seat, SeatCategory, Session};
pub use repository::CatalogStore;
