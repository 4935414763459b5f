pub mod error;
pub mod invoice;
pub mod notify;
pub mod payment;

pub use error::CoreError;
