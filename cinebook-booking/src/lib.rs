pub mod availability;
pub mod checkout;
pub mod models;
pub mod repository;
pub mod review;
pub mod service;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testutil;

pub use availability::AvailabilityService;
pub use checkout::{CheckoutSession, MockPaymentProvider, PaymentOrchestrator};
pub use models::{Booking, BookingState, Payment, PaymentState, Review, Voucher};
pub use repository::BookingStore;
pub use review::ReviewService;
pub use service::BookingService;
pub use sweeper::{ExpirationSweeper, SweepOutcome};
