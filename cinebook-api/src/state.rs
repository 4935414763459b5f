use std::sync::Arc;

use cinebook_booking::{
    AvailabilityService, BookingService, BookingStore, PaymentOrchestrator, ReviewService,
};
use cinebook_catalog::CatalogStore;
use cinebook_core::invoice::InvoiceRenderer;
use cinebook_core::notify::Notifier;
use cinebook_core::payment::PaymentProvider;

#[derive(Clone)]
pub struct AppState {
    pub availability: Arc<AvailabilityService>,
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentOrchestrator>,
    pub reviews: Arc<ReviewService>,
    pub invoices: Arc<dyn InvoiceRenderer>,
}

impl AppState {
    /// Wire the services over a store and the external collaborators.
    pub fn build(
        catalog: Arc<dyn CatalogStore>,
        bookings: Arc<dyn BookingStore>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        invoices: Arc<dyn InvoiceRenderer>,
        currency: String,
    ) -> Self {
        Self {
            availability: Arc::new(AvailabilityService::new(catalog.clone(), bookings.clone())),
            bookings: Arc::new(BookingService::new(catalog, bookings.clone())),
            payments: Arc::new(PaymentOrchestrator::new(
                bookings.clone(),
                provider,
                notifier,
                currency,
            )),
            reviews: Arc::new(ReviewService::new(bookings)),
            invoices,
        }
    }
}
