//! Application services. Each one is generic over the [`Store`](crate::store::Store)
//! backend and is cheap to clone into request handlers.

pub mod cart;
pub mod checkout;
pub mod events;
pub mod orders;
pub mod pricing;
pub mod receipts;

pub use cart::CartService;
pub use checkout::{CheckoutOutcome, CheckoutPhase, CheckoutRequest, CheckoutService};
pub use events::EventPublisher;
pub use orders::{OrderDetails, OrderService};
pub use pricing::{PricedCart, PricingResolver};
pub use receipts::{ReceiptStorage, ReceiptUpload, MAX_RECEIPT_BYTES};
