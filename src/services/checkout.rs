//! Checkout orchestrator.
//!
//! Turns a customer's cart into an order, its lines and a pending payment in
//! one transaction:
//!
//! ```text
//! Cart -> Validating -> Pricing -> Persisting -> Committed
//!                                            \-> RolledBack
//! ```
//!
//! Emptying the cart and announcing the order happen after the commit and
//! can only log on failure; they never undo a committed order.

use chrono::Utc;
use std::fmt;

use crate::domain::aggregates::{
    DeliveryDetails, Identity, NewOrder, NewPayment, OrderLine, PaymentMethod,
};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{CustomerId, InvoiceNumber, Money, OrderId, PaymentId};
use crate::services::events::EventPublisher;
use crate::services::pricing::PricingResolver;
use crate::services::receipts::{ReceiptStorage, ReceiptUpload, StoredReceipt, ValidatedReceipt};
use crate::store::{CheckoutTx, Store};
use crate::{OrderingError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutPhase { Cart, Validating, Pricing, Persisting, Committed, RolledBack }

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cart => "cart",
            Self::Validating => "validating",
            Self::Pricing => "pricing",
            Self::Persisting => "persisting",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CheckoutRequest {
    pub delivery_address: String,
    pub delivery_phone: String,
    pub special_instructions: String,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub receipt: Option<ReceiptUpload>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CheckoutOutcome {
    pub order_id: OrderId,
    pub invoice_no: InvoiceNumber,
    pub total_amount: Money,
    pub payment_id: PaymentId,
}

#[derive(Clone)]
pub struct CheckoutService<S> {
    store: S,
    receipts: ReceiptStorage,
    events: EventPublisher,
}

/// Side effects of an attempt that must be undone if it does not commit.
#[derive(Default)]
struct Attempt {
    phase: Option<CheckoutPhase>,
    stored_receipt: Option<StoredReceipt>,
}

impl Attempt {
    fn enter(&mut self, phase: CheckoutPhase) { self.phase = Some(phase); }
    fn phase(&self) -> CheckoutPhase { self.phase.unwrap_or(CheckoutPhase::Cart) }
}

impl<S: Store> CheckoutService<S> {
    pub fn new(store: S, receipts: ReceiptStorage, events: EventPublisher) -> Self {
        Self { store, receipts, events }
    }

    pub async fn checkout(&self, customer_id: CustomerId, request: CheckoutRequest) -> Result<CheckoutOutcome> {
        let mut attempt = Attempt::default();
        let payment_method = request.payment_method;
        let mut tx = self.store.begin().await?;

        let result = self.place_order(&mut tx, customer_id, request, &mut attempt).await;
        let outcome = match result {
            Ok(outcome) => match tx.commit().await {
                Ok(()) => outcome,
                Err(e) => {
                    attempt.enter(CheckoutPhase::Persisting);
                    return Err(self.abandon(attempt, e.into()).await);
                }
            },
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Checkout rollback failed");
                }
                return Err(self.abandon(attempt, e).await);
            }
        };

        tracing::info!(
            phase = %CheckoutPhase::Committed,
            %customer_id,
            order_id = %outcome.order_id,
            invoice_no = %outcome.invoice_no,
            total = %outcome.total_amount,
            "Order placed"
        );
        self.after_commit(customer_id, payment_method, &outcome).await;
        Ok(outcome)
    }

    async fn place_order(
        &self,
        tx: &mut S::Tx,
        customer_id: CustomerId,
        request: CheckoutRequest,
        attempt: &mut Attempt,
    ) -> Result<CheckoutOutcome> {
        attempt.enter(CheckoutPhase::Validating);
        let lines = tx.cart_lines(customer_id).await?;
        if lines.is_empty() {
            return Err(OrderingError::EmptyCart);
        }
        let delivery = DeliveryDetails::new(&request.delivery_address, &request.delivery_phone, &request.special_instructions)
            .ok_or(OrderingError::MissingDeliveryInfo)?;
        let receipt = Self::validate_receipt(request.payment_method, request.receipt)?;

        attempt.enter(CheckoutPhase::Pricing);
        let priced = PricingResolver::price(tx, &lines).await?;

        attempt.enter(CheckoutPhase::Persisting);
        let invoice_no = InvoiceNumber::generate(Utc::now(), &mut rand::thread_rng());
        let order = tx.insert_order(&NewOrder { customer_id, invoice_no, total: priced.total, delivery }).await?;

        for priced_line in &priced.lines {
            // the product may have left the catalog since it was priced
            let product = PricingResolver::resolve(tx, priced_line.line.product_id).await?;
            tx.insert_order_line(&OrderLine { order_id: order.id, product_id: product.id, quantity: priced_line.line.quantity })
                .await?;
        }

        let receipt_image = match receipt {
            Some(receipt) => {
                let stored = self.receipts.store(order.id, &receipt, Utc::now()).await?;
                let path = stored.relative_path.clone();
                attempt.stored_receipt = Some(stored);
                Some(path)
            }
            None => None,
        };

        let reference = request.payment_reference.trim();
        let payment_id = tx
            .insert_payment(&NewPayment {
                customer_id,
                order_id: order.id,
                amount: order.total,
                method: request.payment_method,
                reference: (!reference.is_empty()).then(|| reference.to_string()),
                receipt_image,
            })
            .await?;

        Ok(CheckoutOutcome { order_id: order.id, invoice_no: order.invoice_no, total_amount: order.total, payment_id })
    }

    /// Only methods settled off-system take a receipt. A missing receipt is
    /// tolerated; a file of the wrong type or size is not.
    fn validate_receipt(method: PaymentMethod, upload: Option<ReceiptUpload>) -> Result<Option<ValidatedReceipt>> {
        match (method.requires_receipt(), upload) {
            (true, Some(upload)) => upload.validate().map(Some),
            (true, None) => {
                tracing::info!(%method, "Checkout without payment receipt");
                Ok(None)
            }
            (false, Some(upload)) => {
                tracing::debug!(%method, file = %upload.file_name, "Ignoring receipt for payment method");
                Ok(None)
            }
            (false, None) => Ok(None),
        }
    }

    async fn abandon(&self, attempt: Attempt, err: OrderingError) -> OrderingError {
        tracing::warn!(failed_in = %attempt.phase(), phase = %CheckoutPhase::RolledBack, error = %err, "Checkout rolled back");
        if let Some(stored) = &attempt.stored_receipt {
            self.receipts.discard(stored).await;
        }
        err
    }

    async fn after_commit(&self, customer_id: CustomerId, payment_method: PaymentMethod, outcome: &CheckoutOutcome) {
        if let Err(e) = self.store.clear(&Identity::Customer(customer_id)).await {
            tracing::warn!(order_id = %outcome.order_id, error = %e, "Failed to empty cart after order creation");
        }
        self.events
            .publish(&OrderEvent::Placed {
                order_id: outcome.order_id,
                invoice_no: outcome.invoice_no.clone(),
                customer_id,
                total: outcome.total_amount,
                payment_method,
            })
            .await;
    }
}
