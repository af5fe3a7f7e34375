//! Value Objects for the cart and checkout flow

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("{0} must be a positive integer")]
    NonPositive(&'static str),
    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Result<Self, ValueError> {
                if value <= 0 { return Err(ValueError::NonPositive(stringify!($name))); }
                Ok(Self(value))
            }
            pub fn get(self) -> i64 { self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }
    };
}

positive_id!(
    /// Catalog product identifier
    ProductId
);
positive_id!(
    /// Authenticated customer identifier
    CustomerId
);
positive_id!(
    /// Store-assigned order identifier
    OrderId
);
positive_id!(PaymentId);

/// Line quantity, always at least one and bounded by the storage integer range
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Quantity(i32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: i64) -> Result<Self, ValueError> {
        if value <= 0 { return Err(ValueError::NonPositive("quantity")); }
        i32::try_from(value).map(Self).map_err(|_| ValueError::OutOfRange("quantity"))
    }
    pub fn get(self) -> i32 { self.0 }
    pub fn saturating_add(self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

/// The single currency every amount is denominated in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn code(self) -> &'static str { match self { Self::Usd => "USD" } }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

/// Money value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: Currency }

impl Money {
    pub fn new(amount: Decimal) -> Self { Self { amount, currency: Currency::Usd } }
    pub fn zero() -> Self { Self::new(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> Currency { self.currency }
    pub fn multiply(&self, qty: Quantity) -> Money { Money::new(self.amount * Decimal::from(qty.get())) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, other: Money) -> Money { Money::new(self.amount + other.amount) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::zero(), Add::add) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2} {}", self.amount, self.currency) }
}

/// Human-facing order reference: `INV-<YYYYMMDD>-<NNNN>`.
///
/// The random suffix only gives weak uniqueness; a collision surfaces as a
/// store conflict and the caller may retry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    const PREFIX: &'static str = "INV";

    pub fn generate<R: Rng + ?Sized>(at: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: u16 = rng.gen_range(1..=9999);
        Self(format!("{}-{}-{:04}", Self::PREFIX, at.format("%Y%m%d"), suffix))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_ids_reject_non_positive() {
        assert!(ProductId::new(0).is_err());
        assert!(CustomerId::new(-3).is_err());
        assert_eq!(OrderId::new(9).unwrap().get(), 9);
    }

    #[test]
    fn test_quantity_bounds() {
        assert_eq!(Quantity::new(0), Err(ValueError::NonPositive("quantity")));
        assert_eq!(Quantity::new(i64::from(i32::MAX) + 1), Err(ValueError::OutOfRange("quantity")));
        let big = Quantity::new(i64::from(i32::MAX) - 1).unwrap();
        assert_eq!(big.saturating_add(Quantity::new(5).unwrap()).get(), i32::MAX);
    }

    #[test]
    fn test_money_sum() {
        let line = Money::new(Decimal::new(1000, 2)).multiply(Quantity::new(2).unwrap());
        let total: Money = [line, Money::new(Decimal::new(2500, 2))].into_iter().sum();
        assert_eq!(total.amount(), Decimal::new(4500, 2));
        assert_eq!(total.to_string(), "45.00 USD");
    }

    #[test]
    fn test_invoice_number_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let invoice = InvoiceNumber::generate(at, &mut rng);
            assert!(invoice.as_str().starts_with("INV-20240307-"));
            assert_eq!(invoice.as_str().len(), "INV-20240307-0000".len());
            let suffix: u16 = invoice.as_str()[13..].parse().unwrap();
            assert!((1..=9999).contains(&suffix));
        }
    }
}
