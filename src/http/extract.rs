//! Caller identity, resolved once per request.
//!
//! The upstream auth gateway sets `x-customer-id` for signed-in customers.
//! Everyone else is scoped by client address: the first `x-forwarded-for`
//! hop, then the socket peer.

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::domain::aggregates::Identity;
use crate::domain::value_objects::CustomerId;
use crate::OrderingError;

pub const CUSTOMER_HEADER: &str = "x-customer-id";
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Whoever is calling, signed in or not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller(pub Identity);

/// A signed-in customer. Anonymous callers get a 401.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequireCustomer(pub CustomerId);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

fn client_address(parts: &Parts) -> String {
    header(parts, FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(peer)| peer.ip().to_string()))
        .unwrap_or_else(|| Identity::UNKNOWN_ADDRESS.to_string())
}

fn resolve(parts: &Parts) -> Identity {
    let customer_id = header(parts, CUSTOMER_HEADER).and_then(|v| v.parse::<i64>().ok());
    Identity::resolve(customer_id, &client_address(parts))
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts)))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireCustomer {
    type Rejection = OrderingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts).customer().map(Self).ok_or(OrderingError::NotAuthenticated)
    }
}
