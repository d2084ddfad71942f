//! Exchange access for the shell.
//!
//! This module handles:
//! - Wire types for margin, positions and orders
//! - Request signing
//! - The REST client (polling account state)
//! - The realtime account feed (streamed account state)
//! - Mock client for testing

pub mod client;
pub mod feed;
pub mod mock;
pub mod signing;
pub mod types;
pub mod websocket;

use async_trait::async_trait;

use crate::error::ExchangeError;

pub use client::RestExchange;
pub use feed::FeedExchange;
pub use mock::{ExchangeCall, MockExchange};
pub use types::{Instrument, Margin, OrdType, Order, OrderRequest, OrderStatus, Position, Side};

/// Operations the shell needs from an exchange.
///
/// Each shell command calls exactly one of these.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Account margin summary.
    async fn margin(&self) -> Result<Margin, ExchangeError>;

    /// All positions on the account, including flat ones.
    async fn positions(&self) -> Result<Vec<Position>, ExchangeError>;

    /// Active instruments.
    async fn instruments(&self) -> Result<Vec<Instrument>, ExchangeError>;

    /// Working orders for one symbol.
    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError>;

    /// Submit an order.
    async fn place_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError>;

    /// Cancel an order by exchange order id.
    async fn cancel_order(&self, order_id: &str) -> Result<Vec<Order>, ExchangeError>;

    /// Release connections. Called once when the session ends.
    async fn close(&self) {}
}
