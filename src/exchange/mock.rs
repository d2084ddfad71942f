//! Mock exchange for unit testing.
//!
//! Records every call so tests can assert which exchange method a shell
//! command reached, and with which arguments, without network access.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map};

use super::types::{Instrument, Margin, OrdType, Order, OrderRequest, OrderStatus, Position};
use super::Exchange;
use crate::error::ExchangeError;

/// One recorded exchange call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeCall {
    /// `margin()`.
    Margin,
    /// `positions()`.
    Positions,
    /// `instruments()`.
    Instruments,
    /// `open_orders(symbol)`.
    OpenOrders(String),
    /// `place_order(request)`.
    PlaceOrder(OrderRequest),
    /// `cancel_order(order_id)`.
    CancelOrder(String),
    /// `close()`.
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    margin: Margin,
    positions: Vec<Position>,
    instruments: Vec<Instrument>,
    orders: Vec<Order>,
    fill_price: Option<Decimal>,
    failure: Option<String>,
    calls: Vec<ExchangeCall>,
}

/// Mock exchange for testing.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    state: Arc<Mutex<MockState>>,
}

impl MockExchange {
    /// Create a mock with an empty account.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the margin returned by `margin()`.
    pub fn set_margin(&self, margin: Margin) {
        self.state().margin = margin;
    }

    /// Add a position.
    pub fn add_position(&self, position: Position) {
        self.state().positions.push(position);
    }

    /// Add an active instrument.
    pub fn add_instrument(&self, symbol: &str) {
        self.state().instruments.push(Instrument {
            symbol: symbol.to_string(),
            state: Some("Open".to_string()),
            root_symbol: None,
        });
    }

    /// Fill market orders immediately at this price.
    pub fn set_fill_price(&self, price: Decimal) {
        self.state().fill_price = Some(price);
    }

    /// Add a working order.
    pub fn add_order(&self, order: Order) {
        self.state().orders.push(order);
    }

    /// Make every subsequent call fail with this message.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.state().failure = Some(message.into());
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<ExchangeCall> {
        self.state().calls.clone()
    }

    fn record(&self, call: ExchangeCall) -> Result<(), ExchangeError> {
        let mut state = self.state();
        state.calls.push(call);
        match &state.failure {
            Some(message) => Err(ExchangeError::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn margin(&self) -> Result<Margin, ExchangeError> {
        self.record(ExchangeCall::Margin)?;
        Ok(self.state().margin.clone())
    }

    async fn positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.record(ExchangeCall::Positions)?;
        Ok(self.state().positions.clone())
    }

    async fn instruments(&self) -> Result<Vec<Instrument>, ExchangeError> {
        self.record(ExchangeCall::Instruments)?;
        Ok(self.state().instruments.clone())
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        self.record(ExchangeCall::OpenOrders(symbol.to_string()))?;
        Ok(self
            .state()
            .orders
            .iter()
            .filter(|o| o.symbol == symbol && o.is_open())
            .cloned()
            .collect())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError> {
        self.record(ExchangeCall::PlaceOrder(request.clone()))?;

        let mut state = self.state();
        let mut order = Order {
            order_id: format!("mock{:04}-0000-0000-0000-000000000000", state.orders.len() + 1),
            cl_ord_id: request.cl_ord_id.clone(),
            symbol: request.symbol.clone(),
            side: Some(request.side),
            price: request.price,
            order_qty: i64::try_from(request.order_qty).ok(),
            leaves_qty: i64::try_from(request.order_qty).ok(),
            ord_type: Some(request.ord_type.clone()),
            ord_status: Some(OrderStatus::New),
            text: None,
            extra: Map::new(),
        };

        if let (OrdType::Market, Some(fill)) = (&request.ord_type, state.fill_price) {
            order.ord_status = Some(OrderStatus::Filled);
            order.leaves_qty = Some(0);
            order.extra.insert("avgPx".to_string(), json!(fill.to_f64()));
            order.extra.insert("cumQty".to_string(), json!(request.order_qty));
        }

        state.orders.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<Vec<Order>, ExchangeError> {
        self.record(ExchangeCall::CancelOrder(order_id.to_string()))?;

        let mut state = self.state();
        let cancelled: Vec<Order> = state
            .orders
            .iter_mut()
            .filter(|o| o.order_id == order_id)
            .map(|o| {
                o.ord_status = Some(OrderStatus::Canceled);
                o.clone()
            })
            .collect();
        Ok(cancelled)
    }

    async fn close(&self) {
        let _ = self.record(ExchangeCall::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::types::Side;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn mock_records_calls() {
        let mock = MockExchange::new();
        mock.margin().await.unwrap();
        mock.open_orders("XBTUSD").await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                ExchangeCall::Margin,
                ExchangeCall::OpenOrders("XBTUSD".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn placed_orders_become_open_and_cancellable() {
        let mock = MockExchange::new();
        let order = mock
            .place_order(&OrderRequest::limit("XBTUSD", Side::Buy, 10, dec!(9000), true))
            .await
            .unwrap();

        assert_eq!(mock.open_orders("XBTUSD").await.unwrap().len(), 1);

        let cancelled = mock.cancel_order(&order.order_id).await.unwrap();
        assert_eq!(cancelled[0].ord_status, Some(OrderStatus::Canceled));
        assert!(mock.open_orders("XBTUSD").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn market_orders_fill_at_configured_price() {
        let mock = MockExchange::new();
        mock.set_fill_price(dec!(9512.5));

        let order = mock
            .place_order(&OrderRequest::market("XBTUSD", Side::Sell, 3))
            .await
            .unwrap();

        assert_eq!(order.ord_status, Some(OrderStatus::Filled));
        assert_eq!(order.extra["avgPx"], 9512.5);
        assert!(mock.open_orders("XBTUSD").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn instruments_are_listed() {
        let mock = MockExchange::new();
        mock.add_instrument("XBTUSD");

        let instruments = mock.instruments().await.unwrap();
        assert_eq!(instruments[0].symbol, "XBTUSD");
        assert_eq!(mock.calls(), vec![ExchangeCall::Instruments]);
    }

    #[tokio::test]
    async fn mock_failure_modes() {
        let mock = MockExchange::new();
        mock.fail_with("overloaded");

        let result = mock.positions().await;
        assert!(matches!(result, Err(ExchangeError::Api { status: 500, .. })));
        assert_eq!(mock.calls(), vec![ExchangeCall::Positions]);
    }
}
