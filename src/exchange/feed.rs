//! Exchange backed by the realtime account feed.
//!
//! Reads come from the feed's table cache; order placement and
//! cancellation still go through the REST client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use super::client::RestExchange;
use super::signing::Credentials;
use super::types::{Instrument, Margin, Order, OrderRequest, Position};
use super::websocket::AccountFeed;
use super::Exchange;
use crate::config::Config;
use crate::error::ExchangeError;

/// Margin currency shown by the funds table.
const MARGIN_CURRENCY: &str = "XBt";

/// Streaming exchange: feed reads, REST writes.
pub struct FeedExchange {
    rest: RestExchange,
    feed: AccountFeed,
}

impl FeedExchange {
    /// Connect the feed and wait for the account snapshots.
    pub async fn connect(config: &Config) -> Result<Self, ExchangeError> {
        let rest = RestExchange::new(config)?;
        let credentials = Credentials::new(&config.bitmex_api_key, &config.bitmex_api_secret);

        let feed =
            AccountFeed::connect(&config.bitmex_ws_url, &credentials, config.request_expiry_secs)
                .await?;
        feed.wait_ready(Duration::from_secs(config.feed_ready_timeout_secs))
            .await?;

        Ok(Self::from_parts(rest, feed))
    }

    /// Assemble from an existing client and feed.
    pub fn from_parts(rest: RestExchange, feed: AccountFeed) -> Self {
        Self { rest, feed }
    }
}

/// Pick the XBt margin row, falling back to the first one.
fn select_margin(rows: Vec<Margin>) -> Margin {
    let preferred = rows
        .iter()
        .position(|m| m.currency.as_deref() == Some(MARGIN_CURRENCY));
    match preferred {
        Some(idx) => rows.into_iter().nth(idx).unwrap_or_default(),
        None => rows.into_iter().next().unwrap_or_default(),
    }
}

#[async_trait]
impl Exchange for FeedExchange {
    async fn margin(&self) -> Result<Margin, ExchangeError> {
        Ok(select_margin(self.feed.rows("margin")?))
    }

    async fn positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.feed.rows("position")
    }

    async fn instruments(&self) -> Result<Vec<Instrument>, ExchangeError> {
        self.rest.instruments().await
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        let orders: Vec<Order> = self.feed.rows("order")?;
        Ok(orders
            .into_iter()
            .filter(|o| o.symbol == symbol && o.is_open())
            .collect())
    }

    #[instrument(skip(self, request))]
    async fn place_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError> {
        self.rest.place_order(request).await
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<Vec<Order>, ExchangeError> {
        self.rest.cancel_order(order_id).await
    }

    async fn close(&self) {
        self.feed.close();
    }
}
