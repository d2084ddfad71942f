//! REST client: every read is a fresh authenticated request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::signing::{self, Credentials};
use super::types::{Instrument, Margin, Order, OrderRequest, Position};
use super::Exchange;
use crate::config::Config;
use crate::error::ExchangeError;

/// Error envelope returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    name: Option<String>,
}

/// Authenticated REST client.
#[derive(Debug, Clone)]
pub struct RestExchange {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL including the API prefix.
    base_url: Url,
    /// API key pair.
    credentials: Credentials,
    /// Client order id prefix.
    order_id_prefix: String,
    /// Seconds a signed request stays valid.
    request_expiry_secs: i64,
}

impl RestExchange {
    /// Create a client from config.
    pub fn new(config: &Config) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        let base = format!("{}/", config.bitmex_base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|e| ExchangeError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            credentials: Credentials::new(&config.bitmex_api_key, &config.bitmex_api_secret),
            order_id_prefix: config.order_id_prefix.clone(),
            request_expiry_secs: config.request_expiry_secs,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint with optional query parameters.
    pub fn endpoint_url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, ExchangeError> {
        let mut url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| ExchangeError::InvalidUrl(e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send a signed request and decode the JSON response.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<T, ExchangeError> {
        let url = self.endpoint_url(endpoint, query)?;
        let path_and_query = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        let body = body.unwrap_or_default();
        let expires = signing::expires_in(self.request_expiry_secs);
        let headers =
            self.credentials
                .auth_headers(method.as_str(), &path_and_query, expires, &body)?;

        debug!(method = %method, path = %path_and_query, "Sending request");

        let mut request = self.http.request(method, url);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        if !body.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Map a failed response into an API error, preferring the body's message.
fn api_error(status: u16, body: &str) -> ExchangeError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error.message.or(r.error.name))
        .unwrap_or_else(|| body.trim().to_string());
    ExchangeError::Api { status, message }
}

#[async_trait]
impl Exchange for RestExchange {
    #[instrument(skip(self))]
    async fn margin(&self) -> Result<Margin, ExchangeError> {
        self.request(Method::GET, "user/margin", &[], None).await
    }

    #[instrument(skip(self))]
    async fn positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.request(Method::GET, "position", &[], None).await
    }

    #[instrument(skip(self))]
    async fn instruments(&self) -> Result<Vec<Instrument>, ExchangeError> {
        self.request(Method::GET, "instrument/active", &[], None).await
    }

    #[instrument(skip(self))]
    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        self.request(
            Method::GET,
            "order",
            &[("symbol", symbol), ("filter", r#"{"open":true}"#)],
            None,
        )
        .await
    }

    #[instrument(skip(self, request), fields(symbol = %request.symbol, side = %request.side))]
    async fn place_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError> {
        request.validate().map_err(ExchangeError::InvalidOrder)?;

        let request = request
            .clone()
            .with_cl_ord_id(signing::client_order_id(&self.order_id_prefix));
        let body = serde_json::to_string(&request)?;

        let order: Order = self.request(Method::POST, "order", &[], Some(body)).await?;

        info!(
            order_id = %order.order_id,
            qty = request.order_qty,
            price = ?request.price,
            ord_type = %request.ord_type,
            "Order submitted"
        );

        Ok(order)
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<Vec<Order>, ExchangeError> {
        let body = serde_json::json!({ "orderID": order_id }).to_string();
        let cancelled: Vec<Order> = self.request(Method::DELETE, "order", &[], Some(body)).await?;

        info!(order_id, count = cancelled.len(), "Cancel requested");

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            bitmex_api_key: "key".to_string(),
            bitmex_api_secret: "secret".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn client_creation_works() {
        let client = RestExchange::new(&test_config()).unwrap();
        assert_eq!(client.base_url().as_str(), "https://testnet.bitmex.com/api/v1/");
    }

    #[test]
    fn endpoint_keeps_api_prefix() {
        let client = RestExchange::new(&test_config()).unwrap();
        let url = client.endpoint_url("user/margin", &[]).unwrap();
        assert_eq!(url.path(), "/api/v1/user/margin");
    }

    #[test]
    fn instrument_endpoint_is_active_list() {
        let client = RestExchange::new(&test_config()).unwrap();
        let url = client.endpoint_url("instrument/active", &[]).unwrap();
        assert_eq!(url.as_str(), "https://testnet.bitmex.com/api/v1/instrument/active");
    }

    #[test]
    fn endpoint_encodes_query() {
        let client = RestExchange::new(&test_config()).unwrap();
        let url = client
            .endpoint_url("order", &[("symbol", "XBTUSD"), ("filter", r#"{"open":true}"#)])
            .unwrap();
        assert_eq!(url.path(), "/api/v1/order");
        assert_eq!(
            url.query(),
            Some("symbol=XBTUSD&filter=%7B%22open%22%3Atrue%7D")
        );
    }

    #[test]
    fn api_error_uses_body_message() {
        let err = api_error(401, r#"{"error":{"message":"Invalid API Key.","name":"HTTPError"}}"#);
        match err {
            ExchangeError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API Key.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn api_error_falls_back_to_raw_body() {
        let err = api_error(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }
}
