//! Exchange wire types: margin, positions, orders and order requests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Satoshis per XBT.
pub const SATOSHIS_PER_XBT: u32 = 8;

/// Convert a satoshi amount into XBT.
pub fn xbt_from_satoshis(satoshis: i64) -> Decimal {
    Decimal::new(satoshis, SATOSHIS_PER_XBT)
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Side {
    /// Buy order.
    #[strum(to_string = "Buy", serialize = "buy", serialize = "BUY")]
    Buy,
    /// Sell order.
    #[strum(to_string = "Sell", serialize = "sell", serialize = "SELL")]
    Sell,
}

/// Order type. Types this shell does not place are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrdType {
    /// Rests on the book at a limit price.
    Limit,
    /// Executes immediately against the book.
    Market,
    /// Any other type (stops, pegged, ...).
    Other(String),
}

impl OrdType {
    /// Name as sent by the exchange.
    pub fn as_str(&self) -> &str {
        match self {
            OrdType::Limit => "Limit",
            OrdType::Market => "Market",
            OrdType::Other(name) => name,
        }
    }
}

impl From<String> for OrdType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Limit" => OrdType::Limit,
            "Market" => OrdType::Market,
            _ => OrdType::Other(name),
        }
    }
}

impl From<OrdType> for String {
    fn from(ord_type: OrdType) -> Self {
        ord_type.as_str().to_string()
    }
}

impl std::fmt::Display for OrdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status as reported by the exchange.
///
/// Statuses outside the common lifecycle (`PendingCancel`, `Expired`, ...)
/// are kept as sent so they print unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// Accepted and resting.
    New,
    /// Partially executed, remainder resting.
    PartiallyFilled,
    /// Fully executed.
    Filled,
    /// Cancelled by user or system.
    Canceled,
    /// Rejected by the exchange.
    Rejected,
    /// Any other status.
    Other(String),
}

impl OrderStatus {
    /// Name as sent by the exchange.
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::PartiallyFilled => "PartiallyFilled",
            OrderStatus::Filled => "Filled",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Other(name) => name,
        }
    }

    /// Whether the order can still trade.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }
}

impl From<String> for OrderStatus {
    fn from(name: String) -> Self {
        match name.as_str() {
            "New" => OrderStatus::New,
            "PartiallyFilled" => OrderStatus::PartiallyFilled,
            "Filled" => OrderStatus::Filled,
            "Canceled" => OrderStatus::Canceled,
            "Rejected" => OrderStatus::Rejected,
            _ => OrderStatus::Other(name),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account margin in satoshis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Margin {
    /// Margin currency, normally `XBt`.
    #[serde(default)]
    pub currency: Option<String>,
    /// Deposits plus realised profit.
    #[serde(default)]
    pub wallet_balance: Option<i64>,
    /// Open profit and loss.
    #[serde(default)]
    pub unrealised_pnl: Option<i64>,
    /// Wallet balance plus unrealised profit and loss.
    #[serde(default)]
    pub margin_balance: Option<i64>,
    /// Maintenance margin held by positions.
    #[serde(default)]
    pub maint_margin: Option<i64>,
    /// Balance usable for new orders.
    #[serde(default)]
    pub available_margin: Option<i64>,
}

/// Position in a single instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Instrument symbol.
    pub symbol: String,
    /// Signed contract quantity; negative is short.
    #[serde(default)]
    pub current_qty: Option<i64>,
    /// Average entry price.
    #[serde(default)]
    pub avg_entry_price: Option<Decimal>,
    /// Liquidation price.
    #[serde(default)]
    pub liquidation_price: Option<Decimal>,
    /// Unrealised profit and loss in satoshis.
    #[serde(default)]
    pub unrealised_pnl: Option<i64>,
    /// Realised profit and loss in satoshis.
    #[serde(default)]
    pub realised_pnl: Option<i64>,
}

impl Position {
    /// Signed quantity, zero when unknown.
    pub fn quantity(&self) -> i64 {
        self.current_qty.unwrap_or(0)
    }

    /// Whether the position holds any contracts.
    pub fn is_open(&self) -> bool {
        self.quantity() != 0
    }

    /// Position value in XBT for inverse contracts: quantity / entry price.
    pub fn value(&self) -> Option<Decimal> {
        let entry = self.avg_entry_price?;
        if entry.is_zero() {
            return None;
        }
        Some(Decimal::from(self.quantity()) / entry)
    }
}

/// Order as returned by the exchange.
///
/// Fields the shell does not read (`avgPx`, `cumQty`, `transactTime`, ...)
/// are kept in `extra` so the order serializes back to what was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Exchange order id (UUID).
    #[serde(rename = "orderID")]
    pub order_id: String,
    /// Client order id.
    #[serde(rename = "clOrdID", default, skip_serializing_if = "Option::is_none")]
    pub cl_ord_id: Option<String>,
    /// Instrument symbol.
    #[serde(default)]
    pub symbol: String,
    /// Order side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// Limit price.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    /// Ordered quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_qty: Option<i64>,
    /// Quantity still resting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaves_qty: Option<i64>,
    /// Order type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ord_type: Option<OrdType>,
    /// Current status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ord_status: Option<OrderStatus>,
    /// Free-form exchange annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Every other field of the response.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// First segment of the order id, enough to recognise it in a table.
    pub fn short_id(&self) -> &str {
        self.order_id.split('-').next().unwrap_or(&self.order_id)
    }

    /// Whether the order is still working.
    pub fn is_open(&self) -> bool {
        self.ord_status.as_ref().is_some_and(OrderStatus::is_open)
    }
}

/// A tradable instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    /// Instrument symbol.
    pub symbol: String,
    /// Listing state, e.g. `Open`.
    #[serde(default)]
    pub state: Option<String>,
    /// Root symbol, e.g. `XBT`.
    #[serde(default)]
    pub root_symbol: Option<String>,
}

impl Instrument {
    /// Symbols containing an underscore are not offered for completion.
    pub fn is_completable(&self) -> bool {
        !self.symbol.contains('_')
    }
}

/// Execution instruction that makes a limit order post-only.
pub const POST_ONLY_EXEC_INST: &str = "ParticipateDoNotInitiate";

/// Order submission request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Instrument symbol.
    pub symbol: String,
    /// Order side.
    pub side: Side,
    /// Quantity in contracts.
    pub order_qty: u64,
    /// Limit price; absent for market orders.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    /// Order type.
    pub ord_type: OrdType,
    /// Client order id, assigned by the client at submission.
    #[serde(rename = "clOrdID", skip_serializing_if = "Option::is_none")]
    pub cl_ord_id: Option<String>,
    /// Execution instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_inst: Option<String>,
}

impl OrderRequest {
    /// Create a limit order.
    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: u64,
        price: Decimal,
        post_only: bool,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_qty: quantity,
            price: Some(price),
            ord_type: OrdType::Limit,
            cl_ord_id: None,
            exec_inst: post_only.then(|| POST_ONLY_EXEC_INST.to_string()),
        }
    }

    /// Create a market order.
    pub fn market(symbol: impl Into<String>, side: Side, quantity: u64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_qty: quantity,
            price: None,
            ord_type: OrdType::Market,
            cl_ord_id: None,
            exec_inst: None,
        }
    }

    /// Attach a client order id.
    pub fn with_cl_ord_id(mut self, cl_ord_id: impl Into<String>) -> Self {
        self.cl_ord_id = Some(cl_ord_id.into());
        self
    }

    /// Validate order parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.is_empty() {
            return Err("symbol is required".to_string());
        }
        if self.order_qty == 0 {
            return Err("quantity must be positive".to_string());
        }
        if let Some(price) = self.price {
            if price <= Decimal::ZERO {
                return Err("price must be positive".to_string());
            }
        }
        Ok(())
    }
}
