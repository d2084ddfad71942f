//! Unified error types for the trading shell.

use thiserror::Error;

/// Unified error type for the trading shell.
#[derive(Error, Debug)]
pub enum ShellError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Exchange call failed.
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// Operator input could not be parsed.
    #[error("{0}")]
    Command(#[from] CommandError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing a typed command line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Verb is not in the dispatch table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A required argument is missing.
    #[error("usage: {usage}")]
    Usage {
        /// Expected usage line.
        usage: &'static str,
    },

    /// Quantity is not a positive integer.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Price is not a positive number.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Symbol is empty after trimming.
    #[error("symbol must not be empty")]
    EmptySymbol,
}

/// Errors from the exchange REST API or account feed.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The exchange answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Order parameters rejected before submission.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Request could not be signed.
    #[error("signing error: {0}")]
    Signing(String),

    /// Request URL could not be built.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The account feed has not delivered a table snapshot yet.
    #[error("account feed not ready: no snapshot for table {table}")]
    FeedNotReady {
        /// Table still waiting for its snapshot.
        table: String,
    },

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),
}

/// WebSocket connection and message errors.
#[derive(Error, Debug)]
pub enum WsError {
    /// Connection failed.
    #[error("websocket connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection is gone; the feed does not reconnect.
    #[error("websocket disconnected")]
    Disconnected,

    /// The exchange rejected a subscription or authentication request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Send failed.
    #[error("failed to send websocket message: {0}")]
    SendFailed(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ShellError>;
