//! Realtime account feed.
//!
//! Features:
//! - API-key authentication over the socket
//! - Subscribes to the `margin`, `position` and `order` tables
//! - Keeps a local copy of each table from partial/insert/update/delete pushes
//!
//! The feed does not reconnect. Once the socket closes every read fails with
//! [`WsError::Disconnected`] and the operator restarts the shell.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::signing::{self, Credentials};
use crate::error::{ExchangeError, WsError};

/// Account tables the feed subscribes to.
pub const ACCOUNT_TABLES: [&str; 3] = ["margin", "position", "order"];

type Row = Map<String, Value>;

/// Kind of change carried by a table push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAction {
    /// Full snapshot; replaces the table.
    Partial,
    /// New rows.
    Insert,
    /// Changed fields for existing rows.
    Update,
    /// Rows to drop.
    Delete,
}

/// A table push from the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct TableMessage {
    /// Table name.
    pub table: String,
    /// Change kind.
    pub action: TableAction,
    /// Identity columns, sent with the partial.
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    /// Affected rows.
    #[serde(default)]
    pub data: Vec<Row>,
}

/// Local copy of one table.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    /// Identity columns used to match updates and deletes.
    pub keys: Vec<String>,
    /// Current rows.
    pub rows: Vec<Row>,
    /// Whether the snapshot has arrived.
    pub has_partial: bool,
}

impl TableState {
    fn matches(keys: &[String], row: &Row, item: &Row) -> bool {
        keys.iter().all(|k| row.get(k) == item.get(k))
    }

    /// An order row with nothing left to fill.
    fn is_closed_order(row: &Row) -> bool {
        let filled = row
            .get("leavesQty")
            .and_then(Value::as_i64)
            .is_some_and(|leaves| leaves <= 0);
        let finished = matches!(
            row.get("ordStatus").and_then(Value::as_str),
            Some("Filled" | "Canceled" | "Rejected")
        );
        filled || finished
    }

    /// Apply a push to the table.
    pub fn apply(&mut self, message: TableMessage) {
        match message.action {
            TableAction::Partial => {
                self.keys = message.keys.unwrap_or_default();
                self.rows = message.data;
                self.has_partial = true;
            }
            TableAction::Insert => {
                self.rows.extend(message.data);
            }
            TableAction::Update => {
                for item in message.data {
                    match self
                        .rows
                        .iter_mut()
                        .find(|row| Self::matches(&self.keys, row, &item))
                    {
                        Some(row) => {
                            for (field, value) in item {
                                row.insert(field, value);
                            }
                        }
                        None => debug!(table = %message.table, "Update for unknown row"),
                    }
                }
                if message.table == "order" {
                    self.rows.retain(|row| !Self::is_closed_order(row));
                }
            }
            TableAction::Delete => {
                let keys = &self.keys;
                for item in &message.data {
                    self.rows.retain(|row| !Self::matches(keys, row, item));
                }
            }
        }
    }
}

/// Authenticated connection to the realtime feed.
pub struct AccountFeed {
    /// Table state by table name.
    tables: Arc<DashMap<String, TableState>>,
    /// Connection state.
    connected: Arc<AtomicBool>,
    /// Last error pushed by the exchange (auth or subscribe failure).
    rejection: Arc<RwLock<Option<String>>>,
    /// Reader task.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AccountFeed {
    /// Feed that has not connected; used by tests and as the initial state.
    pub fn detached() -> Self {
        Self {
            tables: Arc::new(DashMap::new()),
            connected: Arc::new(AtomicBool::new(false)),
            rejection: Arc::new(RwLock::new(None)),
            task: Mutex::new(None),
        }
    }

    /// Connect, authenticate and subscribe to the account tables.
    pub async fn connect(
        ws_url: &str,
        credentials: &Credentials,
        expiry_secs: i64,
    ) -> Result<Self, ExchangeError> {
        info!(url = %ws_url, "Connecting to account feed");

        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        let auth = json!({
            "op": "authKeyExpires",
            "args": credentials.feed_auth_args(signing::expires_in(expiry_secs))?,
        });
        let subscribe = json!({ "op": "subscribe", "args": ACCOUNT_TABLES });

        for msg in [auth, subscribe] {
            write
                .send(Message::Text(msg.to_string()))
                .await
                .map_err(|e| WsError::SendFailed(e.to_string()))?;
        }

        let feed = Self::detached();
        feed.connected.store(true, Ordering::SeqCst);

        let tables = feed.tables.clone();
        let connected = feed.connected.clone();
        let rejection = feed.rejection.clone();

        let handle = tokio::spawn(async move {
            // Holding the sink keeps the socket's write half open.
            let _write = write;

            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        Self::process_message(&tables, &rejection, &text);
                    }
                    Ok(Message::Close(frame)) => {
                        warn!(frame = ?frame, "Account feed closed");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "Account feed error");
                        break;
                    }
                }
            }

            connected.store(false, Ordering::SeqCst);
        });

        if let Ok(mut task) = feed.task.lock() {
            *task = Some(handle);
        }

        Ok(feed)
    }

    /// Check if the socket is still open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Wait until every account table has its snapshot.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), ExchangeError> {
        let start = Instant::now();

        loop {
            if let Some(reason) = self.rejection() {
                return Err(WsError::Rejected(reason).into());
            }

            let missing = ACCOUNT_TABLES.iter().find(|table| !self.has_partial(table));
            let Some(missing) = missing else {
                info!("Account feed ready");
                return Ok(());
            };

            if !self.is_connected() {
                return Err(WsError::Disconnected.into());
            }

            if start.elapsed() >= timeout {
                return Err(ExchangeError::FeedNotReady {
                    table: missing.to_string(),
                });
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn rejection(&self) -> Option<String> {
        self.rejection.read().ok().and_then(|r| r.clone())
    }

    fn has_partial(&self, table: &str) -> bool {
        self.tables
            .get(table)
            .map(|t| t.has_partial)
            .unwrap_or(false)
    }

    /// Current rows of a table, decoded.
    pub fn rows<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, ExchangeError> {
        if !self.is_connected() {
            return Err(WsError::Disconnected.into());
        }

        let state = self
            .tables
            .get(table)
            .filter(|t| t.has_partial)
            .ok_or_else(|| ExchangeError::FeedNotReady {
                table: table.to_string(),
            })?;

        state
            .rows
            .iter()
            .map(|row| serde_json::from_value(Value::Object(row.clone())).map_err(Into::into))
            .collect()
    }

    /// Stop the reader task and drop the connection.
    pub fn close(&self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
                debug!("Account feed task stopped");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Apply one raw feed message.
    pub fn apply_text(&self, text: &str) {
        Self::process_message(&self.tables, &self.rejection, text);
    }

    /// Process a feed message.
    fn process_message(
        tables: &DashMap<String, TableState>,
        rejection: &RwLock<Option<String>>,
        text: &str,
    ) {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Unparseable feed message");
                return;
            }
        };

        if value.get("table").is_some() {
            match serde_json::from_value::<TableMessage>(value) {
                Ok(message) => {
                    debug!(
                        table = %message.table,
                        action = ?message.action,
                        rows = message.data.len(),
                        "Table push"
                    );
                    tables
                        .entry(message.table.clone())
                        .or_default()
                        .apply(message);
                }
                Err(e) => warn!(error = %e, "Malformed table push"),
            }
        } else if let Some(err) = value.get("error") {
            let reason = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
            error!(reason = %reason, "Account feed request rejected");
            if let Ok(mut slot) = rejection.write() {
                *slot = Some(reason);
            }
        } else if value.get("success").is_some() {
            debug!(request = %value["request"], "Account feed request accepted");
        } else if let Some(info) = value.get("info") {
            debug!(info = %info, "Account feed welcome");
        }
    }
}

impl Drop for AccountFeed {
    fn drop(&mut self) {
        self.close();
    }
}

impl AccountFeed {
    /// Mark a detached feed as live so cached rows can be read.
    #[cfg(test)]
    pub(crate) fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }
}
