//! Tab completion for verbs, symbols and order ids.
//!
//! The line editor completes synchronously, so candidates come from a cache
//! the shell fills from exchange answers it already has.

use std::sync::{Arc, RwLock};

use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use super::command::Verb;
use crate::exchange::types::{Instrument, Order};

#[derive(Debug, Default)]
struct Candidates {
    symbols: Vec<String>,
    order_ids: Vec<String>,
}

/// Shared completion candidates.
#[derive(Debug, Clone, Default)]
pub struct Completions {
    inner: Arc<RwLock<Candidates>>,
}

impl Completions {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the symbol list from the active instruments.
    pub fn set_instruments(&self, instruments: &[Instrument]) {
        let mut symbols: Vec<String> = instruments
            .iter()
            .filter(|i| i.is_completable())
            .map(|i| i.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        if let Ok(mut c) = self.inner.write() {
            c.symbols = symbols;
        }
    }

    /// Replace the order id list with the working orders.
    pub fn set_orders(&self, orders: &[Order]) {
        if let Ok(mut c) = self.inner.write() {
            c.order_ids = orders
                .iter()
                .filter(|o| o.is_open())
                .map(|o| o.order_id.clone())
                .collect();
        }
    }

    /// Remember a newly placed order if it is still working.
    pub fn add_order(&self, order: &Order) {
        if !order.is_open() {
            return;
        }
        if let Ok(mut c) = self.inner.write() {
            if !c.order_ids.contains(&order.order_id) {
                c.order_ids.push(order.order_id.clone());
            }
        }
    }

    /// Forget an order id.
    pub fn remove_order(&self, order_id: &str) {
        if let Ok(mut c) = self.inner.write() {
            c.order_ids.retain(|id| id != order_id);
        }
    }

    /// Cached symbols.
    pub fn symbols(&self) -> Vec<String> {
        self.inner.read().map(|c| c.symbols.clone()).unwrap_or_default()
    }

    /// Cached order ids.
    pub fn order_ids(&self) -> Vec<String> {
        self.inner.read().map(|c| c.order_ids.clone()).unwrap_or_default()
    }

    /// Complete the word ending at byte `pos` of `line`.
    ///
    /// Returns the start of the word being completed and the candidates.
    pub fn complete(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let head = line.get(..pos).unwrap_or(line);
        let start = head.rfind(' ').map_or(0, |i| i + 1);
        let word = &head[start..];
        let mut preceding = head[..start].split_whitespace();

        let candidates = match (preceding.next(), preceding.next()) {
            (None, _) => Verb::all()
                .map(|v| v.to_string())
                .filter(|name| name.starts_with(word))
                .collect(),
            (Some(first), None) => match first.to_lowercase().parse::<Verb>() {
                Ok(Verb::Symbol) => {
                    let prefix = word.to_uppercase();
                    self.symbols()
                        .into_iter()
                        .filter(|s| s.starts_with(&prefix))
                        .collect()
                }
                Ok(Verb::Cancel) => self
                    .order_ids()
                    .into_iter()
                    .filter(|id| id.starts_with(word))
                    .collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        (start, candidates)
    }
}

/// Line editor helper that only completes.
pub struct ShellHelper {
    completions: Completions,
}

impl ShellHelper {
    /// Helper backed by a completion cache.
    pub fn new(completions: Completions) -> Self {
        Self { completions }
    }
}

impl Completer for ShellHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(self.completions.complete(line, pos))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}
