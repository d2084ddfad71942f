//! Interactive command loop.
//!
//! The shell reads one line at a time, parses it into a [`Command`], asks
//! for confirmation where the command sends an order, makes a single
//! [`Exchange`] call and renders the answer.

pub mod command;
pub mod completion;
pub mod confirm;
pub mod input;
pub mod render;
pub mod table;

use std::io::Write;

use tracing::{debug, info, warn};

use crate::config::Network;
use crate::error::{ExchangeError, ShellError};
use crate::exchange::types::OrderRequest;
use crate::exchange::Exchange;

pub use command::{Command, Symbol, Verb};
pub use completion::Completions;
pub use confirm::{query_yes_no, DefaultAnswer};
pub use input::{EditorSource, LineSource};

/// Printed once when the shell starts.
pub const BANNER: &str = "Welcome to the Bitmex shell. Type help or ? to list commands.";

const LIGHT_GREEN: &str = "\x1b[92m";
const LIGHT_RED: &str = "\x1b[91m";
const UNDERLINE: &str = "\x1b[4m";
const RESET: &str = "\x1b[0m";

/// Build the prompt for a network and symbol.
pub fn prompt(network: Network, symbol: &Symbol) -> String {
    let colour = match network {
        Network::Testnet => LIGHT_GREEN,
        Network::Live => LIGHT_RED,
    };
    format!("({colour}{network}{RESET} {UNDERLINE}{symbol}{RESET}) $ ")
}

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Command loop over an exchange, an input stream and an output sink.
pub struct Shell<E, R, W> {
    exchange: E,
    input: R,
    output: W,
    network: Network,
    symbol: Symbol,
    prompt: String,
    post_only: bool,
    completions: Option<Completions>,
}

impl<E, R, W> Shell<E, R, W>
where
    E: Exchange,
    R: LineSource,
    W: Write,
{
    /// Create a shell. Limit orders are post-only unless changed.
    pub fn new(exchange: E, network: Network, symbol: Symbol, input: R, output: W) -> Self {
        let prompt = prompt(network, &symbol);
        Self {
            exchange,
            input,
            output,
            network,
            symbol,
            prompt,
            post_only: true,
            completions: None,
        }
    }

    /// Whether limit orders are sent as post-only.
    pub fn with_post_only(mut self, post_only: bool) -> Self {
        self.post_only = post_only;
        self
    }

    /// Active symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Current prompt, including colour escapes.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Keep `completions` filled with symbols and working order ids.
    pub fn with_completions(mut self, completions: Completions) -> Self {
        self.completions = Some(completions);
        self
    }

    /// Underlying exchange.
    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Output written so far.
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Run until `exit` or end of input, then close the exchange.
    ///
    /// Command failures are printed and the loop continues; only IO errors
    /// on the terminal itself end the session early.
    pub async fn run(&mut self) -> Result<(), ShellError> {
        let result = self.read_eval_print().await;
        self.close().await;
        result
    }

    /// Close the exchange.
    pub async fn close(&self) {
        debug!("closing exchange");
        self.exchange.close().await;
    }

    /// Fill the completion cache with instruments and working orders.
    ///
    /// Failures only cost completions, so they are logged and ignored.
    async fn load_completions(&self) {
        let Some(completions) = &self.completions else {
            return;
        };
        match self.exchange.instruments().await {
            Ok(instruments) => completions.set_instruments(&instruments),
            Err(e) => warn!(error = %e, "could not load instruments for completion"),
        }
        match self.exchange.open_orders(self.symbol.as_str()).await {
            Ok(orders) => completions.set_orders(&orders),
            Err(e) => warn!(error = %e, "could not load order ids for completion"),
        }
    }

    async fn read_eval_print(&mut self) -> Result<(), ShellError> {
        writeln!(self.output, "{BANNER}")?;
        self.load_completions().await;

        loop {
            let read = self.input.read_line(&self.prompt, &mut self.output).await;
            let line = match read {
                Ok(Some(line)) => line,
                Ok(None) => {
                    writeln!(self.output)?;
                    return Ok(());
                }
                Err(e) if input::is_interrupt(&e) => return self.interrupted(),
                Err(e) => return Err(e.into()),
            };
            if !line.trim().is_empty() {
                self.input.add_history(line.trim());
            }

            match self.execute(&line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => return Ok(()),
                Err(ShellError::Io(e)) if input::is_interrupt(&e) => return self.interrupted(),
                Err(ShellError::Io(e)) => return Err(ShellError::Io(e)),
                Err(e) => {
                    warn!(error = %e, "command failed");
                    writeln!(self.output, "error: {e}")?;
                }
            }
        }
    }

    fn interrupted(&mut self) -> Result<(), ShellError> {
        writeln!(self.output, "Exit...")?;
        Ok(())
    }

    /// Parse and run one command line.
    async fn execute(&mut self, line: &str) -> Result<Flow, ShellError> {
        let Some(command) = Command::parse(line)? else {
            return Ok(Flow::Continue);
        };
        debug!(?command, "executing");

        if let Some(message) = command.verb().confirmation() {
            let confirmed =
                query_yes_no(message, DefaultAnswer::No, &mut self.input, &mut self.output)
                    .await?;
            if !confirmed {
                debug!(verb = %command.verb(), "declined");
                return Ok(Flow::Continue);
            }
        }

        match command {
            Command::Funds => {
                let margin = self.exchange.margin().await?;
                writeln!(self.output, "{}", render::funds_table(&margin))?;
            }
            Command::Positions => {
                let positions = self.exchange.positions().await?;
                writeln!(self.output, "{}", render::positions_table(&positions))?;
            }
            Command::Orders => {
                let orders = self.exchange.open_orders(self.symbol.as_str()).await?;
                if let Some(completions) = &self.completions {
                    completions.set_orders(&orders);
                }
                writeln!(self.output, "{}", render::orders_table(&orders))?;
            }
            Command::Limit { side, quantity, price } => {
                let request =
                    OrderRequest::limit(self.symbol.as_str(), side, quantity, price, self.post_only);
                let order = self.exchange.place_order(&request).await?;
                info!(order_id = %order.order_id, "limit order placed");
                if let Some(completions) = &self.completions {
                    completions.add_order(&order);
                }
                writeln!(self.output, "{}", render::order_summary(&order))?;
            }
            Command::Market { side, quantity } => {
                let request = OrderRequest::market(self.symbol.as_str(), side, quantity);
                let order = self.exchange.place_order(&request).await?;
                info!(order_id = %order.order_id, "market order placed");
                if let Some(completions) = &self.completions {
                    completions.add_order(&order);
                }
                let text = render::pretty(&order).map_err(ExchangeError::from)?;
                writeln!(self.output, "{text}")?;
            }
            Command::Cancel { order_id } => {
                let cancelled = self.exchange.cancel_order(&order_id).await?;
                info!(%order_id, "order cancelled");
                if let Some(completions) = &self.completions {
                    completions.remove_order(&order_id);
                }
                let text = render::pretty(&cancelled).map_err(ExchangeError::from)?;
                writeln!(self.output, "{text}")?;
            }
            Command::Symbol(None) => {
                writeln!(self.output, "Current symbol: {}", self.symbol)?;
            }
            Command::Symbol(Some(symbol)) => {
                info!(from = %self.symbol, to = %symbol, "switching symbol");
                self.prompt = prompt(self.network, &symbol);
                self.symbol = symbol;
            }
            Command::Help(topic) => self.help(topic)?,
            Command::Exit => return Ok(Flow::Exit),
        }

        Ok(Flow::Continue)
    }

    fn help(&mut self, topic: Option<Verb>) -> Result<(), ShellError> {
        match topic {
            None => {
                writeln!(self.output, "Commands (type help <command>):")?;
                for verb in Verb::all() {
                    writeln!(self.output, "  {:<24} {}", verb.usage(), verb.summary())?;
                }
            }
            Some(verb) => {
                writeln!(self.output, "usage: {}", verb.usage())?;
                writeln!(self.output, "{}", verb.summary())?;
                if !verb.aliases().is_empty() {
                    writeln!(self.output, "aliases: {}", verb.aliases().join(", "))?;
                }
                if let Some(message) = verb.confirmation() {
                    writeln!(self.output, "asks to confirm the {message}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::MockExchange;

    fn symbol(raw: &str) -> Symbol {
        Symbol::new(raw).unwrap()
    }

    #[test]
    fn prompt_colours_network_and_underlines_symbol() {
        assert_eq!(
            prompt(Network::Testnet, &symbol("XBTUSD")),
            "(\x1b[92mtestnet\x1b[0m \x1b[4mXBTUSD\x1b[0m) $ "
        );
        assert!(prompt(Network::Live, &symbol("ethusd")).starts_with("(\x1b[91mlive\x1b[0m"));
    }

    #[tokio::test]
    async fn blank_line_does_nothing() {
        let mut shell = Shell::new(
            MockExchange::new(),
            Network::Testnet,
            symbol("XBTUSD"),
            "\n\n".as_bytes(),
            Vec::new(),
        );
        assert_eq!(shell.execute("   \n").await.unwrap(), Flow::Continue);
        assert!(shell.exchange().calls().is_empty());
    }

    #[tokio::test]
    async fn exit_stops_the_loop() {
        let mut shell = Shell::new(
            MockExchange::new(),
            Network::Testnet,
            symbol("XBTUSD"),
            "".as_bytes(),
            Vec::new(),
        );
        assert_eq!(shell.execute("quit").await.unwrap(), Flow::Exit);
    }
}
