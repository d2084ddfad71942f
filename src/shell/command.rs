//! Command verbs and argument parsing.

use std::str::FromStr;

use rust_decimal::Decimal;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::CommandError;
use crate::exchange::types::Side;

/// The active trading symbol: trimmed, uppercase, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// Normalize and validate a symbol.
    pub fn new(raw: &str) -> Result<Self, CommandError> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CommandError::EmptySymbol);
        }
        Ok(Self(symbol))
    }

    /// Symbol as sent to the exchange.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A command name, with its short aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Verb {
    /// Account funds.
    #[strum(to_string = "funds")]
    Funds,
    /// Open positions.
    #[strum(to_string = "positions", serialize = "p")]
    Positions,
    /// Working orders for the current symbol.
    #[strum(to_string = "orders", serialize = "o")]
    Orders,
    /// Limit buy.
    #[strum(to_string = "buy", serialize = "b")]
    Buy,
    /// Market buy.
    #[strum(to_string = "market-buy", serialize = "mb")]
    MarketBuy,
    /// Limit sell.
    #[strum(to_string = "sell", serialize = "s")]
    Sell,
    /// Market sell.
    #[strum(to_string = "market-sell", serialize = "ms")]
    MarketSell,
    /// Cancel an order.
    #[strum(to_string = "cancel", serialize = "cancelorder")]
    Cancel,
    /// Show or switch the symbol.
    #[strum(to_string = "symbol")]
    Symbol,
    /// List commands.
    #[strum(to_string = "help", serialize = "?")]
    Help,
    /// Leave the shell.
    #[strum(to_string = "exit", serialize = "quit")]
    Exit,
}

impl Verb {
    /// Short aliases accepted besides the full name.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Verb::Positions => &["p"],
            Verb::Orders => &["o"],
            Verb::Buy => &["b"],
            Verb::MarketBuy => &["mb"],
            Verb::Sell => &["s"],
            Verb::MarketSell => &["ms"],
            Verb::Cancel => &["cancelorder"],
            Verb::Help => &["?"],
            Verb::Exit => &["quit"],
            Verb::Funds | Verb::Symbol => &[],
        }
    }

    /// Usage line.
    pub fn usage(&self) -> &'static str {
        match self {
            Verb::Funds => "funds",
            Verb::Positions => "positions",
            Verb::Orders => "orders",
            Verb::Buy => "buy <quantity> <price>",
            Verb::MarketBuy => "market-buy <quantity>",
            Verb::Sell => "sell <quantity> <price>",
            Verb::MarketSell => "market-sell <quantity>",
            Verb::Cancel => "cancel <order_id>",
            Verb::Symbol => "symbol [symbol]",
            Verb::Help => "help [command]",
            Verb::Exit => "exit",
        }
    }

    /// One-line description.
    pub fn summary(&self) -> &'static str {
        match self {
            Verb::Funds => "Print funds",
            Verb::Positions => "Print open positions",
            Verb::Orders => "Print working orders for the current symbol",
            Verb::Buy => "Place a limit buy order",
            Verb::MarketBuy => "Place a market buy order",
            Verb::Sell => "Place a limit sell order",
            Verb::MarketSell => "Place a market sell order",
            Verb::Cancel => "Cancel an order by id",
            Verb::Symbol => "Print the current symbol, or switch to another",
            Verb::Help => "List commands, or describe one",
            Verb::Exit => "Leave the shell",
        }
    }

    /// What the operator is asked to confirm, for verbs that send orders.
    pub fn confirmation(&self) -> Option<&'static str> {
        match self {
            Verb::Buy => Some("BUY order"),
            Verb::MarketBuy => Some("MARKET BUY"),
            Verb::Sell => Some("SELL order"),
            Verb::MarketSell => Some("MARKET SELL"),
            Verb::Cancel => Some("CANCEL order"),
            _ => None,
        }
    }

    /// All verbs in help order.
    pub fn all() -> impl Iterator<Item = Verb> {
        Verb::iter()
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print funds.
    Funds,
    /// Print positions.
    Positions,
    /// Print working orders.
    Orders,
    /// Limit order.
    Limit {
        /// Order side.
        side: Side,
        /// Contracts.
        quantity: u64,
        /// Limit price.
        price: Decimal,
    },
    /// Market order.
    Market {
        /// Order side.
        side: Side,
        /// Contracts.
        quantity: u64,
    },
    /// Cancel by order id.
    Cancel {
        /// Exchange order id.
        order_id: String,
    },
    /// Show (`None`) or switch the symbol.
    Symbol(Option<Symbol>),
    /// Help, optionally for one verb.
    Help(Option<Verb>),
    /// Leave the shell.
    Exit,
}

impl Command {
    /// Parse a command line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, args) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        // `?funds` is help for funds, as in most line-oriented shells.
        if let Some(topic) = word.strip_prefix('?').filter(|t| !t.is_empty()) {
            return Ok(Some(Command::Help(Some(parse_verb(topic)?))));
        }

        let verb = parse_verb(word)?;
        Self::from_verb(verb, args).map(Some)
    }

    /// Build the command for a verb from its argument string.
    pub fn from_verb(verb: Verb, args: &str) -> Result<Command, CommandError> {
        let usage = CommandError::Usage { usage: verb.usage() };

        let command = match verb {
            Verb::Funds => Command::Funds,
            Verb::Positions => Command::Positions,
            Verb::Orders => Command::Orders,
            Verb::Buy | Verb::Sell => {
                let side = if verb == Verb::Buy { Side::Buy } else { Side::Sell };
                let mut parts = args.split_whitespace();
                let (Some(quantity), Some(price), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(usage);
                };
                Command::Limit {
                    side,
                    quantity: parse_quantity(quantity)?,
                    price: parse_price(price)?,
                }
            }
            Verb::MarketBuy | Verb::MarketSell => {
                let side = if verb == Verb::MarketBuy { Side::Buy } else { Side::Sell };
                let mut parts = args.split_whitespace();
                let (Some(quantity), None) = (parts.next(), parts.next()) else {
                    return Err(usage);
                };
                Command::Market {
                    side,
                    quantity: parse_quantity(quantity)?,
                }
            }
            Verb::Cancel => {
                let mut parts = args.split_whitespace();
                let (Some(order_id), None) = (parts.next(), parts.next()) else {
                    return Err(usage);
                };
                Command::Cancel {
                    order_id: order_id.to_string(),
                }
            }
            Verb::Symbol => match args {
                "" => Command::Symbol(None),
                symbol if symbol.split_whitespace().count() == 1 => {
                    Command::Symbol(Some(Symbol::new(symbol)?))
                }
                _ => return Err(usage),
            },
            Verb::Help => match args {
                "" => Command::Help(None),
                topic => Command::Help(Some(parse_verb(topic)?)),
            },
            Verb::Exit => Command::Exit,
        };

        Ok(command)
    }

    /// The verb this command was parsed from.
    pub fn verb(&self) -> Verb {
        match self {
            Command::Funds => Verb::Funds,
            Command::Positions => Verb::Positions,
            Command::Orders => Verb::Orders,
            Command::Limit { side: Side::Buy, .. } => Verb::Buy,
            Command::Limit { side: Side::Sell, .. } => Verb::Sell,
            Command::Market { side: Side::Buy, .. } => Verb::MarketBuy,
            Command::Market { side: Side::Sell, .. } => Verb::MarketSell,
            Command::Cancel { .. } => Verb::Cancel,
            Command::Symbol(_) => Verb::Symbol,
            Command::Help(_) => Verb::Help,
            Command::Exit => Verb::Exit,
        }
    }
}

fn parse_verb(word: &str) -> Result<Verb, CommandError> {
    Verb::from_str(&word.to_lowercase()).map_err(|_| CommandError::UnknownCommand(word.to_string()))
}

fn parse_quantity(raw: &str) -> Result<u64, CommandError> {
    match raw.parse::<u64>() {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(CommandError::InvalidQuantity(raw.to_string())),
    }
}

fn parse_price(raw: &str) -> Result<Decimal, CommandError> {
    match Decimal::from_str(raw) {
        Ok(p) if p > Decimal::ZERO => Ok(p),
        _ => Err(CommandError::InvalidPrice(raw.to_string())),
    }
}
