//! Table builders for exchange responses.

use rust_decimal::Decimal;
use serde::Serialize;

use super::table::{Justify, Table};
use crate::exchange::types::{xbt_from_satoshis, Margin, Order, Position};

/// Placeholder for values the exchange does not report.
const NOT_REPORTED: &str = "???";

fn fixed4(value: Decimal) -> String {
    format!("{:.4}", value.round_dp(4))
}

fn xbt(satoshis: Option<i64>) -> String {
    xbt_from_satoshis(satoshis.unwrap_or(0)).normalize().to_string()
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Account funds in XBT.
pub fn funds_table(margin: &Margin) -> Table {
    let rows = vec![
        vec!["Wallet Balance".to_string(), xbt(margin.wallet_balance)],
        vec!["Unrealised PNL".to_string(), xbt(margin.unrealised_pnl)],
        vec!["Margin Balance".to_string(), xbt(margin.margin_balance)],
        vec!["Position Margin".to_string(), xbt(margin.maint_margin)],
        vec!["Order Margin".to_string(), NOT_REPORTED.to_string()],
        vec!["Available Balance".to_string(), xbt(margin.available_margin)],
    ];

    Table::new(rows).with_title("Funds").without_heading_border()
}

/// Open positions; flat positions are left out.
pub fn positions_table(positions: &[Position]) -> Table {
    let mut rows = vec![["Symbol", "Sz", "AvgEntry", "Val", "LiqPx", "UnPNL", "rPNL"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()];

    for p in positions.iter().filter(|p| p.is_open()) {
        rows.push(vec![
            p.symbol.clone(),
            p.quantity().to_string(),
            opt(p.avg_entry_price.map(|d| d.normalize())),
            opt(p.value().map(fixed4)),
            opt(p.liquidation_price.map(|d| d.normalize())),
            fixed4(xbt_from_satoshis(p.unrealised_pnl.unwrap_or(0))),
            fixed4(xbt_from_satoshis(p.realised_pnl.unwrap_or(0))),
        ]);
    }

    if rows.len() == 1 {
        rows.push(Vec::new());
    }

    Table::new(rows)
        .with_title("Positions")
        .justify_all(Justify::Right)
}

/// Working orders.
pub fn orders_table(orders: &[Order]) -> Table {
    let mut rows = vec![["Id", "Sym", "Side", "Px", "Qty", "Status"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()];

    for o in orders {
        rows.push(vec![
            o.short_id().to_string(),
            o.symbol.clone(),
            opt(o.side),
            opt(o.price.map(|d| d.normalize())),
            opt(o.order_qty),
            opt(o.ord_status.as_ref()),
        ]);
    }

    Table::new(rows).with_title("Orders")
}

/// One-line acknowledgement for a placed order.
pub fn order_summary(order: &Order) -> String {
    let mut line = format!(
        "{} {} {}",
        opt(order.side),
        opt(order.order_qty),
        order.symbol
    );
    if let Some(price) = order.price {
        line.push_str(&format!(" @ {}", price.normalize()));
    }
    line.push_str(&format!(" -> order {} {}", order.short_id(), opt(order.ord_status.as_ref())));
    line
}

/// Pretty-printed JSON of any response.
pub fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
