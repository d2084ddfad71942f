//! End-to-end tests driving the shell over in-memory input.

use bitmex_shell::config::Network;
use bitmex_shell::exchange::types::POST_ONLY_EXEC_INST;
use bitmex_shell::exchange::{
    ExchangeCall, Margin, MockExchange, OrdType, Order, OrderRequest, OrderStatus, Position, Side,
};
use bitmex_shell::shell::{Completions, Shell, Symbol, BANNER};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

/// Run a whole session and return what was printed.
async fn session(exchange: &MockExchange, input: &'static str) -> String {
    session_on(exchange, Network::Testnet, "XBTUSD", input).await
}

async fn session_on(
    exchange: &MockExchange,
    network: Network,
    symbol: &str,
    input: &'static str,
) -> String {
    let mut shell = Shell::new(
        exchange.clone(),
        network,
        Symbol::new(symbol).unwrap(),
        input.as_bytes(),
        Vec::new(),
    );
    shell.run().await.unwrap();
    String::from_utf8(shell.output().clone()).unwrap()
}

fn working_order(id: &str, symbol: &str) -> Order {
    Order {
        order_id: id.to_string(),
        cl_ord_id: None,
        symbol: symbol.to_string(),
        side: Some(Side::Sell),
        price: Some(dec!(11000)),
        order_qty: Some(5),
        leaves_qty: Some(5),
        ord_type: Some(OrdType::Limit),
        ord_status: Some(OrderStatus::New),
        text: None,
        extra: Default::default(),
    }
}

#[tokio::test]
async fn banner_is_printed_and_eof_closes_exchange() {
    let exchange = MockExchange::new();
    let output = session(&exchange, "").await;

    assert!(output.starts_with(BANNER));
    assert_eq!(exchange.calls(), vec![ExchangeCall::Close]);
}

#[tokio::test]
async fn exit_closes_exchange_and_ignores_the_rest() {
    let exchange = MockExchange::new();
    session(&exchange, "exit\nfunds\n").await;

    assert_eq!(exchange.calls(), vec![ExchangeCall::Close]);
}

#[tokio::test]
async fn read_commands_call_one_method_each() {
    let exchange = MockExchange::new();
    session(&exchange, "funds\np\npositions\no\n").await;

    assert_eq!(
        exchange.calls(),
        vec![
            ExchangeCall::Margin,
            ExchangeCall::Positions,
            ExchangeCall::Positions,
            ExchangeCall::OpenOrders("XBTUSD".to_string()),
            ExchangeCall::Close,
        ]
    );
}

#[tokio::test]
async fn funds_prints_table() {
    let exchange = MockExchange::new();
    exchange.set_margin(Margin {
        currency: Some("XBt".to_string()),
        wallet_balance: Some(250_000_000),
        ..Default::default()
    });

    let output = session(&exchange, "funds\n").await;
    assert!(output.contains("┌Funds"));
    assert!(output.contains("│ Wallet Balance    │ 2.5 │"));
    assert!(output.contains("│ Order Margin      │ ??? │"));
}

#[tokio::test]
async fn positions_hide_flat_rows() {
    let exchange = MockExchange::new();
    exchange.add_position(Position {
        symbol: "XBTUSD".to_string(),
        current_qty: Some(-200),
        avg_entry_price: Some(dec!(8000)),
        ..Default::default()
    });
    exchange.add_position(Position {
        symbol: "ETHUSD".to_string(),
        current_qty: Some(0),
        ..Default::default()
    });

    let output = session(&exchange, "positions\n").await;
    assert!(output.contains("XBTUSD"));
    assert!(output.contains("-0.0250"));
    assert!(!output.contains("ETHUSD"));
}

#[tokio::test]
async fn orders_only_list_active_symbol() {
    let exchange = MockExchange::new();
    exchange.add_order(working_order("aaaa1111-2222", "XBTUSD"));
    exchange.add_order(working_order("bbbb3333-4444", "ETHUSD"));

    let output = session(&exchange, "orders\n").await;
    assert!(output.contains("┌Orders"));
    assert!(output.contains("aaaa1111"));
    assert!(!output.contains("bbbb3333"));
}

#[tokio::test]
async fn confirmed_limit_buy_is_post_only() {
    let exchange = MockExchange::new();
    let output = session(&exchange, "buy 100 9500\ny\n").await;

    assert_eq!(
        exchange.calls(),
        vec![
            ExchangeCall::PlaceOrder(OrderRequest::limit("XBTUSD", Side::Buy, 100, dec!(9500), true)),
            ExchangeCall::Close,
        ]
    );
    assert!(output.contains("Confirm BUY order? [y/N] "));
    assert!(output.contains("Buy 100 XBTUSD @ 9500 -> order mock0001 New"));
}

#[tokio::test]
async fn limit_orders_honour_post_only_setting() {
    let exchange = MockExchange::new();
    let mut shell = Shell::new(
        exchange.clone(),
        Network::Testnet,
        Symbol::new("XBTUSD").unwrap(),
        "s 7 10250.5\nyes\n".as_bytes(),
        Vec::new(),
    )
    .with_post_only(false);
    shell.run().await.unwrap();

    match &exchange.calls()[0] {
        ExchangeCall::PlaceOrder(request) => {
            assert_eq!(request.side, Side::Sell);
            assert_eq!(request.order_qty, 7);
            assert_eq!(request.price, Some(dec!(10250.5)));
            assert_eq!(request.exec_inst, None);
        }
        other => panic!("unexpected call {other:?}"),
    }

    let post_only = OrderRequest::limit("XBTUSD", Side::Sell, 7, dec!(10250.5), true);
    assert_eq!(post_only.exec_inst.as_deref(), Some(POST_ONLY_EXEC_INST));
}

#[tokio::test]
async fn market_orders_print_json() {
    let exchange = MockExchange::new();
    let output = session(&exchange, "mb 10\ny\nms 3\nY\n").await;

    assert_eq!(
        exchange.calls(),
        vec![
            ExchangeCall::PlaceOrder(OrderRequest::market("XBTUSD", Side::Buy, 10)),
            ExchangeCall::PlaceOrder(OrderRequest::market("XBTUSD", Side::Sell, 3)),
            ExchangeCall::Close,
        ]
    );
    assert!(output.contains("Confirm MARKET BUY? [y/N] "));
    assert!(output.contains("Confirm MARKET SELL? [y/N] "));
    assert!(output.contains("\"ordType\": \"Market\""));
}

#[tokio::test]
async fn market_fill_details_are_printed() {
    let exchange = MockExchange::new();
    exchange.set_fill_price(dec!(9512.5));

    let output = session(&exchange, "mb 10
y
").await;

    assert!(output.contains("\"avgPx\": 9512.5"));
    assert!(output.contains("\"cumQty\": 10"));
    assert!(output.contains("\"ordStatus\": \"Filled\""));
    assert!(!output.contains("\"text\": null"));
}

#[tokio::test]
async fn cancel_marks_order_cancelled() {
    let exchange = MockExchange::new();
    exchange.add_order(working_order("aaaa1111-2222", "XBTUSD"));

    let output = session(&exchange, "cancelorder aaaa1111-2222\ny\n").await;

    assert_eq!(
        exchange.calls(),
        vec![
            ExchangeCall::CancelOrder("aaaa1111-2222".to_string()),
            ExchangeCall::Close,
        ]
    );
    assert!(output.contains("Confirm CANCEL order? [y/N] "));
    assert!(output.contains("\"ordStatus\": \"Canceled\""));
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() {
    let exchange = MockExchange::new();
    session(&exchange, "buy 1 9000\nn\nsell 1 9000\n\ncancel abc\nno\n").await;

    assert_eq!(exchange.calls(), vec![ExchangeCall::Close]);
}

#[tokio::test]
async fn end_of_input_during_confirmation_sends_nothing() {
    let exchange = MockExchange::new();
    session(&exchange, "mb 100\n").await;

    assert_eq!(exchange.calls(), vec![ExchangeCall::Close]);
}

#[tokio::test]
async fn invalid_confirmation_answer_is_asked_again() {
    let exchange = MockExchange::new();
    let output = session(&exchange, "ms 1\nsure\ny\n").await;

    assert!(output.contains("Please respond with 'yes' or 'no' (or 'y' or 'n')."));
    assert_eq!(exchange.calls().len(), 2);
}

#[tokio::test]
async fn bad_arguments_never_reach_the_exchange() {
    let exchange = MockExchange::new();
    let output = session(&exchange, "buy 100\nbuy x 1\nmb 0\ncancel\n").await;

    assert_eq!(exchange.calls(), vec![ExchangeCall::Close]);
    assert!(output.contains("error: usage: buy <quantity> <price>"));
    assert!(output.contains("error: invalid quantity: x"));
    assert!(output.contains("error: invalid quantity: 0"));
    assert!(output.contains("error: usage: cancel <order_id>"));
    assert!(!output.contains("Confirm"));
}

#[tokio::test]
async fn symbol_switch_uppercases_and_updates_prompt() {
    let exchange = MockExchange::new();
    let output = session(&exchange, "symbol\nsymbol ethusd\nsymbol\no\n").await;

    assert!(output.contains("Current symbol: XBTUSD\n"));
    assert!(output.contains("\x1b[4mETHUSD\x1b[0m) $ "));
    assert!(output.contains("Current symbol: ETHUSD\n"));
    assert_eq!(
        exchange.calls(),
        vec![ExchangeCall::OpenOrders("ETHUSD".to_string()), ExchangeCall::Close]
    );
}

#[tokio::test]
async fn shell_tracks_symbol_and_prompt_after_switch() {
    let exchange = MockExchange::new();
    let mut shell = Shell::new(
        exchange.clone(),
        Network::Live,
        Symbol::new("XBTUSD").unwrap(),
        "symbol ethusd\n".as_bytes(),
        Vec::new(),
    );
    assert_eq!(shell.symbol().as_str(), "XBTUSD");

    shell.run().await.unwrap();

    assert_eq!(shell.symbol().as_str(), "ETHUSD");
    assert_eq!(shell.prompt(), "(\x1b[91mlive\x1b[0m \x1b[4mETHUSD\x1b[0m) $ ");
}

#[tokio::test]
async fn prompt_colour_follows_network() {
    let exchange = MockExchange::new();
    let testnet = session(&exchange, "").await;
    let live = session_on(&exchange, Network::Live, "xbtusd", "").await;

    assert!(testnet.contains("(\x1b[92mtestnet\x1b[0m \x1b[4mXBTUSD\x1b[0m) $ "));
    assert!(live.contains("(\x1b[91mlive\x1b[0m \x1b[4mXBTUSD\x1b[0m) $ "));
}

#[tokio::test]
async fn unknown_command_is_reported() {
    let exchange = MockExchange::new();
    let output = session(&exchange, "withdraw 1\n\nfunds\n").await;

    assert!(output.contains("error: unknown command: withdraw"));
    assert_eq!(exchange.calls(), vec![ExchangeCall::Margin, ExchangeCall::Close]);
}

#[tokio::test]
async fn exchange_errors_are_printed_and_loop_continues() {
    let exchange = MockExchange::new();
    exchange.fail_with("service unavailable");

    let output = session(&exchange, "funds\npositions\n").await;

    assert_eq!(output.matches("error: exchange error: HTTP 500: service unavailable").count(), 2);
    assert_eq!(
        exchange.calls(),
        vec![ExchangeCall::Margin, ExchangeCall::Positions, ExchangeCall::Close]
    );
}

#[tokio::test]
async fn help_lists_commands() {
    let exchange = MockExchange::new();
    let output = session(&exchange, "help\n? mb\n").await;

    assert!(output.contains("buy <quantity> <price>"));
    assert!(output.contains("cancel <order_id>"));
    assert!(output.contains("usage: market-buy <quantity>"));
    assert!(output.contains("aliases: mb"));
    assert_eq!(exchange.calls(), vec![ExchangeCall::Close]);
}

/// Run a session that keeps a completion cache up to date.
async fn completing_session(exchange: &MockExchange, input: &'static str) -> Completions {
    let completions = Completions::new();
    let mut shell = Shell::new(
        exchange.clone(),
        Network::Testnet,
        Symbol::new("XBTUSD").unwrap(),
        input.as_bytes(),
        Vec::new(),
    )
    .with_completions(completions.clone());
    shell.run().await.unwrap();
    completions
}

#[tokio::test]
async fn completion_loads_symbols_and_order_ids_at_start() {
    let exchange = MockExchange::new();
    exchange.add_instrument("XBTUSD");
    exchange.add_instrument("XBTZ19");
    exchange.add_instrument("XBT_USDT");
    exchange.add_order(working_order("aaaa1111-2222", "XBTUSD"));
    exchange.add_order(working_order("bbbb3333-4444", "ETHUSD"));

    let completions = completing_session(&exchange, "").await;

    assert_eq!(
        exchange.calls(),
        vec![
            ExchangeCall::Instruments,
            ExchangeCall::OpenOrders("XBTUSD".to_string()),
            ExchangeCall::Close,
        ]
    );
    assert_eq!(
        completions.complete("symbol xbt", 10),
        (7, vec!["XBTUSD".to_string(), "XBTZ19".to_string()])
    );
    assert_eq!(
        completions.complete("cancel a", 8),
        (7, vec!["aaaa1111-2222".to_string()])
    );
}

#[tokio::test]
async fn placed_orders_become_completable_until_cancelled() {
    let exchange = MockExchange::new();

    let order_id = "mock0001-0000-0000-0000-000000000000";

    let completions = completing_session(&exchange, "buy 5 9000\ny\n").await;
    assert_eq!(completions.complete("cancel mock", 11).1, vec![order_id.to_string()]);

    let completions =
        completing_session(&exchange, "cancel mock0001-0000-0000-0000-000000000000\ny\n").await;
    assert!(completions.complete("cancel mock", 11).1.is_empty());
}

#[tokio::test]
async fn completion_survives_exchange_failure() {
    let exchange = MockExchange::new();
    exchange.fail_with("service unavailable");

    let completions = completing_session(&exchange, "").await;

    assert!(completions.symbols().is_empty());
    assert!(completions.complete("fu", 2).1.contains(&"funds".to_string()));
}
