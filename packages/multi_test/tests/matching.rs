use cosmwasm_std::{Event, Uint128};
use msg::error::{ErrorId, PlatformError};
use msg::event::PlatformEventExt;
use msg::platform::entry::ExecuteMsg;
use msg::platform::market::MarketId;
use msg::platform::order::events::TradeEvent;
use msg::platform::order::{OrderSide, OrderType, TimeInForce};
use sharehodl_multi_test::PlatformApp;

fn error_id(err: &anyhow::Error) -> ErrorId {
    PlatformError::try_from_anyhow(err)
        .unwrap_or_else(|| panic!("not a platform error: {err:#}"))
        .id
}

fn place(
    app: &mut PlatformApp,
    sender: &str,
    market_id: &MarketId,
    side: OrderSide,
    order_type: OrderType,
    time_in_force: TimeInForce,
    quantity: u128,
    price: Option<&str>,
    stop_price: Option<&str>,
) -> anyhow::Result<cosmwasm_std::Response> {
    app.exec(
        sender,
        ExecuteMsg::PlaceOrder {
            market_id: market_id.clone(),
            side,
            order_type,
            time_in_force,
            quantity: Uint128::new(quantity),
            price: price.map(|p| p.parse().unwrap()),
            stop_price: stop_price.map(|p| p.parse().unwrap()),
            expires_at: None,
            client_order_id: None,
        },
    )
}

fn find_event<'a>(resp: &'a cosmwasm_std::Response, ty: &str) -> Option<&'a Event> {
    resp.events.iter().find(|e| e.ty == ty)
}

#[test]
fn limit_orders_match_at_maker_price() {
    let mut app = PlatformApp::new();
    let market = app.create_apple_market();
    app.fund("alice", "APPLE", 100);
    app.fund("bob", "uhodl", 9018);

    let resp = place(
        &mut app,
        "alice",
        &market,
        OrderSide::Sell,
        OrderType::Limit,
        TimeInForce::Gtc,
        100,
        Some("150"),
        None,
    )
    .unwrap();
    // the full base quantity is escrowed at acceptance
    assert_eq!(app.balance("alice", "APPLE"), Uint128::zero());
    let placed = find_event(&resp, "place-order").unwrap();
    assert_eq!(placed.string_attr("status").unwrap(), "open");

    let resp = place(
        &mut app,
        "bob",
        &market,
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Gtc,
        60,
        Some("150"),
        None,
    )
    .unwrap();

    let trade = TradeEvent::try_from(find_event(&resp, "trade").unwrap().clone())
        .unwrap()
        .trade;
    assert_eq!(trade.quantity, Uint128::new(60));
    assert_eq!(trade.price.to_string(), "150");
    assert_eq!(trade.buyer.as_str(), "bob");
    assert_eq!(trade.seller.as_str(), "alice");
    assert!(!trade.buyer_is_maker);
    assert_eq!(trade.buyer_fee, Uint128::new(18));
    assert_eq!(trade.seller_fee, Uint128::new(9));

    let placed = find_event(&resp, "place-order").unwrap();
    assert_eq!(placed.string_attr("status").unwrap(), "filled");

    assert_eq!(app.balance("bob", "APPLE"), Uint128::new(60));
    assert_eq!(app.balance("bob", "uhodl"), Uint128::zero());
    assert_eq!(app.balance("alice", "uhodl"), Uint128::new(8991));

    // the maker rests with its remaining 40 escrowed; cancelling returns
    // exactly that
    let resp = app
        .exec(
            "alice",
            ExecuteMsg::CancelOrder {
                order_id: "1".parse().unwrap(),
            },
        )
        .unwrap();
    let cancelled = find_event(&resp, "cancel-order").unwrap();
    assert_eq!(cancelled.string_attr("refunded").unwrap(), "40");
    assert_eq!(app.balance("alice", "APPLE"), Uint128::new(40));
}

#[test]
fn fok_without_full_fill_executes_nothing() {
    let mut app = PlatformApp::new();
    let market = app.create_apple_market();
    app.fund("alice", "APPLE", 30);
    app.fund("bob", "uhodl", 9000);

    place(
        &mut app,
        "alice",
        &market,
        OrderSide::Sell,
        OrderType::Limit,
        TimeInForce::Gtc,
        30,
        Some("150"),
        None,
    )
    .unwrap();

    let resp = place(
        &mut app,
        "bob",
        &market,
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Fok,
        60,
        Some("150"),
        None,
    )
    .unwrap();

    assert!(find_event(&resp, "trade").is_none());
    let cancelled = find_event(&resp, "cancel-order").unwrap();
    assert_eq!(cancelled.string_attr("status").unwrap(), "cancelled");
    // all escrow returned
    assert_eq!(app.balance("bob", "uhodl"), Uint128::new(9000));
}

#[test]
fn ioc_partial_fill_cancels_residual() {
    let mut app = PlatformApp::new();
    let market = app.create_apple_market();
    app.fund("alice", "APPLE", 50);
    app.fund("bob", "uhodl", 9100);

    place(
        &mut app,
        "alice",
        &market,
        OrderSide::Sell,
        OrderType::Limit,
        TimeInForce::Gtc,
        50,
        Some("150"),
        None,
    )
    .unwrap();

    let resp = place(
        &mut app,
        "bob",
        &market,
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Ioc,
        60,
        Some("150"),
        None,
    )
    .unwrap();

    let trade = TradeEvent::try_from(find_event(&resp, "trade").unwrap().clone())
        .unwrap()
        .trade;
    assert_eq!(trade.quantity, Uint128::new(50));
    let cancelled = find_event(&resp, "cancel-order").unwrap();
    assert_eq!(cancelled.string_attr("status").unwrap(), "partially_filled");
    // 10 unfilled at 150 returns 1500 of the 9000 escrow
    assert_eq!(cancelled.string_attr("refunded").unwrap(), "1500");
    assert_eq!(app.balance("bob", "APPLE"), Uint128::new(50));
}

#[test]
fn placement_validation_rejects_bad_orders() {
    let mut app = PlatformApp::new();
    let market = app.create_apple_market();
    app.fund("bob", "uhodl", 1_000_000);

    // off-tick price
    let err = place(
        &mut app,
        "bob",
        &market,
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Gtc,
        10,
        Some("150.001"),
        None,
    )
    .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InvalidMarket);

    // below the market minimum
    let err = place(
        &mut app,
        "bob",
        &market,
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Gtc,
        0,
        Some("150"),
        None,
    )
    .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::OrderTooSmall);

    // unknown market
    let err = place(
        &mut app,
        "bob",
        &MarketId::new("TESLA", "uhodl"),
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Gtc,
        10,
        Some("150"),
        None,
    )
    .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::MarketNotFound);

    // insufficient funds for a sell
    let err = place(
        &mut app,
        "bob",
        &market,
        OrderSide::Sell,
        OrderType::Limit,
        TimeInForce::Gtc,
        10,
        Some("150"),
        None,
    )
    .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InsufficientFunds);
}

#[test]
fn stop_orders_trigger_on_price_cross() {
    let mut app = PlatformApp::new();
    let market = app.create_apple_market();
    app.fund("alice", "APPLE", 20);
    app.fund("bob", "uhodl", 10_000);
    app.fund("carol", "APPLE", 10);
    app.fund("eve", "uhodl", 5_000);

    // seed a last price of 150
    place(
        &mut app,
        "alice",
        &market,
        OrderSide::Sell,
        OrderType::Limit,
        TimeInForce::Gtc,
        10,
        Some("150"),
        None,
    )
    .unwrap();
    place(
        &mut app,
        "bob",
        &market,
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Gtc,
        10,
        Some("150"),
        None,
    )
    .unwrap();

    // carol protects with a sell stop at 140; eve quotes a resting bid
    let resp = place(
        &mut app,
        "carol",
        &market,
        OrderSide::Sell,
        OrderType::Stop,
        TimeInForce::Gtc,
        10,
        None,
        Some("140"),
    )
    .unwrap();
    assert_eq!(
        find_event(&resp, "place-order")
            .unwrap()
            .string_attr("status")
            .unwrap(),
        "pending"
    );
    place(
        &mut app,
        "eve",
        &market,
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Gtc,
        10,
        Some("139"),
        None,
    )
    .unwrap();

    // a trade at 140 drags the last price onto the trigger
    place(
        &mut app,
        "alice",
        &market,
        OrderSide::Sell,
        OrderType::Limit,
        TimeInForce::Gtc,
        10,
        Some("140"),
        None,
    )
    .unwrap();
    place(
        &mut app,
        "bob",
        &market,
        OrderSide::Buy,
        OrderType::Limit,
        TimeInForce::Gtc,
        10,
        Some("140"),
        None,
    )
    .unwrap();

    let resp = app.advance_blocks(5).unwrap();
    assert!(find_event(&resp, "stop-triggered").is_some());
    let trade = TradeEvent::try_from(find_event(&resp, "trade").unwrap().clone())
        .unwrap()
        .trade;
    // the triggered stop became a market sell and hit eve's bid
    assert_eq!(trade.seller.as_str(), "carol");
    assert_eq!(trade.price.to_string(), "139");
    assert_eq!(trade.quantity, Uint128::new(10));
}

#[test]
fn gtd_orders_expire_and_refund() {
    let mut app = PlatformApp::new();
    let market = app.create_apple_market();
    app.fund("bob", "uhodl", 9000);

    let expires_at = app.time.plus_seconds(100);
    app.exec(
        "bob",
        ExecuteMsg::PlaceOrder {
            market_id: market,
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtd,
            quantity: Uint128::new(60),
            price: Some("150".parse().unwrap()),
            stop_price: None,
            expires_at: Some(expires_at),
            client_order_id: None,
        },
    )
    .unwrap();
    assert_eq!(app.balance("bob", "uhodl"), Uint128::zero());

    // not yet due
    let resp = app.advance_blocks(50).unwrap();
    assert!(find_event(&resp, "order-expired").is_none());

    let resp = app.advance_blocks(100).unwrap();
    let expired = find_event(&resp, "order-expired").unwrap();
    assert_eq!(expired.string_attr("refunded").unwrap(), "9000");
    assert_eq!(app.balance("bob", "uhodl"), Uint128::new(9000));
}
