use cosmwasm_std::Uint128;
use msg::error::{ErrorId, PlatformError};
use msg::event::PlatformEventExt;
use msg::platform::entry::ExecuteMsg;
use msg::platform::order::{OrderSide, OrderType, TimeInForce};
use sharehodl_multi_test::{PlatformApp, GOVERNANCE};

fn error_id(err: &anyhow::Error) -> ErrorId {
    PlatformError::try_from_anyhow(err)
        .unwrap_or_else(|| panic!("not a platform error: {err:#}"))
        .id
}

/// Seeds `APPLE/uhodl` with zero trading fees and a last price of 150.
fn setup_priced_market(app: &mut PlatformApp) {
    app.exec(
        GOVERNANCE,
        ExecuteMsg::CreateMarket {
            base: "APPLE".to_owned(),
            quote: "uhodl".to_owned(),
            tick_size: "0.01".parse().unwrap(),
            lot_size: Uint128::new(1),
            min_order_size: Uint128::new(1),
            max_order_size: Uint128::new(1_000_000_000),
            maker_fee: Some("0".parse().unwrap()),
            taker_fee: Some("0".parse().unwrap()),
        },
    )
    .unwrap();

    app.fund("seed-seller", "APPLE", 1);
    app.fund("seed-buyer", "uhodl", 150);
    for (sender, side) in [("seed-seller", OrderSide::Sell), ("seed-buyer", OrderSide::Buy)] {
        app.exec(
            sender,
            ExecuteMsg::PlaceOrder {
                market_id: msg::platform::market::MarketId::new("APPLE", "uhodl"),
                side,
                order_type: OrderType::Limit,
                time_in_force: TimeInForce::Gtc,
                quantity: Uint128::new(1),
                price: Some("150".parse().unwrap()),
                stop_price: None,
                expires_at: None,
                client_order_id: None,
            },
        )
        .unwrap();
    }
}

#[test]
fn fee_in_fee_denom_settles_directly() {
    let mut app = PlatformApp::new();
    app.fund("uma", "uhodl", 500);

    app.deduct_fee("uma", Uint128::new(300)).unwrap();
    assert_eq!(app.balance("uma", "uhodl"), Uint128::new(200));
    assert_eq!(app.module_balance("fees", "uhodl"), Uint128::new(300));
}

#[test]
fn auto_swap_covers_shortfall_from_module_reserves() {
    let mut app = PlatformApp::new();
    setup_priced_market(&mut app);
    app.fund_module("fees", "uhodl", 10_000);
    app.fund("uma", "APPLE", 10);
    let supply_before = app.supply("uhodl");

    // shortfall 300 at price 150 with 1% slippage sizes the swap at
    // ceil(300 * 1.01 / 150) = 3 equity units
    let resp = app.deduct_fee("uma", Uint128::new(300)).unwrap();

    let swap = resp
        .events
        .iter()
        .find(|e| e.ty == "equity-to-fee-swap")
        .unwrap();
    assert_eq!(swap.string_attr("equity-amount").unwrap(), "3");
    // floor(3 * 150 * 0.997) = 448 paid out of reserves, never minted
    assert_eq!(swap.string_attr("output-amount").unwrap(), "448");

    assert_eq!(app.balance("uma", "APPLE"), Uint128::new(7));
    assert_eq!(app.balance("uma", "uhodl"), Uint128::new(148));
    // reserves: -448 output, +300 fee
    assert_eq!(app.module_balance("fees", "uhodl"), Uint128::new(9852));
    assert_eq!(app.supply("uhodl"), supply_before);
}

#[test]
fn auto_swap_skips_unpriced_markets() {
    let mut app = PlatformApp::new();
    // market exists but has never traded: last price is zero
    app.create_apple_market();
    app.fund_module("fees", "uhodl", 10_000);
    app.fund("uma", "APPLE", 10);

    let err = app.deduct_fee("uma", Uint128::new(300)).unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InsufficientFunds);
    // nothing moved and nothing was minted
    assert_eq!(app.balance("uma", "APPLE"), Uint128::new(10));
    assert_eq!(app.module_balance("fees", "uhodl"), Uint128::new(10_000));
}

#[test]
fn auto_swap_failure_rolls_back_entirely() {
    let mut app = PlatformApp::new();
    setup_priced_market(&mut app);
    app.fund_module("fees", "uhodl", 10_000);
    // one equity unit converts to 149, far short of the 300 fee
    app.fund("uma", "APPLE", 1);

    let err = app.deduct_fee("uma", Uint128::new(300)).unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InsufficientFunds);
    assert_eq!(app.balance("uma", "APPLE"), Uint128::new(1));
    assert_eq!(app.balance("uma", "uhodl"), Uint128::zero());
    assert_eq!(app.module_balance("fees", "uhodl"), Uint128::new(10_000));
}

#[test]
fn auto_swap_never_drains_reserves_below_output() {
    let mut app = PlatformApp::new();
    setup_priced_market(&mut app);
    // reserves cannot cover the would-be output of 448
    app.fund_module("fees", "uhodl", 100);
    app.fund("uma", "APPLE", 10);

    let err = app.deduct_fee("uma", Uint128::new(300)).unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InsufficientFunds);
    // the equity was refunded when the reserve check failed
    assert_eq!(app.balance("uma", "APPLE"), Uint128::new(10));
    assert_eq!(app.module_balance("fees", "uhodl"), Uint128::new(100));
}
