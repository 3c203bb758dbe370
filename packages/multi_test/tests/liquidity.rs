use cosmwasm_std::{Event, Response, Uint128};
use msg::error::{ErrorId, PlatformError};
use msg::event::PlatformEventExt;
use msg::platform::entry::ExecuteMsg;
use msg::platform::market::MarketId;
use msg::platform::order::{OrderSide, OrderType, TimeInForce};
use sharehodl_multi_test::PlatformApp;

fn error_id(err: &anyhow::Error) -> ErrorId {
    PlatformError::try_from_anyhow(err)
        .unwrap_or_else(|| panic!("not a platform error: {err:#}"))
        .id
}

fn find_event<'a>(resp: &'a Response, ty: &str) -> Option<&'a Event> {
    resp.events.iter().find(|e| e.ty == ty)
}

fn setup_pool(app: &mut PlatformApp) -> MarketId {
    let market = app.create_apple_market();
    app.fund("lp-1", "APPLE", 1_000);
    app.fund("lp-1", "uhodl", 150_000);
    app.exec(
        "lp-1",
        ExecuteMsg::CreateLiquidityPool {
            market_id: market.clone(),
            fee_rate: "0.003".parse().unwrap(),
            base_amount: Uint128::new(1_000),
            quote_amount: Uint128::new(150_000),
        },
    )
    .unwrap();
    market
}

#[test]
fn pool_lifecycle_and_swap_pricing() {
    let mut app = PlatformApp::new();
    let market = setup_pool(&mut app);

    // initial shares are the geometric mean of the reserves
    // sqrt(1000 * 150000) ~ 12247
    let err = app
        .exec(
            "lp-1",
            ExecuteMsg::CreateLiquidityPool {
                market_id: market.clone(),
                fee_rate: "0.003".parse().unwrap(),
                base_amount: Uint128::new(1),
                quote_amount: Uint128::new(1),
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::MarketAlreadyExists);

    // a second provider must match the reserve ratio
    app.fund("lp-2", "APPLE", 100);
    app.fund("lp-2", "uhodl", 20_000);
    let resp = app
        .exec(
            "lp-2",
            ExecuteMsg::AddLiquidity {
                market_id: market.clone(),
                base_amount: Uint128::new(100),
                quote_amount: Uint128::new(20_000),
            },
        )
        .unwrap();
    let added = find_event(&resp, "liquidity-added").unwrap();
    // only the ratio-matching 15,000 quote is taken
    assert_eq!(added.string_attr("quote-amount").unwrap(), "15000");
    assert_eq!(app.balance("lp-2", "uhodl"), Uint128::new(5_000));

    // constant-product swap: 1000 APPLE in (after the 0.3% fee: 997)
    // against reserves of 1100/165000 yields
    // floor(165000 * 997 / (1100 + 997)) = 78447
    app.fund("trader", "APPLE", 1_000);
    let resp = app
        .exec(
            "trader",
            ExecuteMsg::Swap {
                market_id: market.clone(),
                offer_denom: "APPLE".to_owned(),
                offer_amount: Uint128::new(1_000),
                min_receive: None,
            },
        )
        .unwrap();
    let swap = find_event(&resp, "swap").unwrap();
    assert_eq!(swap.string_attr("fee").unwrap(), "3");
    assert_eq!(swap.string_attr("ask-amount").unwrap(), "78447");
    assert_eq!(app.balance("trader", "uhodl"), Uint128::new(78_447));

    // a tighter minimum rejects the same swap
    app.fund("trader", "APPLE", 1_000);
    let err = app
        .exec(
            "trader",
            ExecuteMsg::Swap {
                market_id: market.clone(),
                offer_denom: "APPLE".to_owned(),
                offer_amount: Uint128::new(1_000),
                min_receive: Some(Uint128::new(100_000)),
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::AmountTooSmall);

    // unknown denom
    let err = app
        .exec(
            "trader",
            ExecuteMsg::Swap {
                market_id: market.clone(),
                offer_denom: "TESLA".to_owned(),
                offer_amount: Uint128::new(10),
                min_receive: None,
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InvalidAsset);
}

#[test]
fn removing_liquidity_returns_proportional_reserves() {
    let mut app = PlatformApp::new();
    let market = setup_pool(&mut app);

    let err = app
        .exec(
            "lp-1",
            ExecuteMsg::RemoveLiquidity {
                market_id: market.clone(),
                lp_amount: Uint128::new(u64::MAX as u128),
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InsufficientBalance);

    // sqrt(1000 * 150000) = 12247 shares were minted; burning half
    // returns half the reserves (floored)
    app.exec(
        "lp-1",
        ExecuteMsg::RemoveLiquidity {
            market_id: market.clone(),
            lp_amount: Uint128::new(6_123),
        },
    )
    .unwrap();
    assert_eq!(app.balance("lp-1", "APPLE"), Uint128::new(499));
    assert_eq!(app.balance("lp-1", "uhodl"), Uint128::new(74_993));
}

/// Trading fees collected by the dex sweep to LP share holders pro rata.
#[test]
fn trading_fees_distribute_to_providers() {
    let mut app = PlatformApp::new();
    let market = setup_pool(&mut app);

    // a trade generates maker+taker fees in the dex module
    app.fund("alice", "APPLE", 100);
    app.fund("bob", "uhodl", 15_030);
    app.exec(
        "alice",
        ExecuteMsg::PlaceOrder {
            market_id: market.clone(),
            side: OrderSide::Sell,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            quantity: Uint128::new(100),
            price: Some("150".parse().unwrap()),
            stop_price: None,
            expires_at: None,
            client_order_id: None,
        },
    )
    .unwrap();
    app.exec(
        "bob",
        ExecuteMsg::PlaceOrder {
            market_id: market.clone(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            quantity: Uint128::new(100),
            price: Some("150".parse().unwrap()),
            stop_price: None,
            expires_at: None,
            client_order_id: None,
        },
    )
    .unwrap();
    // maker 15 + taker 30 collected on the 15,000 notional

    let lp_before = app.balance("lp-1", "uhodl");
    // the sweep runs on its daily cadence
    let resp = app.advance_blocks(25 * 60 * 60).unwrap();
    let distribution = find_event(&resp, "fee-distribution").unwrap();
    assert_eq!(distribution.string_attr("fees-distributed").unwrap(), "45");
    assert_eq!(app.balance("lp-1", "uhodl"), lp_before + Uint128::new(45));
}
