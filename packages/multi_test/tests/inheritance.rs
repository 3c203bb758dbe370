use cosmwasm_std::{Addr, Coin, Event, Response, Uint128};
use msg::error::{ErrorId, PlatformError};
use msg::event::PlatformEventExt;
use msg::ids::PlanId;
use msg::platform::entry::ExecuteMsg;
use msg::platform::inheritance::Beneficiary;
use sharehodl_multi_test::PlatformApp;

const DAY: u64 = 24 * 60 * 60;

fn error_id(err: &anyhow::Error) -> ErrorId {
    PlatformError::try_from_anyhow(err)
        .unwrap_or_else(|| panic!("not a platform error: {err:#}"))
        .id
}

fn find_event<'a>(resp: &'a Response, ty: &str) -> Option<&'a Event> {
    resp.events.iter().find(|e| e.ty == ty)
}

fn beneficiary(addr: &str, priority: u32, pct: u64, specific: Vec<Coin>) -> Beneficiary {
    Beneficiary {
        address: Addr::unchecked(addr),
        priority,
        percentage: cosmwasm_std::Decimal::percent(pct),
        specific_assets: specific,
    }
}

fn create_plan(app: &mut PlatformApp, owner: &str, beneficiaries: Vec<Beneficiary>) -> PlanId {
    let resp = app
        .exec(
            owner,
            ExecuteMsg::CreatePlan {
                beneficiaries,
                inactivity_period: 60 * DAY,
                grace_period: 30 * DAY,
                claim_window: 7 * DAY,
                charity: None,
            },
        )
        .unwrap();
    find_event(&resp, "plan-stored")
        .unwrap()
        .u64_attr("plan-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap()
}

/// Banned first-priority beneficiary is skipped; the second claims the
/// whole estate, specific assets included; the plan completes with the
/// module emptied.
#[test]
fn claims_cascade_past_banned_beneficiaries() {
    let mut app = PlatformApp::new();
    app.fund("olivia", "APPLE", 100);
    app.fund("olivia", "uhodl", 5_000);

    create_plan(
        &mut app,
        "olivia",
        vec![
            beneficiary("heir-1", 1, 50, vec![Coin::new(100u128, "APPLE")]),
            beneficiary("heir-2", 2, 50, vec![]),
        ],
    );
    app.ban_address("heir-1");

    // inactivity elapses: the plan triggers and sweeps the estate
    let resp = app.advance_blocks(61 * DAY).unwrap();
    assert!(find_event(&resp, "plan-triggered").is_some());
    assert_eq!(app.balance("olivia", "APPLE"), Uint128::zero());
    assert_eq!(app.balance("olivia", "uhodl"), Uint128::zero());

    // grace elapses: heir-1 is skipped, heir-2's window opens
    let resp = app.advance_blocks(31 * DAY).unwrap();
    let skipped = find_event(&resp, "claim-settled").unwrap();
    assert_eq!(skipped.string_attr("beneficiary").unwrap(), "heir-1");
    assert_eq!(skipped.string_attr("action").unwrap(), "skipped");
    let window = find_event(&resp, "claim-window-opened").unwrap();
    assert_eq!(window.string_attr("priority").unwrap(), "2");

    // heir-2 claims everything
    let resp = app
        .exec("heir-2", ExecuteMsg::ClaimAssets { plan_id: PlanId::new(1) })
        .unwrap();
    let settled = find_event(&resp, "claim-settled").unwrap();
    assert_eq!(settled.string_attr("action").unwrap(), "claimed");
    assert_eq!(app.balance("heir-2", "APPLE"), Uint128::new(100));
    assert_eq!(app.balance("heir-2", "uhodl"), Uint128::new(5_000));
    // estate fully distributed: nothing is stranded in the module
    assert_eq!(app.module_balance("inheritance", "APPLE"), Uint128::zero());
    assert_eq!(app.module_balance("inheritance", "uhodl"), Uint128::zero());

    // the plan is complete; further claims bounce
    let err = app
        .exec("heir-2", ExecuteMsg::ClaimAssets { plan_id: PlanId::new(1) })
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::PlanNotClaimable);
}

/// Any owner transaction during grace is proof of life: the trigger is
/// cancelled and the swept estate returns.
#[test]
fn owner_activity_cancels_a_trigger() {
    let mut app = PlatformApp::new();
    app.fund("oscar", "uhodl", 9_000);
    create_plan(&mut app, "oscar", vec![beneficiary("heir-1", 1, 100, vec![])]);

    let resp = app.advance_blocks(61 * DAY).unwrap();
    assert!(find_event(&resp, "plan-triggered").is_some());
    assert_eq!(app.balance("oscar", "uhodl"), Uint128::zero());

    // an unrelated transaction from the owner suffices
    let resp = app
        .exec("oscar", ExecuteMsg::CancelAllOrders { market_id: None })
        .unwrap();
    assert!(find_event(&resp, "trigger-cancelled").is_some());
    assert_eq!(app.balance("oscar", "uhodl"), Uint128::new(9_000));

    // and the plan monitors afresh: no immediate re-trigger
    let resp = app.advance_blocks(5).unwrap();
    assert!(find_event(&resp, "plan-triggered").is_none());
}

/// Unclaimed windows cascade; after the last priority the residual goes
/// to charity and the plan completes.
#[test]
fn unclaimed_windows_fall_through_to_charity() {
    let mut app = PlatformApp::new();
    app.fund("olga", "uhodl", 1_000);
    create_plan(&mut app, "olga", vec![beneficiary("heir-1", 1, 100, vec![])]);

    app.advance_blocks(61 * DAY).unwrap();
    let resp = app.advance_blocks(31 * DAY).unwrap();
    assert!(find_event(&resp, "claim-window-opened").is_some());

    // the window lapses unclaimed
    let resp = app.advance_blocks(8 * DAY).unwrap();
    let fallback = find_event(&resp, "charity-fallback").unwrap();
    assert_eq!(fallback.string_attr("fee-denom-total").unwrap(), "1000");
    assert_eq!(
        app.balance(sharehodl_multi_test::CHARITY, "uhodl"),
        Uint128::new(1_000)
    );
}

#[test]
fn plan_validation_rejects_bad_shapes() {
    let mut app = PlatformApp::new();

    // grace below 30 days
    let err = app
        .exec(
            "olivia",
            ExecuteMsg::CreatePlan {
                beneficiaries: vec![beneficiary("heir-1", 1, 100, vec![])],
                inactivity_period: 60 * DAY,
                grace_period: 10 * DAY,
                claim_window: 7 * DAY,
                charity: None,
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InvalidPlan);

    // duplicate priorities
    let err = app
        .exec(
            "olivia",
            ExecuteMsg::CreatePlan {
                beneficiaries: vec![
                    beneficiary("heir-1", 1, 50, vec![]),
                    beneficiary("heir-2", 1, 50, vec![]),
                ],
                inactivity_period: 60 * DAY,
                grace_period: 30 * DAY,
                claim_window: 7 * DAY,
                charity: None,
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InvalidPlan);

    // percentages above 100%
    let err = app
        .exec(
            "olivia",
            ExecuteMsg::CreatePlan {
                beneficiaries: vec![
                    beneficiary("heir-1", 1, 60, vec![]),
                    beneficiary("heir-2", 2, 60, vec![]),
                ],
                inactivity_period: 60 * DAY,
                grace_period: 30 * DAY,
                claim_window: 7 * DAY,
                charity: None,
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InvalidPlan);
}
