use cosmwasm_std::{Addr, Event, Response, Uint128};
use core_engine::collaborators::{Bank, Staking};
use msg::event::PlatformEventExt;
use msg::platform::entry::ExecuteMsg;
use msg::platform::escrow::Resolution;
use msg::platform::report::{ReportTarget, ReportType, TargetKind, VoteChoice};
use msg::tier::Tier;
use sharehodl_multi_test::{PlatformApp, GOVERNANCE};

fn find_event<'a>(resp: &'a Response, ty: &str) -> Option<&'a Event> {
    resp.events.iter().find(|e| e.ty == ty)
}

fn recovery_steps(resp: &Response) -> Vec<(String, String)> {
    resp.events
        .iter()
        .filter(|e| e.ty == "recovery-step")
        .map(|e| {
            (
                e.string_attr("source").unwrap(),
                e.string_attr("amount").unwrap(),
            )
        })
        .collect()
}

/// The clawback -> reserve -> slash waterfall end to end: the victim is
/// made exactly whole, the excess funds the reporter reward.
#[test]
fn wrong_resolution_recovery_waterfall() {
    let mut app = PlatformApp::new();
    for warden in ["warden-1", "warden-2", "warden-3"] {
        app.add_validator(warden, Tier::Warden, 1_000_000);
    }
    // the resolver bears the slash liability when overturned
    app.add_staker(GOVERNANCE, Tier::Archon, 5_000, 365);
    app.add_staker("sally", Tier::Keeper, 1_000_000, 30);
    app.fund("rob", "uhodl", 10_010);

    // rob funds a 10,010 escrow; 10 goes to the reserve, 10,000 is held
    app.exec(
        "rob",
        ExecuteMsg::OpenEscrow {
            seller: Addr::unchecked("sally"),
            amount: Uint128::new(10_010),
            denom: "uhodl".to_owned(),
        },
    )
    .unwrap();
    app.exec(
        GOVERNANCE,
        ExecuteMsg::ResolveEscrow {
            escrow_id: "1".parse().unwrap(),
            resolution: Resolution::ReleaseBuyer,
        },
    )
    .unwrap();
    assert_eq!(app.balance("rob", "uhodl"), Uint128::new(10_000));

    // rob dissipates 7,000 of it
    app.bank
        .send(
            &mut app.storage,
            &Addr::unchecked("rob"),
            &Addr::unchecked("elsewhere"),
            "uhodl",
            Uint128::new(7_000),
        )
        .unwrap();

    // the reserve holds 7,000 in total (10 from the escrow fee)
    app.fund_module("reserve", "uhodl", 6_990);
    let supply_before = app.supply("uhodl");

    let resp = app
        .exec(
            "sally",
            ExecuteMsg::SubmitReport {
                report_type: ReportType::WrongResolution,
                target: ReportTarget {
                    kind: TargetKind::Escrow,
                    id: "1".to_owned(),
                },
                severity: 2,
                evidence: vec![],
                escrow_id: Some("1".parse().unwrap()),
            },
        )
        .unwrap();
    let report_id = find_event(&resp, "report-submitted")
        .unwrap()
        .u64_attr("report-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    // the 48h grace lapses unanswered
    app.advance_blocks(49 * 60 * 60).unwrap();

    let mut last = Response::default();
    for warden in ["warden-1", "warden-2", "warden-3"] {
        last = app
            .exec(
                warden,
                ExecuteMsg::VoteOnReport {
                    report_id,
                    choice: VoteChoice::Confirm,
                    comment: None,
                },
            )
            .unwrap();
    }

    // clawback drains rob's remaining 3,000; the reserve covers the other
    // 7,000; the slash tops the pool up to the 10% recovery margin
    assert_eq!(
        recovery_steps(&last),
        vec![
            ("clawback".to_owned(), "3000".to_owned()),
            ("reserve".to_owned(), "7000".to_owned()),
            ("slash".to_owned(), "1000".to_owned()),
        ]
    );

    // sally is made exactly whole plus the 10% reward on the excess
    let reward = find_event(&last, "reporter-reward").unwrap();
    assert_eq!(reward.string_attr("amount").unwrap(), "100");
    assert_eq!(app.balance("sally", "uhodl"), Uint128::new(10_100));
    assert_eq!(app.balance("rob", "uhodl"), Uint128::zero());

    // the slash burned stake and minted a tagged replacement
    let stake = app
        .staking
        .staked_amount(&app.storage, &Addr::unchecked(GOVERNANCE))
        .unwrap();
    assert_eq!(stake, Uint128::new(4_000));
    assert_eq!(app.supply("uhodl"), supply_before + Uint128::new(1_000));

    // excess pool net of the reward stays in the reserve
    assert_eq!(app.module_balance("reserve", "uhodl"), Uint128::new(900));
}

/// When every source runs dry the victim gets what exists and a shortfall
/// event names the remedy.
#[test]
fn recovery_shortfall_is_reported() {
    let mut app = PlatformApp::new();
    for warden in ["warden-1", "warden-2", "warden-3"] {
        app.add_validator(warden, Tier::Warden, 1_000_000);
    }
    // penniless resolver: nothing to slash
    app.add_staker(GOVERNANCE, Tier::Archon, 0, 365);
    app.add_staker("sally", Tier::Keeper, 1_000_000, 30);
    app.fund("rob", "uhodl", 10_010);

    app.exec(
        "rob",
        ExecuteMsg::OpenEscrow {
            seller: Addr::unchecked("sally"),
            amount: Uint128::new(10_010),
            denom: "uhodl".to_owned(),
        },
    )
    .unwrap();
    app.exec(
        GOVERNANCE,
        ExecuteMsg::ResolveEscrow {
            escrow_id: "1".parse().unwrap(),
            resolution: Resolution::ReleaseBuyer,
        },
    )
    .unwrap();
    // rob dissipates everything
    app.bank
        .send(
            &mut app.storage,
            &Addr::unchecked("rob"),
            &Addr::unchecked("elsewhere"),
            "uhodl",
            Uint128::new(10_000),
        )
        .unwrap();

    let resp = app
        .exec(
            "sally",
            ExecuteMsg::SubmitReport {
                report_type: ReportType::WrongResolution,
                target: ReportTarget {
                    kind: TargetKind::Escrow,
                    id: "1".to_owned(),
                },
                severity: 2,
                evidence: vec![],
                escrow_id: Some("1".parse().unwrap()),
            },
        )
        .unwrap();
    let report_id = find_event(&resp, "report-submitted")
        .unwrap()
        .u64_attr("report-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();
    app.advance_blocks(49 * 60 * 60).unwrap();

    let mut last = Response::default();
    for warden in ["warden-1", "warden-2", "warden-3"] {
        last = app
            .exec(
                warden,
                ExecuteMsg::VoteOnReport {
                    report_id,
                    choice: VoteChoice::Confirm,
                    comment: None,
                },
            )
            .unwrap();
    }

    let shortfall = find_event(&last, "recovery-shortfall").unwrap();
    // only the 10-unit reserve fee was recoverable
    assert_eq!(shortfall.string_attr("recovered").unwrap(), "10");
    assert_eq!(shortfall.string_attr("shortfall").unwrap(), "9990");
    assert_eq!(app.balance("sally", "uhodl"), Uint128::new(10));
}
