use cosmwasm_std::{Addr, Binary, Event, Response, Uint128};
use msg::error::{ErrorId, PlatformError};
use msg::event::PlatformEventExt;
use msg::ids::{DepositId, SessionId, WithdrawalId};
use msg::platform::bridge::{ExternalAsset, ExternalChain};
use msg::platform::entry::ExecuteMsg;
use msg::tier::Tier;
use sharehodl_multi_test::{PlatformApp, GOVERNANCE};

fn error_id(err: &anyhow::Error) -> ErrorId {
    PlatformError::try_from_anyhow(err)
        .unwrap_or_else(|| panic!("not a platform error: {err:#}"))
        .id
}

fn find_event<'a>(resp: &'a Response, ty: &str) -> Option<&'a Event> {
    resp.events.iter().find(|e| e.ty == ty)
}

fn validator(i: usize) -> String {
    format!("validator-{i:02}")
}

fn setup_bridge(app: &mut PlatformApp, validators: usize) {
    for i in 0..validators {
        app.add_validator(&validator(i), Tier::Warden, 1_000_000);
    }
    app.exec(
        GOVERNANCE,
        ExecuteMsg::AddExternalChain {
            chain: ExternalChain {
                chain_id: "ethereum".to_owned(),
                enabled: true,
                min_deposit: Uint128::new(1),
                max_deposit: Uint128::new(1_000_000_000_000),
            },
        },
    )
    .unwrap();
    app.exec(
        GOVERNANCE,
        ExecuteMsg::AddExternalAsset {
            asset: ExternalAsset {
                chain_id: "ethereum".to_owned(),
                asset: "USDC".to_owned(),
                enabled: true,
                internal_denom: "uusdc".to_owned(),
                conversion_rate: "1".parse().unwrap(),
                rate_limit_window: None,
                rate_limit_max: None,
            },
        },
    )
    .unwrap();
}

fn observe(app: &mut PlatformApp, observer: &str, tx_hash: &str, amount: u128) -> anyhow::Result<Response> {
    app.exec(
        observer,
        ExecuteMsg::ObserveDeposit {
            chain_id: "ethereum".to_owned(),
            asset: "USDC".to_owned(),
            external_tx_hash: tx_hash.to_owned(),
            external_block_height: 19_000_000,
            external_sender: "0xabc".to_owned(),
            recipient: Addr::unchecked("daisy"),
            amount: Uint128::new(amount),
        },
    )
}

fn attest(app: &mut PlatformApp, who: &str, deposit_id: DepositId, amount: u128) -> anyhow::Result<Response> {
    app.exec(
        who,
        ExecuteMsg::AttestDeposit {
            deposit_id,
            approved: true,
            observed_tx_hash: "0xdeadbeef".to_owned(),
            observed_amount: Uint128::new(amount),
        },
    )
}

#[test]
fn deposit_completes_at_attestation_threshold() {
    let mut app = PlatformApp::new();
    // 10 eligible validators at a 0.67 threshold need 7 approvals
    setup_bridge(&mut app, 10);

    let resp = observe(&mut app, &validator(0), "0xdeadbeef", 100).unwrap();
    let observed = find_event(&resp, "deposit-observed").unwrap();
    assert_eq!(observed.string_attr("required").unwrap(), "7");
    let deposit_id: DepositId = observed
        .u64_attr("deposit-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    // a second observation of the same external transaction is refused
    let err = observe(&mut app, &validator(1), "0xdeadbeef", 100).unwrap_err();
    assert_eq!(error_id(&err), ErrorId::DuplicateDeposit);

    let supply_before = app.supply("uusdc");
    for i in 0..6 {
        let resp = attest(&mut app, &validator(i), deposit_id, 100).unwrap();
        assert!(find_event(&resp, "deposit-settled").is_none());
    }
    // a mismatched approval is the cross-check firing
    let err = app
        .exec(
            &validator(6),
            ExecuteMsg::AttestDeposit {
                deposit_id,
                approved: true,
                observed_tx_hash: "0xdeadbeef".to_owned(),
                observed_amount: Uint128::new(999),
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::AttestationMismatch);

    // the seventh matching approval mints and delivers
    let resp = attest(&mut app, &validator(6), deposit_id, 100).unwrap();
    let settled = find_event(&resp, "deposit-settled").unwrap();
    assert_eq!(settled.string_attr("status").unwrap(), "completed");
    assert_eq!(app.balance("daisy", "uusdc"), Uint128::new(100));
    assert_eq!(app.supply("uusdc"), supply_before + Uint128::new(100));

    // the eighth attestation bounces off the terminal state
    let err = attest(&mut app, &validator(7), deposit_id, 100).unwrap_err();
    assert_eq!(error_id(&err), ErrorId::DepositCompleted);

    // one attestation per validator
    let err = attest(&mut app, &validator(0), deposit_id, 100).unwrap_err();
    assert_eq!(error_id(&err), ErrorId::DepositCompleted);
}

#[test]
fn banned_recipient_rejects_the_deposit() {
    let mut app = PlatformApp::new();
    setup_bridge(&mut app, 3);
    app.ban_address("daisy");

    let resp = observe(&mut app, &validator(0), "0xdeadbeef", 100).unwrap();
    let deposit_id: DepositId = find_event(&resp, "deposit-observed")
        .unwrap()
        .u64_attr("deposit-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    // threshold of 3 validators at 0.67 is 3
    attest(&mut app, &validator(0), deposit_id, 100).unwrap();
    attest(&mut app, &validator(1), deposit_id, 100).unwrap();
    let resp = attest(&mut app, &validator(2), deposit_id, 100).unwrap();
    let settled = find_event(&resp, "deposit-settled").unwrap();
    assert_eq!(settled.string_attr("status").unwrap(), "rejected");
    assert_eq!(app.balance("daisy", "uusdc"), Uint128::zero());
    assert_eq!(app.supply("uusdc"), Uint128::zero());
}

#[test]
fn withdrawal_lifecycle_signs_and_burns() {
    let mut app = PlatformApp::new();
    setup_bridge(&mut app, 10);
    app.fund("wendy", "uusdc", 1_000);
    let supply_before = app.supply("uusdc");

    let resp = app
        .exec(
            "wendy",
            ExecuteMsg::RequestWithdrawal {
                chain_id: "ethereum".to_owned(),
                asset: "USDC".to_owned(),
                recipient: "0xrecipient".to_owned(),
                amount: Uint128::new(1_000),
            },
        )
        .unwrap();
    let requested = find_event(&resp, "withdrawal-requested").unwrap();
    assert_eq!(requested.string_attr("fee").unwrap(), "1");
    assert_eq!(requested.string_attr("external-amount").unwrap(), "999");
    let withdrawal_id: WithdrawalId = requested
        .u64_attr("withdrawal-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();
    assert_eq!(app.balance("wendy", "uusdc"), Uint128::zero());

    // escrowed, not yet burned
    assert_eq!(app.supply("uusdc"), supply_before);

    // the refund path is closed while the timelock runs
    let err = app
        .exec("wendy", ExecuteMsg::RefundWithdrawal { withdrawal_id })
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::WithdrawalNotReady);

    // past the timelock the sweep opens a signing session
    let resp = app.advance_blocks(3_700).unwrap();
    let opened = find_event(&resp, "tss-session-opened").unwrap();
    assert_eq!(opened.string_attr("participants").unwrap(), "10");
    assert_eq!(opened.string_attr("required").unwrap(), "7");
    let session_id: SessionId = opened
        .u64_attr("session-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    for i in 0..6 {
        app.exec(
            &validator(i),
            ExecuteMsg::SubmitTssSignature {
                session_id,
                data: Binary::from(format!("share-{i}").into_bytes()),
            },
        )
        .unwrap();
    }
    let resp = app
        .exec(
            &validator(6),
            ExecuteMsg::SubmitTssSignature {
                session_id,
                data: Binary::from(b"share-6".to_vec()),
            },
        )
        .unwrap();
    let closed = find_event(&resp, "tss-session-closed").unwrap();
    assert_eq!(closed.string_attr("status").unwrap(), "completed");
    assert_eq!(closed.string_attr("shares").unwrap(), "7");

    // the net escrow burned, the fee moved to the fee module
    assert_eq!(app.supply("uusdc"), supply_before - Uint128::new(999));
    assert_eq!(app.module_balance("fees", "uusdc"), Uint128::new(1));

    // duplicate share submission is refused
    let err = app
        .exec(
            &validator(0),
            ExecuteMsg::SubmitTssSignature {
                session_id,
                data: Binary::from(b"again".to_vec()),
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::TssSessionCompleted);
}

#[test]
fn timed_out_withdrawal_refunds_in_full() {
    let mut app = PlatformApp::new();
    setup_bridge(&mut app, 10);
    app.fund("wendy", "uusdc", 1_000);
    let supply_before = app.supply("uusdc");

    let resp = app
        .exec(
            "wendy",
            ExecuteMsg::RequestWithdrawal {
                chain_id: "ethereum".to_owned(),
                asset: "USDC".to_owned(),
                recipient: "0xrecipient".to_owned(),
                amount: Uint128::new(1_000),
            },
        )
        .unwrap();
    let withdrawal_id: WithdrawalId = find_event(&resp, "withdrawal-requested")
        .unwrap()
        .u64_attr("withdrawal-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    // past the timelock a session opens; it then idles past its timeout
    app.advance_blocks(3_700).unwrap();
    let resp = app.advance_blocks(3_700).unwrap();
    let closed = find_event(&resp, "tss-session-closed").unwrap();
    assert_eq!(closed.string_attr("status").unwrap(), "timeout");

    // the refund returns exactly the escrowed amount, no fee retained
    app.exec("wendy", ExecuteMsg::RefundWithdrawal { withdrawal_id })
        .unwrap();
    assert_eq!(app.balance("wendy", "uusdc"), Uint128::new(1_000));
    assert_eq!(app.supply("uusdc"), supply_before);
}

#[test]
fn rate_limit_windows_are_independent_and_roll_over() {
    let mut app = PlatformApp::new();
    for i in 0..3 {
        app.add_validator(&validator(i), Tier::Warden, 1_000_000);
    }
    app.exec(
        GOVERNANCE,
        ExecuteMsg::AddExternalChain {
            chain: ExternalChain {
                chain_id: "ethereum".to_owned(),
                enabled: true,
                min_deposit: Uint128::new(1),
                max_deposit: Uint128::new(1_000_000),
            },
        },
    )
    .unwrap();
    app.exec(
        GOVERNANCE,
        ExecuteMsg::AddExternalAsset {
            asset: ExternalAsset {
                chain_id: "ethereum".to_owned(),
                asset: "USDC".to_owned(),
                enabled: true,
                internal_denom: "uusdc".to_owned(),
                conversion_rate: "1".parse().unwrap(),
                rate_limit_window: Some(1_000),
                rate_limit_max: Some(Uint128::new(500)),
            },
        },
    )
    .unwrap();

    observe(&mut app, &validator(0), "0xaaa", 400).unwrap();
    let err = observe(&mut app, &validator(0), "0xbbb", 200).unwrap_err();
    assert_eq!(error_id(&err), ErrorId::RateLimitExceeded);

    // a request landing exactly on the window end belongs to the next
    // window
    let now = app.time.seconds();
    let window_end = (now / 1_000 + 1) * 1_000;
    app.advance_time(window_end - now);
    observe(&mut app, &validator(0), "0xbbb", 200).unwrap();
}

#[test]
fn circuit_breaker_gates_and_expires() {
    let mut app = PlatformApp::new();
    setup_bridge(&mut app, 3);

    let expires_at = app.time.plus_seconds(100);
    app.exec(
        GOVERNANCE,
        ExecuteMsg::UpdateCircuitBreaker {
            enabled: true,
            reason: Some("anomalous flow".to_owned()),
            allow_deposit: false,
            allow_withdraw: false,
            allow_attest: false,
            expires_at: Some(expires_at),
        },
    )
    .unwrap();

    let err = observe(&mut app, &validator(0), "0xccc", 100).unwrap_err();
    assert_eq!(error_id(&err), ErrorId::CircuitBreakerActive);

    // only governance may touch the breaker
    let err = app
        .exec(
            "wendy",
            ExecuteMsg::UpdateCircuitBreaker {
                enabled: false,
                reason: None,
                allow_deposit: true,
                allow_withdraw: true,
                allow_attest: true,
                expires_at: None,
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::Unauthorized);

    // the first operation past the expiry succeeds without waiting for
    // the EndBlock sweep
    app.advance_time(150);
    observe(&mut app, &validator(0), "0xccc", 100).unwrap();

    // and the sweep clears the lapsed breaker
    let resp = app.end_block().unwrap();
    let cleared = find_event(&resp, "circuit-breaker").unwrap();
    assert_eq!(cleared.string_attr("enabled").unwrap(), "false");
}
