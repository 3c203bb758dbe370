use cosmwasm_std::{Event, Response, Uint128};
use msg::error::{ErrorId, PlatformError};
use msg::event::PlatformEventExt;
use msg::platform::entry::ExecuteMsg;
use msg::platform::escrow::Resolution;
use msg::platform::report::{ReportTarget, ReportType, TargetKind, VoteChoice};
use msg::tier::Tier;
use sharehodl_multi_test::{MockEquity, PlatformApp, GOVERNANCE};

fn error_id(err: &anyhow::Error) -> ErrorId {
    PlatformError::try_from_anyhow(err)
        .unwrap_or_else(|| panic!("not a platform error: {err:#}"))
        .id
}

fn find_event<'a>(resp: &'a Response, ty: &str) -> Option<&'a Event> {
    resp.events.iter().find(|e| e.ty == ty)
}

/// Three warden moderators, the minimum quorum pool for priority <= 3.
fn setup_wardens(app: &mut PlatformApp) {
    for warden in ["warden-1", "warden-2", "warden-3"] {
        app.add_validator(warden, Tier::Warden, 1_000_000);
    }
}

fn company_target() -> ReportTarget {
    ReportTarget {
        kind: TargetKind::Company,
        id: "APPLE".to_owned(),
    }
}

fn submit_fraud_report(app: &mut PlatformApp, reporter: &str) -> anyhow::Result<Response> {
    app.exec(
        reporter,
        ExecuteMsg::SubmitReport {
            report_type: ReportType::Fraud,
            target: company_target(),
            severity: 2,
            evidence: vec!["ipfs://evidence-1".to_owned()],
            escrow_id: None,
        },
    )
}

#[test]
fn submission_gates() {
    let mut app = PlatformApp::new();
    setup_wardens(&mut app);
    MockEquity::register_equity(&mut app.storage, "APPLE").unwrap();

    // tier below keeper
    app.add_staker("rita", Tier::Bronze, 1000, 30);
    let err = submit_fraud_report(&mut app, "rita").unwrap_err();
    assert_eq!(error_id(&err), ErrorId::ReporterTierTooLow);

    // stake age below seven days
    app.add_staker("rita", Tier::Keeper, 1000, 3);
    let err = submit_fraud_report(&mut app, "rita").unwrap_err();
    assert_eq!(error_id(&err), ErrorId::StakeAgeTooLow);

    // three per day, the fourth rejected
    app.add_staker("rita", Tier::Keeper, 1000, 30);
    for _ in 0..3 {
        submit_fraud_report(&mut app, "rita").unwrap();
    }
    let err = submit_fraud_report(&mut app, "rita").unwrap_err();
    assert_eq!(error_id(&err), ErrorId::ReporterRateLimited);

    // a nonexistent target is rejected outright
    app.advance_time(24 * 60 * 60);
    let err = app
        .exec(
            "rita",
            ExecuteMsg::SubmitReport {
                report_type: ReportType::Fraud,
                target: ReportTarget {
                    kind: TargetKind::Company,
                    id: "NOSUCH".to_owned(),
                },
                severity: 2,
                evidence: vec![],
                escrow_id: None,
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::InvalidReportTarget);
}

#[test]
fn evidence_freezes_on_first_vote() {
    let mut app = PlatformApp::new();
    setup_wardens(&mut app);
    MockEquity::register_equity(&mut app.storage, "APPLE").unwrap();
    app.add_staker("rita", Tier::Keeper, 1000, 30);

    let resp = submit_fraud_report(&mut app, "rita").unwrap();
    let report_id = find_event(&resp, "report-submitted")
        .unwrap()
        .u64_attr("report-id")
        .unwrap();
    let report_id = report_id.to_string().parse().unwrap();

    // evidence flows freely before any vote
    app.exec(
        "rita",
        ExecuteMsg::SubmitReportEvidence {
            report_id,
            uri: "ipfs://evidence-2".to_owned(),
        },
    )
    .unwrap();

    app.exec(
        "warden-1",
        ExecuteMsg::VoteOnReport {
            report_id,
            choice: VoteChoice::Confirm,
            comment: None,
        },
    )
    .unwrap();

    let err = app
        .exec(
            "rita",
            ExecuteMsg::SubmitReportEvidence {
                report_id,
                uri: "ipfs://evidence-3".to_owned(),
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::EvidenceLockedAfterVoting);

    // and a reviewer votes exactly once
    let err = app
        .exec(
            "warden-1",
            ExecuteMsg::VoteOnReport {
                report_id,
                choice: VoteChoice::Dismiss,
                comment: None,
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::ReviewerAlreadyVoted);
}

#[test]
fn confirmed_fraud_delists_the_company() {
    let mut app = PlatformApp::new();
    setup_wardens(&mut app);
    MockEquity::register_equity(&mut app.storage, "APPLE").unwrap();
    app.add_staker("rita", Tier::Keeper, 1000, 30);

    let resp = submit_fraud_report(&mut app, "rita").unwrap();
    let report_id = find_event(&resp, "report-submitted")
        .unwrap()
        .u64_attr("report-id")
        .unwrap();
    let parsed_id = report_id.to_string().parse().unwrap();

    for (warden, choice) in [
        ("warden-1", VoteChoice::Confirm),
        ("warden-2", VoteChoice::Confirm),
        ("warden-3", VoteChoice::Dismiss),
    ] {
        app.exec(
            warden,
            ExecuteMsg::VoteOnReport {
                report_id: parsed_id,
                choice,
                comment: None,
            },
        )
        .unwrap();
    }

    assert_eq!(
        MockEquity::delisted_by(&app.storage, "APPLE").unwrap(),
        Some(report_id)
    );
}

#[test]
fn dismissals_escalate_reporter_penalties() {
    let mut app = PlatformApp::new();
    setup_wardens(&mut app);
    MockEquity::register_equity(&mut app.storage, "APPLE").unwrap();
    app.add_staker("rita", Tier::Keeper, 1_000_000, 30);

    let dismiss_one = |app: &mut PlatformApp| {
        let resp = submit_fraud_report(app, "rita").unwrap();
        let report_id = find_event(&resp, "report-submitted")
            .unwrap()
            .u64_attr("report-id")
            .unwrap()
            .to_string()
            .parse()
            .unwrap();
        let mut last = Response::default();
        for warden in ["warden-1", "warden-2", "warden-3"] {
            last = app
                .exec(
                    warden,
                    ExecuteMsg::VoteOnReport {
                        report_id,
                        choice: VoteChoice::Dismiss,
                        comment: None,
                    },
                )
                .unwrap();
        }
        last
    };

    let resp = dismiss_one(&mut app);
    let penalty = find_event(&resp, "reporter-penalty").unwrap();
    assert_eq!(penalty.string_attr("streak").unwrap(), "1");
    assert_eq!(penalty.string_attr("reputation-penalty").unwrap(), "1000");

    // streak 1 imposes a one day cooldown
    let err = submit_fraud_report(&mut app, "rita").unwrap_err();
    assert_eq!(error_id(&err), ErrorId::ReporterCooldown);

    app.advance_time(25 * 60 * 60);
    let resp = dismiss_one(&mut app);
    let penalty = find_event(&resp, "reporter-penalty").unwrap();
    assert_eq!(penalty.string_attr("streak").unwrap(), "2");
    assert_eq!(penalty.string_attr("reputation-penalty").unwrap(), "1500");

    app.advance_time(49 * 60 * 60);
    let resp = dismiss_one(&mut app);
    let penalty = find_event(&resp, "reporter-penalty").unwrap();
    assert_eq!(penalty.string_attr("streak").unwrap(), "3");
    // the third consecutive dismissal slashes 15% and bans for a week
    assert_eq!(
        penalty.string_attr("slashed").unwrap(),
        Uint128::new(150_000).to_string()
    );
    let ban = find_event(&resp, "address-banned").unwrap();
    assert_eq!(ban.string_attr("address").unwrap(), "rita");

    app.advance_time(25 * 60 * 60);
    let err = submit_fraud_report(&mut app, "rita").unwrap_err();
    assert_eq!(error_id(&err), ErrorId::ReporterBanned);

    // the ban expires on the first sweep after its deadline
    app.advance_time(7 * 24 * 60 * 60);
    let resp = app.end_block().unwrap();
    assert!(find_event(&resp, "ban-expired").is_some());
}

#[test]
fn voluntary_return_settles_wrong_resolution() {
    let mut app = PlatformApp::new();
    setup_wardens(&mut app);
    app.add_staker("sally", Tier::Keeper, 1_000_000, 30);
    app.fund("rob", "uhodl", 10_010);

    // rob escrows against sally and wins the release
    app.exec(
        "rob",
        ExecuteMsg::OpenEscrow {
            seller: cosmwasm_std::Addr::unchecked("sally"),
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
    let submitted = find_event(&resp, "report-submitted").unwrap();
    assert_eq!(
        submitted.string_attr("status").unwrap(),
        "pending_voluntary_return"
    );
    let report_id = submitted
        .u64_attr("report-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    // only the counterparty may return
    let err = app
        .exec("warden-1", ExecuteMsg::VoluntaryReturn { report_id })
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::NotCounterparty);

    app.exec("rob", ExecuteMsg::VoluntaryReturn { report_id })
        .unwrap();
    assert_eq!(app.balance("sally", "uhodl"), Uint128::new(10_000));
    assert_eq!(app.balance("rob", "uhodl"), Uint128::zero());

    // a second return is refused
    let err = app
        .exec("rob", ExecuteMsg::VoluntaryReturn { report_id })
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::VoluntaryReturnAlreadyDone);
}

#[test]
fn rejected_return_advances_to_investigation() {
    let mut app = PlatformApp::new();
    setup_wardens(&mut app);
    app.add_staker("sally", Tier::Keeper, 1_000_000, 30);
    app.fund("rob", "uhodl", 10_010);

    app.exec(
        "rob",
        ExecuteMsg::OpenEscrow {
            seller: cosmwasm_std::Addr::unchecked("sally"),
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

    app.exec(
        "rob",
        ExecuteMsg::RejectVoluntaryReturn {
            report_id,
            reason: "the resolution was right".to_owned(),
        },
    )
    .unwrap();

    // voting is now open, which it is not during the grace window
    app.exec(
        "warden-1",
        ExecuteMsg::VoteOnReport {
            report_id,
            choice: VoteChoice::Dismiss,
            comment: None,
        },
    )
    .unwrap();

    // rejecting twice is refused
    let err = app
        .exec(
            "rob",
            ExecuteMsg::RejectVoluntaryReturn {
                report_id,
                reason: "again".to_owned(),
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::ReportNotPendingReturn);
}

#[test]
fn silent_reports_escalate_to_governance() {
    let mut app = PlatformApp::new();
    setup_wardens(&mut app);
    for steward in ["steward-1", "steward-2", "steward-3", "steward-4", "steward-5"] {
        app.add_validator(steward, Tier::Steward, 1_000_000);
    }
    for archon in [
        "archon-1", "archon-2", "archon-3", "archon-4", "archon-5", "archon-6", "archon-7",
    ] {
        app.add_validator(archon, Tier::Archon, 1_000_000);
    }
    MockEquity::register_equity(&mut app.storage, "APPLE").unwrap();
    app.add_staker("rita", Tier::Keeper, 1_000_000, 30);

    let resp = submit_fraud_report(&mut app, "rita").unwrap();
    let submitted = find_event(&resp, "report-submitted").unwrap();
    assert_eq!(submitted.string_attr("priority").unwrap(), "3");
    let report_id: msg::ids::ReportId = submitted
        .u64_attr("report-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();
    let mut reviewers = reviewer_list(submitted);
    assert_eq!(reviewers.len(), 3);

    // one confirmation, no quorum: warden -> steward at the deadline
    app.exec(
        &reviewers[0].clone(),
        ExecuteMsg::VoteOnReport {
            report_id,
            choice: VoteChoice::Confirm,
            comment: None,
        },
    )
    .unwrap();
    let resp = app.advance_blocks(8 * 24 * 60 * 60).unwrap();
    let outcome = find_event(&resp, "report-outcome").unwrap();
    assert_eq!(outcome.string_attr("action").unwrap(), "escalated");
    reviewers = reviewer_list(outcome);
    assert_eq!(reviewers.len(), 5);

    // a lone confirmation at steward tier: steward -> archon
    app.exec(
        &reviewers[0].clone(),
        ExecuteMsg::VoteOnReport {
            report_id,
            choice: VoteChoice::Confirm,
            comment: None,
        },
    )
    .unwrap();
    let resp = app.advance_blocks(6 * 24 * 60 * 60).unwrap();
    let outcome = find_event(&resp, "report-outcome").unwrap();
    assert_eq!(outcome.string_attr("action").unwrap(), "escalated");
    reviewers = reviewer_list(outcome);
    assert_eq!(reviewers.len(), 7);

    // a lone confirmation at archon tier: out of tiers, governance takes it
    app.exec(
        &reviewers[0].clone(),
        ExecuteMsg::VoteOnReport {
            report_id,
            choice: VoteChoice::Confirm,
            comment: None,
        },
    )
    .unwrap();
    let resp = app.advance_blocks(4 * 24 * 60 * 60).unwrap();
    let outcome = find_event(&resp, "report-outcome").unwrap();
    assert_eq!(
        outcome.string_attr("action").unwrap(),
        "escalated_to_governance"
    );
    assert_eq!(outcome.string_attr("status").unwrap(), "appealed");
}

fn reviewer_list(event: &Event) -> Vec<String> {
    event
        .string_attr("reviewers")
        .unwrap()
        .split(',')
        .map(str::to_owned)
        .collect()
}
