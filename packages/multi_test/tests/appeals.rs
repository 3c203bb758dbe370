use cosmwasm_std::{Addr, Event, Response, Uint128};
use msg::error::{ErrorId, PlatformError};
use msg::event::PlatformEventExt;
use msg::ids::AppealId;
use msg::platform::entry::ExecuteMsg;
use msg::platform::escrow::Resolution;
use msg::platform::report::VoteChoice;
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

fn reviewer_list(event: &Event) -> Vec<String> {
    event
        .string_attr("reviewers")
        .unwrap()
        .split(',')
        .map(str::to_owned)
        .collect()
}

/// Resolved escrow ready for appeal: rob funded it, the resolution paid
/// sally, rob contests.
fn setup_resolved_escrow(app: &mut PlatformApp) {
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
            resolution: Resolution::ReleaseSeller,
        },
    )
    .unwrap();
    assert_eq!(app.balance("sally", "uhodl"), Uint128::new(10_000));
}

#[test]
fn overturned_dispute_appeal_reroutes_funds() {
    let mut app = PlatformApp::new();
    for warden in ["warden-1", "warden-2", "warden-3", "warden-4", "warden-5"] {
        app.add_validator(warden, Tier::Warden, 1_000_000);
    }
    app.add_staker(GOVERNANCE, Tier::Archon, 1_000_000, 365);
    setup_resolved_escrow(&mut app);

    let resp = app
        .exec(
            "rob",
            ExecuteMsg::SubmitDisputeAppeal {
                escrow_id: "1".parse().unwrap(),
                requested_resolution: Resolution::ReleaseBuyer,
                evidence: vec!["ipfs://appeal-evidence".to_owned()],
            },
        )
        .unwrap();
    let submitted = find_event(&resp, "appeal-submitted").unwrap();
    assert_eq!(submitted.string_attr("appeal-level").unwrap(), "1");
    let reviewers = reviewer_list(submitted);
    assert_eq!(reviewers.len(), 5);
    let appeal_id: AppealId = submitted
        .u64_attr("appeal-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    // appealing twice while one is open is refused
    let err = app
        .exec(
            "rob",
            ExecuteMsg::SubmitDisputeAppeal {
                escrow_id: "1".parse().unwrap(),
                requested_resolution: Resolution::ReleaseBuyer,
                evidence: vec![],
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::CannotAppeal);

    // five overturn votes
    let mut last = Response::default();
    for reviewer in &reviewers {
        last = app
            .exec(
                reviewer,
                ExecuteMsg::VoteOnAppeal {
                    appeal_id,
                    choice: VoteChoice::Confirm,
                    comment: None,
                },
            )
            .unwrap();
    }
    let resolved = find_event(&last, "appeal-resolved").unwrap();
    assert_eq!(resolved.string_attr("status").unwrap(), "overturned");
    assert_eq!(resolved.string_attr("resolution").unwrap(), "release_buyer");

    // the waterfall clawed the payout back from sally and delivered it to
    // rob, the newly entitled party
    assert_eq!(app.balance("rob", "uhodl"), Uint128::new(10_000));
    assert_eq!(app.balance("sally", "uhodl"), Uint128::zero());
}

#[test]
fn upheld_appeal_keeps_the_resolution_and_escalates() {
    let mut app = PlatformApp::new();
    for warden in ["warden-1", "warden-2", "warden-3", "warden-4", "warden-5"] {
        app.add_validator(warden, Tier::Warden, 1_000_000);
    }
    for steward in [
        "steward-1", "steward-2", "steward-3", "steward-4", "steward-5", "steward-6", "steward-7",
    ] {
        app.add_validator(steward, Tier::Steward, 1_000_000);
    }
    app.add_staker(GOVERNANCE, Tier::Archon, 1_000_000, 365);
    setup_resolved_escrow(&mut app);

    let resp = app
        .exec(
            "rob",
            ExecuteMsg::SubmitDisputeAppeal {
                escrow_id: "1".parse().unwrap(),
                requested_resolution: Resolution::ReleaseBuyer,
                evidence: vec![],
            },
        )
        .unwrap();
    let appeal_id: AppealId = find_event(&resp, "appeal-submitted")
        .unwrap()
        .u64_attr("appeal-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    // nobody votes: the deadline upholds the original resolution
    let resp = app.advance_blocks(6 * 24 * 60 * 60).unwrap();
    let resolved = find_event(&resp, "appeal-resolved").unwrap();
    assert_eq!(resolved.string_attr("status").unwrap(), "upheld");
    assert_eq!(app.balance("sally", "uhodl"), Uint128::new(10_000));

    // the appellant escalates to level 2 with a bigger, higher-tier panel
    let resp = app
        .exec("rob", ExecuteMsg::EscalateAppeal { appeal_id })
        .unwrap();
    let submitted = find_event(&resp, "appeal-submitted").unwrap();
    assert_eq!(submitted.string_attr("appeal-level").unwrap(), "2");
    assert_eq!(reviewer_list(submitted).len(), 7);
}

#[test]
fn appeal_evidence_locks_on_first_vote() {
    let mut app = PlatformApp::new();
    for warden in ["warden-1", "warden-2", "warden-3", "warden-4", "warden-5"] {
        app.add_validator(warden, Tier::Warden, 1_000_000);
    }
    app.add_staker(GOVERNANCE, Tier::Archon, 1_000_000, 365);
    setup_resolved_escrow(&mut app);

    let resp = app
        .exec(
            "rob",
            ExecuteMsg::SubmitDisputeAppeal {
                escrow_id: "1".parse().unwrap(),
                requested_resolution: Resolution::ReleaseBuyer,
                evidence: vec![],
            },
        )
        .unwrap();
    let submitted = find_event(&resp, "appeal-submitted").unwrap();
    let reviewers = reviewer_list(submitted);
    let appeal_id: AppealId = submitted
        .u64_attr("appeal-id")
        .unwrap()
        .to_string()
        .parse()
        .unwrap();

    app.exec(
        "rob",
        ExecuteMsg::AddAppealEvidence {
            appeal_id,
            uri: "ipfs://more".to_owned(),
        },
    )
    .unwrap();

    app.exec(
        &reviewers[0].clone(),
        ExecuteMsg::VoteOnAppeal {
            appeal_id,
            choice: VoteChoice::Dismiss,
            comment: None,
        },
    )
    .unwrap();

    let err = app
        .exec(
            "rob",
            ExecuteMsg::AddAppealEvidence {
                appeal_id,
                uri: "ipfs://late".to_owned(),
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::EvidenceLockedAfterVoting);

    let err = app
        .exec(
            &reviewers[0].clone(),
            ExecuteMsg::VoteOnAppeal {
                appeal_id,
                choice: VoteChoice::Dismiss,
                comment: None,
            },
        )
        .unwrap_err();
    assert_eq!(error_id(&err), ErrorId::AppealReviewerAlreadyVoted);
}
