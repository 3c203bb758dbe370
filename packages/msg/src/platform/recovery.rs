//! Recovery waterfall events.

/// Events
pub mod events {
    use crate::constants::event_key;
    use crate::ids::ReportId;
    use cosmwasm_std::{Event, Uint128};

    /// One waterfall source produced funds.
    pub struct RecoveryStepEvent {
        /// The confirmed report driving the recovery
        pub report_id: ReportId,
        /// `clawback`, `reserve` or `slash`
        pub source: String,
        /// Amount produced by this source
        pub amount: Uint128,
    }

    impl From<RecoveryStepEvent> for Event {
        fn from(src: RecoveryStepEvent) -> Self {
            Event::new("recovery-step")
                .add_attribute(event_key::REPORT_ID, src.report_id.to_string())
                .add_attribute(event_key::SOURCE, src.source)
                .add_attribute(event_key::AMOUNT, src.amount.to_string())
        }
    }

    /// The waterfall could not make the victim whole; the remainder needs
    /// a governance proposal.
    pub struct RecoveryShortfallEvent {
        /// The confirmed report driving the recovery
        pub report_id: ReportId,
        /// What the victim actually received
        pub recovered: Uint128,
        /// What remains owed
        pub shortfall: Uint128,
    }

    impl From<RecoveryShortfallEvent> for Event {
        fn from(src: RecoveryShortfallEvent) -> Self {
            Event::new("recovery-shortfall")
                .add_attribute(event_key::REPORT_ID, src.report_id.to_string())
                .add_attribute(event_key::RECOVERED, src.recovered.to_string())
                .add_attribute(event_key::SHORTFALL, src.shortfall.to_string())
                .add_attribute(event_key::ACTION, "governance_proposal_required")
        }
    }

}
