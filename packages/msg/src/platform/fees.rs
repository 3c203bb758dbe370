//! Fee settlement events.

/// Events
pub mod events {
    use crate::constants::event_key;
    use cosmwasm_std::{Addr, Event, Uint128};

    /// A transaction fee was settled.
    pub struct FeeDeductedEvent {
        /// Paying address
        pub payer: Addr,
        /// Fee amount, in the fee denom
        pub amount: Uint128,
    }

    impl From<FeeDeductedEvent> for Event {
        fn from(src: FeeDeductedEvent) -> Self {
            Event::new("fee-deducted")
                .add_attribute(event_key::PAYER, src.payer.to_string())
                .add_attribute(event_key::FEE_AMOUNT, src.amount.to_string())
        }
    }

    /// Holdings were auto-swapped into the fee denom to cover a shortfall.
    ///
    /// The output comes from module reserves; the fee denom supply never
    /// changes on this path.
    pub struct EquityToFeeSwapEvent {
        /// Paying address
        pub payer: Addr,
        /// Denom swapped away
        pub equity_denom: String,
        /// Amount swapped away
        pub equity_amount: Uint128,
        /// Fee-denom units delivered from module reserves
        pub output: Uint128,
    }

    impl From<EquityToFeeSwapEvent> for Event {
        fn from(src: EquityToFeeSwapEvent) -> Self {
            Event::new("equity-to-fee-swap")
                .add_attribute(event_key::PAYER, src.payer.to_string())
                .add_attribute(event_key::EQUITY_DENOM, src.equity_denom)
                .add_attribute(event_key::EQUITY_AMOUNT, src.equity_amount.to_string())
                .add_attribute(event_key::OUTPUT_AMOUNT, src.output.to_string())
        }
    }
}
