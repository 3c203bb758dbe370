//! Convenient re-exports for platform code.

pub use crate::constants::{event_key, event_val};
pub use crate::error::{ErrorDomain, ErrorId, PlatformError};
pub use crate::event::PlatformEventExt;
pub use crate::ids::{
    AppealId, DepositId, EscrowId, OrderId, PlanId, ReportId, SessionId, TradeId, WithdrawalId,
};
pub use crate::keys::PriceKey;
pub use crate::namespace;
pub use crate::platform::config::{Config, ConfigUpdate};
pub use crate::platform::entry::{ExecuteMsg, InstantiateMsg};
pub use crate::platform::market::MarketId;
pub use crate::response::ResponseBuilder;
pub use crate::storage::alloc_id;
pub use crate::tier::Tier;
pub use crate::time::{day_number, expired, DAY_SECONDS, HOUR_SECONDS, YEAR_SECONDS};
pub use crate::{platform_anyhow, platform_bail, platform_ensure};

pub use anyhow::{anyhow, bail, ensure, Context, Result};
pub use cosmwasm_schema::cw_serde;
pub use cosmwasm_std::{
    Addr, Binary, Coin, Decimal, Event, Order, Response, Storage, Timestamp, Uint128,
};
pub use cw_storage_plus::{Bound, Item, Map, PrefixBound};
pub use std::fmt::Display;
pub use std::str::FromStr;
