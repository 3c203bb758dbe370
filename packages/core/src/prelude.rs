pub(crate) use crate::collaborators::{module, Bank, Equity, Staking};
pub(crate) use crate::state::{State, StateContext};
pub(crate) use msg::prelude::*;
