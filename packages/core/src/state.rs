pub(crate) mod appeal;
pub(crate) mod bridge;
pub(crate) mod end_block;
pub(crate) mod escrow;
pub(crate) mod fees;
pub(crate) mod history;
pub(crate) mod inheritance;
pub(crate) mod liquidity;
pub(crate) mod market;
pub(crate) mod matching;
pub(crate) mod order;
pub(crate) mod recovery;
pub(crate) mod report;
pub(crate) mod stats;

use crate::collaborators::{Bank, Equity, Staking};
use crate::contract::BlockEnv;
use crate::prelude::*;
use cw_storage_plus::Item;

pub(crate) const CONFIG: Item<Config> = Item::new(namespace::CONFIG);

/// Read-only handler context: block environment, configuration and the
/// injected collaborators.
pub struct State<'a> {
    pub(crate) env: BlockEnv,
    pub(crate) config: Config,
    pub(crate) bank: &'a dyn Bank,
    pub(crate) staking: &'a dyn Staking,
    pub(crate) equity: &'a dyn Equity,
}

/// Mutable handler context: the store plus the event accumulator.
pub struct StateContext<'a> {
    pub storage: &'a mut dyn Storage,
    response: ResponseBuilder,
}

impl<'a> State<'a> {
    pub(crate) fn new(
        bank: &'a dyn Bank,
        staking: &'a dyn Staking,
        equity: &'a dyn Equity,
        env: BlockEnv,
        store: &dyn Storage,
    ) -> Result<Self> {
        let config = load_config(store)?;
        Ok(State {
            env,
            config,
            bank,
            staking,
            equity,
        })
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.env.time
    }

    pub(crate) fn assert_governance(&self, sender: &Addr) -> Result<()> {
        platform_ensure!(
            sender == &self.config.governance,
            ErrorId::Unauthorized,
            ErrorDomain::Config,
            "{sender} is not the governance address"
        );
        Ok(())
    }
}

impl<'a> StateContext<'a> {
    pub(crate) fn new(storage: &'a mut dyn Storage) -> Self {
        StateContext {
            storage,
            response: ResponseBuilder::new(),
        }
    }

    pub(crate) fn response_mut(&mut self) -> &mut ResponseBuilder {
        &mut self.response
    }

    pub(crate) fn into_response(self) -> Response {
        self.response.into_response()
    }
}

pub(crate) fn load_config(store: &dyn Storage) -> Result<Config> {
    CONFIG.load(store).context("Could not load platform config")
}

pub(crate) fn save_config(store: &mut dyn Storage, config: &Config) -> Result<()> {
    config.check()?;
    CONFIG
        .save(store, config)
        .context("Could not save platform config")
}
