//! The ShareHodl platform core.
//!
//! A deterministic transaction handler over a key-value store. The
//! surrounding shell feeds it ordered transactions plus block context and
//! applies the resulting events; consensus, networking and the bank /
//! staking / equity primitives live outside and are injected as traits.

mod cache;
pub mod collaborators;
mod contract;
mod prelude;
mod rng;
mod state;

pub use cache::CacheStorage;
pub use contract::{deduct_fee, end_block, execute, instantiate, BlockEnv, Collaborators};
pub use state::{State, StateContext};
