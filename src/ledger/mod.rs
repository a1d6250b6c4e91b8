//! Commission ledger core: configuration store, hierarchy resolver, wallet
//! ledger and the distribution engine that ties them together.

pub mod config_store;
pub mod distribution;
pub mod hierarchy;
pub mod money;
pub mod wallet;

pub use distribution::{distribute, distribute_detailed};
