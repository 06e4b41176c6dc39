// Library root: re-exports all modules so integration tests and the binary
// share the crate's public API.

pub mod backtest;
pub mod config;
pub mod lineup;
pub mod roster;

#[cfg(test)]
pub(crate) mod testutil;
