// Lineup search: stacks, construction, validation, scoring, local search,
// ownership balancing, and export.

pub mod builder;
pub mod export;
pub mod generator;
#[allow(clippy::module_inception)]
pub mod lineup;
pub mod optimizer;
pub mod ownership;
pub mod scoring;
pub mod stack;
pub mod validator;
