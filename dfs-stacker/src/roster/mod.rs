// Roster data: players, reference tables, feed loading, and the pool.

pub mod player;
pub mod pool;
pub mod projections;
pub mod reference;
