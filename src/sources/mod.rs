//! Frame source implementations

pub mod replay;

pub use replay::{DEFAULT_POOL_SIZE, ReplaySource};
