//! Xornet fleet core library
//!
//! Machine liveness and session authority for the Xornet fleet:
//! - Machine access tokens and signed user session tokens
//! - Online/Offline liveness driven by heartbeats
//! - Typed repositories with a SQLite implementation
//! - `FleetManager` façade for machine, user and label operations
//! - Shard-aware reaper that demotes silent machines and evicts abandoned ones

pub mod auth;
pub mod error;
pub mod fleet;
pub mod liveness;
pub mod reaper;
pub mod storage;
pub mod validate;

pub use error::{FleetError, Result};
pub use fleet::{FleetManager, LabelInput, UserSession};
pub use reaper::{Reaper, ShardGuard, SweepReport};
