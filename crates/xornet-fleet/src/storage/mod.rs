//! Fleet storage: typed repository contracts and their `SQLite`
//! implementation.
//!
//! Provides persistence for users, machines, and labels.

mod db;
mod models;
mod queries;
mod queries_labels;
mod queries_machines;
mod store;


pub use db::FleetDatabase;
pub use models::*;
pub use store::{FleetStore, LabelStore, MachineLookup, MachineStore, UserLookup, UserStore};
pub use xornet_core::db::DatabaseError;
