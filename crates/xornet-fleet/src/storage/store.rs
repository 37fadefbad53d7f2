//! Typed repository contracts the fleet core depends on.
//!
//! One trait per entity; the core never names a concrete store. Every method
//! may fail with an infrastructure [`DatabaseError`], which callers must pass
//! on rather than reinterpret.

use std::future::Future;

use xornet_core::db::DatabaseError;

use super::models::{Label, Machine, NewLabel, NewMachine, NewUser, User};

/// Ways to look a single user up.
#[derive(Debug, Clone, Copy)]
pub enum UserLookup<'a> {
    Uuid(&'a str),
    Username(&'a str),
    Email(&'a str),
}

/// Ways to look a single machine up.
#[derive(Debug, Clone, Copy)]
pub enum MachineLookup<'a> {
    Uuid(&'a str),
    AccessToken(&'a str),
}

pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateKey` when the username or email is taken.
    fn create_user(
        &self,
        params: &NewUser<'_>,
    ) -> impl Future<Output = Result<User, DatabaseError>> + Send;

    fn find_user(
        &self,
        lookup: UserLookup<'_>,
    ) -> impl Future<Output = Result<User, DatabaseError>> + Send;

    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, DatabaseError>> + Send;

    fn delete_user(&self, uuid: &str) -> impl Future<Output = Result<bool, DatabaseError>> + Send;
}

pub trait MachineStore: Send + Sync {
    fn create_machine(
        &self,
        params: &NewMachine<'_>,
    ) -> impl Future<Output = Result<Machine, DatabaseError>> + Send;

    fn find_machine(
        &self,
        lookup: MachineLookup<'_>,
    ) -> impl Future<Output = Result<Machine, DatabaseError>> + Send;

    /// All machines of one owner, or every machine when `owner_uuid` is `None`.
    fn list_machines(
        &self,
        owner_uuid: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Machine>, DatabaseError>> + Send;

    /// Persist the mutable fields of `machine` (name, status, `last_update`).
    fn save_machine(
        &self,
        machine: &Machine,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send;

    /// Mark the machine online as of `now`. Fails with `NotFound` if it is gone.
    fn record_heartbeat(
        &self,
        uuid: &str,
        now: i64,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send;

    /// Online → offline, only if `last_update` still equals `observed`.
    /// Returns whether the row changed.
    fn demote_machine(
        &self,
        uuid: &str,
        observed: Option<i64>,
        now: i64,
    ) -> impl Future<Output = Result<bool, DatabaseError>> + Send;

    /// Delete, only if `last_update` still equals `observed`.
    /// Returns whether the row was removed.
    fn evict_machine(
        &self,
        uuid: &str,
        observed: Option<i64>,
    ) -> impl Future<Output = Result<bool, DatabaseError>> + Send;

    fn delete_machine(&self, uuid: &str)
    -> impl Future<Output = Result<bool, DatabaseError>> + Send;
}

pub trait LabelStore: Send + Sync {
    fn create_label(
        &self,
        params: &NewLabel<'_>,
    ) -> impl Future<Output = Result<Label, DatabaseError>> + Send;

    fn find_label(&self, uuid: &str) -> impl Future<Output = Result<Label, DatabaseError>> + Send;

    fn list_labels(
        &self,
        owner_uuid: &str,
    ) -> impl Future<Output = Result<Vec<Label>, DatabaseError>> + Send;

    fn delete_label(&self, uuid: &str) -> impl Future<Output = Result<bool, DatabaseError>> + Send;
}

/// Everything the fleet core needs from storage.
pub trait FleetStore: UserStore + MachineStore + LabelStore + Clone + 'static {}

impl<T> FleetStore for T where T: UserStore + MachineStore + LabelStore + Clone + 'static {}
