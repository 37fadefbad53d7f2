//! In-memory store with fault injection, shared by the fleet and reaper tests.
//!
//! Behaves like `FleetDatabase` (unique username/email/token, conditional
//! demote/evict) and can be told to fail everything or only the writes for
//! particular machines.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use xornet_core::db::DatabaseError;

use crate::liveness::MachineStatus;
use crate::storage::{
    Label, LabelStore, Machine, MachineLookup, MachineStore, NewLabel, NewMachine, NewUser, User,
    UserLookup, UserStore,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    machines: HashMap<String, Machine>,
    labels: HashMap<String, Label>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    outage: Arc<AtomicBool>,
    failing_machines: Arc<Mutex<HashSet<String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were unreachable.
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    /// Make writes to one machine fail.
    pub fn fail_writes_for(&self, machine_uuid: &str) {
        self.failing_machines
            .lock()
            .unwrap()
            .insert(machine_uuid.to_string());
    }

    /// Number of successful machine writes (save/heartbeat/demote/evict/delete).
    pub fn machine_writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Insert a machine row as-is, bypassing registration.
    pub fn put_machine(&self, machine: Machine) {
        self.tables()
            .machines
            .insert(machine.uuid.clone(), machine);
    }

    pub fn machine(&self, uuid: &str) -> Option<Machine> {
        self.tables().machines.get(uuid).cloned()
    }

    pub fn machine_count(&self) -> usize {
        self.tables().machines.len()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    fn check_up(&self) -> Result<(), DatabaseError> {
        if self.outage.load(Ordering::SeqCst) {
            Err(DatabaseError::Connection("connection refused".into()))
        } else {
            Ok(())
        }
    }

    fn check_machine_write(&self, uuid: &str) -> Result<(), DatabaseError> {
        self.check_up()?;
        if self.failing_machines.lock().unwrap().contains(uuid) {
            return Err(DatabaseError::Query(format!("disk I/O error writing {uuid}")));
        }
        Ok(())
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn machine_row(uuid: &str, status: MachineStatus, last_update: Option<i64>) -> Machine {
    Machine {
        uuid: uuid.to_string(),
        hardware_uuid: "hw".to_string(),
        owner_uuid: "owner".to_string(),
        name: format!("host-{uuid}"),
        access_token: format!("token-{uuid}"),
        status,
        last_update,
        created_at: 0,
        updated_at: 0,
    }
}

impl UserStore for MemoryStore {
    async fn create_user(&self, params: &NewUser<'_>) -> Result<User, DatabaseError> {
        self.check_up()?;
        let mut t = self.tables();
        if t
            .users
            .values()
            .any(|u| u.username == params.username || u.email == params.email)
        {
            return Err(DatabaseError::DuplicateKey("users.username".into()));
        }
        let user = User {
            uuid: params.uuid.to_string(),
            username: params.username.to_string(),
            email: params.email.to_string(),
            password_hash: params.password_hash.to_string(),
            created_at: 0,
            updated_at: 0,
        };
        t.users.insert(user.uuid.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, lookup: UserLookup<'_>) -> Result<User, DatabaseError> {
        self.check_up()?;
        let t = self.tables();
        let found = t.users.values().find(|u| match lookup {
            UserLookup::Uuid(v) => u.uuid == v,
            UserLookup::Username(v) => u.username == v,
            UserLookup::Email(v) => u.email == v,
        });
        found
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound("User".into()))
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        self.check_up()?;
        Ok(self.tables().users.values().cloned().collect())
    }

    async fn delete_user(&self, uuid: &str) -> Result<bool, DatabaseError> {
        self.check_up()?;
        Ok(self.tables().users.remove(uuid).is_some())
    }
}

impl MachineStore for MemoryStore {
    async fn create_machine(&self, params: &NewMachine<'_>) -> Result<Machine, DatabaseError> {
        self.check_up()?;
        let mut t = self.tables();
        if t
            .machines
            .values()
            .any(|m| m.access_token == params.access_token)
        {
            return Err(DatabaseError::DuplicateKey("machines.access_token".into()));
        }
        let machine = Machine {
            uuid: params.uuid.to_string(),
            hardware_uuid: params.hardware_uuid.to_string(),
            owner_uuid: params.owner_uuid.to_string(),
            name: params.name.to_string(),
            access_token: params.access_token.to_string(),
            status: MachineStatus::Offline,
            last_update: None,
            created_at: 0,
            updated_at: 0,
        };
        t.machines.insert(machine.uuid.clone(), machine.clone());
        Ok(machine)
    }

    async fn find_machine(&self, lookup: MachineLookup<'_>) -> Result<Machine, DatabaseError> {
        self.check_up()?;
        let t = self.tables();
        let found = t.machines.values().find(|m| match lookup {
            MachineLookup::Uuid(v) => m.uuid == v,
            MachineLookup::AccessToken(v) => m.access_token == v,
        });
        found
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound("Machine".into()))
    }

    async fn list_machines(&self, owner_uuid: Option<&str>) -> Result<Vec<Machine>, DatabaseError> {
        self.check_up()?;
        let mut machines: Vec<Machine> = self
            .tables()
            .machines
            .values()
            .filter(|m| owner_uuid.is_none_or(|o| m.owner_uuid == o))
            .cloned()
            .collect();
        machines.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        Ok(machines)
    }

    async fn save_machine(&self, machine: &Machine) -> Result<(), DatabaseError> {
        self.check_machine_write(&machine.uuid)?;
        let mut t = self.tables();
        let Some(stored) = t.machines.get_mut(&machine.uuid) else {
            return Err(DatabaseError::NotFound(format!("Machine {}", machine.uuid)));
        };
        stored.name.clone_from(&machine.name);
        stored.status = machine.status;
        stored.last_update = machine.last_update;
        stored.updated_at = machine.updated_at;
        drop(t);
        self.wrote();
        Ok(())
    }

    async fn record_heartbeat(&self, uuid: &str, now: i64) -> Result<(), DatabaseError> {
        self.check_machine_write(uuid)?;
        let mut t = self.tables();
        let Some(stored) = t.machines.get_mut(uuid) else {
            return Err(DatabaseError::NotFound(format!("Machine {uuid}")));
        };
        stored.heartbeat_received(now);
        drop(t);
        self.wrote();
        Ok(())
    }

    async fn demote_machine(
        &self,
        uuid: &str,
        observed: Option<i64>,
        now: i64,
    ) -> Result<bool, DatabaseError> {
        self.check_machine_write(uuid)?;
        let mut t = self.tables();
        let Some(stored) = t.machines.get_mut(uuid) else {
            return Ok(false);
        };
        if stored.status != MachineStatus::Online || stored.last_update != observed {
            return Ok(false);
        }
        stored.status = MachineStatus::Offline;
        stored.updated_at = now;
        drop(t);
        self.wrote();
        Ok(true)
    }

    async fn evict_machine(&self, uuid: &str, observed: Option<i64>) -> Result<bool, DatabaseError> {
        self.check_machine_write(uuid)?;
        let mut t = self.tables();
        if t.machines.get(uuid).is_none_or(|m| m.last_update != observed) {
            return Ok(false);
        }
        t.machines.remove(uuid);
        drop(t);
        self.wrote();
        Ok(true)
    }

    async fn delete_machine(&self, uuid: &str) -> Result<bool, DatabaseError> {
        self.check_machine_write(uuid)?;
        let removed = self.tables().machines.remove(uuid).is_some();
        if removed {
            self.wrote();
        }
        Ok(removed)
    }
}

impl LabelStore for MemoryStore {
    async fn create_label(&self, params: &NewLabel<'_>) -> Result<Label, DatabaseError> {
        self.check_up()?;
        let label = Label {
            uuid: params.uuid.to_string(),
            owner_uuid: params.owner_uuid.to_string(),
            name: params.name.to_string(),
            color: params.color.to_string(),
            icon: params.icon,
            description: params.description.to_string(),
            created_at: 0,
            updated_at: 0,
        };
        self.tables()
            .labels
            .insert(label.uuid.clone(), label.clone());
        Ok(label)
    }

    async fn find_label(&self, uuid: &str) -> Result<Label, DatabaseError> {
        self.check_up()?;
        self.tables()
            .labels
            .get(uuid)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("Label {uuid}")))
    }

    async fn list_labels(&self, owner_uuid: &str) -> Result<Vec<Label>, DatabaseError> {
        self.check_up()?;
        Ok(self
            .tables()
            .labels
            .values()
            .filter(|l| l.owner_uuid == owner_uuid)
            .cloned()
            .collect())
    }

    async fn delete_label(&self, uuid: &str) -> Result<bool, DatabaseError> {
        self.check_up()?;
        Ok(self.tables().labels.remove(uuid).is_some())
    }
}
