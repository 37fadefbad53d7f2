//! Machine queries for the fleet database.
//!
//! The reaper's writes (`demote_machine`, `evict_machine`) are conditional
//! on `last_update` being what the sweep read, so a heartbeat that lands
//! between the read and the write is never overwritten.

use xornet_core::db::{DatabaseError, unix_timestamp};

use super::db::FleetDatabase;
use super::models::{Machine, NewMachine};
use super::store::{MachineLookup, MachineStore};
use crate::liveness::MachineStatus;

impl MachineStore for FleetDatabase {
    async fn create_machine(&self, params: &NewMachine<'_>) -> Result<Machine, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO machines (uuid, hardware_uuid, owner_uuid, name, access_token, status, last_update, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(params.uuid)
        .bind(params.hardware_uuid)
        .bind(params.owner_uuid)
        .bind(params.name)
        .bind(params.access_token)
        .bind(MachineStatus::Offline)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_machine(MachineLookup::Uuid(params.uuid)).await
    }

    async fn find_machine(&self, lookup: MachineLookup<'_>) -> Result<Machine, DatabaseError> {
        let (sql, key) = match lookup {
            MachineLookup::Uuid(v) => ("SELECT * FROM machines WHERE uuid = ?", v),
            MachineLookup::AccessToken(v) => ("SELECT * FROM machines WHERE access_token = ?", v),
        };

        let machine = sqlx::query_as::<_, Machine>(sql)
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        // Never echo an access token into an error message.
        machine.ok_or_else(|| match lookup {
            MachineLookup::Uuid(uuid) => DatabaseError::NotFound(format!("Machine {uuid}")),
            MachineLookup::AccessToken(_) => {
                DatabaseError::NotFound("Machine with access token".to_string())
            }
        })
    }

    async fn list_machines(&self, owner_uuid: Option<&str>) -> Result<Vec<Machine>, DatabaseError> {
        let machines = if let Some(owner) = owner_uuid {
            sqlx::query_as::<_, Machine>(
                "SELECT * FROM machines WHERE owner_uuid = ? ORDER BY created_at, uuid",
            )
            .bind(owner)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, Machine>("SELECT * FROM machines ORDER BY created_at, uuid")
                .fetch_all(self.pool())
                .await?
        };

        Ok(machines)
    }

    async fn save_machine(&self, machine: &Machine) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE machines SET name = ?, status = ?, last_update = ?, updated_at = ? WHERE uuid = ?",
        )
        .bind(&machine.name)
        .bind(machine.status)
        .bind(machine.last_update)
        .bind(machine.updated_at)
        .bind(&machine.uuid)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Machine {}", machine.uuid)));
        }
        Ok(())
    }

    async fn record_heartbeat(&self, uuid: &str, now: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE machines SET status = ?, last_update = ?, updated_at = ? WHERE uuid = ?",
        )
        .bind(MachineStatus::Online)
        .bind(now)
        .bind(now)
        .bind(uuid)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Machine {uuid}")));
        }
        Ok(())
    }

    async fn demote_machine(
        &self,
        uuid: &str,
        observed: Option<i64>,
        now: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE machines SET status = ?, updated_at = ? WHERE uuid = ? AND status = ? AND last_update IS ?",
        )
        .bind(MachineStatus::Offline)
        .bind(now)
        .bind(uuid)
        .bind(MachineStatus::Online)
        .bind(observed)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn evict_machine(&self, uuid: &str, observed: Option<i64>) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM machines WHERE uuid = ? AND last_update IS ?")
            .bind(uuid)
            .bind(observed)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_machine(&self, uuid: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM machines WHERE uuid = ?")
            .bind(uuid)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
