//! Label queries for the fleet database.

use xornet_core::db::{DatabaseError, unix_timestamp};

use super::db::FleetDatabase;
use super::models::{Label, NewLabel};
use super::store::LabelStore;

impl LabelStore for FleetDatabase {
    async fn create_label(&self, params: &NewLabel<'_>) -> Result<Label, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO labels (uuid, owner_uuid, name, color, icon, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.uuid)
        .bind(params.owner_uuid)
        .bind(params.name)
        .bind(params.color)
        .bind(params.icon)
        .bind(params.description)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_label(params.uuid).await
    }

    async fn find_label(&self, uuid: &str) -> Result<Label, DatabaseError> {
        sqlx::query_as::<_, Label>("SELECT * FROM labels WHERE uuid = ?")
            .bind(uuid)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Label {uuid}")))
    }

    async fn list_labels(&self, owner_uuid: &str) -> Result<Vec<Label>, DatabaseError> {
        let labels = sqlx::query_as::<_, Label>(
            "SELECT * FROM labels WHERE owner_uuid = ? ORDER BY name, created_at",
        )
        .bind(owner_uuid)
        .fetch_all(self.pool())
        .await?;
        Ok(labels)
    }

    async fn delete_label(&self, uuid: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM labels WHERE uuid = ?")
            .bind(uuid)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
