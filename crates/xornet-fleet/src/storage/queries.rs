//! User queries for the fleet database.

use xornet_core::db::{DatabaseError, unix_timestamp};

use super::db::FleetDatabase;
use super::models::{NewUser, User};
use super::store::{UserLookup, UserStore};

impl UserStore for FleetDatabase {
    async fn create_user(&self, params: &NewUser<'_>) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (uuid, username, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(params.uuid)
        .bind(params.username)
        .bind(params.email)
        .bind(params.password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_user(UserLookup::Uuid(params.uuid)).await
    }

    async fn find_user(&self, lookup: UserLookup<'_>) -> Result<User, DatabaseError> {
        let (sql, key, what) = match lookup {
            UserLookup::Uuid(v) => ("SELECT * FROM users WHERE uuid = ?", v, "uuid"),
            UserLookup::Username(v) => ("SELECT * FROM users WHERE username = ?", v, "username"),
            UserLookup::Email(v) => ("SELECT * FROM users WHERE email = ?", v, "email"),
        };

        sqlx::query_as::<_, User>(sql)
            .bind(key)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with {what} {key}")))
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, username")
            .fetch_all(self.pool())
            .await?;
        Ok(users)
    }

    async fn delete_user(&self, uuid: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE uuid = ?")
            .bind(uuid)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
