//! Fleet façade: machine, user and label operations.
//!
//! Every operation validates its input before touching storage. Storage
//! failures come back as [`FleetError::StorageUnavailable`]; only the lookups
//! that are expected to miss turn `NotFound` into a domain error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use xornet_core::db::{DatabaseError, unix_timestamp};

use crate::auth::password;
use crate::auth::{SessionToken, TokenIssuer};
use crate::error::{FleetError, Result};
use crate::storage::{
    FleetStore, Label, Machine, MachineLookup, NewLabel, NewMachine, NewUser, User, UserLookup,
};
use crate::validate;

#[cfg(test)]
pub(crate) mod test_helpers;


/// Label fields as submitted by an owner, before normalisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelInput {
    pub name: String,
    pub color: String,
    pub icon: String,
    #[serde(default)]
    pub description: String,
}

/// A user together with a freshly issued session.
#[derive(Debug, Clone, Serialize)]
pub struct UserSession {
    pub user: User,
    pub session: SessionToken,
}

pub struct FleetManager<S> {
    store: S,
    tokens: Arc<TokenIssuer>,
}

impl<S: FleetStore> FleetManager<S> {
    pub const fn new(store: S, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Machines
    // =========================================================================

    /// Register hardware under an existing owner and mint its access token.
    ///
    /// Registering the same `hardware_uuid` twice creates a second machine
    /// with a new token.
    #[instrument(skip(self))]
    pub async fn register_machine(
        &self,
        hardware_uuid: &str,
        owner_uuid: &str,
        hostname: &str,
    ) -> Result<Machine> {
        validate::uuid("hardware_uuid", hardware_uuid)?;
        validate::uuid("owner_uuid", owner_uuid)?;
        validate::hostname(hostname)?;

        self.require_owner(owner_uuid).await?;

        let uuid = uuid::Uuid::new_v4().to_string();
        let access_token = self.tokens.issue_machine_token();
        let machine = self
            .store
            .create_machine(&NewMachine {
                uuid: &uuid,
                hardware_uuid,
                owner_uuid,
                name: hostname,
                access_token: &access_token,
            })
            .await?;

        info!(machine_uuid = %machine.uuid, owner_uuid = %owner_uuid, "Machine registered");
        Ok(machine)
    }

    /// Authenticate a machine by access token and record a heartbeat.
    pub async fn login_machine(&self, access_token: &str) -> Result<Machine> {
        self.login_machine_at(access_token, unix_timestamp()).await
    }

    #[instrument(skip(self, access_token))]
    pub async fn login_machine_at(&self, access_token: &str, now: i64) -> Result<Machine> {
        if access_token.is_empty() {
            return Err(FleetError::InvalidToken);
        }

        let mut machine = self
            .store
            .find_machine(MachineLookup::AccessToken(access_token))
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => FleetError::InvalidToken,
                other => other.into(),
            })?;

        machine.heartbeat_received(now);
        self.store
            .record_heartbeat(&machine.uuid, now)
            .await
            .map_err(|e| match e {
                // Evicted between lookup and write.
                DatabaseError::NotFound(_) => FleetError::InvalidToken,
                other => other.into(),
            })?;

        Ok(machine)
    }

    pub async fn get_machine(&self, uuid: &str) -> Result<Machine> {
        validate::uuid("uuid", uuid)?;
        Ok(self.store.find_machine(MachineLookup::Uuid(uuid)).await?)
    }

    pub async fn list_machines(&self, owner_uuid: &str) -> Result<Vec<Machine>> {
        validate::uuid("owner_uuid", owner_uuid)?;
        Ok(self.store.list_machines(Some(owner_uuid)).await?)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Sign up a user and open a session for them.
    ///
    /// `device` is optional request context (e.g. a user agent) embedded in
    /// the session token.
    #[instrument(skip(self, email, password))]
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        device: Option<&str>,
    ) -> Result<UserSession> {
        validate::username(username)?;
        validate::email(email)?;
        validate::password(password)?;

        let password_hash = password::hash_password(password)?;
        let uuid = uuid::Uuid::new_v4().to_string();
        let user = self
            .store
            .create_user(&NewUser {
                uuid: &uuid,
                username,
                email,
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateKey(_) => FleetError::UserExists,
                other => other.into(),
            })?;

        let session = self
            .tokens
            .issue_session_token(&user.uuid, &user.username, device)?;

        info!(user_uuid = %user.uuid, username = %user.username, "User registered");
        Ok(UserSession { user, session })
    }

    /// Check credentials and open a new session.
    #[instrument(skip(self, password))]
    pub async fn login_user(
        &self,
        username: &str,
        password: &str,
        device: Option<&str>,
    ) -> Result<UserSession> {
        let user = self.verify_credentials(username, password).await?;
        let session = self
            .tokens
            .issue_session_token(&user.uuid, &user.username, device)?;

        info!(user_uuid = %user.uuid, username = %user.username, "User logged in");
        Ok(UserSession { user, session })
    }

    /// Delete an account after re-checking its password. A session token alone
    /// is not enough.
    #[instrument(skip(self, password))]
    pub async fn delete_user(&self, username: &str, password: &str) -> Result<()> {
        let user = self.verify_credentials(username, password).await?;

        if !self.store.delete_user(&user.uuid).await? {
            return Err(FleetError::NotFound(format!("User {}", user.uuid)));
        }

        info!(user_uuid = %user.uuid, username = %user.username, "User deleted");
        Ok(())
    }

    /// Resolve the user behind a session token.
    pub async fn authenticate(&self, session_token: &str) -> Result<User> {
        let claims = self.tokens.verify_session_token(session_token)?;
        self.store
            .find_user(UserLookup::Uuid(claims.user_uuid()))
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => FleetError::InvalidToken,
                other => other.into(),
            })
    }

    pub async fn get_user(&self, lookup: UserLookup<'_>) -> Result<User> {
        match lookup {
            UserLookup::Uuid(v) => validate::uuid("uuid", v)?,
            UserLookup::Username(v) => validate::username(v)?,
            UserLookup::Email(v) => validate::email(v)?,
        }
        Ok(self.store.find_user(lookup).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    // =========================================================================
    // Labels
    // =========================================================================

    #[instrument(skip(self, input), fields(label_name = %input.name))]
    pub async fn create_label(&self, owner_uuid: &str, input: &LabelInput) -> Result<Label> {
        validate::uuid("owner_uuid", owner_uuid)?;
        let name = validate::label_name(&input.name)?;
        let color = validate::color(&input.color)?;
        let icon = validate::icon(&input.icon)?;
        validate::description(&input.description)?;

        self.require_owner(owner_uuid).await?;

        let uuid = uuid::Uuid::new_v4().to_string();
        let label = self
            .store
            .create_label(&NewLabel {
                uuid: &uuid,
                owner_uuid,
                name: &name,
                color: &color,
                icon,
                description: &input.description,
            })
            .await?;

        info!(label_uuid = %label.uuid, owner_uuid = %owner_uuid, name = %label.name, "Label created");
        Ok(label)
    }

    pub async fn get_label(&self, uuid: &str) -> Result<Label> {
        validate::uuid("uuid", uuid)?;
        Ok(self.store.find_label(uuid).await?)
    }

    pub async fn list_labels(&self, owner_uuid: &str) -> Result<Vec<Label>> {
        validate::uuid("owner_uuid", owner_uuid)?;
        Ok(self.store.list_labels(owner_uuid).await?)
    }

    /// Delete one of the owner's labels. Someone else's label reads as missing.
    pub async fn delete_label(&self, owner_uuid: &str, uuid: &str) -> Result<()> {
        let label = self.get_label(uuid).await?;
        if label.owner_uuid != owner_uuid {
            warn!(label_uuid = %uuid, owner_uuid = %owner_uuid, "Label delete by non-owner");
            return Err(FleetError::NotFound(format!("Label {uuid}")));
        }
        self.store.delete_label(uuid).await?;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_owner(&self, owner_uuid: &str) -> Result<()> {
        match self.store.find_user(UserLookup::Uuid(owner_uuid)).await {
            Ok(_) => Ok(()),
            Err(DatabaseError::NotFound(_)) => Err(FleetError::InvalidOwner),
            Err(e) => Err(e.into()),
        }
    }

    /// Unknown username and wrong password fail identically.
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<User> {
        if validate::username(username).is_err() {
            return Err(password::reject_unknown_user(password));
        }

        let user = match self.store.find_user(UserLookup::Username(username)).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => return Err(password::reject_unknown_user(password)),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = password::check_password(password, &user.password_hash) {
            warn!(username = %username, "Failed login attempt");
            return Err(e);
        }
        Ok(user)
    }
}
