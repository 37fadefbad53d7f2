//! Data models for fleet storage.

use serde::{Deserialize, Serialize};

use crate::liveness::MachineStatus;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub uuid: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Machine {
    pub uuid: String,
    pub hardware_uuid: String,
    pub owner_uuid: String,
    pub name: String,
    /// Bearer credential, generated once at registration.
    pub access_token: String,
    pub status: MachineStatus,
    /// Time of the last heartbeat; `None` until the machine first reports.
    pub last_update: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LabelIcon {
    Server,
    Desktop,
    Laptop,
    Cloud,
    Database,
    Network,
    Storage,
    Gpu,
}

impl LabelIcon {
    pub const ALL: [Self; 8] = [
        Self::Server,
        Self::Desktop,
        Self::Laptop,
        Self::Cloud,
        Self::Database,
        Self::Network,
        Self::Storage,
        Self::Gpu,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Desktop => "desktop",
            Self::Laptop => "laptop",
            Self::Cloud => "cloud",
            Self::Database => "database",
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Gpu => "gpu",
        }
    }
}

impl std::str::FromStr for LabelIcon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|icon| icon.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown icon '{s}'"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Label {
    pub uuid: String,
    pub owner_uuid: String,
    pub name: String,
    pub color: String,
    pub icon: LabelIcon,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Parameters for creating a user.
pub struct NewUser<'a> {
    pub uuid: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// Parameters for registering a machine.
pub struct NewMachine<'a> {
    pub uuid: &'a str,
    pub hardware_uuid: &'a str,
    pub owner_uuid: &'a str,
    pub name: &'a str,
    pub access_token: &'a str,
}

/// Parameters for creating a label. Fields are already normalised.
pub struct NewLabel<'a> {
    pub uuid: &'a str,
    pub owner_uuid: &'a str,
    pub name: &'a str,
    pub color: &'a str,
    pub icon: LabelIcon,
    pub description: &'a str,
}
