//! Machine liveness: the Online/Offline state machine driven by heartbeat
//! recency.
//!
//! A heartbeat always moves a machine to `Online`. Only the reaper moves it
//! back to `Offline` (after [`OFFLINE_AFTER_SECS`] of silence) or removes it
//! entirely (after [`EVICT_AFTER_SECS`], or if it never reported at all).

use serde::{Deserialize, Serialize};

use crate::storage::Machine;

/// Silence after which an online machine is demoted.
pub const OFFLINE_AFTER_SECS: i64 = 10;

/// Silence after which a machine is evicted.
pub const EVICT_AFTER_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MachineStatus {
    Online,
    /// Also the status of a machine that has never reported.
    #[default]
    Offline,
}

impl MachineStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a sweep should do with one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapAction {
    /// Delete the record. Terminal.
    Evict,
    /// Online → Offline.
    Demote,
    Keep,
}

/// Decide the reaper's action for a machine at `now`.
///
/// Eviction is checked first: a machine silent for more than 30 days is
/// evicted whatever its status, never demoted.
pub const fn reap_check(status: MachineStatus, last_update: Option<i64>, now: i64) -> ReapAction {
    let Some(last) = last_update else {
        return ReapAction::Evict;
    };
    let silence = now - last;
    if silence > EVICT_AFTER_SECS {
        ReapAction::Evict
    } else if matches!(status, MachineStatus::Online) && silence > OFFLINE_AFTER_SECS {
        ReapAction::Demote
    } else {
        ReapAction::Keep
    }
}

impl Machine {
    /// Record a heartbeat: the machine is online as of `now`. Idempotent.
    pub fn heartbeat_received(&mut self, now: i64) {
        self.status = MachineStatus::Online;
        self.last_update = Some(now);
        self.updated_at = now;
    }

    pub const fn reap_check(&self, now: i64) -> ReapAction {
        reap_check(self.status, self.last_update, now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_750_000_000;
    const DAY: i64 = 24 * 60 * 60;

    fn machine(status: MachineStatus, last_update: Option<i64>) -> Machine {
        Machine {
            uuid: "m1".into(),
            hardware_uuid: "hw".into(),
            owner_uuid: "u1".into(),
            name: "box".into(),
            access_token: "t".into(),
            status,
            last_update,
            created_at: NOW - 100 * DAY,
            updated_at: NOW - 100 * DAY,
        }
    }

    #[test]
    fn never_reported_is_evicted() {
        assert_eq!(reap_check(MachineStatus::Offline, None, NOW), ReapAction::Evict);
        assert_eq!(reap_check(MachineStatus::Online, None, NOW), ReapAction::Evict);
    }

    #[test]
    fn older_than_thirty_days_is_evicted_regardless_of_status() {
        for status in [MachineStatus::Online, MachineStatus::Offline] {
            for age in [EVICT_AFTER_SECS + 1, 31 * DAY, 365 * DAY] {
                assert_eq!(
                    reap_check(status, Some(NOW - age), NOW),
                    ReapAction::Evict,
                    "status={status} age={age}"
                );
            }
        }
    }

    #[test]
    fn exactly_thirty_days_is_not_evicted() {
        assert_eq!(
            reap_check(MachineStatus::Online, Some(NOW - EVICT_AFTER_SECS), NOW),
            ReapAction::Demote
        );
        assert_eq!(
            reap_check(MachineStatus::Offline, Some(NOW - EVICT_AFTER_SECS), NOW),
            ReapAction::Keep
        );
    }

    #[test]
    fn online_and_quiet_is_demoted_never_evicted() {
        for age in [OFFLINE_AFTER_SECS + 1, 60, DAY, 29 * DAY, EVICT_AFTER_SECS] {
            assert_eq!(
                reap_check(MachineStatus::Online, Some(NOW - age), NOW),
                ReapAction::Demote,
                "age={age}"
            );
        }
    }

    #[test]
    fn offline_and_quiet_is_kept() {
        assert_eq!(
            reap_check(MachineStatus::Offline, Some(NOW - DAY), NOW),
            ReapAction::Keep
        );
    }

    #[test]
    fn recent_heartbeat_is_kept() {
        for status in [MachineStatus::Online, MachineStatus::Offline] {
            for age in [0, 1, OFFLINE_AFTER_SECS] {
                assert_eq!(reap_check(status, Some(NOW - age), NOW), ReapAction::Keep);
            }
        }
    }

    #[test]
    fn heartbeat_brings_machine_online() {
        let mut m = machine(MachineStatus::Offline, None);
        m.heartbeat_received(NOW);
        assert_eq!(m.status, MachineStatus::Online);
        assert_eq!(m.last_update, Some(NOW));
        assert_eq!(m.updated_at, NOW);
        assert_eq!(m.reap_check(NOW), ReapAction::Keep);
    }

    #[test]
    fn heartbeat_is_idempotent() {
        let mut once = machine(MachineStatus::Offline, Some(NOW - DAY));
        once.heartbeat_received(NOW);

        let mut twice = machine(MachineStatus::Offline, Some(NOW - DAY));
        twice.heartbeat_received(NOW);
        twice.heartbeat_received(NOW);

        assert_eq!(once.status, twice.status);
        assert_eq!(once.last_update, twice.last_update);
    }

    #[test]
    fn status_strings_match_storage() {
        assert_eq!(MachineStatus::Online.as_str(), "online");
        assert_eq!(MachineStatus::default(), MachineStatus::Offline);
        assert_eq!(
            serde_json::to_string(&MachineStatus::Offline).unwrap(),
            "\"offline\""
        );
    }
}
