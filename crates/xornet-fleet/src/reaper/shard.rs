//! Sweep leadership by shard convention.

/// Shard that owns the sweep when the fleet runs several instances.
pub const LEADER_SHARD: &str = "1";

/// Decides whether this instance sweeps.
///
/// An unsharded instance, or the one configured as shard `"1"`, is the
/// leader. Nothing coordinates this: two instances both configured as shard
/// 1 will both sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardGuard {
    shard: Option<String>,
}

impl ShardGuard {
    pub fn new(shard: Option<&str>) -> Self {
        Self {
            shard: shard
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    pub fn shard(&self) -> Option<&str> {
        self.shard.as_deref()
    }

    pub fn is_leader(&self) -> bool {
        self.shard.as_deref().is_none_or(|s| s == LEADER_SHARD)
    }
}
