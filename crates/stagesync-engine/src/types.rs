//! Common types for the sync core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target-side operation resolved for one described domain object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// The object does not yet exist on the target and must be created.
    Add,
    /// The object exists on the target and must be merged.
    Update,
    /// The target-side copy must be removed.
    Delete,
}

impl Command {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Add => "add",
            Command::Update => "update",
            Command::Delete => "delete",
        }
    }

    /// Check whether this command merges source state onto the target
    /// (true for add and update, false for delete).
    #[must_use]
    pub fn is_upsert(&self) -> bool {
        matches!(self, Command::Add | Command::Update)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" => Ok(Command::Add),
            "update" => Ok(Command::Update),
            "delete" => Ok(Command::Delete),
            _ => Err(format!("Unknown command: {s}")),
        }
    }
}

/// Outcome of replaying one transactional batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Not yet replayed.
    Pending,
    /// All entries committed.
    Applied,
    /// An entry failed before the batch could be rolled back cleanly.
    Failed,
    /// An entry failed and the batch was rolled back; nothing applied.
    RolledBack,
}

impl BatchStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Applied => "applied",
            BatchStatus::Failed => "failed",
            BatchStatus::RolledBack => "rolled_back",
        }
    }

    /// Check if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::Pending)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for duplicate logical keys among a source collection's elements.
///
/// The original tool silently let the first-seen element win; the policy is
/// explicit here so the tolerance is a configuration decision rather than an
/// accident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// First element with a given key wins; later duplicates are skipped.
    #[default]
    FirstWins,
    /// A duplicate key fails the enclosing object's merge.
    Fail,
}

impl DuplicateKeyPolicy {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateKeyPolicy::FirstWins => "first_wins",
            DuplicateKeyPolicy::Fail => "fail",
        }
    }
}

impl fmt::Display for DuplicateKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_roundtrip() {
        for command in [Command::Add, Command::Update, Command::Delete] {
            let parsed: Command = command.as_str().parse().unwrap();
            assert_eq!(command, parsed);
        }
        assert!("replace".parse::<Command>().is_err());
    }

    #[test]
    fn test_command_is_upsert() {
        assert!(Command::Add.is_upsert());
        assert!(Command::Update.is_upsert());
        assert!(!Command::Delete.is_upsert());
    }

    #[test]
    fn test_command_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Command::Add).unwrap(), "\"add\"");
        let back: Command = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(back, Command::Delete);
    }

    #[test]
    fn test_batch_status_terminal() {
        assert!(!BatchStatus::Pending.is_terminal());
        assert!(BatchStatus::Applied.is_terminal());
        assert!(BatchStatus::RolledBack.is_terminal());
    }

    #[test]
    fn test_duplicate_key_policy_default() {
        assert_eq!(DuplicateKeyPolicy::default(), DuplicateKeyPolicy::FirstWins);
    }
}
