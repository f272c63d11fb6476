//! Owner (tenant) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant that requests artifact generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Lifetime number of generations requested
    pub artifact_count: i64,
    /// API calls made today; reset by the control loop's daily pass
    pub calls_today: i64,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last updated
    pub updated_at: DateTime<Utc>,
}

impl Owner {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            artifact_count: 0,
            calls_today: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_owner_has_zero_counters() {
        let owner = Owner::new("acme");
        assert_eq!(owner.artifact_count, 0);
        assert_eq!(owner.calls_today, 0);
    }
}
