use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

use crate::models::{AlertStatus, Severity};

/// Contents of a seed file: the whole organization plus its alerts.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    pub employees: Vec<SeedEmployee>,
    pub alerts: Vec<SeedAlert>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedEmployee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub reports_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAlert {
    pub id: String,
    pub employee_id: String,
    pub severity: Severity,
    pub category: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: AlertStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub employees: usize,
    pub alerts: usize,
}

impl SeedData {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse seed data")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bundled_seed_file() {
        let seed = SeedData::from_json(include_str!("../data/seed_data.json")).unwrap();
        assert_eq!(seed.employees.len(), 10);
        assert_eq!(seed.alerts.len(), 14);
        assert_eq!(seed.employees[0].reports_to, None);
        assert_eq!(seed.alerts[5].status, AlertStatus::Dismissed);
    }

    #[test]
    fn status_defaults_to_open() {
        let seed = SeedData::from_json(
            r#"{
                "employees": [{"id": "E1", "name": "Solo"}],
                "alerts": [{
                    "id": "A1", "employee_id": "E1", "severity": "low",
                    "category": "workload", "created_at": "2025-01-01T00:00:00Z"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(seed.alerts[0].status, AlertStatus::Open);
        assert_eq!(seed.employees[0].reports_to, None);
    }

    #[test]
    fn rejects_unknown_severity() {
        let err = SeedData::from_json(
            r#"{
                "employees": [],
                "alerts": [{
                    "id": "A1", "employee_id": "E1", "severity": "critical",
                    "category": "x", "created_at": "2025-01-01T00:00:00Z"
                }]
            }"#,
        );
        assert!(err.is_err());
    }
}
