use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub reports_to: Option<String>, // may form cycles
}

/// The `{id, name}` pair embedded in every alert response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub employee: EmployeeSummary,
    pub severity: Severity,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub status: AlertStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Open,
    Dismissed,
}

/// Which part of a manager's organization a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Employees reporting straight to the manager.
    #[default]
    Direct,
    /// Every employee reachable below the manager.
    Subtree,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "open",
            AlertStatus::Dismissed => "dismissed",
        }
    }
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Direct => "direct",
            Scope::Subtree => "subtree",
        }
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(ParseEnumError {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for AlertStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(AlertStatus::Open),
            "dismissed" => Ok(AlertStatus::Dismissed),
            _ => Err(ParseEnumError {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Scope {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Scope::Direct),
            "subtree" => Ok(Scope::Subtree),
            _ => Err(ParseEnumError {
                kind: "scope",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// --- SQLite column mapping ---

impl ToSql for Severity {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Severity {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<Self>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for AlertStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AlertStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<Self>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_serializes_to_wire_shape() {
        let alert = Alert {
            id: "A1".to_string(),
            employee: EmployeeSummary {
                id: "E3".to_string(),
                name: "Jordan Lee".to_string(),
            },
            severity: Severity::High,
            category: "retention".to_string(),
            created_at: "2025-09-01T09:00:00Z".parse().unwrap(),
            status: AlertStatus::Open,
        };

        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "A1",
                "employee": {"id": "E3", "name": "Jordan Lee"},
                "severity": "high",
                "category": "retention",
                "created_at": "2025-09-01T09:00:00Z",
                "status": "open"
            })
        );
    }

    #[test]
    fn enum_parsing_is_exact() {
        assert_eq!("medium".parse::<Severity>(), Ok(Severity::Medium));
        assert!("High".parse::<Severity>().is_err());
        assert!("critical".parse::<Severity>().is_err());
        assert_eq!("dismissed".parse::<AlertStatus>(), Ok(AlertStatus::Dismissed));
        assert!("pending".parse::<AlertStatus>().is_err());
        assert_eq!("subtree".parse::<Scope>(), Ok(Scope::Subtree));
        assert_eq!(Scope::default(), Scope::Direct);
        assert_eq!(AlertStatus::default(), AlertStatus::Open);
    }
}
