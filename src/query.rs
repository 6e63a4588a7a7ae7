//! Listing and dismissing alerts for a manager's organization.

use serde::Deserialize;
use std::collections::HashSet;
use std::hash::Hash;
use std::str::FromStr;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::ApiError;
use crate::models::{Alert, AlertStatus, Scope, Severity};
use crate::org::resolve_scope;

/// Raw query-string parameters of an alert listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertParams {
    pub manager_id: Option<String>,
    pub scope: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub q: Option<String>,
}

impl AlertParams {
    /// Builds params from raw query pairs. A repeated key keeps its last
    /// value and unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "manager_id" => &mut params.manager_id,
                "scope" => &mut params.scope,
                "severity" => &mut params.severity,
                "status" => &mut params.status,
                "q" => &mut params.q,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }
}

/// A listing request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertQuery {
    pub manager_id: String,
    pub scope: Scope,
    pub filter: AlertFilter,
}

/// Post-scope filters. An unset dimension lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    severities: Option<HashSet<Severity>>,
    statuses: Option<HashSet<AlertStatus>>,
    name: Option<String>, // lowercased
}

impl AlertFilter {
    pub fn with_severities(mut self, severities: HashSet<Severity>) -> Self {
        self.severities = Some(severities);
        self
    }

    pub fn with_statuses(mut self, statuses: HashSet<AlertStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    /// Case-insensitive substring match on the employee name.
    pub fn with_name(mut self, needle: &str) -> Self {
        self.name = Some(needle.to_lowercase());
        self
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        if let Some(severities) = &self.severities {
            if !severities.contains(&alert.severity) {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&alert.status) {
                return false;
            }
        }
        if let Some(needle) = &self.name {
            if !alert.employee.name.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

impl AlertQuery {
    /// Validates `params` in a fixed order, stopping at the first failure:
    /// manager_id present, manager exists, scope, severity, status.
    pub fn validate(db: &Database, params: &AlertParams) -> Result<Self, ApiError> {
        let manager_id = params
            .manager_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingManagerId)?;

        if db.get_employee(manager_id)?.is_none() {
            return Err(ApiError::ManagerNotFound);
        }

        let scope = match params.scope.as_deref() {
            None => Scope::default(),
            Some(raw) => raw.parse::<Scope>().map_err(|_| ApiError::InvalidScope)?,
        };

        let severities = parse_list::<Severity>(params.severity.as_deref())
            .map_err(|_| ApiError::InvalidSeverity)?;
        let statuses = parse_list::<AlertStatus>(params.status.as_deref())
            .map_err(|_| ApiError::InvalidStatus)?;

        let mut filter = AlertFilter::default();
        if let Some(severities) = severities {
            filter = filter.with_severities(severities);
        }
        if let Some(statuses) = statuses {
            filter = filter.with_statuses(statuses);
        }
        if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
            filter = filter.with_name(q);
        }

        Ok(Self {
            manager_id: manager_id.to_string(),
            scope,
            filter,
        })
    }
}

/// Parses a comma-separated list, trimming each token. An absent or empty
/// parameter means no restriction.
fn parse_list<T>(raw: Option<&str>) -> Result<Option<HashSet<T>>, T::Err>
where
    T: FromStr + Eq + Hash,
{
    match raw {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .split(',')
            .map(|token| token.trim().parse())
            .collect::<Result<HashSet<_>, _>>()
            .map(Some),
    }
}

/// Newest first; equal timestamps by ascending id.
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Alerts for employees in the manager's scope, filtered and ordered. The
/// manager's own alerts are never included.
pub fn list_alerts(db: &Database, params: &AlertParams) -> Result<Vec<Alert>, ApiError> {
    let query = AlertQuery::validate(db, params).inspect_err(|err| {
        if !matches!(err, ApiError::Store(_)) {
            warn!(
                manager_id = params.manager_id.as_deref().unwrap_or_default(),
                reason = %err,
                "rejected alert query"
            );
        }
    })?;

    run_query(db, &query)
}

/// Executes an already validated query.
pub fn run_query(db: &Database, query: &AlertQuery) -> Result<Vec<Alert>, ApiError> {
    let employee_ids = resolve_scope(db, &query.manager_id, query.scope)?;

    let mut alerts: Vec<Alert> = db
        .alerts_for_employees(&employee_ids)?
        .into_iter()
        .filter(|alert| query.filter.matches(alert))
        .collect();
    sort_alerts(&mut alerts);

    info!(
        manager_id = %query.manager_id,
        scope = %query.scope,
        in_scope = employee_ids.len(),
        results = alerts.len(),
        "listed alerts"
    );
    Ok(alerts)
}

/// Sets the alert's status to dismissed. Repeating the call is harmless and
/// returns the same alert.
pub fn dismiss_alert(db: &Database, alert_id: &str) -> Result<Alert, ApiError> {
    match db.dismiss_alert(alert_id)? {
        Some(alert) => {
            info!(alert_id, "alert dismissed");
            Ok(alert)
        }
        None => {
            warn!(alert_id, "alert not found");
            Err(ApiError::AlertNotFound)
        }
    }
}
