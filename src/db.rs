use anyhow::{anyhow, Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::{Alert, AlertStatus, Employee, EmployeeSummary};
use crate::org::ReportingGraph;
use crate::seed::{SeedData, SeedStats};

const ALERT_COLUMNS: &str = "a.id, a.severity, a.category, a.created_at, a.status, e.id, e.name";

/// Bound parameters per `IN (...)` lookup, well under SQLite's variable limit.
const IDS_PER_QUERY: usize = 500;

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::configure(conn, path.to_path_buf())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn, PathBuf::from(":memory:"))
    }

    fn configure(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "hr-alerts") {
            proj_dirs.data_dir().join("hr-alerts.db")
        } else {
            PathBuf::from("hr-alerts.db")
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS employees (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                reports_to TEXT REFERENCES employees(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                employee_id TEXT NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
                severity TEXT NOT NULL CHECK (severity IN ('low', 'medium', 'high')),
                category TEXT NOT NULL,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'dismissed'))
            );

            CREATE INDEX IF NOT EXISTS idx_employees_reports_to ON employees(reports_to);
            CREATE INDEX IF NOT EXISTS idx_alerts_employee ON alerts(employee_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('employees', 'alerts')",
            [],
            |row| row.get(0),
        )?;
        if tables < 2 {
            return Err(anyhow!(
                "Database not initialized. Run 'hr-alerts init' first."
            ));
        }
        Ok(())
    }

    // --- Employee operations ---

    pub fn get_employee(&self, id: &str) -> Result<Option<Employee>> {
        self.conn
            .query_row(
                "SELECT id, name, reports_to FROM employees WHERE id = ?1",
                [id],
                |row| {
                    Ok(Employee {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        reports_to: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to look up employee")
    }

    pub fn count_employees(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Alert operations ---

    /// Every alert owned by one of `employee_ids`, in no particular order.
    /// Large sets are looked up in batches of `IDS_PER_QUERY`.
    pub fn alerts_for_employees(&self, employee_ids: &HashSet<String>) -> Result<Vec<Alert>> {
        let ids: Vec<&String> = employee_ids.iter().collect();
        let mut alerts = Vec::new();

        for chunk in ids.chunks(IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {ALERT_COLUMNS}
                 FROM alerts a
                 JOIN employees e ON a.employee_id = e.id
                 WHERE a.employee_id IN ({placeholders})"
            );

            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), Self::row_to_alert)?;
            for row in rows {
                alerts.push(row.context("Failed to list alerts")?);
            }
        }

        Ok(alerts)
    }

    pub fn get_alert(&self, id: &str) -> Result<Option<Alert>> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS}
             FROM alerts a
             JOIN employees e ON a.employee_id = e.id
             WHERE a.id = ?1"
        );
        self.conn
            .query_row(&sql, [id], Self::row_to_alert)
            .optional()
            .context("Failed to look up alert")
    }

    /// Marks an alert dismissed regardless of its current status. Returns
    /// `None` when no alert has that id.
    pub fn dismiss_alert(&self, id: &str) -> Result<Option<Alert>> {
        let changed = self.conn.execute(
            "UPDATE alerts SET status = ?1 WHERE id = ?2",
            params![AlertStatus::Dismissed, id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_alert(id)
    }

    pub fn count_alerts(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<Alert> {
        Ok(Alert {
            id: row.get(0)?,
            severity: row.get(1)?,
            category: row.get(2)?,
            created_at: row.get(3)?,
            status: row.get(4)?,
            employee: EmployeeSummary {
                id: row.get(5)?,
                name: row.get(6)?,
            },
        })
    }

    // --- Seeding ---

    /// Replaces all employees and alerts with the contents of `seed`.
    ///
    /// Employees are inserted without relationships first and linked in a
    /// second pass, since reporting cycles cannot be inserted in any order.
    pub fn load_seed(&mut self, seed: &SeedData) -> Result<SeedStats> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM alerts", [])?;
        tx.execute("DELETE FROM employees", [])?;

        {
            let mut insert = tx.prepare("INSERT INTO employees (id, name) VALUES (?1, ?2)")?;
            for emp in &seed.employees {
                insert
                    .execute(params![emp.id, emp.name])
                    .with_context(|| format!("Failed to insert employee {}", emp.id))?;
            }

            let mut link = tx.prepare("UPDATE employees SET reports_to = ?1 WHERE id = ?2")?;
            for emp in &seed.employees {
                if let Some(manager) = &emp.reports_to {
                    link.execute(params![manager, emp.id])
                        .with_context(|| format!("Failed to link {} to {}", emp.id, manager))?;
                }
            }

            let mut insert = tx.prepare(
                "INSERT INTO alerts (id, employee_id, severity, category, created_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for alert in &seed.alerts {
                insert
                    .execute(params![
                        alert.id,
                        alert.employee_id,
                        alert.severity,
                        alert.category,
                        alert.created_at,
                        alert.status,
                    ])
                    .with_context(|| format!("Failed to insert alert {}", alert.id))?;
            }
        }

        tx.commit()?;

        let stats = SeedStats {
            employees: seed.employees.len(),
            alerts: seed.alerts.len(),
        };
        debug!(employees = stats.employees, alerts = stats.alerts, "seed data loaded");
        Ok(stats)
    }
}

impl ReportingGraph for Database {
    fn direct_reports(&self, manager_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM employees WHERE reports_to = ?1")?;
        let rows = stmt.query_map([manager_id], |row| row.get::<_, String>(0))?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list direct reports")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::seed::{SeedAlert, SeedEmployee};

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let seed = SeedData::from_json(include_str!("../data/seed_data.json")).unwrap();
        db.load_seed(&seed).unwrap();
        db
    }

    #[test]
    fn uninitialized_database_is_reported() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ensure_initialized().is_err());
        db.init().unwrap();
        db.ensure_initialized().unwrap();
        // init is repeatable
        db.init().unwrap();
    }

    #[test]
    fn seed_loads_counts_and_relationships() {
        let db = seeded();
        assert_eq!(db.count_employees().unwrap(), 10);
        assert_eq!(db.count_alerts().unwrap(), 14);

        let e6 = db.get_employee("E6").unwrap().unwrap();
        assert_eq!(e6.name, "Sam Patel");
        assert_eq!(e6.reports_to.as_deref(), Some("E7"));
        assert!(db.get_employee("E99").unwrap().is_none());
    }

    #[test]
    fn reseeding_replaces_existing_rows() {
        let mut db = seeded();
        let seed = SeedData::from_json(
            r#"{"employees": [{"id": "X1", "name": "Only One", "reports_to": null}], "alerts": []}"#,
        )
        .unwrap();
        let stats = db.load_seed(&seed).unwrap();
        assert_eq!(stats, SeedStats { employees: 1, alerts: 0 });
        assert_eq!(db.count_employees().unwrap(), 1);
        assert_eq!(db.count_alerts().unwrap(), 0);
    }

    #[test]
    fn seed_with_dangling_employee_rolls_back() {
        let mut db = seeded();
        let seed = SeedData::from_json(
            r#"{
                "employees": [{"id": "X1", "name": "Only One"}],
                "alerts": [{
                    "id": "A1", "employee_id": "GHOST", "severity": "low",
                    "category": "workload", "created_at": "2025-01-01T00:00:00Z"
                }]
            }"#,
        )
        .unwrap();
        assert!(db.load_seed(&seed).is_err());
        assert_eq!(db.count_employees().unwrap(), 10);
        assert_eq!(db.count_alerts().unwrap(), 14);
    }

    #[test]
    fn direct_reports_follow_reports_to() {
        let db = seeded();
        let mut reports = db.direct_reports("E2").unwrap();
        reports.sort();
        assert_eq!(reports, vec!["E3", "E4", "E9"]);
        assert!(db.direct_reports("E5").unwrap().is_empty());
    }

    #[test]
    fn alerts_for_employees_joins_employee() {
        let db = seeded();
        let ids = HashSet::from(["E5".to_string()]);
        let mut alerts = db.alerts_for_employees(&ids).unwrap();
        alerts.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].id, "A3");
        assert_eq!(alerts[0].severity, Severity::Low);
        assert_eq!(alerts[0].employee.name, "Riley Chen");
        assert_eq!(
            alerts[0].created_at,
            "2025-09-03T09:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap()
        );

        assert!(db.alerts_for_employees(&HashSet::new()).unwrap().is_empty());
    }

    #[test]
    fn dismiss_is_idempotent() {
        let db = seeded();
        let first = db.dismiss_alert("A1").unwrap().unwrap();
        assert_eq!(first.status, AlertStatus::Dismissed);

        let second = db.dismiss_alert("A1").unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(db.get_alert("A1").unwrap().unwrap().status, AlertStatus::Dismissed);
    }

    #[test]
    fn dismiss_unknown_alert_returns_none() {
        let db = seeded();
        assert!(db.dismiss_alert("INVALID").unwrap().is_none());
    }

    #[test]
    fn alerts_for_employees_spans_many_batches() {
        let mut db = Database::open_in_memory().unwrap();
        db.init().unwrap();

        let reports = IDS_PER_QUERY * 2 + 17;
        let mut employees = vec![SeedEmployee {
            id: "M".to_string(),
            name: "Manager".to_string(),
            reports_to: None,
        }];
        employees.extend((0..reports).map(|i| SeedEmployee {
            id: format!("R{i}"),
            name: format!("Report {i}"),
            reports_to: Some("M".to_string()),
        }));
        let last = format!("R{}", reports - 1);
        let seed = SeedData {
            employees,
            alerts: vec![SeedAlert {
                id: "A1".to_string(),
                employee_id: last.clone(),
                severity: Severity::High,
                category: "workload".to_string(),
                created_at: "2025-09-01T09:00:00Z".parse().unwrap(),
                status: AlertStatus::Open,
            }],
        };
        db.load_seed(&seed).unwrap();

        let scope: HashSet<String> = db.direct_reports("M").unwrap().into_iter().collect();
        assert_eq!(scope.len(), reports);

        let alerts = db.alerts_for_employees(&scope).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].employee.id, last);

        let listed = crate::query::list_alerts(
            &db,
            &crate::query::AlertParams {
                manager_id: Some("M".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(listed, alerts);
    }

    #[test]
    fn open_reports_unusable_data_directory() {
        let blocker = std::env::temp_dir().join(format!("hr-alerts-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = Database::open(&blocker.join("nested").join("hr-alerts.db"))
            .err()
            .unwrap();
        std::fs::remove_file(&blocker).unwrap();

        assert!(format!("{err:#}").contains("Failed to create data directory"));
    }
}
