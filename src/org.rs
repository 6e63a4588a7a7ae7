//! Resolution of a manager's organizational scope.
//!
//! The reports-to relation is a general directed graph: cycles are valid
//! data, so traversal is breadth-first over an explicit visited set.

use anyhow::Result;
use std::collections::{HashSet, VecDeque};

use crate::models::Scope;

/// Read access to the reports-to relation.
pub trait ReportingGraph {
    /// IDs of every employee whose `reports_to` is `manager_id`.
    fn direct_reports(&self, manager_id: &str) -> Result<Vec<String>>;
}

/// Returns the IDs of employees under `manager_id` for the given scope.
///
/// The manager itself is never part of the result, even when a cycle leads
/// back to it. An unknown manager yields an empty set; checking existence is
/// up to the caller.
pub fn resolve_scope<G>(graph: &G, manager_id: &str, scope: Scope) -> Result<HashSet<String>>
where
    G: ReportingGraph + ?Sized,
{
    match scope {
        Scope::Direct => Ok(graph
            .direct_reports(manager_id)?
            .into_iter()
            .filter(|id| id != manager_id)
            .collect()),
        Scope::Subtree => subtree(graph, manager_id),
    }
}

fn subtree<G>(graph: &G, manager_id: &str) -> Result<HashSet<String>>
where
    G: ReportingGraph + ?Sized,
{
    let mut result = HashSet::new();
    let mut visited = HashSet::from([manager_id.to_string()]);
    let mut queue = VecDeque::from([manager_id.to_string()]);

    while let Some(current) = queue.pop_front() {
        for report in graph.direct_reports(&current)? {
            if visited.insert(report.clone()) {
                result.insert(report.clone());
                queue.push_back(report);
            }
        }
    }

    Ok(result)
}
