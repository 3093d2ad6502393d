//! Explain output for query plans
//!
//! Deterministic, human-readable description of how a query will run.

use std::fmt;

use serde::Serialize;

use super::planner::QueryPlan;

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainPlan {
    /// Scan type: "FULL_SCAN" or "INDEX_SCAN"
    pub scan_type: &'static str,
    /// Filter evaluated by the store
    pub native_filter: Option<String>,
    /// Qualifiers evaluated client-side, in evaluation order
    pub residual: Vec<String>,
    /// Sort applied after materialization
    pub sort: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a query plan
    pub fn from_plan(plan: &QueryPlan) -> Self {
        Self {
            scan_type: if plan.native_filter.is_some() {
                "INDEX_SCAN"
            } else {
                "FULL_SCAN"
            },
            native_filter: plan.native_filter.as_ref().map(ToString::to_string),
            residual: plan.residual.iter().map(ToString::to_string).collect(),
            sort: plan.sort.as_ref().map(ToString::to_string),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scan: {}", self.scan_type)?;
        if let Some(native) = &self.native_filter {
            writeln!(f, "native: {}", native)?;
        }
        for residual in &self.residual {
            writeln!(f, "residual: {}", residual)?;
        }
        if let Some(sort) = &self.sort {
            writeln!(f, "sort: {}", sort)?;
        }
        Ok(())
    }
}
