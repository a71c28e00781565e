use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Health Model
// ============================================================================
//
// Components report a status; the system status is the worst of them.
//
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub overall: HealthStatus,
    pub components: BTreeMap<String, HealthStatus>,
    pub check_time: DateTime<Utc>,
}

impl SystemHealth {
    pub fn from_components(components: BTreeMap<String, HealthStatus>) -> Self {
        let unhealthy: Vec<String> = components
            .iter()
            .filter_map(|(name, status)| match status {
                HealthStatus::Unhealthy(reason) => Some(format!("{}: {}", name, reason)),
                _ => None,
            })
            .collect();

        let overall = if !unhealthy.is_empty() {
            HealthStatus::Unhealthy(unhealthy.join(", "))
        } else if components.values().any(|s| !s.is_healthy()) {
            HealthStatus::Degraded("some components degraded".to_string())
        } else {
            HealthStatus::Healthy
        };

        Self {
            overall,
            components,
            check_time: Utc::now(),
        }
    }
}
