//! Task cost estimation types and validation.
//!
//! The estimation service is external; these are the typed responses
//! the client consumes. Estimation failures are user-visible errors
//! and never feed back into reconciler state.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One line of a cost breakdown, e.g. `("gpu_seconds", 0.42)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub label: String,
    pub amount: f64,
}

/// Estimated duration and cost for a single generation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEstimate {
    pub task_type: String,
    pub duration_seconds: f64,
    pub cost: f64,
    #[serde(default)]
    pub cost_breakdown: Vec<CostLine>,
}

impl TaskEstimate {
    /// Sum of the breakdown lines.
    pub fn breakdown_total(&self) -> f64 {
        self.cost_breakdown.iter().map(|line| line.amount).sum()
    }
}

/// Validate an estimate received from the service.
///
/// Rejects negative values and a breakdown that disagrees with the
/// stated total by more than a rounding tolerance.
pub fn validate_estimate(estimate: &TaskEstimate) -> Result<(), CoreError> {
    if estimate.duration_seconds < 0.0 {
        return Err(CoreError::Validation(
            "Estimate duration must not be negative".to_string(),
        ));
    }
    if estimate.cost < 0.0 {
        return Err(CoreError::Validation(
            "Estimate cost must not be negative".to_string(),
        ));
    }
    if !estimate.cost_breakdown.is_empty() {
        let total = estimate.breakdown_total();
        if (total - estimate.cost).abs() > 0.01 {
            return Err(CoreError::Validation(format!(
                "Cost breakdown sums to {total}, expected {}",
                estimate.cost
            )));
        }
    }
    Ok(())
}
