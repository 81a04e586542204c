use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::WorkforcePlanError;
use crate::WorkforcePlanResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Ratios expressed as decimals (0.75 = 75%).
pub type Rate = Decimal;

/// Headcount, FTE and recruitment/churn counts. Fractional FTE is allowed.
pub type Count = Decimal;

/// Calendar month, 1 = January.
pub type Month = u32;

/// Calendar months in a planning year, January first.
pub const MONTHS: [Month; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Reject months outside 1..=12.
pub fn validate_month(month: Month) -> WorkforcePlanResult<Month> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(WorkforcePlanError::invalid(
            "month",
            format!("month must be between 1 and 12, got {}", month),
        ))
    }
}

/// Division that yields zero for a zero denominator instead of failing.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
