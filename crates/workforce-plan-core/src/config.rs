//! Engine constants and injectable configuration.
//!
//! The constants are the planning defaults used when no office-specific
//! economics are supplied. `EngineConfig` carries them into every computation
//! so callers can substitute real office parameters.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::taxonomy::RoleTaxonomy;
use crate::types::{Money, Rate};

/// Billable hours per working day.
pub const HOURS_PER_DAY: Decimal = dec!(8);
/// Working days per month.
pub const WORKING_DAYS_PER_MONTH: Decimal = dec!(21);
/// Reference hourly price that `avg_price_increase` is measured against.
pub const BASELINE_PRICE: Money = dec!(100);
/// Monthly base salary for a role/level with no recorded entry.
pub const DEFAULT_SALARY: Money = dec!(5000);
/// Hourly price for a billable role/level with no recorded entry.
pub const DEFAULT_BILLABLE_PRICE: Money = dec!(100);
/// Utilisation for a billable role/level with no recorded entry.
pub const DEFAULT_BILLABLE_UTR: Rate = dec!(0.75);
/// Employer social security as a share of base salary.
pub const SOCIAL_SECURITY_RATE: Rate = dec!(0.25);
/// Employer pension contribution as a share of base salary.
pub const PENSION_RATE: Rate = dec!(0.08);
pub const MONTHS_PER_YEAR: usize = 12;

/// Numeric parameters consumed by the engine. Every field defaults to the
/// matching constant above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub hours_per_day: Decimal,
    pub working_days_per_month: Decimal,
    pub baseline_price: Money,
    pub default_salary: Money,
    pub default_billable_price: Money,
    pub default_billable_utr: Rate,
    pub social_security_rate: Rate,
    pub pension_rate: Rate,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hours_per_day: HOURS_PER_DAY,
            working_days_per_month: WORKING_DAYS_PER_MONTH,
            baseline_price: BASELINE_PRICE,
            default_salary: DEFAULT_SALARY,
            default_billable_price: DEFAULT_BILLABLE_PRICE,
            default_billable_utr: DEFAULT_BILLABLE_UTR,
            social_security_rate: SOCIAL_SECURITY_RATE,
            pension_rate: PENSION_RATE,
        }
    }
}

impl EngineConfig {
    /// Billable hours in one month for a single fully-utilised FTE.
    pub fn hours_per_month(&self) -> Decimal {
        self.hours_per_day * self.working_days_per_month
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let non_negative = [
            ("hours_per_day", self.hours_per_day),
            ("working_days_per_month", self.working_days_per_month),
            ("default_salary", self.default_salary),
            ("default_billable_price", self.default_billable_price),
            ("social_security_rate", self.social_security_rate),
            ("pension_rate", self.pension_rate),
        ];
        for (name, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(invalid(name, format!("must not be negative, got {}", value)));
            }
        }
        if self.baseline_price <= Decimal::ZERO {
            return Err(invalid(
                "baseline_price",
                format!("must be positive, got {}", self.baseline_price),
            ));
        }
        if self.default_billable_utr < Decimal::ZERO || self.default_billable_utr > Decimal::ONE {
            return Err(invalid(
                "default_billable_utr",
                format!("must be within 0..=1, got {}", self.default_billable_utr),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: String) -> ConfigurationError {
    ConfigurationError::InvalidConstant {
        name: name.to_string(),
        reason,
    }
}

/// Settings document accepted by the CLI `--config` flag and by every request
/// input. Missing sections fall back to the standard values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningSettings {
    pub engine: EngineConfig,
    /// Role→levels table with billable and debit role sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<RoleTaxonomy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_constants() {
        let c = EngineConfig::default();
        assert_eq!(c.hours_per_month(), dec!(168));
        assert_eq!(c.baseline_price, dec!(100));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let c: EngineConfig = serde_json::from_str(r#"{"hours_per_day":"7.5"}"#).unwrap();
        assert_eq!(c.hours_per_day, dec!(7.5));
        assert_eq!(c.working_days_per_month, dec!(21));
    }

    #[test]
    fn test_validate_rejects_zero_baseline_price() {
        let c = EngineConfig {
            baseline_price: Decimal::ZERO,
            ..EngineConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(ConfigurationError::InvalidConstant { ref name, .. }) if name == "baseline_price"
        ));
    }

    #[test]
    fn test_validate_rejects_utr_above_one() {
        let c = EngineConfig {
            default_billable_utr: dec!(1.2),
            ..EngineConfig::default()
        };
        assert!(c.validate().is_err());
    }
}
