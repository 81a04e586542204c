use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::error::{ConfigurationError, WorkforcePlanError};
use crate::model::overrides::OverrideStore;
use crate::taxonomy::{Level, Role, RoleTaxonomy};
use crate::types::{validate_month, Count, Money, Month, Rate};
use crate::WorkforcePlanResult;

// ---------------------------------------------------------------------------
// Types: Monthly entries
// ---------------------------------------------------------------------------

/// Lookup key for one (role, level, month, year) observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub year: i32,
    pub month: Month,
    pub role: Role,
    pub level: Level,
}

impl EntryKey {
    pub fn new(role: Role, level: Level, month: Month, year: i32) -> Self {
        EntryKey {
            year,
            month,
            role,
            level,
        }
    }
}

/// Operating-cost line items recorded against a role/level for one month,
/// e.g. "office_rent", "it_related", "travel".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatingCosts(pub BTreeMap<String, Money>);

impl OperatingCosts {
    pub fn total(&self) -> Money {
        self.0.values().copied().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One (role, level, month, year) planning or simulation observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEntry {
    pub role: Role,
    pub level: Level,
    pub month: Month,
    pub year: i32,
    /// Starters in the month
    pub recruitment: Count,
    /// Leavers in the month
    pub churn: Count,
    /// Headcount in full-time equivalents
    #[serde(default)]
    pub fte: Count,
    /// Monthly base salary
    pub salary: Money,
    /// Hourly billing rate; zero for non-billable roles
    #[serde(default)]
    pub price: Money,
    /// Utilisation, 0–1; zero for non-billable roles
    #[serde(default)]
    pub utr: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_salary: Option<Money>,
    /// Employer social security; derived from salary when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_security: Option<Money>,
    /// Employer pension; derived from salary when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pension: Option<Money>,
    /// Billed hours actually recorded for the month
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoiced_time: Option<Decimal>,
    /// Realised average hourly price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_price: Option<Money>,
    #[serde(default, skip_serializing_if = "OperatingCosts::is_empty")]
    pub operating_costs: OperatingCosts,
}

impl MonthlyEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.role, self.level, self.month, self.year)
    }

    /// True when the entry bills: both price and utilisation are positive.
    pub fn is_billing(&self) -> bool {
        self.price > Decimal::ZERO && self.utr > Decimal::ZERO
    }

    pub fn variable_salary_or_zero(&self) -> Money {
        self.variable_salary.unwrap_or(Decimal::ZERO)
    }

    pub fn social_security_or_default(&self, config: &EngineConfig) -> Money {
        self.social_security
            .unwrap_or(self.salary * config.social_security_rate)
    }

    pub fn pension_or_default(&self, config: &EngineConfig) -> Money {
        self.pension.unwrap_or(self.salary * config.pension_rate)
    }

    /// Employer cost of one FTE: base + variable + social security + pension.
    pub fn total_salary_cost(&self, config: &EngineConfig) -> Money {
        self.salary
            + self.variable_salary_or_zero()
            + self.social_security_or_default(config)
            + self.pension_or_default(config)
    }

    /// Billed hours for the month: recorded invoiced time when present,
    /// otherwise utr × hours/day × days/month × fte.
    pub fn billed_hours(&self, config: &EngineConfig) -> Decimal {
        self.invoiced_time
            .unwrap_or(self.utr * config.hours_per_month() * self.fte)
    }

    pub(crate) fn validate(&self) -> WorkforcePlanResult<()> {
        validate_month(self.month)?;
        let required = [
            ("recruitment".to_string(), self.recruitment),
            ("churn".to_string(), self.churn),
            ("fte".to_string(), self.fte),
            ("salary".to_string(), self.salary),
            ("price".to_string(), self.price),
        ];
        let optional = [
            ("variable_salary", self.variable_salary),
            ("social_security", self.social_security),
            ("pension", self.pension),
            ("invoiced_time", self.invoiced_time),
            ("average_price", self.average_price),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field.to_string(), v)));
        let costs = self
            .operating_costs
            .0
            .iter()
            .map(|(item, value)| (format!("operating_costs.{}", item), *value));

        for (field, value) in required.into_iter().chain(optional).chain(costs) {
            if value < Decimal::ZERO {
                return Err(WorkforcePlanError::invalid(
                    field,
                    format!("must not be negative for {:?}, got {}", self.key(), value),
                ));
            }
        }
        if self.utr < Decimal::ZERO || self.utr > Decimal::ONE {
            return Err(WorkforcePlanError::invalid(
                "utr",
                format!("must be within 0..=1 for {:?}, got {}", self.key(), self.utr),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Types: Datasets
// ---------------------------------------------------------------------------

/// Recorded entries for one office, indexed by key. Serialized as a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MonthlyEntry>", into = "Vec<MonthlyEntry>")]
pub struct MonthlyDataset {
    entries: BTreeMap<EntryKey, MonthlyEntry>,
}

impl MonthlyDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recorded entry. A key may only be recorded once.
    pub fn insert(&mut self, entry: MonthlyEntry) -> WorkforcePlanResult<()> {
        entry.validate()?;
        let key = entry.key();
        if self.entries.contains_key(&key) {
            return Err(WorkforcePlanError::invalid(
                "entries",
                format!("duplicate entry for {:?}", key),
            ));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    pub fn get(&self, key: &EntryKey) -> Option<&MonthlyEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonthlyEntry> {
        self.entries.values()
    }
}

impl TryFrom<Vec<MonthlyEntry>> for MonthlyDataset {
    type Error = WorkforcePlanError;

    fn try_from(entries: Vec<MonthlyEntry>) -> Result<Self, Self::Error> {
        let mut dataset = MonthlyDataset::new();
        for entry in entries {
            dataset.insert(entry)?;
        }
        Ok(dataset)
    }
}

impl From<MonthlyDataset> for Vec<MonthlyEntry> {
    fn from(dataset: MonthlyDataset) -> Self {
        dataset.entries.into_values().collect()
    }
}

/// Everything the engine knows about one office: recorded entries, unsaved
/// edits, and optionally an office-specific role table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficePlan {
    pub office_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Falls back to the engine taxonomy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<RoleTaxonomy>,
    #[serde(default)]
    pub entries: MonthlyDataset,
    #[serde(default)]
    pub overrides: OverrideStore,
}

impl OfficePlan {
    pub fn new(office_id: impl Into<String>) -> Self {
        OfficePlan {
            office_id: office_id.into(),
            name: None,
            taxonomy: None,
            entries: MonthlyDataset::new(),
            overrides: OverrideStore::new(),
        }
    }

    /// Every recorded entry and edit must name a pair the taxonomy defines.
    pub fn validate_against(&self, taxonomy: &RoleTaxonomy) -> Result<(), ConfigurationError> {
        self.entries
            .iter()
            .chain(self.overrides.iter())
            .try_for_each(|e| taxonomy.ensure(e.role, e.level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(month: Month) -> MonthlyEntry {
        MonthlyEntry {
            role: Role::Consultant,
            level: Level::A,
            month,
            year: 2025,
            recruitment: dec!(2),
            churn: dec!(1),
            fte: dec!(10),
            salary: dec!(4000),
            price: dec!(120),
            utr: dec!(0.8),
            variable_salary: Some(dec!(500)),
            social_security: None,
            pension: None,
            invoiced_time: None,
            average_price: None,
            operating_costs: OperatingCosts::default(),
        }
    }

    #[test]
    fn test_total_salary_cost_derives_missing_components() {
        let e = entry(1);
        let config = EngineConfig::default();
        // 4000 + 500 + 4000*0.25 + 4000*0.08 = 5820
        assert_eq!(e.total_salary_cost(&config), dec!(5820));
    }

    #[test]
    fn test_recorded_components_take_precedence() {
        let mut e = entry(1);
        e.social_security = Some(dec!(900));
        e.pension = Some(dec!(0));
        assert_eq!(e.total_salary_cost(&EngineConfig::default()), dec!(5400));
    }

    #[test]
    fn test_billed_hours_prefers_invoiced_time() {
        let mut e = entry(1);
        let config = EngineConfig::default();
        // 0.8 * 168 * 10
        assert_eq!(e.billed_hours(&config), dec!(1344));
        e.invoiced_time = Some(dec!(1200));
        assert_eq!(e.billed_hours(&config), dec!(1200));
    }

    #[test]
    fn test_negative_optional_components_rejected() {
        let mut e = entry(2);
        e.pension = Some(dec!(-1));
        assert!(matches!(
            e.validate(),
            Err(WorkforcePlanError::InvalidInput { ref field, .. }) if field == "pension"
        ));

        let mut e = entry(2);
        e.invoiced_time = Some(dec!(-40));
        assert!(e.validate().is_err());

        let mut e = entry(2);
        e.operating_costs.0.insert("travel".to_string(), dec!(-250));
        assert!(matches!(
            e.validate(),
            Err(WorkforcePlanError::InvalidInput { ref field, .. }) if field == "operating_costs.travel"
        ));

        let mut e = entry(2);
        e.average_price = Some(dec!(0));
        e.operating_costs.0.insert("travel".to_string(), dec!(250));
        assert!(e.validate().is_ok());
    }

    #[test]
    fn test_dataset_rejects_duplicate_key() {
        let mut ds = MonthlyDataset::new();
        ds.insert(entry(3)).unwrap();
        let err = ds.insert(entry(3)).unwrap_err();
        assert!(matches!(err, WorkforcePlanError::InvalidInput { .. }));
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_dataset_rejects_invalid_month_and_utr() {
        let mut ds = MonthlyDataset::new();
        assert!(ds.insert(entry(13)).is_err());
        let mut e = entry(2);
        e.utr = dec!(1.5);
        assert!(ds.insert(e).is_err());
    }

    #[test]
    fn test_operating_costs_total() {
        let mut e = entry(1);
        e.operating_costs.0.insert("office_rent".into(), dec!(1200));
        e.operating_costs.0.insert("it_related".into(), dec!(300.50));
        assert_eq!(e.operating_costs.total(), dec!(1500.50));
    }

    #[test]
    fn test_office_validate_against_taxonomy() {
        let mut office = OfficePlan::new("oslo");
        let mut e = entry(1);
        e.role = Role::Operations;
        office.entries.insert(e).unwrap();
        let err = office
            .validate_against(&RoleTaxonomy::standard())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownRoleLevel {
                role: Role::Operations,
                level: Level::A
            }
        );
    }
}
