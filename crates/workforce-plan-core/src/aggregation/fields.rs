//! Field catalog: the typed mapping from a table field name to how its value
//! is obtained.
//!
//! Each field carries an extractor (or an office-level formula), the value
//! used where the field does not apply, and an applicability predicate. The
//! catalog is validated when it is built, so an unknown name surfaces as a
//! `ConfigurationError` instead of a row of zeros.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::error::ConfigurationError;
use crate::model::MonthlyEntry;
use crate::taxonomy::{Role, RoleTaxonomy};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Table section a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Workforce,
    Compensation,
    PricingUtilisation,
    Financials,
}

impl FieldCategory {
    pub fn label(&self) -> &'static str {
        match self {
            FieldCategory::Workforce => "Workforce",
            FieldCategory::Compensation => "Compensation",
            FieldCategory::PricingUtilisation => "Pricing & Utilisation",
            FieldCategory::Financials => "Financials",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Read directly from an entry
    Data,
    /// Derived from other values
    Computed,
    /// Category header, display only
    Display,
    /// Section separator, display only
    Separator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldScope {
    RoleLevel,
    Office,
    Structural,
}

/// Office totals computed over the full role × level cross-product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficeMetric {
    /// Σ billed hours × price
    NetSales,
    /// Σ total salary cost × fte
    SalaryExpenses,
    /// Σ operating-cost line items
    OperatingExpenses,
    /// net sales − salary expenses − operating expenses
    Ebitda,
    Fte,
    Starters,
    Leavers,
}

/// How role/level values combine into an office or group total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Totals are plain sums
    Additive,
    /// Per-FTE figure (price, UTR, salary); totals are Σ value × fte / Σ fte,
    /// zero when no FTE
    PerUnit,
}

pub type Extractor = fn(&MonthlyEntry, &EngineConfig) -> Decimal;
pub type Applicability = fn(Role, &RoleTaxonomy) -> bool;

/// How a field obtains its monthly value.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue {
    Entry(Extractor),
    Office(OfficeMetric),
    Structural,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub label: &'static str,
    pub category: FieldCategory,
    pub field_type: FieldType,
    pub value: FieldValue,
    /// Value reported where `applies_to` is false
    pub default_value: Decimal,
    pub applies_to: Applicability,
    pub aggregation: AggregationMode,
}

impl FieldSpec {
    pub fn scope(&self) -> FieldScope {
        match self.value {
            FieldValue::Entry(_) => FieldScope::RoleLevel,
            FieldValue::Office(_) => FieldScope::Office,
            FieldValue::Structural => FieldScope::Structural,
        }
    }

    pub fn is_per_unit(&self) -> bool {
        self.aggregation == AggregationMode::PerUnit
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self.field_type, FieldType::Display | FieldType::Separator)
    }

    pub fn applies(&self, role: Role, taxonomy: &RoleTaxonomy) -> bool {
        (self.applies_to)(role, taxonomy)
    }

    /// Value of a role/level field for one resolved entry.
    pub fn extract(
        &self,
        entry: &MonthlyEntry,
        taxonomy: &RoleTaxonomy,
        config: &EngineConfig,
    ) -> Decimal {
        match self.value {
            FieldValue::Entry(f) if self.applies(entry.role, taxonomy) => f(entry, config),
            _ => self.default_value,
        }
    }
}

fn every_role(_: Role, _: &RoleTaxonomy) -> bool {
    true
}

fn billable_role(role: Role, taxonomy: &RoleTaxonomy) -> bool {
    taxonomy.is_billable(role)
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Ordered, validated set of fields. Order is table order.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    specs: Vec<FieldSpec>,
    by_name: BTreeMap<&'static str, usize>,
}

impl FieldCatalog {
    pub fn new(specs: Vec<FieldSpec>) -> Result<Self, ConfigurationError> {
        let mut by_name = BTreeMap::new();
        for (i, spec) in specs.iter().enumerate() {
            for name in std::iter::once(&spec.name).chain(spec.aliases.iter()) {
                if by_name.insert(*name, i).is_some() {
                    return Err(ConfigurationError::DuplicateField(name.to_string()));
                }
            }
            let structural = matches!(spec.value, FieldValue::Structural);
            if structural == spec.is_numeric() {
                return Err(ConfigurationError::InvalidField {
                    name: spec.name.to_string(),
                    reason: format!(
                        "{:?} field must {}have a value source",
                        spec.field_type,
                        if structural { "" } else { "not " }
                    ),
                });
            }
        }
        Ok(FieldCatalog { specs, by_name })
    }

    pub fn standard() -> Result<Self, ConfigurationError> {
        Self::new(standard_fields())
    }

    /// Look a field up by name or alias.
    pub fn lookup(&self, name: &str) -> Result<&FieldSpec, ConfigurationError> {
        self.by_name
            .get(name)
            .map(|&i| &self.specs[i])
            .ok_or_else(|| ConfigurationError::UnknownField(name.to_string()))
    }

    /// Like [`lookup`](Self::lookup), but display and separator rows are
    /// rejected since they have no numeric meaning.
    pub fn numeric(&self, name: &str) -> Result<&FieldSpec, ConfigurationError> {
        let spec = self.lookup(name)?;
        if spec.is_numeric() {
            Ok(spec)
        } else {
            Err(ConfigurationError::NonNumericField(spec.name.to_string()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|s| s.name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn header(name: &'static str, label: &'static str, category: FieldCategory) -> FieldSpec {
    FieldSpec {
        name,
        aliases: &[],
        label,
        category,
        field_type: FieldType::Display,
        value: FieldValue::Structural,
        default_value: Decimal::ZERO,
        applies_to: every_role,
        aggregation: AggregationMode::Additive,
    }
}

fn separator(name: &'static str, category: FieldCategory) -> FieldSpec {
    FieldSpec {
        name,
        aliases: &[],
        label: "",
        category,
        field_type: FieldType::Separator,
        value: FieldValue::Structural,
        default_value: Decimal::ZERO,
        applies_to: every_role,
        aggregation: AggregationMode::Additive,
    }
}

fn entry_field(
    name: &'static str,
    aliases: &'static [&'static str],
    label: &'static str,
    category: FieldCategory,
    field_type: FieldType,
    extractor: Extractor,
    applies_to: Applicability,
) -> FieldSpec {
    FieldSpec {
        name,
        aliases,
        label,
        category,
        field_type,
        value: FieldValue::Entry(extractor),
        default_value: Decimal::ZERO,
        applies_to,
        aggregation: AggregationMode::Additive,
    }
}

fn per_unit(spec: FieldSpec) -> FieldSpec {
    FieldSpec {
        aggregation: AggregationMode::PerUnit,
        ..spec
    }
}

fn office_field(
    name: &'static str,
    label: &'static str,
    category: FieldCategory,
    metric: OfficeMetric,
) -> FieldSpec {
    FieldSpec {
        name,
        aliases: &[],
        label,
        category,
        field_type: FieldType::Computed,
        value: FieldValue::Office(metric),
        default_value: Decimal::ZERO,
        applies_to: every_role,
        aggregation: AggregationMode::Additive,
    }
}

fn standard_fields() -> Vec<FieldSpec> {
    use FieldCategory::*;
    use FieldType::{Computed, Data};

    vec![
        header("workforce_header", "Workforce", Workforce),
        office_field("total_fte", "Total FTE", Workforce, OfficeMetric::Fte),
        office_field("total_starters", "Total starters", Workforce, OfficeMetric::Starters),
        office_field("total_leavers", "Total leavers", Workforce, OfficeMetric::Leavers),
        entry_field("fte", &[], "FTE", Workforce, Data, |e, _| e.fte, every_role),
        entry_field(
            "starters",
            &["recruitment"],
            "Starters",
            Workforce,
            Data,
            |e, _| e.recruitment,
            every_role,
        ),
        entry_field(
            "leavers",
            &["churn"],
            "Leavers",
            Workforce,
            Data,
            |e, _| e.churn,
            every_role,
        ),
        entry_field(
            "net_headcount_change",
            &[],
            "Net headcount change",
            Workforce,
            Computed,
            |e, _| e.recruitment - e.churn,
            every_role,
        ),
        separator("workforce_separator", Workforce),
        header("compensation_header", "Compensation", Compensation),
        per_unit(entry_field(
            "base_salary",
            &["salary"],
            "Base salary",
            Compensation,
            Data,
            |e, _| e.salary,
            every_role,
        )),
        per_unit(entry_field(
            "variable_salary",
            &[],
            "Variable salary",
            Compensation,
            Data,
            |e, _| e.variable_salary_or_zero(),
            every_role,
        )),
        per_unit(entry_field(
            "social_security",
            &[],
            "Social security",
            Compensation,
            Data,
            |e, c| e.social_security_or_default(c),
            every_role,
        )),
        per_unit(entry_field(
            "pension",
            &[],
            "Pension",
            Compensation,
            Data,
            |e, c| e.pension_or_default(c),
            every_role,
        )),
        per_unit(entry_field(
            "total_salary_cost",
            &[],
            "Total salary cost per FTE",
            Compensation,
            Computed,
            |e, c| e.total_salary_cost(c),
            every_role,
        )),
        separator("compensation_separator", Compensation),
        header("pricing_header", "Pricing & Utilisation", PricingUtilisation),
        per_unit(entry_field(
            "price",
            &[],
            "Price",
            PricingUtilisation,
            Data,
            |e, _| e.price,
            billable_role,
        )),
        per_unit(entry_field(
            "average_price",
            &[],
            "Realised average price",
            PricingUtilisation,
            Data,
            |e, _| e.average_price.unwrap_or(e.price),
            billable_role,
        )),
        per_unit(entry_field(
            "utr",
            &[],
            "UTR",
            PricingUtilisation,
            Data,
            |e, _| e.utr,
            billable_role,
        )),
        entry_field(
            "hours",
            &["invoiced_time"],
            "Billed hours",
            PricingUtilisation,
            Computed,
            |e, c| e.billed_hours(c),
            billable_role,
        ),
        separator("pricing_separator", PricingUtilisation),
        header("financials_header", "Financials", Financials),
        entry_field(
            "net_sales",
            &[],
            "Net sales",
            Financials,
            Computed,
            |e, c| e.billed_hours(c) * e.price,
            billable_role,
        ),
        office_field("total_net_sales", "Total net sales", Financials, OfficeMetric::NetSales),
        office_field(
            "total_salary_expenses",
            "Total salary expenses",
            Financials,
            OfficeMetric::SalaryExpenses,
        ),
        office_field(
            "total_operating_expenses",
            "Total operating expenses",
            Financials,
            OfficeMetric::OperatingExpenses,
        ),
        office_field("ebitda", "EBITDA", Financials, OfficeMetric::Ebitda),
    ]
}
