use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::aggregation::fields::{FieldSpec, FieldType, FieldValue, OfficeMetric};
use crate::aggregation::series::{AggregatedFieldRow, RowKind, TwelveMonthSeries};
use crate::config::{EngineConfig, PlanningSettings};
use crate::context::{OfficeScope, PlanningContext};
use crate::error::{ConfigurationError, WorkforcePlanError};
use crate::model::{MonthlyEntry, OfficePlan, YearGrid};
use crate::taxonomy::{Level, Role, RoleTaxonomy};
use crate::types::{safe_div, with_metadata, ComputationOutput, Month};
use crate::WorkforcePlanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a single field series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSeriesInput {
    pub office: OfficePlan,
    pub field: String,
    /// Role and level select one pair; omit both for the office total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub year: i32,
    #[serde(default)]
    pub settings: PlanningSettings,
}

/// Input for the full per-office field table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTableInput {
    pub office: OfficePlan,
    pub year: i32,
    #[serde(default)]
    pub settings: PlanningSettings,
}

/// Every catalog row for one office and year, in table order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTable {
    pub office_id: String,
    pub year: i32,
    pub rows: Vec<AggregatedFieldRow>,
}

impl FieldTable {
    /// Rows that carry numbers; headers and separators are skipped.
    pub fn numeric_rows(&self) -> impl Iterator<Item = &AggregatedFieldRow> {
        self.rows.iter().filter(|r| r.kind.is_numeric())
    }

    pub fn find(
        &self,
        field: &str,
        role: Option<Role>,
        level: Option<Level>,
    ) -> Option<&AggregatedFieldRow> {
        self.rows
            .iter()
            .find(|r| r.field == field && r.role == role && r.level == level)
    }
}

// ---------------------------------------------------------------------------
// Field series
// ---------------------------------------------------------------------------

/// Twelve-month series of one field for one role/level pair.
///
/// Office-level fields ignore `role`/`level` and are summed over the whole
/// role × level cross-product instead.
pub fn aggregate_field(
    scope: &OfficeScope<'_>,
    field: &str,
    role: Role,
    level: Level,
    year: i32,
) -> WorkforcePlanResult<TwelveMonthSeries> {
    let spec = scope.catalog().numeric(field)?;
    match spec.value {
        FieldValue::Entry(_) => {
            scope.taxonomy().ensure(role, level)?;
            let resolver = scope.resolver();
            TwelveMonthSeries::try_from_fn(|month| {
                let resolved = resolver.resolve(role, level, month, year)?;
                Ok(spec.extract(&resolved.entry, scope.taxonomy(), scope.config()))
            })
        }
        FieldValue::Office(_) => aggregate_office_field(scope, field, year),
        FieldValue::Structural => Err(ConfigurationError::NonNumericField(spec.name.into()).into()),
    }
}

/// Office total of a field for each month.
///
/// Additive role/level fields are summed over every pair they apply to.
/// Per-unit fields (price, UTR, salaries) are averaged over those pairs,
/// weighted by FTE, and read zero in a month with no FTE. Office-level fields
/// use their cross-product formula.
pub fn aggregate_office_field(
    scope: &OfficeScope<'_>,
    field: &str,
    year: i32,
) -> WorkforcePlanResult<TwelveMonthSeries> {
    let spec = scope.catalog().numeric(field)?;
    let grid = YearGrid::resolve(scope, year)?;
    office_series(spec, &grid, scope.taxonomy(), scope.config())
}

pub(crate) fn office_series(
    spec: &FieldSpec,
    grid: &YearGrid,
    taxonomy: &RoleTaxonomy,
    config: &EngineConfig,
) -> WorkforcePlanResult<TwelveMonthSeries> {
    TwelveMonthSeries::try_from_fn(|month| match spec.value {
        FieldValue::Office(metric) => Ok(office_metric(grid, metric, taxonomy, config, month)),
        FieldValue::Entry(_) if spec.is_per_unit() => {
            let (weighted, fte) = grid
                .month(month)
                .filter(|e| spec.applies(e.role, taxonomy))
                .fold((Decimal::ZERO, Decimal::ZERO), |(v, w), e| {
                    (v + spec.extract(e, taxonomy, config) * e.fte, w + e.fte)
                });
            Ok(safe_div(weighted, fte))
        }
        FieldValue::Entry(_) => Ok(grid
            .month(month)
            .map(|e| spec.extract(e, taxonomy, config))
            .sum()),
        FieldValue::Structural => {
            Err(ConfigurationError::NonNumericField(spec.name.into()).into())
        }
    })
}

/// One month of an office-level metric.
pub(crate) fn office_metric(
    grid: &YearGrid,
    metric: OfficeMetric,
    taxonomy: &RoleTaxonomy,
    config: &EngineConfig,
    month: Month,
) -> Decimal {
    let sum = |f: &dyn Fn(&MonthlyEntry) -> Decimal| -> Decimal {
        grid.month(month).map(f).sum()
    };
    match metric {
        OfficeMetric::NetSales => sum(&|e| net_sales(e, taxonomy, config)),
        OfficeMetric::SalaryExpenses => sum(&|e| e.total_salary_cost(config) * e.fte),
        OfficeMetric::OperatingExpenses => sum(&|e| e.operating_costs.total()),
        OfficeMetric::Ebitda => {
            office_metric(grid, OfficeMetric::NetSales, taxonomy, config, month)
                - office_metric(grid, OfficeMetric::SalaryExpenses, taxonomy, config, month)
                - office_metric(grid, OfficeMetric::OperatingExpenses, taxonomy, config, month)
        }
        OfficeMetric::Fte => sum(&|e| e.fte),
        OfficeMetric::Starters => sum(&|e| e.recruitment),
        OfficeMetric::Leavers => sum(&|e| e.churn),
    }
}

/// One pair's series read from a resolved grid. A pair missing from the
/// grid reads as the field's default value.
pub(crate) fn pair_series(
    spec: &FieldSpec,
    grid: &YearGrid,
    role: Role,
    level: Level,
    taxonomy: &RoleTaxonomy,
    config: &EngineConfig,
) -> WorkforcePlanResult<TwelveMonthSeries> {
    TwelveMonthSeries::try_from_fn(|month| {
        Ok(grid
            .entry(role, level, month)
            .map(|e| spec.extract(e, taxonomy, config))
            .unwrap_or(spec.default_value))
    })
}

/// FTE behind a per-unit field's office average, month by month.
pub(crate) fn office_weight(
    spec: &FieldSpec,
    grid: &YearGrid,
    taxonomy: &RoleTaxonomy,
) -> WorkforcePlanResult<TwelveMonthSeries> {
    TwelveMonthSeries::try_from_fn(|month| {
        Ok(grid
            .month(month)
            .filter(|e| spec.applies(e.role, taxonomy))
            .map(|e| e.fte)
            .sum())
    })
}

/// One pair's FTE, zero where the grid has no such pair.
pub(crate) fn pair_fte(
    grid: &YearGrid,
    role: Role,
    level: Level,
) -> WorkforcePlanResult<TwelveMonthSeries> {
    TwelveMonthSeries::try_from_fn(|month| {
        Ok(grid
            .entry(role, level, month)
            .map(|e| e.fte)
            .unwrap_or_default())
    })
}

/// Hours billed × price for billable roles, zero elsewhere.
pub(crate) fn net_sales(
    entry: &MonthlyEntry,
    taxonomy: &RoleTaxonomy,
    config: &EngineConfig,
) -> Decimal {
    if taxonomy.is_billable(entry.role) {
        entry.billed_hours(config) * entry.price
    } else {
        Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Field table
// ---------------------------------------------------------------------------

/// Every catalog field for one office and year, with category headers and
/// separators in place. Role/level rows are emitted only for pairs the field
/// applies to.
pub fn build_field_table(scope: &OfficeScope<'_>, year: i32) -> WorkforcePlanResult<FieldTable> {
    let grid = YearGrid::resolve(scope, year)?;
    let taxonomy = scope.taxonomy();
    let config = scope.config();
    let mut rows = Vec::new();

    for spec in scope.catalog().iter() {
        let row = |kind: RowKind, role: Option<Role>, level: Option<Level>, values| {
            AggregatedFieldRow {
                field: spec.name.to_string(),
                label: spec.label.to_string(),
                category: spec.category,
                kind,
                role,
                level,
                values,
            }
        };

        match (spec.field_type, spec.value) {
            (FieldType::Display, _) => {
                rows.push(row(RowKind::CategoryHeader, None, None, TwelveMonthSeries::zero()))
            }
            (FieldType::Separator, _) => {
                rows.push(row(RowKind::Separator, None, None, TwelveMonthSeries::zero()))
            }
            (_, FieldValue::Office(_)) => {
                let values = office_series(spec, &grid, taxonomy, config)?;
                rows.push(row(RowKind::Office, None, None, values));
            }
            (_, FieldValue::Entry(_)) => {
                for (role, level) in grid.pairs() {
                    if !spec.applies(role, taxonomy) {
                        continue;
                    }
                    let values = pair_series(spec, &grid, role, level, taxonomy, config)?;
                    rows.push(row(RowKind::RoleLevel, Some(role), Some(level), values));
                }
            }
            (_, FieldValue::Structural) => {
                return Err(ConfigurationError::InvalidField {
                    name: spec.name.to_string(),
                    reason: "numeric field without a value source".to_string(),
                }
                .into())
            }
        }
    }

    tracing::debug!(
        office = scope.office_id(),
        year,
        rows = rows.len(),
        "built field table"
    );

    Ok(FieldTable {
        office_id: scope.office_id().to_string(),
        year,
        rows,
    })
}

// ---------------------------------------------------------------------------
// Request entry points
// ---------------------------------------------------------------------------

/// Compute one field series, for a role/level pair or the office total.
pub fn calculate_field_series(
    input: &FieldSeriesInput,
) -> WorkforcePlanResult<ComputationOutput<AggregatedFieldRow>> {
    let start = Instant::now();
    let ctx = PlanningContext::from_settings(&input.settings)?;
    let scope = ctx.scope(&input.office)?;
    let spec = ctx.catalog().numeric(&input.field)?;
    let mut warnings = Vec::new();

    let (kind, role, level, values) = match (input.role, input.level, spec.value) {
        (_, _, FieldValue::Office(_)) => {
            if input.role.is_some() || input.level.is_some() {
                warnings.push(format!(
                    "'{}' is an office-level field; role/level selection ignored",
                    spec.name
                ));
            }
            let values = aggregate_office_field(&scope, spec.name, input.year)?;
            (RowKind::Office, None, None, values)
        }
        (Some(role), Some(level), _) => {
            let values = aggregate_field(&scope, spec.name, role, level, input.year)?;
            (RowKind::RoleLevel, Some(role), Some(level), values)
        }
        (None, None, _) => {
            let grid = YearGrid::resolve(&scope, input.year)?;
            let values = office_series(spec, &grid, scope.taxonomy(), scope.config())?;
            if spec.is_per_unit() {
                let weight = office_weight(spec, &grid, scope.taxonomy())?;
                let idle = weight.months().iter().filter(|w| w.is_zero()).count();
                if idle > 0 {
                    warnings.push(format!(
                        "'{}' office value is an FTE-weighted average; {} of 12 months have no FTE and report 0",
                        spec.name, idle
                    ));
                }
            }
            (RowKind::Office, None, None, values)
        }
        _ => {
            return Err(WorkforcePlanError::InvalidInput {
                field: "role/level".to_string(),
                reason: "role and level must be given together".to_string(),
            })
        }
    };

    let row = AggregatedFieldRow {
        field: spec.name.to_string(),
        label: spec.label.to_string(),
        category: spec.category,
        kind,
        role,
        level,
        values,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly field aggregation over resolved role/level entries",
        &serde_json::json!({
            "office_id": input.office.office_id,
            "field": spec.name,
            "year": input.year,
            "recorded_entries": input.office.entries.len(),
            "overrides": input.office.overrides.len(),
        }),
        warnings,
        elapsed,
        row,
    ))
}

/// Build the full field table for one office.
pub fn calculate_field_table(
    input: &FieldTableInput,
) -> WorkforcePlanResult<ComputationOutput<FieldTable>> {
    let start = Instant::now();
    let ctx = PlanningContext::from_settings(&input.settings)?;
    let scope = ctx.scope(&input.office)?;
    let table = build_field_table(&scope, input.year)?;

    let mut warnings = Vec::new();
    if input.office.entries.iter().all(|e| e.year != input.year) {
        warnings.push(format!(
            "No recorded entries for {} in {}; all rows use default figures",
            input.office.office_id, input.year
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Per-office monthly field table by category, role and level",
        &serde_json::json!({
            "office_id": input.office.office_id,
            "year": input.year,
            "fields": ctx.catalog().len(),
            "role_level_pairs": scope.taxonomy().pair_count(),
        }),
        warnings,
        elapsed,
        table,
    ))
}
