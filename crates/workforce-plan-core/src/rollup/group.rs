use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::aggregation::fields::{FieldCategory, FieldValue};
use crate::aggregation::monthly::{office_series, pair_fte, pair_series};
use crate::aggregation::series::{AggregatedFieldRow, RowKind, TwelveMonthSeries};
use crate::config::PlanningSettings;
use crate::context::PlanningContext;
use crate::error::WorkforcePlanError;
use crate::kpi::yearly::{accumulate_year, compute_yearly_kpis, KpiAccumulator, KpiFigures};
use crate::model::{OfficePlan, YearGrid};
use crate::taxonomy::{Level, Role};
use crate::types::{safe_div, with_metadata, ComputationOutput};
use crate::WorkforcePlanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for group KPIs over a set of offices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupKpiInput {
    #[serde(default)]
    pub offices: Vec<OfficePlan>,
    pub year: i32,
    #[serde(default)]
    pub settings: PlanningSettings,
}

/// Input for one field summed across offices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSeriesInput {
    #[serde(default)]
    pub offices: Vec<OfficePlan>,
    pub field: String,
    pub year: i32,
    #[serde(default)]
    pub settings: PlanningSettings,
}

/// KPIs for several offices in one year. Same figures as a single office's
/// set, plus the offices that contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupKpiSet {
    pub year: i32,
    pub office_count: usize,
    pub office_ids: Vec<String>,
    #[serde(flatten)]
    pub figures: KpiFigures,
}

/// A field summed across offices, one row per (role, level) pair in the
/// union of the offices' tables, plus the group total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSeries {
    pub field: String,
    pub label: String,
    pub category: FieldCategory,
    pub year: i32,
    pub office_ids: Vec<String>,
    pub rows: Vec<AggregatedFieldRow>,
    pub total: TwelveMonthSeries,
}

impl GroupSeries {
    pub fn row(&self, role: Role, level: Level) -> Option<&AggregatedFieldRow> {
        self.rows
            .iter()
            .find(|r| r.role == Some(role) && r.level == Some(level))
    }
}

fn office_ids(offices: &[OfficePlan]) -> WorkforcePlanResult<Vec<String>> {
    let mut seen = BTreeSet::new();
    offices
        .iter()
        .map(|o| {
            if seen.insert(o.office_id.as_str()) {
                Ok(o.office_id.clone())
            } else {
                Err(WorkforcePlanError::invalid(
                    "offices",
                    format!("office {} appears more than once", o.office_id),
                ))
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Group KPIs
// ---------------------------------------------------------------------------

/// Annual KPIs across `offices`.
///
/// No offices yields all-zero figures. A single office yields exactly its
/// own yearly figures. Otherwise the per-office accumulators are merged and
/// every ratio is recomputed from the summed parts.
pub fn compute_group_kpis(
    ctx: &PlanningContext,
    offices: &[OfficePlan],
    year: i32,
) -> WorkforcePlanResult<GroupKpiSet> {
    let ids = office_ids(offices)?;

    let figures = match offices {
        [] => KpiFigures::default(),
        [office] => compute_yearly_kpis(&ctx.scope(office)?, year)?.figures,
        _ => {
            let mut acc = KpiAccumulator::default();
            for office in offices {
                acc.merge(&accumulate_year(&ctx.scope(office)?, year)?);
            }
            acc.finish(ctx.config())
        }
    };

    tracing::debug!(
        offices = offices.len(),
        year,
        net_revenue = %figures.net_revenue,
        year_end_headcount = %figures.year_end_headcount,
        "computed group KPIs"
    );

    Ok(GroupKpiSet {
        year,
        office_count: ids.len(),
        office_ids: ids,
        figures,
    })
}

// ---------------------------------------------------------------------------
// Cross-office series
// ---------------------------------------------------------------------------

/// Contribution of one office to a cross-office series: each pair's values
/// and FTE, and the office total.
struct OfficeSlice {
    pairs: BTreeMap<(Role, Level), (TwelveMonthSeries, TwelveMonthSeries)>,
    total: TwelveMonthSeries,
}

/// One field combined month by month across `offices`, keeping the per-level
/// breakdown. Additive fields are summed; an office without a pair another
/// office has contributes zero for that pair. Per-unit fields (price, UTR,
/// salaries) are FTE-weighted averages over the contributing cells, zero
/// where no FTE stands behind them. A single office is returned as-is.
pub fn aggregate_across_offices(
    ctx: &PlanningContext,
    offices: &[OfficePlan],
    field: &str,
    year: i32,
) -> WorkforcePlanResult<GroupSeries> {
    let spec = ctx.catalog().numeric(field)?;
    let ids = office_ids(offices)?;

    let mut slices = Vec::with_capacity(offices.len());
    for office in offices {
        let scope = ctx.scope(office)?;
        let grid = YearGrid::resolve(&scope, year)?;
        let (taxonomy, config) = (scope.taxonomy(), scope.config());

        let mut pairs = BTreeMap::new();
        if let FieldValue::Entry(_) = spec.value {
            for (role, level) in grid.pairs() {
                if spec.applies(role, taxonomy) {
                    let values = pair_series(spec, &grid, role, level, taxonomy, config)?;
                    pairs.insert((role, level), (values, pair_fte(&grid, role, level)?));
                }
            }
        }
        let total = office_series(spec, &grid, taxonomy, config)?;
        slices.push(OfficeSlice { pairs, total });
    }

    let (pairs, total): Combined = match slices.pop() {
        Some(only) if slices.is_empty() => {
            let pairs = only
                .pairs
                .into_iter()
                .map(|(pair, (values, _))| (pair, values))
                .collect();
            (pairs, only.total)
        }
        last => {
            slices.extend(last);
            if spec.is_per_unit() {
                combine_weighted(slices)
            } else {
                combine_additive(slices)
            }
        }
    };

    let rows: Vec<AggregatedFieldRow> = pairs
        .into_iter()
        .map(|((role, level), values)| AggregatedFieldRow {
            field: spec.name.to_string(),
            label: spec.label.to_string(),
            category: spec.category,
            kind: RowKind::RoleLevel,
            role: Some(role),
            level: Some(level),
            values,
        })
        .collect();

    tracing::debug!(
        offices = offices.len(),
        field = spec.name,
        year,
        rows = rows.len(),
        total = %total.total(),
        "aggregated across offices"
    );

    Ok(GroupSeries {
        field: spec.name.to_string(),
        label: spec.label.to_string(),
        category: spec.category,
        year,
        office_ids: ids,
        rows,
        total,
    })
}

type Combined = (BTreeMap<(Role, Level), TwelveMonthSeries>, TwelveMonthSeries);

fn combine_additive(slices: Vec<OfficeSlice>) -> Combined {
    let mut union: BTreeMap<(Role, Level), TwelveMonthSeries> = BTreeMap::new();
    let mut total = TwelveMonthSeries::zero();
    for slice in slices {
        for (pair, (values, _)) in slice.pairs {
            let slot = union.entry(pair).or_default();
            *slot = *slot + values;
        }
        total = total + slice.total;
    }
    (union, total)
}

/// Σ value × fte / Σ fte per pair and for the group, summed over every
/// office's cells.
fn combine_weighted(slices: Vec<OfficeSlice>) -> Combined {
    let mut union: BTreeMap<(Role, Level), (TwelveMonthSeries, TwelveMonthSeries)> =
        BTreeMap::new();
    for slice in slices {
        for (pair, (values, fte)) in slice.pairs {
            let (weighted, weight) = union.entry(pair).or_default();
            *weighted = *weighted + values.zip_with(&fte, |v, w| v * w);
            *weight = *weight + fte;
        }
    }
    let weighted_total: TwelveMonthSeries = union.values().map(|(v, _)| *v).sum();
    let weight_total: TwelveMonthSeries = union.values().map(|(_, w)| *w).sum();
    let pairs = union
        .into_iter()
        .map(|(pair, (weighted, weight))| (pair, weighted.zip_with(&weight, safe_div)))
        .collect();
    (pairs, weighted_total.zip_with(&weight_total, safe_div))
}

// ---------------------------------------------------------------------------
// Request entry points
// ---------------------------------------------------------------------------

pub fn calculate_group_kpis(
    input: &GroupKpiInput,
) -> WorkforcePlanResult<ComputationOutput<GroupKpiSet>> {
    let start = Instant::now();
    let ctx = PlanningContext::from_settings(&input.settings)?;
    let result = compute_group_kpis(&ctx, &input.offices, input.year)?;

    let mut warnings = Vec::new();
    if input.offices.is_empty() {
        warnings.push("No offices selected; all group KPIs are zero".to_string());
    }
    let idle: Vec<&str> = input
        .offices
        .iter()
        .filter(|o| o.entries.iter().all(|e| e.year != input.year))
        .map(|o| o.office_id.as_str())
        .collect();
    if !idle.is_empty() {
        warnings.push(format!(
            "No recorded entries in {} for: {}",
            input.year,
            idle.join(", ")
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Group KPIs from merged per-office accumulators",
        &serde_json::json!({
            "year": input.year,
            "office_count": result.office_count,
            "singleton_identity": result.office_count == 1,
        }),
        warnings,
        elapsed,
        result,
    ))
}

pub fn calculate_group_series(
    input: &GroupSeriesInput,
) -> WorkforcePlanResult<ComputationOutput<GroupSeries>> {
    let start = Instant::now();
    let ctx = PlanningContext::from_settings(&input.settings)?;
    let result = aggregate_across_offices(&ctx, &input.offices, &input.field, input.year)?;

    let mut warnings = Vec::new();
    if input.offices.is_empty() {
        warnings.push("No offices selected; series is zero".to_string());
    }
    let per_unit = ctx.catalog().numeric(&input.field)?.is_per_unit();
    if per_unit && input.offices.len() > 1 {
        warnings.push(format!(
            "'{}' is a per-FTE figure; group values are FTE-weighted averages and read 0 where no FTE is planned",
            result.field
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Field series combined per level across offices; missing levels count as zero",
        &serde_json::json!({
            "field": result.field,
            "year": input.year,
            "office_count": result.office_ids.len(),
            "per_unit": per_unit,
        }),
        warnings,
        elapsed,
        result,
    ))
}
