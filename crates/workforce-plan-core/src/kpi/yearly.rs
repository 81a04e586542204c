use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{EngineConfig, PlanningSettings, MONTHS_PER_YEAR};
use crate::context::{OfficeScope, PlanningContext};
use crate::model::{EntryOrigin, MonthlyEntry, OfficePlan, YearGrid};
use crate::taxonomy::{Level, RoleTaxonomy};
use crate::types::{safe_div, with_metadata, ComputationOutput, Count, Money, Month, Rate, MONTHS};
use crate::WorkforcePlanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for yearly KPI calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyKpiInput {
    pub office: OfficePlan,
    pub year: i32,
    #[serde(default)]
    pub settings: PlanningSettings,
}

/// Annual KPI figures, shared by office and group results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiFigures {
    pub total_recruitment: Count,
    pub total_churn: Count,
    /// total_recruitment - total_churn
    pub net_recruitment: Count,
    /// net_recruitment / month-1 recruitment * 100; 0 when month 1 has none
    pub net_recruitment_percent: Decimal,
    /// Σ price × utr × hours/day × days/month over billing entries
    pub net_revenue: Money,
    pub avg_price: Money,
    pub avg_utr: Rate,
    /// (avg_price - baseline price) / baseline price * 100
    pub avg_price_increase: Decimal,
    /// avg_utr * 100
    pub avg_target_utr: Decimal,
    /// Non-debit FTE-months / total FTE-months
    pub non_debit_ratio: Rate,
    /// Σ billed hours × price, FTE-weighted
    pub net_sales: Money,
    pub total_salary_expenses: Money,
    pub total_operating_expenses: Money,
    pub ebitda: Money,
    /// ebitda / net_sales * 100
    pub ebitda_margin: Decimal,
    /// December FTE
    pub year_end_headcount: Count,
    /// December FTE share per level, percent
    pub seniority_distribution: BTreeMap<Level, Decimal>,
}

/// KPIs for one office and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyKpiSet {
    pub office_id: String,
    pub year: i32,
    #[serde(flatten)]
    pub figures: KpiFigures,
}

/// Running sums behind [`KpiFigures`]. Accumulators from several offices can
/// be merged before finishing, so group ratios come from summed numerators
/// and denominators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiAccumulator {
    pub total_recruitment: Count,
    pub total_churn: Count,
    pub baseline_recruitment: Count,
    pub net_revenue: Money,
    pub price_sum: Money,
    pub utr_sum: Rate,
    pub entry_count: u64,
    pub net_sales: Money,
    pub salary_expenses: Money,
    pub operating_expenses: Money,
    pub fte_months: Count,
    pub non_debit_fte_months: Count,
    pub year_end_fte_by_level: BTreeMap<Level, Count>,
}

impl KpiAccumulator {
    /// Fold one resolved entry into the sums.
    pub fn observe(
        &mut self,
        entry: &MonthlyEntry,
        month: Month,
        taxonomy: &RoleTaxonomy,
        config: &EngineConfig,
    ) {
        self.total_recruitment += entry.recruitment;
        self.total_churn += entry.churn;
        if month == 1 {
            self.baseline_recruitment += entry.recruitment;
        }

        if entry.is_billing() {
            self.net_revenue += entry.price * entry.utr * config.hours_per_month();
            self.price_sum += entry.price;
            self.utr_sum += entry.utr;
            self.entry_count += 1;
        }

        if taxonomy.is_billable(entry.role) {
            self.net_sales += entry.billed_hours(config) * entry.price;
        }
        self.salary_expenses += entry.total_salary_cost(config) * entry.fte;
        self.operating_expenses += entry.operating_costs.total();

        self.fte_months += entry.fte;
        if !taxonomy.is_debit(entry.role) {
            self.non_debit_fte_months += entry.fte;
        }
        if month == 12 {
            *self.year_end_fte_by_level.entry(entry.level).or_default() += entry.fte;
        }
    }

    pub fn merge(&mut self, other: &KpiAccumulator) {
        self.total_recruitment += other.total_recruitment;
        self.total_churn += other.total_churn;
        self.baseline_recruitment += other.baseline_recruitment;
        self.net_revenue += other.net_revenue;
        self.price_sum += other.price_sum;
        self.utr_sum += other.utr_sum;
        self.entry_count += other.entry_count;
        self.net_sales += other.net_sales;
        self.salary_expenses += other.salary_expenses;
        self.operating_expenses += other.operating_expenses;
        self.fte_months += other.fte_months;
        self.non_debit_fte_months += other.non_debit_fte_months;
        for (level, fte) in &other.year_end_fte_by_level {
            *self.year_end_fte_by_level.entry(*level).or_default() += *fte;
        }
    }

    /// Derive the annual figures. Every ratio is zero when its denominator is.
    pub fn finish(&self, config: &EngineConfig) -> KpiFigures {
        let hundred = dec!(100);
        let net_recruitment = self.total_recruitment - self.total_churn;
        let count = Decimal::from(self.entry_count);
        let avg_price = safe_div(self.price_sum, count);
        let avg_utr = safe_div(self.utr_sum, count);
        let avg_price_increase = if avg_price > Decimal::ZERO {
            safe_div(avg_price - config.baseline_price, config.baseline_price) * hundred
        } else {
            Decimal::ZERO
        };

        let ebitda = self.net_sales - self.salary_expenses - self.operating_expenses;
        let year_end_headcount: Count = self.year_end_fte_by_level.values().copied().sum();
        let seniority_distribution = self
            .year_end_fte_by_level
            .iter()
            .map(|(level, fte)| (*level, safe_div(*fte, year_end_headcount) * hundred))
            .collect();

        KpiFigures {
            total_recruitment: self.total_recruitment,
            total_churn: self.total_churn,
            net_recruitment,
            net_recruitment_percent: safe_div(net_recruitment, self.baseline_recruitment) * hundred,
            net_revenue: self.net_revenue,
            avg_price,
            avg_utr,
            avg_price_increase,
            avg_target_utr: avg_utr * hundred,
            non_debit_ratio: safe_div(self.non_debit_fte_months, self.fte_months),
            net_sales: self.net_sales,
            total_salary_expenses: self.salary_expenses,
            total_operating_expenses: self.operating_expenses,
            ebitda,
            ebitda_margin: safe_div(ebitda, self.net_sales) * hundred,
            year_end_headcount,
            seniority_distribution,
        }
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Sum one office's year: every month, every (role, level) pair of the
/// office's taxonomy, missing entries resolved to defaults.
pub fn accumulate_year(scope: &OfficeScope<'_>, year: i32) -> WorkforcePlanResult<KpiAccumulator> {
    let grid = YearGrid::resolve(scope, year)?;
    Ok(accumulate_grid(&grid, scope.taxonomy(), scope.config()))
}

pub(crate) fn accumulate_grid(
    grid: &YearGrid,
    taxonomy: &RoleTaxonomy,
    config: &EngineConfig,
) -> KpiAccumulator {
    let mut acc = KpiAccumulator::default();
    for month in MONTHS {
        for entry in grid.month(month) {
            acc.observe(entry, month, taxonomy, config);
        }
    }
    acc
}

/// Annual KPIs for one office.
pub fn compute_yearly_kpis(scope: &OfficeScope<'_>, year: i32) -> WorkforcePlanResult<YearlyKpiSet> {
    let grid = YearGrid::resolve(scope, year)?;
    Ok(yearly_kpis_from_grid(scope, &grid))
}

fn yearly_kpis_from_grid(scope: &OfficeScope<'_>, grid: &YearGrid) -> YearlyKpiSet {
    let acc = accumulate_grid(grid, scope.taxonomy(), scope.config());
    let figures = acc.finish(scope.config());

    tracing::debug!(
        office = scope.office_id(),
        year = grid.year(),
        net_revenue = %figures.net_revenue,
        net_recruitment = %figures.net_recruitment,
        billing_entries = acc.entry_count,
        "computed yearly KPIs"
    );

    YearlyKpiSet {
        office_id: scope.office_id().to_string(),
        year: grid.year(),
        figures,
    }
}

/// Request-level wrapper over [`compute_yearly_kpis`].
pub fn calculate_yearly_kpis(
    input: &YearlyKpiInput,
) -> WorkforcePlanResult<ComputationOutput<YearlyKpiSet>> {
    let start = Instant::now();
    let ctx = PlanningContext::from_settings(&input.settings)?;
    let scope = ctx.scope(&input.office)?;
    let grid = YearGrid::resolve(&scope, input.year)?;
    let result = yearly_kpis_from_grid(&scope, &grid);

    let mut warnings = Vec::new();
    let defaulted = grid.count_by_origin(EntryOrigin::Default);
    let cells = scope.taxonomy().pair_count() * MONTHS_PER_YEAR;
    if defaulted == cells {
        warnings.push(format!(
            "No entries for {} in {}; KPIs reflect default figures only",
            input.office.office_id, input.year
        ));
    } else if defaulted > 0 {
        warnings.push(format!(
            "{} of {} role/level/month cells resolved to defaults",
            defaulted, cells
        ));
    }
    let dirty = grid.count_by_origin(EntryOrigin::Override);
    if dirty > 0 {
        warnings.push(format!("{} cells include unsaved edits", dirty));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Yearly workforce and revenue KPIs over resolved monthly entries",
        &serde_json::json!({
            "office_id": input.office.office_id,
            "year": input.year,
            "hours_per_day": scope.config().hours_per_day.to_string(),
            "working_days_per_month": scope.config().working_days_per_month.to_string(),
            "baseline_price": scope.config().baseline_price.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DefaultsTable;
    use crate::taxonomy::Role;
    use pretty_assertions::assert_eq;

    fn single_pair_context() -> PlanningContext {
        PlanningContext::new(
            EngineConfig::default(),
            RoleTaxonomy::new([(Role::Consultant, vec![Level::A])], [Role::Consultant], [Role::Consultant])
                .unwrap(),
        )
        .unwrap()
    }

    fn office_for(ctx: &PlanningContext, f: impl Fn(&mut MonthlyEntry)) -> OfficePlan {
        let defaults = DefaultsTable::build(ctx.taxonomy(), ctx.config()).unwrap();
        let mut office = OfficePlan::new("oslo");
        for month in MONTHS {
            let mut e = defaults
                .default_entry(Role::Consultant, Level::A, month, 2025)
                .unwrap();
            f(&mut e);
            office.entries.insert(e).unwrap();
        }
        office
    }

    #[test]
    fn test_revenue_accumulation_single_pair() {
        let ctx = single_pair_context();
        let office = office_for(&ctx, |e| {
            e.price = dec!(100);
            e.utr = dec!(0.75);
        });
        let kpis = compute_yearly_kpis(&ctx.scope(&office).unwrap(), 2025).unwrap();
        // 12 * 100 * 0.75 * 8 * 21
        assert_eq!(kpis.figures.net_revenue, dec!(151200));
        assert_eq!(kpis.figures.avg_price_increase, dec!(0));
        assert_eq!(kpis.figures.avg_target_utr, dec!(75));
    }

    #[test]
    fn test_net_recruitment_example() {
        let ctx = single_pair_context();
        let office = office_for(&ctx, |e| {
            e.recruitment = dec!(10);
            e.churn = dec!(3);
        });
        let f = compute_yearly_kpis(&ctx.scope(&office).unwrap(), 2025)
            .unwrap()
            .figures;
        assert_eq!(f.total_recruitment, dec!(120));
        assert_eq!(f.total_churn, dec!(36));
        assert_eq!(f.net_recruitment, dec!(84));
        assert_eq!(f.net_recruitment_percent, dec!(840));
    }

    #[test]
    fn test_zero_baseline_gives_zero_percent() {
        let ctx = single_pair_context();
        let office = office_for(&ctx, |e| {
            if e.month > 1 {
                e.recruitment = dec!(2);
            }
        });
        let f = compute_yearly_kpis(&ctx.scope(&office).unwrap(), 2025)
            .unwrap()
            .figures;
        assert_eq!(f.total_recruitment, dec!(22));
        assert_eq!(f.net_recruitment_percent, dec!(0));
    }

    #[test]
    fn test_no_billing_entries_gives_zero_averages() {
        let ctx = single_pair_context();
        let office = office_for(&ctx, |e| e.utr = dec!(0));
        let f = compute_yearly_kpis(&ctx.scope(&office).unwrap(), 2025)
            .unwrap()
            .figures;
        assert_eq!(f.net_revenue, dec!(0));
        assert_eq!(f.avg_price, dec!(0));
        assert_eq!(f.avg_price_increase, dec!(0));
        assert_eq!(f.avg_target_utr, dec!(0));
        assert_eq!(f.non_debit_ratio, dec!(0));
        assert_eq!(f.ebitda_margin, dec!(0));
    }

    #[test]
    fn test_price_increase_against_baseline() {
        let ctx = single_pair_context();
        let office = office_for(&ctx, |e| e.price = dec!(110));
        let f = compute_yearly_kpis(&ctx.scope(&office).unwrap(), 2025)
            .unwrap()
            .figures;
        assert_eq!(f.avg_price, dec!(110));
        assert_eq!(f.avg_price_increase, dec!(10));
    }

    #[test]
    fn test_empty_office_resolves_through_defaults() {
        let ctx = PlanningContext::standard().unwrap();
        let office = OfficePlan::new("empty");
        let f = compute_yearly_kpis(&ctx.scope(&office).unwrap(), 2025)
            .unwrap()
            .figures;
        // 20 billable pairs x 12 months, each 100 * 0.75 * 168
        assert_eq!(f.net_revenue, dec!(3024000));
        assert_eq!(f.total_recruitment, dec!(0));
        assert_eq!(f.net_recruitment_percent, dec!(0));
        assert_eq!(f.avg_price, dec!(100));
        assert_eq!(f.avg_target_utr, dec!(75));
        assert_eq!(f.year_end_headcount, dec!(0));
        assert_eq!(f.non_debit_ratio, dec!(0));
    }

    #[test]
    fn test_non_debit_ratio_and_seniority() {
        let ctx = PlanningContext::standard().unwrap();
        let defaults = DefaultsTable::build(ctx.taxonomy(), ctx.config()).unwrap();
        let mut office = OfficePlan::new("oslo");
        for month in MONTHS {
            let mut a = defaults.default_entry(Role::Consultant, Level::A, month, 2025).unwrap();
            a.fte = dec!(6);
            let mut m = defaults.default_entry(Role::Consultant, Level::M, month, 2025).unwrap();
            m.fte = dec!(2);
            let mut ops = defaults
                .default_entry(Role::Operations, Level::General, month, 2025)
                .unwrap();
            ops.fte = dec!(2);
            for e in [a, m, ops] {
                office.entries.insert(e).unwrap();
            }
        }
        let f = compute_yearly_kpis(&ctx.scope(&office).unwrap(), 2025)
            .unwrap()
            .figures;
        assert_eq!(f.non_debit_ratio, dec!(0.2));
        assert_eq!(f.year_end_headcount, dec!(10));
        assert_eq!(f.seniority_distribution[&Level::A], dec!(60));
        assert_eq!(f.seniority_distribution[&Level::M], dec!(20));
        assert_eq!(f.seniority_distribution[&Level::General], dec!(20));
        assert_eq!(f.seniority_distribution[&Level::X], dec!(0));
    }

    #[test]
    fn test_accumulator_merge_sums_components() {
        let mut a = KpiAccumulator {
            total_recruitment: dec!(5),
            baseline_recruitment: dec!(1),
            entry_count: 2,
            price_sum: dec!(200),
            ..Default::default()
        };
        let b = KpiAccumulator {
            total_recruitment: dec!(3),
            baseline_recruitment: dec!(1),
            entry_count: 2,
            price_sum: dec!(240),
            ..Default::default()
        };
        a.merge(&b);
        let f = a.finish(&EngineConfig::default());
        assert_eq!(f.total_recruitment, dec!(8));
        assert_eq!(f.net_recruitment_percent, dec!(400));
        assert_eq!(f.avg_price, dec!(110));
    }

    #[test]
    fn test_calculate_yearly_kpis_warns_on_defaults() {
        let input = YearlyKpiInput {
            office: OfficePlan::new("empty"),
            year: 2025,
            settings: PlanningSettings::default(),
        };
        let out = calculate_yearly_kpis(&input).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("default figures only"));
        assert_eq!(out.result.office_id, "empty");
    }

    #[test]
    fn test_request_path_matches_direct_computation() {
        let ctx = single_pair_context();
        let office = office_for(&ctx, |e| {
            e.fte = dec!(2);
            e.recruitment = dec!(1);
        });
        let direct = compute_yearly_kpis(&ctx.scope(&office).unwrap(), 2025).unwrap();
        let input = YearlyKpiInput {
            office,
            year: 2025,
            settings: PlanningSettings {
                taxonomy: Some(ctx.taxonomy().clone()),
                ..Default::default()
            },
        };
        let out = calculate_yearly_kpis(&input).unwrap();
        assert_eq!(out.result, direct);
    }
}
