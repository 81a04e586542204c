use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use workforce_plan_core::kpi::{compute_yearly_kpis, KpiFigures};
use workforce_plan_core::model::{DefaultsTable, MonthlyEntry, OfficePlan};
use workforce_plan_core::rollup::{
    aggregate_across_offices, calculate_group_series, compute_group_kpis, GroupSeriesInput,
};
use workforce_plan_core::taxonomy::{Level, Role, RoleTaxonomy};
use workforce_plan_core::PlanningContext;

fn office(
    ctx: &PlanningContext,
    id: &str,
    pairs: &[(Role, Level)],
    fill: impl Fn(&mut MonthlyEntry),
) -> OfficePlan {
    let defaults = DefaultsTable::build(ctx.taxonomy(), ctx.config()).unwrap();
    let mut plan = OfficePlan::new(id);
    for &(role, level) in pairs {
        for month in 1..=12 {
            let mut e = defaults.default_entry(role, level, month, 2025).unwrap();
            fill(&mut e);
            plan.entries.insert(e).unwrap();
        }
    }
    plan
}

#[test]
fn test_empty_scope_is_all_zero() {
    let ctx = PlanningContext::standard().unwrap();
    let group = compute_group_kpis(&ctx, &[], 2025).unwrap();
    assert_eq!(group.office_count, 0);
    assert_eq!(group.figures, KpiFigures::default());
    assert_eq!(group.figures.net_revenue, dec!(0));
    assert_eq!(group.figures.net_recruitment_percent, dec!(0));
}

#[test]
fn test_single_office_identity() {
    let ctx = PlanningContext::standard().unwrap();
    let oslo = office(
        &ctx,
        "oslo",
        &[(Role::Consultant, Level::SrC), (Role::Sales, Level::P)],
        |e| {
            e.fte = dec!(1.7);
            e.recruitment = dec!(0.3);
            e.churn = dec!(0.1);
            e.utr = dec!(0.61);
        },
    );
    let own = compute_yearly_kpis(&ctx.scope(&oslo).unwrap(), 2025).unwrap();
    let group = compute_group_kpis(&ctx, std::slice::from_ref(&oslo), 2025).unwrap();
    assert_eq!(group.figures, own.figures);
    assert_eq!(group.office_ids, vec!["oslo".to_string()]);
}

#[test]
fn test_two_offices_sum_counts() {
    let ctx = PlanningContext::standard().unwrap();
    let a = office(&ctx, "a", &[(Role::Consultant, Level::A)], |e| {
        e.recruitment = dec!(10);
        e.churn = dec!(3);
    });
    let b = office(&ctx, "b", &[(Role::Consultant, Level::A)], |e| {
        e.recruitment = dec!(10);
        e.churn = dec!(3);
    });
    let group = compute_group_kpis(&ctx, &[a, b], 2025).unwrap();
    assert_eq!(group.office_count, 2);
    assert_eq!(group.figures.total_recruitment, dec!(240));
    assert_eq!(group.figures.net_recruitment, dec!(168));
    // ratio recomputed from summed parts, not added
    assert_eq!(group.figures.net_recruitment_percent, dec!(840));
}

#[test]
fn test_series_keeps_level_structure() {
    let ctx = PlanningContext::standard().unwrap();
    let a = office(&ctx, "a", &[(Role::Consultant, Level::A), (Role::Consultant, Level::C)], |e| {
        e.fte = dec!(1)
    });
    let b = office(&ctx, "b", &[(Role::Consultant, Level::A)], |e| e.fte = dec!(3));
    let series = aggregate_across_offices(&ctx, &[a, b], "fte", 2025).unwrap();

    assert_eq!(series.row(Role::Consultant, Level::A).unwrap().values.months(), &[dec!(4); 12]);
    assert_eq!(series.row(Role::Consultant, Level::C).unwrap().values.months(), &[dec!(1); 12]);
    assert_eq!(series.total.get(7).unwrap(), dec!(5));
}

#[test]
fn test_series_office_missing_a_role_contributes_zero() {
    let ctx = PlanningContext::standard().unwrap();
    let mut lean = office(&ctx, "lean", &[(Role::Consultant, Level::M)], |e| e.recruitment = dec!(1));
    lean.taxonomy = Some(
        RoleTaxonomy::new([(Role::Consultant, vec![Level::M])], [Role::Consultant], [Role::Consultant])
            .unwrap(),
    );
    let full = office(&ctx, "full", &[(Role::Recruitment, Level::M)], |e| e.recruitment = dec!(2));

    let input = GroupSeriesInput {
        offices: vec![lean, full],
        field: "starters".to_string(),
        year: 2025,
        settings: Default::default(),
    };
    let out = calculate_group_series(&input).unwrap();
    let series = &out.result;
    assert_eq!(series.row(Role::Consultant, Level::M).unwrap().total(), dec!(12));
    assert_eq!(series.row(Role::Recruitment, Level::M).unwrap().total(), dec!(24));
    assert_eq!(series.total.total(), dec!(36));
    assert_eq!(series.office_ids.len(), 2);
}

#[test]
fn test_group_per_unit_series_on_defaults_is_zero() {
    let input = GroupSeriesInput {
        offices: vec![OfficePlan::new("a"), OfficePlan::new("b")],
        field: "utr".to_string(),
        year: 2025,
        settings: Default::default(),
    };
    let out = calculate_group_series(&input).unwrap();
    let series = &out.result;
    assert!(series.row(Role::Consultant, Level::A).unwrap().values.is_zero());
    assert!(series.total.is_zero());
    assert!(out.warnings.iter().any(|w| w.contains("FTE-weighted")));
}

#[test]
fn test_group_price_weights_offices_by_fte() {
    let ctx = PlanningContext::standard().unwrap();
    let a = office(&ctx, "a", &[(Role::Consultant, Level::A)], |e| {
        e.fte = dec!(1);
        e.price = dec!(100);
    });
    let b = office(&ctx, "b", &[(Role::Consultant, Level::A)], |e| {
        e.fte = dec!(3);
        e.price = dec!(140);
    });
    let series = aggregate_across_offices(&ctx, &[a, b], "price", 2025).unwrap();
    // (100 * 1 + 140 * 3) / 4
    assert_eq!(series.row(Role::Consultant, Level::A).unwrap().values.months(), &[dec!(130); 12]);
    assert_eq!(series.total.get(3).unwrap(), dec!(130));
}
