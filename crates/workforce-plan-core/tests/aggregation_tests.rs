use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use workforce_plan_core::aggregation::monthly::{
    calculate_field_series, calculate_field_table, FieldSeriesInput, FieldTableInput,
};
use workforce_plan_core::aggregation::{
    aggregate_field, aggregate_office_field, build_field_table, RowKind,
};
use workforce_plan_core::model::{DefaultsTable, OfficePlan};
use workforce_plan_core::taxonomy::{Level, Role};
use workforce_plan_core::{ConfigurationError, PlanningContext, WorkforcePlanError};

fn staffed_office() -> OfficePlan {
    let ctx = PlanningContext::standard().unwrap();
    let defaults = DefaultsTable::build(ctx.taxonomy(), ctx.config()).unwrap();
    let mut office = OfficePlan::new("oslo");
    for month in 1..=12u32 {
        let mut a = defaults.default_entry(Role::Consultant, Level::A, month, 2025).unwrap();
        a.salary = dec!(4000);
        a.fte = dec!(1);
        a.recruitment = Decimal::from(month % 3);
        a.churn = dec!(0.5);
        let mut ops = defaults
            .default_entry(Role::Operations, Level::General, month, 2025)
            .unwrap();
        ops.operating_costs.0.insert("rent".to_string(), dec!(1000));
        office.entries.insert(a).unwrap();
        office.entries.insert(ops).unwrap();
    }
    office
}

// ===========================================================================
// Total consistency
// ===========================================================================

#[test]
fn test_every_table_row_total_is_sum_of_months() {
    let ctx = PlanningContext::standard().unwrap();
    let office = staffed_office();
    let table = build_field_table(&ctx.scope(&office).unwrap(), 2025).unwrap();

    for row in table.numeric_rows() {
        let sum: Decimal = row.values.months().iter().copied().sum();
        assert_eq!(row.total(), sum, "row {} {:?} {:?}", row.field, row.role, row.level);
    }

    let json = serde_json::to_value(&table).unwrap();
    for row in json["rows"].as_array().unwrap() {
        let months: Decimal = row["values"]["months"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().parse::<Decimal>().unwrap())
            .sum();
        let total: Decimal = row["values"]["total"].as_str().unwrap().parse().unwrap();
        assert_eq!(total, months);
    }
}

#[test]
fn test_table_layout() {
    let ctx = PlanningContext::standard().unwrap();
    let office = staffed_office();
    let table = build_field_table(&ctx.scope(&office).unwrap(), 2025).unwrap();

    let headers = table.rows.iter().filter(|r| r.kind == RowKind::CategoryHeader).count();
    let separators = table.rows.iter().filter(|r| r.kind == RowKind::Separator).count();
    assert_eq!(headers, 4);
    assert_eq!(separators, 3);
    assert_eq!(table.rows[0].field, "workforce_header");
    assert_eq!(table.rows.last().unwrap().field, "ebitda");

    // pricing rows exist only for billable roles
    assert!(table.find("price", Some(Role::Sales), Some(Level::X)).is_some());
    assert!(table.find("price", Some(Role::Recruitment), Some(Level::X)).is_none());
}

// ===========================================================================
// Office-level fields
// ===========================================================================

#[test]
fn test_office_financials() {
    let ctx = PlanningContext::standard().unwrap();
    let office = staffed_office();
    let table = build_field_table(&ctx.scope(&office).unwrap(), 2025).unwrap();

    let salary = table.find("total_salary_expenses", None, None).unwrap();
    // 4000 + 1000 social security + 320 pension, one FTE
    assert_eq!(salary.values.months(), &[dec!(5320); 12]);

    let opex = table.find("total_operating_expenses", None, None).unwrap();
    assert_eq!(opex.total(), dec!(12000));

    // 0.75 utr * 168 hours * 1 FTE * 100 price
    let sales = table.find("total_net_sales", None, None).unwrap();
    assert_eq!(sales.values.get(1).unwrap(), dec!(12600));

    let ebitda = table.find("ebitda", None, None).unwrap();
    assert_eq!(ebitda.values.get(6).unwrap(), dec!(12600) - dec!(5320) - dec!(1000));
}

#[test]
fn test_role_level_series() {
    let ctx = PlanningContext::standard().unwrap();
    let office = staffed_office();
    let scope = ctx.scope(&office).unwrap();

    let starters = aggregate_field(&scope, "recruitment", Role::Consultant, Level::A, 2025).unwrap();
    // month % 3 over 1..=12 gives 1,2,0 four times
    assert_eq!(starters.total(), dec!(12));
    assert_eq!(starters.get(3).unwrap(), dec!(0));

    let net = aggregate_field(&scope, "net_headcount_change", Role::Consultant, Level::A, 2025)
        .unwrap();
    assert_eq!(net.total(), dec!(6));

    let price = aggregate_field(&scope, "price", Role::Operations, Level::General, 2025).unwrap();
    assert!(price.is_zero());
}

// ===========================================================================
// Rejections
// ===========================================================================

#[test]
fn test_unknown_field_is_rejected_not_zero() {
    let ctx = PlanningContext::standard().unwrap();
    let office = staffed_office();
    let scope = ctx.scope(&office).unwrap();
    let err = aggregate_field(&scope, "bonus_pool", Role::Consultant, Level::A, 2025).unwrap_err();
    assert!(matches!(
        err,
        WorkforcePlanError::Configuration(ConfigurationError::UnknownField(ref f)) if f == "bonus_pool"
    ));
}

#[test]
fn test_display_row_is_not_numeric() {
    let ctx = PlanningContext::standard().unwrap();
    let office = staffed_office();
    let scope = ctx.scope(&office).unwrap();
    let err =
        aggregate_field(&scope, "pricing_header", Role::Consultant, Level::A, 2025).unwrap_err();
    assert!(matches!(
        err,
        WorkforcePlanError::Configuration(ConfigurationError::NonNumericField(_))
    ));
}

#[test]
fn test_unknown_level_for_role_is_rejected() {
    let ctx = PlanningContext::standard().unwrap();
    let office = staffed_office();
    let scope = ctx.scope(&office).unwrap();
    let err = aggregate_field(&scope, "fte", Role::Operations, Level::A, 2025).unwrap_err();
    assert!(matches!(
        err,
        WorkforcePlanError::Configuration(ConfigurationError::UnknownRoleLevel { .. })
    ));
}

// ===========================================================================
// Request entry points
// ===========================================================================

#[test]
fn test_field_series_input_from_json() {
    let input: FieldSeriesInput = serde_json::from_value(json!({
        "office": serde_json::to_value(staffed_office()).unwrap(),
        "field": "churn",
        "role": "Consultant",
        "level": "A",
        "year": 2025
    }))
    .unwrap();
    let out = calculate_field_series(&input).unwrap();
    assert_eq!(out.result.field, "leavers");
    assert_eq!(out.result.kind, RowKind::RoleLevel);
    assert_eq!(out.result.total(), dec!(6));
}

#[test]
fn test_office_per_unit_fields_on_defaults_are_zero_with_warning() {
    for field in ["utr", "price", "base_salary"] {
        let input = FieldSeriesInput {
            office: OfficePlan::new("oslo"),
            field: field.to_string(),
            role: None,
            level: None,
            year: 2025,
            settings: Default::default(),
        };
        let out = calculate_field_series(&input).unwrap();
        assert_eq!(out.result.kind, RowKind::Office);
        assert!(out.result.values.is_zero(), "{} office total", field);
        assert_eq!(out.warnings.len(), 1, "{}", field);
        assert!(out.warnings[0].contains("FTE-weighted"));
    }
}

#[test]
fn test_office_utr_weights_by_fte() {
    let ctx = PlanningContext::standard().unwrap();
    let defaults = DefaultsTable::build(ctx.taxonomy(), ctx.config()).unwrap();
    let mut office = OfficePlan::new("oslo");
    for (level, fte, utr) in [(Level::A, dec!(1), dec!(0.9)), (Level::C, dec!(4), dec!(0.65))] {
        for month in 1..=12u32 {
            let mut e = defaults.default_entry(Role::Consultant, level, month, 2025).unwrap();
            e.fte = fte;
            e.utr = utr;
            office.entries.insert(e).unwrap();
        }
    }
    let input = FieldSeriesInput {
        office,
        field: "utr".to_string(),
        role: None,
        level: None,
        year: 2025,
        settings: Default::default(),
    };
    let out = calculate_field_series(&input).unwrap();
    // (0.9 * 1 + 0.65 * 4) / 5
    assert_eq!(out.result.values.get(6).unwrap(), dec!(0.7));
    assert!(out.warnings.is_empty());

    // additive fields still sum
    let fte = aggregate_office_field(&ctx.scope(&input.office).unwrap(), "fte", 2025).unwrap();
    assert_eq!(fte.get(6).unwrap(), dec!(5));
}

#[test]
fn test_field_series_requires_role_and_level_together() {
    let input = FieldSeriesInput {
        office: staffed_office(),
        field: "fte".to_string(),
        role: Some(Role::Consultant),
        level: None,
        year: 2025,
        settings: Default::default(),
    };
    assert!(matches!(
        calculate_field_series(&input).unwrap_err(),
        WorkforcePlanError::InvalidInput { .. }
    ));
}

#[test]
fn test_field_table_warns_for_empty_year() {
    let input = FieldTableInput {
        office: staffed_office(),
        year: 2031,
        settings: Default::default(),
    };
    let out = calculate_field_table(&input).unwrap();
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.result.year, 2031);
}
