use clap::Args;
use serde_json::{json, Value};

use workforce_plan_core::aggregation::monthly::{
    calculate_field_series, calculate_field_table, FieldSeriesInput, FieldTableInput,
};
use workforce_plan_core::config::PlanningSettings;
use workforce_plan_core::taxonomy::{Level, Role};
use workforce_plan_core::PlanningContext;

use super::{apply_settings, series_record};
use crate::input;
use crate::OutputFormat;

/// Arguments for a single field series
#[derive(Args)]
pub struct AggregateArgs {
    /// Path to JSON input file (office, field, optional role/level, year)
    #[arg(long)]
    pub input: Option<String>,

    /// Field name or alias, e.g. starters, total_salary_expenses
    #[arg(long)]
    pub field: Option<String>,

    #[arg(long)]
    pub role: Option<Role>,

    #[arg(long)]
    pub level: Option<Level>,

    #[arg(long)]
    pub year: Option<i32>,
}

pub fn run_aggregate(
    args: AggregateArgs,
    settings: Option<&PlanningSettings>,
    format: &OutputFormat,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut series_input: FieldSeriesInput =
        input::read_input(args.input.as_deref(), "aggregate")?;
    if let Some(field) = args.field {
        series_input.field = field;
    }
    if args.role.is_some() || args.level.is_some() {
        series_input.role = args.role;
        series_input.level = args.level;
    }
    if let Some(year) = args.year {
        series_input.year = year;
    }
    apply_settings(&mut series_input.settings, settings);

    let out = calculate_field_series(&series_input)?;
    let mut value = serde_json::to_value(&out)?;
    if !matches!(format, OutputFormat::Json) {
        let row = &out.result;
        value["result"] = series_record(&row.field, row.role, row.level, &row.values)?;
    }
    Ok(value)
}

/// Arguments for the full office table
#[derive(Args)]
pub struct TableArgs {
    /// Path to JSON input file (office, year)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,
}

pub fn run_table(
    args: TableArgs,
    settings: Option<&PlanningSettings>,
    format: &OutputFormat,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut table_input: FieldTableInput = input::read_input(args.input.as_deref(), "table")?;
    if let Some(year) = args.year {
        table_input.year = year;
    }
    apply_settings(&mut table_input.settings, settings);

    let out = calculate_field_table(&table_input)?;
    let mut value = serde_json::to_value(&out)?;
    if !matches!(format, OutputFormat::Json) {
        let rows = out
            .result
            .numeric_rows()
            .map(|r| series_record(&r.field, r.role, r.level, &r.values))
            .collect::<Result<Vec<_>, _>>()?;
        value["result"] = Value::Array(rows);
    }
    Ok(value)
}

/// Catalog listing, in table order.
pub fn run_fields() -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = PlanningContext::standard()?;
    let fields: Vec<Value> = ctx
        .catalog()
        .iter()
        .filter(|spec| spec.is_numeric())
        .map(|spec| {
            json!({
                "field": spec.name,
                "aliases": spec.aliases.join(", "),
                "label": spec.label,
                "category": spec.category.label(),
                "scope": spec.scope(),
                "type": spec.field_type,
                "aggregation": spec.aggregation,
            })
        })
        .collect();
    Ok(Value::Array(fields))
}
