use clap::Args;
use serde_json::Value;

use workforce_plan_core::config::PlanningSettings;
use workforce_plan_core::rollup::{
    calculate_group_kpis, calculate_group_series, GroupKpiInput, GroupSeriesInput,
};

use super::{apply_settings, series_record};
use crate::input;
use crate::OutputFormat;

/// Arguments for group KPIs
#[derive(Args)]
pub struct GroupArgs {
    /// Path to JSON input file (offices, year)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,
}

pub fn run_group(
    args: GroupArgs,
    settings: Option<&PlanningSettings>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut group_input: GroupKpiInput = input::read_input(args.input.as_deref(), "group")?;
    if let Some(year) = args.year {
        group_input.year = year;
    }
    apply_settings(&mut group_input.settings, settings);

    let result = calculate_group_kpis(&group_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a cross-office field series
#[derive(Args)]
pub struct GroupSeriesArgs {
    /// Path to JSON input file (offices, field, year)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub field: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,
}

pub fn run_group_series(
    args: GroupSeriesArgs,
    settings: Option<&PlanningSettings>,
    format: &OutputFormat,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut series_input: GroupSeriesInput =
        input::read_input(args.input.as_deref(), "group-series")?;
    if let Some(field) = args.field {
        series_input.field = field;
    }
    if let Some(year) = args.year {
        series_input.year = year;
    }
    apply_settings(&mut series_input.settings, settings);

    let out = calculate_group_series(&series_input)?;
    let mut value = serde_json::to_value(&out)?;
    if !matches!(format, OutputFormat::Json) {
        let series = &out.result;
        let mut rows = series
            .rows
            .iter()
            .map(|r| series_record(&r.field, r.role, r.level, &r.values))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(series_record(&series.field, None, None, &series.total)?);
        value["result"] = Value::Array(rows);
    }
    Ok(value)
}
