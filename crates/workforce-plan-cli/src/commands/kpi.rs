use clap::Args;
use serde_json::Value;

use workforce_plan_core::config::PlanningSettings;
use workforce_plan_core::kpi::{calculate_yearly_kpis, YearlyKpiInput};

use super::apply_settings;
use crate::input;

/// Arguments for yearly office KPIs
#[derive(Args)]
pub struct KpiArgs {
    /// Path to JSON input file (office, year)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,
}

pub fn run_kpis(
    args: KpiArgs,
    settings: Option<&PlanningSettings>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut kpi_input: YearlyKpiInput = input::read_input(args.input.as_deref(), "kpis")?;
    if let Some(year) = args.year {
        kpi_input.year = year;
    }
    apply_settings(&mut kpi_input.settings, settings);

    let result = calculate_yearly_kpis(&kpi_input)?;
    Ok(serde_json::to_value(result)?)
}
