use clap::Args;
use serde_json::Value;

use workforce_plan_core::config::PlanningSettings;
use workforce_plan_core::context::{calculate_resolved_entry, ResolveEntryInput};
use workforce_plan_core::model::input::{normalize_plan_records, parse_plan_records, NormalizeInput};
use workforce_plan_core::model::OfficePlan;
use workforce_plan_core::taxonomy::{Level, Role};

use super::apply_settings;
use crate::input;

/// Arguments for record normalization
#[derive(Args)]
pub struct NormalizeArgs {
    /// JSON file of backend plan records (an array, or an object with "records" or "plans")
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_normalize(
    args: NormalizeArgs,
    settings: Option<&PlanningSettings>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let text = if let Some(ref path) = args.input {
        input::file::read_text(path)?.1
    } else if let Some(text) = input::stdin::read_stdin_text()? {
        text
    } else {
        return Err("--input <file.json> or stdin required for normalize".into());
    };

    let records = parse_plan_records(&text)?;
    let mut normalize_input = NormalizeInput {
        records,
        settings: PlanningSettings::default(),
    };
    apply_settings(&mut normalize_input.settings, settings);

    let result = normalize_plan_records(&normalize_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for single entry resolution
#[derive(Args)]
pub struct ResolveArgs {
    /// Path to JSON input file (office plus key); flags below override its key
    #[arg(long)]
    pub input: Option<String>,

    /// Office identifier when no input file is given
    #[arg(long, default_value = "office")]
    pub office_id: String,

    /// Role, e.g. Consultant
    #[arg(long)]
    pub role: Option<Role>,

    /// Level, e.g. AM
    #[arg(long)]
    pub level: Option<Level>,

    /// Month, 1-12
    #[arg(long)]
    pub month: Option<u32>,

    #[arg(long)]
    pub year: Option<i32>,
}

pub fn run_resolve(
    args: ResolveArgs,
    settings: Option<&PlanningSettings>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut resolve_input: ResolveEntryInput = if args.input.is_some() {
        input::read_input(args.input.as_deref(), "resolve")?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        // No office data: resolves straight to defaults
        ResolveEntryInput {
            office: OfficePlan::new(args.office_id.clone()),
            role: args.role.ok_or("--role is required (or provide --input)")?,
            level: args.level.ok_or("--level is required (or provide --input)")?,
            month: args.month.ok_or("--month is required (or provide --input)")?,
            year: args.year.ok_or("--year is required (or provide --input)")?,
            settings: PlanningSettings::default(),
        }
    };

    if let Some(role) = args.role {
        resolve_input.role = role;
    }
    if let Some(level) = args.level {
        resolve_input.level = level;
    }
    if let Some(month) = args.month {
        resolve_input.month = month;
    }
    if let Some(year) = args.year {
        resolve_input.year = year;
    }
    apply_settings(&mut resolve_input.settings, settings);

    let result = calculate_resolved_entry(&resolve_input)?;
    Ok(serde_json::to_value(result)?)
}
