pub mod aggregate;
pub mod group;
pub mod kpi;
pub mod plan;

use serde_json::{Map, Value};
use workforce_plan_core::aggregation::{month_abbrev, TwelveMonthSeries};
use workforce_plan_core::config::PlanningSettings;
use workforce_plan_core::taxonomy::{Level, Role};
use workforce_plan_core::MONTHS;

/// `--config` settings win over settings embedded in the input document.
pub fn apply_settings(target: &mut PlanningSettings, settings: Option<&PlanningSettings>) {
    if let Some(s) = settings {
        *target = s.clone();
    }
}

/// One series as a flat record: field, role, level, Jan..Dec, total.
/// Used for table and CSV output where nested month arrays read poorly.
pub fn series_record(
    field: &str,
    role: Option<Role>,
    level: Option<Level>,
    values: &TwelveMonthSeries,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut rec = Map::new();
    rec.insert("field".to_string(), Value::from(field));
    rec.insert(
        "role".to_string(),
        Value::from(role.map(|r| r.to_string()).unwrap_or_default()),
    );
    rec.insert(
        "level".to_string(),
        Value::from(level.map(|l| l.to_string()).unwrap_or_default()),
    );
    for (month, v) in MONTHS.iter().zip(values.months()) {
        rec.insert(month_abbrev(*month)?.to_string(), Value::from(v.to_string()));
    }
    rec.insert("total".to_string(), Value::from(values.total().to_string()));
    Ok(Value::Object(rec))
}
