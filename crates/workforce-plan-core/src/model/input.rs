//! Adapter from planning-backend records to [`OfficePlan`]s.
//!
//! The backend (`GET /business-plans`, `GET /offices/{id}/workforce`) returns
//! one record per office and month, each with an `entries` array of
//! role/level rows. Records are parsed one at a time so a malformed record is
//! reported by position rather than failing the whole document anonymously.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::PlanningSettings;
use crate::error::WorkforcePlanError;
use crate::model::entry::{MonthlyEntry, OfficePlan, OperatingCosts};
use crate::taxonomy::{Level, Role, RoleTaxonomy};
use crate::types::{with_metadata, ComputationOutput, Money, Month};
use crate::WorkforcePlanResult;

// ---------------------------------------------------------------------------
// Types: raw backend records
// ---------------------------------------------------------------------------

/// One monthly plan record as served by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMonthlyPlan {
    pub office_id: Option<String>,
    pub year: Option<i32>,
    pub month: Option<Month>,
    pub entries: Option<Vec<Value>>,
}

/// One role/level row inside a plan record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlanEntry {
    pub role: Option<String>,
    pub level: Option<String>,
    pub salary: Option<Money>,
    pub variable_salary: Option<Money>,
    pub social_security: Option<Money>,
    pub pension: Option<Money>,
    pub recruitment: Option<Decimal>,
    pub churn: Option<Decimal>,
    pub fte: Option<Decimal>,
    pub price: Option<Money>,
    pub utr: Option<Decimal>,
    pub invoiced_time: Option<Decimal>,
    pub average_price: Option<Money>,
    #[serde(default)]
    pub operating_costs: BTreeMap<String, Money>,
}

/// Input for record normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeInput {
    /// Raw plan records, exactly as returned by the backend
    pub records: Vec<Value>,
    #[serde(default)]
    pub settings: PlanningSettings,
}

/// Normalized office plans plus adapter warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedPlans {
    pub offices: Vec<OfficePlan>,
    pub record_count: usize,
    pub entry_count: usize,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Parse a JSON document holding an array of plan records.
pub fn parse_plan_records(json: &str) -> WorkforcePlanResult<Vec<Value>> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("records").or_else(|| map.remove("plans")) {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(WorkforcePlanError::malformed(
                "document",
                "expected an array of plan records or an object with a 'records' array",
            )),
        },
        _ => Err(WorkforcePlanError::malformed(
            "document",
            "expected an array of plan records",
        )),
    }
}

/// Convert backend records into one [`OfficePlan`] per office, in the order
/// offices first appear.
pub fn normalize_plans(
    records: &[Value],
    taxonomy: &RoleTaxonomy,
) -> WorkforcePlanResult<NormalizedPlans> {
    let mut offices: Vec<OfficePlan> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut entry_count = 0usize;

    for (i, record) in records.iter().enumerate() {
        let record_name = format!("plans[{}]", i);
        let plan: RawMonthlyPlan = serde_json::from_value(record.clone())
            .map_err(|e| WorkforcePlanError::malformed(&record_name, e.to_string()))?;

        let office_id = require(plan.office_id, &record_name, "office_id")?;
        let year = require(plan.year, &record_name, "year")?;
        let month = require(plan.month, &record_name, "month")?;
        if !(1..=12).contains(&month) {
            return Err(WorkforcePlanError::malformed(
                &record_name,
                format!("month must be between 1 and 12, got {}", month),
            ));
        }
        let entries = require(plan.entries, &record_name, "entries")?;

        let slot = *index.entry(office_id.clone()).or_insert_with(|| {
            offices.push(OfficePlan::new(office_id.clone()));
            offices.len() - 1
        });

        for (j, raw) in entries.into_iter().enumerate() {
            let entry_name = format!("{}.entries[{}]", record_name, j);
            let raw: RawPlanEntry = serde_json::from_value(raw)
                .map_err(|e| WorkforcePlanError::malformed(&entry_name, e.to_string()))?;
            let entry = normalize_entry(raw, year, month, taxonomy, &entry_name, &mut warnings)?;
            offices[slot]
                .entries
                .insert(entry)
                .map_err(|e| WorkforcePlanError::malformed(&entry_name, e.to_string()))?;
            entry_count += 1;
        }
    }

    tracing::debug!(
        records = records.len(),
        offices = offices.len(),
        entries = entry_count,
        "normalized plan records"
    );

    Ok(NormalizedPlans {
        offices,
        record_count: records.len(),
        entry_count,
        warnings,
    })
}

/// Envelope-producing wrapper over [`normalize_plans`].
pub fn normalize_plan_records(
    input: &NormalizeInput,
) -> WorkforcePlanResult<ComputationOutput<NormalizedPlans>> {
    let start = Instant::now();
    let taxonomy = input.settings.taxonomy.clone().unwrap_or_default();
    let mut output = normalize_plans(&input.records, &taxonomy)?;
    let warnings = std::mem::take(&mut output.warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Planning record normalization into office plans",
        &serde_json::json!({
            "records": input.records.len(),
            "roles": taxonomy.roles().count(),
            "role_level_pairs": taxonomy.pair_count(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn require<T>(value: Option<T>, record: &str, field: &str) -> WorkforcePlanResult<T> {
    value.ok_or_else(|| {
        WorkforcePlanError::malformed(record, format!("missing required field '{}'", field))
    })
}

fn normalize_entry(
    raw: RawPlanEntry,
    year: i32,
    month: Month,
    taxonomy: &RoleTaxonomy,
    record: &str,
    warnings: &mut Vec<String>,
) -> WorkforcePlanResult<MonthlyEntry> {
    let role: Role = require(raw.role, record, "role")?
        .parse()
        .map_err(|e: String| WorkforcePlanError::malformed(record, e))?;
    let level: Level = require(raw.level, record, "level")?
        .parse()
        .map_err(|e: String| WorkforcePlanError::malformed(record, e))?;
    taxonomy.ensure(role, level)?;

    let salary = require(raw.salary, record, "salary")?;
    let recruitment = require(raw.recruitment, record, "recruitment")?;
    let churn = require(raw.churn, record, "churn")?;

    let (price, utr) = if taxonomy.is_billable(role) {
        (
            require(raw.price, record, "price")?,
            require(raw.utr, record, "utr")?,
        )
    } else {
        let price = raw.price.unwrap_or_default();
        let utr = raw.utr.unwrap_or_default();
        if !price.is_zero() || !utr.is_zero() {
            tracing::warn!(
                record,
                %role,
                %price,
                %utr,
                "non-billable role carries price/utr; zeroing"
            );
            warnings.push(format!(
                "{}: non-billable role {} carried price {} / utr {}; set to 0",
                record, role, price, utr
            ));
        }
        (Decimal::ZERO, Decimal::ZERO)
    };

    Ok(MonthlyEntry {
        role,
        level,
        month,
        year,
        recruitment,
        churn,
        fte: raw.fte.unwrap_or_default(),
        salary,
        price,
        utr,
        variable_salary: raw.variable_salary,
        social_security: raw.social_security,
        pension: raw.pension,
        invoiced_time: raw.invoiced_time,
        average_price: raw.average_price,
        operating_costs: OperatingCosts(raw.operating_costs),
    })
}
