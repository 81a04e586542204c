use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use workforce_plan_core::WorkforcePlanResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse the request, run `f`, serialize the envelope.
fn call<I, O>(input_json: &str, f: impl FnOnce(&I) -> WorkforcePlanResult<O>) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = f(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Entry model
// ---------------------------------------------------------------------------

/// `{records: [...], settings?}` → office plans
#[napi]
pub fn normalize_plans(input_json: String) -> NapiResult<String> {
    call(&input_json, workforce_plan_core::model::input::normalize_plan_records)
}

#[napi]
pub fn resolve_entry(input_json: String) -> NapiResult<String> {
    call(&input_json, workforce_plan_core::context::calculate_resolved_entry)
}

// ---------------------------------------------------------------------------
// Monthly aggregation
// ---------------------------------------------------------------------------

#[napi]
pub fn aggregate_field(input_json: String) -> NapiResult<String> {
    call(&input_json, workforce_plan_core::aggregation::monthly::calculate_field_series)
}

#[napi]
pub fn build_field_table(input_json: String) -> NapiResult<String> {
    call(&input_json, workforce_plan_core::aggregation::monthly::calculate_field_table)
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_yearly_kpis(input_json: String) -> NapiResult<String> {
    call(&input_json, workforce_plan_core::kpi::calculate_yearly_kpis)
}

#[napi]
pub fn compute_group_kpis(input_json: String) -> NapiResult<String> {
    call(&input_json, workforce_plan_core::rollup::calculate_group_kpis)
}

#[napi]
pub fn aggregate_across_offices(input_json: String) -> NapiResult<String> {
    call(&input_json, workforce_plan_core::rollup::calculate_group_series)
}
