use workforce_plan_core::config::PlanningSettings;
use workforce_plan_core::PlanningContext;

use super::file;

/// Load engine settings from a JSON or YAML file, chosen by extension.
/// Settings are validated here so a bad file fails before any input is read.
pub fn load_settings(path: &str) -> Result<PlanningSettings, Box<dyn std::error::Error>> {
    let (canonical, contents) = file::read_text(path)?;
    let is_yaml = canonical
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let settings: PlanningSettings = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };

    PlanningContext::from_settings(&settings)?;
    tracing::debug!(path = %canonical.display(), yaml = is_yaml, "loaded settings");
    Ok(settings)
}
