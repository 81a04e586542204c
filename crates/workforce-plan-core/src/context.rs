use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{EngineConfig, PlanningSettings};
use crate::error::ConfigurationError;
use crate::model::{DefaultsTable, EntryResolver, OfficePlan, ResolvedEntry};
use crate::taxonomy::{Level, Role, RoleTaxonomy};
use crate::types::{with_metadata, ComputationOutput, Month};
use crate::WorkforcePlanResult;

#[cfg(feature = "aggregation")]
use crate::aggregation::fields::FieldCatalog;

/// Validated configuration shared by every computation: constants, the
/// canonical role table and the field catalog.
#[derive(Debug, Clone)]
pub struct PlanningContext {
    config: EngineConfig,
    taxonomy: RoleTaxonomy,
    #[cfg(feature = "aggregation")]
    catalog: FieldCatalog,
}

impl PlanningContext {
    pub fn new(config: EngineConfig, taxonomy: RoleTaxonomy) -> Result<Self, ConfigurationError> {
        // Fails fast on bad constants or a role without levels.
        DefaultsTable::build(&taxonomy, &config)?;
        Ok(PlanningContext {
            config,
            taxonomy,
            #[cfg(feature = "aggregation")]
            catalog: FieldCatalog::standard()?,
        })
    }

    pub fn standard() -> Result<Self, ConfigurationError> {
        Self::new(EngineConfig::default(), RoleTaxonomy::standard())
    }

    pub fn from_settings(settings: &PlanningSettings) -> Result<Self, ConfigurationError> {
        Self::new(
            settings.engine.clone(),
            settings.taxonomy.clone().unwrap_or_default(),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn taxonomy(&self) -> &RoleTaxonomy {
        &self.taxonomy
    }

    #[cfg(feature = "aggregation")]
    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Bind an office to this context. The office's own role table, when it
    /// has one, replaces the engine table for that office.
    pub fn scope<'a>(&'a self, office: &'a OfficePlan) -> WorkforcePlanResult<OfficeScope<'a>> {
        let taxonomy = office.taxonomy.as_ref().unwrap_or(&self.taxonomy);
        office.validate_against(taxonomy)?;
        let defaults = DefaultsTable::build(taxonomy, &self.config)?;
        Ok(OfficeScope {
            config: &self.config,
            taxonomy,
            office,
            defaults,
            #[cfg(feature = "aggregation")]
            catalog: &self.catalog,
        })
    }
}

/// One office bound to a context, ready to resolve entries.
#[derive(Debug, Clone)]
pub struct OfficeScope<'a> {
    config: &'a EngineConfig,
    taxonomy: &'a RoleTaxonomy,
    office: &'a OfficePlan,
    defaults: DefaultsTable,
    #[cfg(feature = "aggregation")]
    catalog: &'a FieldCatalog,
}

impl<'a> OfficeScope<'a> {
    pub fn office_id(&self) -> &'a str {
        &self.office.office_id
    }

    pub fn office(&self) -> &'a OfficePlan {
        self.office
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub fn taxonomy(&self) -> &'a RoleTaxonomy {
        self.taxonomy
    }

    #[cfg(feature = "aggregation")]
    pub fn catalog(&self) -> &'a FieldCatalog {
        self.catalog
    }

    pub fn resolver(&self) -> EntryResolver<'_> {
        EntryResolver::new(&self.defaults)
            .with_recorded(&self.office.entries)
            .with_overrides(&self.office.overrides)
    }

    pub fn resolve(
        &self,
        role: Role,
        level: Level,
        month: Month,
        year: i32,
    ) -> WorkforcePlanResult<ResolvedEntry> {
        self.resolver().resolve(role, level, month, year)
    }
}

/// Input for resolving a single (role, level, month, year) entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveEntryInput {
    pub office: OfficePlan,
    pub role: Role,
    pub level: Level,
    pub month: Month,
    pub year: i32,
    #[serde(default)]
    pub settings: PlanningSettings,
}

pub fn calculate_resolved_entry(
    input: &ResolveEntryInput,
) -> WorkforcePlanResult<ComputationOutput<ResolvedEntry>> {
    let start = Instant::now();
    let ctx = PlanningContext::from_settings(&input.settings)?;
    let scope = ctx.scope(&input.office)?;
    let resolved = scope.resolve(input.role, input.level, input.month, input.year)?;

    let mut warnings = Vec::new();
    if resolved.is_dirty() {
        warnings.push("Value comes from an unsaved edit".to_string());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Entry resolution: unsaved edit, then recorded entry, then defaults",
        &serde_json::json!({
            "office_id": input.office.office_id,
            "role": input.role,
            "level": input.level,
            "month": input.month,
            "year": input.year,
        }),
        warnings,
        elapsed,
        resolved,
    ))
}
