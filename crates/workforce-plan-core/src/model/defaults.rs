use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::error::ConfigurationError;
use crate::model::entry::{EntryKey, MonthlyDataset, MonthlyEntry, OperatingCosts};
use crate::model::overrides::OverrideStore;
use crate::taxonomy::{Level, Role, RoleTaxonomy};
use crate::types::{validate_month, Money, Month, Rate};
use crate::WorkforcePlanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a resolved entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    /// Unsaved local edit
    Override,
    /// Entry fetched from the planning backend
    Recorded,
    /// No entry anywhere; filled from the defaults table
    Default,
}

/// An entry plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    #[serde(flatten)]
    pub entry: MonthlyEntry,
    pub origin: EntryOrigin,
}

impl ResolvedEntry {
    /// True when the value comes from an edit that has not been persisted.
    pub fn is_dirty(&self) -> bool {
        self.origin == EntryOrigin::Override
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DefaultFigures {
    salary: Money,
    price: Money,
    utr: Rate,
}

/// Default figures for every (role, level) pair of a taxonomy.
///
/// Built once per taxonomy; lookups for a pair the taxonomy does not define
/// fail with `UnknownRoleLevel` instead of producing zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultsTable {
    figures: BTreeMap<(Role, Level), DefaultFigures>,
    billable: BTreeSet<Role>,
}

impl DefaultsTable {
    pub fn build(taxonomy: &RoleTaxonomy, config: &EngineConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let mut figures = BTreeMap::new();
        let mut billable = BTreeSet::new();
        for role in taxonomy.roles() {
            let levels = taxonomy.levels_for(role)?;
            if levels.is_empty() {
                return Err(ConfigurationError::RoleWithoutLevels(role));
            }
            let role_bills = taxonomy.is_billable(role);
            if role_bills {
                billable.insert(role);
            }
            for level in levels {
                let (price, utr) = if role_bills {
                    (config.default_billable_price, config.default_billable_utr)
                } else {
                    (Decimal::ZERO, Decimal::ZERO)
                };
                figures.insert(
                    (role, *level),
                    DefaultFigures {
                        salary: config.default_salary,
                        price,
                        utr,
                    },
                );
            }
        }

        Ok(DefaultsTable { figures, billable })
    }

    pub fn contains(&self, role: Role, level: Level) -> bool {
        self.figures.contains_key(&(role, level))
    }

    pub fn is_billable(&self, role: Role) -> bool {
        self.billable.contains(&role)
    }

    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }

    /// The entry used when nothing is recorded for the key.
    pub fn default_entry(
        &self,
        role: Role,
        level: Level,
        month: Month,
        year: i32,
    ) -> Result<MonthlyEntry, ConfigurationError> {
        let f = self
            .figures
            .get(&(role, level))
            .ok_or(ConfigurationError::UnknownRoleLevel { role, level })?;
        Ok(MonthlyEntry {
            role,
            level,
            month,
            year,
            recruitment: Decimal::ZERO,
            churn: Decimal::ZERO,
            fte: Decimal::ZERO,
            salary: f.salary,
            price: f.price,
            utr: f.utr,
            variable_salary: None,
            social_security: None,
            pension: None,
            invoiced_time: None,
            average_price: None,
            operating_costs: OperatingCosts::default(),
        })
    }

    /// Non-billable roles never carry a price or utilisation.
    fn normalize(&self, entry: &MonthlyEntry) -> MonthlyEntry {
        let mut entry = entry.clone();
        if !self.is_billable(entry.role) {
            entry.price = Decimal::ZERO;
            entry.utr = Decimal::ZERO;
        }
        entry
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve one key against the override store, falling back to defaults.
pub fn resolve_entry(
    defaults: &DefaultsTable,
    role: Role,
    level: Level,
    month: Month,
    year: i32,
    overrides: &OverrideStore,
) -> WorkforcePlanResult<ResolvedEntry> {
    EntryResolver::new(defaults)
        .with_overrides(overrides)
        .resolve(role, level, month, year)
}

/// Layered lookup: override, then recorded entry, then default.
#[derive(Debug, Clone, Copy)]
pub struct EntryResolver<'a> {
    defaults: &'a DefaultsTable,
    recorded: Option<&'a MonthlyDataset>,
    overrides: Option<&'a OverrideStore>,
}

impl<'a> EntryResolver<'a> {
    pub fn new(defaults: &'a DefaultsTable) -> Self {
        EntryResolver {
            defaults,
            recorded: None,
            overrides: None,
        }
    }

    pub fn with_recorded(mut self, recorded: &'a MonthlyDataset) -> Self {
        self.recorded = Some(recorded);
        self
    }

    pub fn with_overrides(mut self, overrides: &'a OverrideStore) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn defaults(&self) -> &'a DefaultsTable {
        self.defaults
    }

    pub fn resolve(
        &self,
        role: Role,
        level: Level,
        month: Month,
        year: i32,
    ) -> WorkforcePlanResult<ResolvedEntry> {
        validate_month(month)?;
        if !self.defaults.contains(role, level) {
            return Err(ConfigurationError::UnknownRoleLevel { role, level }.into());
        }

        let key = EntryKey::new(role, level, month, year);
        if let Some(edit) = self.overrides.and_then(|o| o.get(&key)) {
            return Ok(ResolvedEntry {
                entry: self.defaults.normalize(edit),
                origin: EntryOrigin::Override,
            });
        }
        if let Some(recorded) = self.recorded.and_then(|r| r.get(&key)) {
            return Ok(ResolvedEntry {
                entry: self.defaults.normalize(recorded),
                origin: EntryOrigin::Recorded,
            });
        }

        Ok(ResolvedEntry {
            entry: self.defaults.default_entry(role, level, month, year)?,
            origin: EntryOrigin::Default,
        })
    }
}
