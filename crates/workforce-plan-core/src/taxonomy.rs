//! Canonical role→levels table.
//!
//! Every other module asks this table which (role, level) pairs exist, so the
//! defaults resolver, the aggregator and the KPI calculator can never disagree
//! on the cross-product they iterate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Workforce role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Consultant,
    Sales,
    Recruitment,
    Operations,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Consultant,
        Role::Sales,
        Role::Recruitment,
        Role::Operations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consultant => "Consultant",
            Role::Sales => "Sales",
            Role::Recruitment => "Recruitment",
            Role::Operations => "Operations",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Career level, ordered junior to senior. `General` is the single level of a
/// flat role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    A,
    #[serde(rename = "AC")]
    Ac,
    C,
    SrC,
    #[serde(rename = "AM")]
    Am,
    M,
    SrM,
    Pi,
    P,
    X,
    General,
}

impl Level {
    /// The ladder shared by every leveled role.
    pub const LADDER: [Level; 10] = [
        Level::A,
        Level::Ac,
        Level::C,
        Level::SrC,
        Level::Am,
        Level::M,
        Level::SrM,
        Level::Pi,
        Level::P,
        Level::X,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::A => "A",
            Level::Ac => "AC",
            Level::C => "C",
            Level::SrC => "SrC",
            Level::Am => "AM",
            Level::M => "M",
            Level::SrM => "SrM",
            Level::Pi => "Pi",
            Level::P => "P",
            Level::X => "X",
            Level::General => "General",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Level::LADDER
            .into_iter()
            .chain(std::iter::once(Level::General))
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown level '{}'", s))
    }
}

/// One row of the role→levels table as it appears in settings files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleLevels {
    pub role: Role,
    pub levels: Vec<Level>,
}

/// Serialized form of [`RoleTaxonomy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomySpec {
    pub roles: Vec<RoleLevels>,
    pub billable_roles: Vec<Role>,
    #[serde(default = "default_debit_roles")]
    pub debit_roles: Vec<Role>,
}

fn default_debit_roles() -> Vec<Role> {
    vec![Role::Consultant]
}

/// Validated role→levels table plus the billable and debit role sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaxonomySpec", into = "TaxonomySpec")]
pub struct RoleTaxonomy {
    levels: BTreeMap<Role, Vec<Level>>,
    billable: BTreeSet<Role>,
    debit: BTreeSet<Role>,
}

impl RoleTaxonomy {
    /// Consultant, Sales and Recruitment on the full ladder; Operations flat.
    /// Consultant and Sales bill; only Consultant counts as debit FTE.
    pub fn standard() -> Self {
        let mut levels = BTreeMap::new();
        for role in [Role::Consultant, Role::Sales, Role::Recruitment] {
            levels.insert(role, Level::LADDER.to_vec());
        }
        levels.insert(Role::Operations, vec![Level::General]);
        RoleTaxonomy {
            levels,
            billable: [Role::Consultant, Role::Sales].into_iter().collect(),
            debit: [Role::Consultant].into_iter().collect(),
        }
    }

    /// Build and validate a custom table. Roles absent from `table` do not
    /// exist for this taxonomy.
    pub fn new(
        table: impl IntoIterator<Item = (Role, Vec<Level>)>,
        billable: impl IntoIterator<Item = Role>,
        debit: impl IntoIterator<Item = Role>,
    ) -> Result<Self, ConfigurationError> {
        let mut levels = BTreeMap::new();
        for (role, role_levels) in table {
            let mut seen = BTreeSet::new();
            let deduped: Vec<Level> = role_levels
                .into_iter()
                .filter(|l| seen.insert(*l))
                .collect();
            if deduped.is_empty() {
                return Err(ConfigurationError::RoleWithoutLevels(role));
            }
            if deduped.contains(&Level::General) && deduped.len() != 1 {
                return Err(ConfigurationError::FlatRoleLevels {
                    role,
                    count: deduped.len(),
                });
            }
            levels.insert(role, deduped);
        }

        let billable: BTreeSet<Role> = billable.into_iter().collect();
        let debit: BTreeSet<Role> = debit.into_iter().collect();
        for role in billable.iter().chain(debit.iter()) {
            if !levels.contains_key(role) {
                return Err(ConfigurationError::RoleWithoutLevels(*role));
            }
        }

        Ok(RoleTaxonomy {
            levels,
            billable,
            debit,
        })
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.levels.keys().copied()
    }

    pub fn levels_for(&self, role: Role) -> Result<&[Level], ConfigurationError> {
        self.levels
            .get(&role)
            .map(Vec::as_slice)
            .ok_or(ConfigurationError::RoleWithoutLevels(role))
    }

    pub fn contains(&self, role: Role, level: Level) -> bool {
        self.levels
            .get(&role)
            .is_some_and(|levels| levels.contains(&level))
    }

    /// Fail with `UnknownRoleLevel` unless `level` is defined for `role`.
    pub fn ensure(&self, role: Role, level: Level) -> Result<(), ConfigurationError> {
        if self.contains(role, level) {
            Ok(())
        } else {
            Err(ConfigurationError::UnknownRoleLevel { role, level })
        }
    }

    /// Every (role, level) pair, roles in declaration order, levels junior first.
    pub fn pairs(&self) -> impl Iterator<Item = (Role, Level)> + '_ {
        self.levels
            .iter()
            .flat_map(|(role, levels)| levels.iter().map(move |level| (*role, *level)))
    }

    pub fn pair_count(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    pub fn is_billable(&self, role: Role) -> bool {
        self.billable.contains(&role)
    }

    pub fn is_debit(&self, role: Role) -> bool {
        self.debit.contains(&role)
    }
}

impl Default for RoleTaxonomy {
    fn default() -> Self {
        RoleTaxonomy::standard()
    }
}

impl TryFrom<TaxonomySpec> for RoleTaxonomy {
    type Error = ConfigurationError;

    fn try_from(spec: TaxonomySpec) -> Result<Self, Self::Error> {
        RoleTaxonomy::new(
            spec.roles.into_iter().map(|r| (r.role, r.levels)),
            spec.billable_roles,
            spec.debit_roles,
        )
    }
}

impl From<RoleTaxonomy> for TaxonomySpec {
    fn from(t: RoleTaxonomy) -> Self {
        TaxonomySpec {
            roles: t
                .levels
                .into_iter()
                .map(|(role, levels)| RoleLevels { role, levels })
                .collect(),
            billable_roles: t.billable.into_iter().collect(),
            debit_roles: t.debit.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_pair_count() {
        let t = RoleTaxonomy::standard();
        // 3 leveled roles x 10 levels + Operations/General
        assert_eq!(t.pair_count(), 31);
        assert_eq!(t.pairs().count(), 31);
    }

    #[test]
    fn test_standard_billable_and_debit_sets() {
        let t = RoleTaxonomy::standard();
        assert!(t.is_billable(Role::Consultant));
        assert!(t.is_billable(Role::Sales));
        assert!(!t.is_billable(Role::Recruitment));
        assert!(!t.is_billable(Role::Operations));
        assert!(t.is_debit(Role::Consultant));
        assert!(!t.is_debit(Role::Sales));
    }

    #[test]
    fn test_ensure_rejects_level_outside_role() {
        let t = RoleTaxonomy::standard();
        let err = t.ensure(Role::Operations, Level::A).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownRoleLevel {
                role: Role::Operations,
                level: Level::A
            }
        );
        assert!(t.ensure(Role::Consultant, Level::General).is_err());
        assert!(t.ensure(Role::Operations, Level::General).is_ok());
    }

    #[test]
    fn test_new_rejects_empty_role() {
        let err = RoleTaxonomy::new([(Role::Sales, vec![])], [], []).unwrap_err();
        assert_eq!(err, ConfigurationError::RoleWithoutLevels(Role::Sales));
    }

    #[test]
    fn test_new_rejects_mixed_flat_role() {
        let err = RoleTaxonomy::new(
            [(Role::Operations, vec![Level::General, Level::A])],
            [],
            [],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::FlatRoleLevels { count: 2, .. }));
    }

    #[test]
    fn test_new_rejects_billable_role_missing_from_table() {
        let err = RoleTaxonomy::new([(Role::Consultant, vec![Level::A])], [Role::Sales], [])
            .unwrap_err();
        assert_eq!(err, ConfigurationError::RoleWithoutLevels(Role::Sales));
    }

    #[test]
    fn test_parse_role_and_level_case_insensitive() {
        assert_eq!("consultant".parse::<Role>().unwrap(), Role::Consultant);
        assert_eq!("src".parse::<Level>().unwrap(), Level::SrC);
        assert_eq!("AM".parse::<Level>().unwrap(), Level::Am);
        assert!("Partner".parse::<Level>().is_err());
    }

    #[test]
    fn test_taxonomy_serde_validates() {
        let json = r#"{"roles":[{"role":"Operations","levels":[]}],"billable_roles":[]}"#;
        assert!(serde_json::from_str::<RoleTaxonomy>(json).is_err());

        let json = r#"{"roles":[{"role":"Consultant","levels":["A","AC"]}],"billable_roles":["Consultant"]}"#;
        let t: RoleTaxonomy = serde_json::from_str(json).unwrap();
        assert_eq!(t.levels_for(Role::Consultant).unwrap(), &[Level::A, Level::Ac]);
        assert!(t.is_debit(Role::Consultant));
    }
}
