use std::collections::BTreeMap;

use crate::context::OfficeScope;
use crate::model::defaults::{EntryOrigin, ResolvedEntry};
use crate::model::entry::MonthlyEntry;
use crate::taxonomy::{Level, Role};
use crate::types::{Month, MONTHS};
use crate::WorkforcePlanResult;

/// Every (role, level) pair of an office resolved for all twelve months of a
/// year. Built once per computation so the aggregator and the KPI calculator
/// walk the same cross-product.
#[derive(Debug, Clone)]
pub struct YearGrid {
    year: i32,
    cells: BTreeMap<(Role, Level), Vec<ResolvedEntry>>,
}

impl YearGrid {
    pub fn resolve(scope: &OfficeScope<'_>, year: i32) -> WorkforcePlanResult<Self> {
        let resolver = scope.resolver();
        let mut cells = BTreeMap::new();
        for (role, level) in scope.taxonomy().pairs() {
            let months = MONTHS
                .iter()
                .map(|&m| resolver.resolve(role, level, m, year))
                .collect::<WorkforcePlanResult<Vec<_>>>()?;
            cells.insert((role, level), months);
        }
        Ok(YearGrid { year, cells })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn pairs(&self) -> impl Iterator<Item = (Role, Level)> + '_ {
        self.cells.keys().copied()
    }

    pub fn entry(&self, role: Role, level: Level, month: Month) -> Option<&MonthlyEntry> {
        let idx = (month as usize).checked_sub(1)?;
        self.cells
            .get(&(role, level))
            .and_then(|months| months.get(idx))
            .map(|r| &r.entry)
    }

    /// All pairs' entries for one month, in taxonomy order. Empty for a
    /// month outside 1..=12.
    pub fn month(&self, month: Month) -> impl Iterator<Item = &MonthlyEntry> + '_ {
        let idx = (month as usize).checked_sub(1);
        self.cells
            .values()
            .filter_map(move |months| idx.and_then(|i| months.get(i)))
            .map(|r| &r.entry)
    }

    pub fn count_by_origin(&self, origin: EntryOrigin) -> usize {
        self.cells
            .values()
            .flatten()
            .filter(|r| r.origin == origin)
            .count()
    }
}
