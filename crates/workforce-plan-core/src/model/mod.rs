pub mod defaults;
pub mod entry;
pub mod grid;
pub mod input;
pub mod overrides;

pub use defaults::{resolve_entry, DefaultsTable, EntryOrigin, EntryResolver, ResolvedEntry};
pub use entry::{EntryKey, MonthlyDataset, MonthlyEntry, OfficePlan, OperatingCosts};
pub use grid::YearGrid;
pub use overrides::OverrideStore;
