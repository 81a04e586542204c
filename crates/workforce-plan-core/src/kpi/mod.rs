pub mod yearly;

pub use yearly::{
    accumulate_year, calculate_yearly_kpis, compute_yearly_kpis, KpiAccumulator, KpiFigures,
    YearlyKpiInput, YearlyKpiSet,
};
