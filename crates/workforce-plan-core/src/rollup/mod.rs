pub mod group;

pub use group::{
    aggregate_across_offices, calculate_group_kpis, calculate_group_series, compute_group_kpis,
    GroupKpiInput, GroupKpiSet, GroupSeries, GroupSeriesInput,
};
