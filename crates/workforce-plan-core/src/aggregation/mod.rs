pub mod fields;
pub mod monthly;
pub mod series;

pub use fields::{FieldCatalog, FieldCategory, FieldScope, FieldSpec, FieldType, OfficeMetric};
pub use monthly::{aggregate_field, aggregate_office_field, build_field_table, FieldTable};
pub use series::{month_abbrev, AggregatedFieldRow, RowKind, TwelveMonthSeries};
