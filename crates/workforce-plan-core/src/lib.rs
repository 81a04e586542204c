pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod taxonomy;
pub mod types;

#[cfg(feature = "aggregation")]
pub mod aggregation;

#[cfg(feature = "kpi")]
pub mod kpi;

#[cfg(feature = "rollup")]
pub mod rollup;

pub use context::{OfficeScope, PlanningContext, ResolveEntryInput};
pub use error::{ConfigurationError, WorkforcePlanError};
pub use types::*;

/// Standard result type for all workforce-plan operations
pub type WorkforcePlanResult<T> = Result<T, WorkforcePlanError>;
