use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Add;

use crate::aggregation::fields::FieldCategory;
use crate::error::WorkforcePlanError;
use crate::taxonomy::{Level, Role};
use crate::types::{validate_month, Month, MONTHS};
use crate::WorkforcePlanResult;

// ---------------------------------------------------------------------------
// Twelve-month series
// ---------------------------------------------------------------------------

/// Twelve monthly values, January first. The total is never stored: it is
/// recomputed from the months whenever it is read or serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SeriesRepr", from = "SeriesRepr")]
pub struct TwelveMonthSeries {
    months: [Decimal; 12],
}

#[derive(Serialize, Deserialize)]
struct SeriesRepr {
    months: [Decimal; 12],
    #[serde(default)]
    total: Decimal,
}

impl From<TwelveMonthSeries> for SeriesRepr {
    fn from(s: TwelveMonthSeries) -> Self {
        SeriesRepr {
            months: s.months,
            total: s.total(),
        }
    }
}

impl From<SeriesRepr> for TwelveMonthSeries {
    fn from(r: SeriesRepr) -> Self {
        TwelveMonthSeries { months: r.months }
    }
}

impl TwelveMonthSeries {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_months(months: [Decimal; 12]) -> Self {
        TwelveMonthSeries { months }
    }

    /// Build a series by evaluating `f` for months 1..=12.
    pub fn try_from_fn<F>(mut f: F) -> WorkforcePlanResult<Self>
    where
        F: FnMut(Month) -> WorkforcePlanResult<Decimal>,
    {
        let mut months = [Decimal::ZERO; 12];
        for (slot, month) in months.iter_mut().zip(MONTHS) {
            *slot = f(month)?;
        }
        Ok(TwelveMonthSeries { months })
    }

    pub fn months(&self) -> &[Decimal; 12] {
        &self.months
    }

    pub fn get(&self, month: Month) -> WorkforcePlanResult<Decimal> {
        validate_month(month)?;
        Ok(self.months[month as usize - 1])
    }

    pub fn total(&self) -> Decimal {
        self.months.iter().copied().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.months.iter().all(Decimal::is_zero)
    }

    /// Combine two series month by month.
    pub fn zip_with<F>(mut self, other: &TwelveMonthSeries, f: F) -> Self
    where
        F: Fn(Decimal, Decimal) -> Decimal,
    {
        for (a, b) in self.months.iter_mut().zip(other.months) {
            *a = f(*a, b);
        }
        self
    }
}

impl Add for TwelveMonthSeries {
    type Output = TwelveMonthSeries;

    fn add(mut self, rhs: TwelveMonthSeries) -> Self::Output {
        for (a, b) in self.months.iter_mut().zip(rhs.months) {
            *a += b;
        }
        self
    }
}

impl std::iter::Sum for TwelveMonthSeries {
    fn sum<I: Iterator<Item = TwelveMonthSeries>>(iter: I) -> Self {
        iter.fold(TwelveMonthSeries::zero(), Add::add)
    }
}

/// Three-letter month label ("Jan" … "Dec").
pub fn month_abbrev(month: Month) -> WorkforcePlanResult<&'static str> {
    let m = u8::try_from(month)
        .ok()
        .and_then(|m| chrono::Month::try_from(m).ok())
        .ok_or_else(|| {
            WorkforcePlanError::invalid("month", format!("no calendar month {}", month))
        })?;
    Ok(&m.name()[..3])
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// What a table row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Office total, no role/level breakdown
    Office,
    /// One role/level pair
    RoleLevel,
    /// Category title; display only
    CategoryHeader,
    /// Gap between categories; display only
    Separator,
}

impl RowKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, RowKind::Office | RowKind::RoleLevel)
    }
}

/// One rendered row: a field for one role/level (or the office) across the
/// year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFieldRow {
    pub field: String,
    pub label: String,
    pub category: FieldCategory,
    pub kind: RowKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub values: TwelveMonthSeries,
}

impl AggregatedFieldRow {
    pub fn total(&self) -> Decimal {
        self.values.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_is_sum_of_months() {
        let s = TwelveMonthSeries::try_from_fn(|m| Ok(Decimal::from(m) * dec!(1.5))).unwrap();
        // 1.5 * (1 + ... + 12) = 117
        assert_eq!(s.total(), dec!(117));
        assert_eq!(s.get(12).unwrap(), dec!(18));
    }

    #[test]
    fn test_serialized_total_is_recomputed() {
        let json = r#"{"months":["1","1","1","1","1","1","1","1","1","1","1","1"],"total":"999"}"#;
        let s: TwelveMonthSeries = serde_json::from_str(json).unwrap();
        assert_eq!(s.total(), dec!(12));
        let v = serde_json::to_value(s).unwrap();
        assert_eq!(v["total"], "12");
    }

    #[test]
    fn test_add_is_month_wise() {
        let a = TwelveMonthSeries::from_months([dec!(1); 12]);
        let b = TwelveMonthSeries::from_months([dec!(2); 12]);
        let c: TwelveMonthSeries = [a, b].into_iter().sum();
        assert_eq!(c.months(), &[dec!(3); 12]);
    }

    #[test]
    fn test_month_abbrev() {
        assert_eq!(month_abbrev(1).unwrap(), "Jan");
        assert_eq!(month_abbrev(9).unwrap(), "Sep");
        assert!(month_abbrev(13).is_err());
    }

    #[test]
    fn test_get_rejects_month_zero() {
        assert!(TwelveMonthSeries::zero().get(0).is_err());
    }
}
