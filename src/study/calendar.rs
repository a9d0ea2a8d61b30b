//! Trading calendar derived from the market index.

use chrono::NaiveDate;

use crate::domain::PriceSeries;

/// Strictly increasing sequence of trading dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Every date with a market price is a trading date.
    pub fn from_prices(market: &PriceSeries) -> Self {
        Self {
            dates: market.dates().collect(),
        }
    }

    /// Build from arbitrary dates; duplicates are dropped and order is restored.
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn get(&self, idx: usize) -> Option<NaiveDate> {
        self.dates.get(idx).copied()
    }

    pub fn as_slice(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Index of `date` if it is a trading date.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Index of the closest trading date at or before `date`.
    pub fn anchor_index(&self, date: NaiveDate) -> Option<usize> {
        match self.dates.binary_search(&date) {
            Ok(idx) => Some(idx),
            Err(0) => None,
            Err(insert_at) => Some(insert_at - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn calendar_follows_market_dates() {
        let market = PriceSeries::from_points([(d(5), 1.0), (d(1), 1.0), (d(4), 1.0)]);
        let cal = TradingCalendar::from_prices(&market);
        assert_eq!(cal.as_slice(), &[d(1), d(4), d(5)]);
        assert_eq!(cal.first(), Some(d(1)));
        assert_eq!(cal.last(), Some(d(5)));
    }

    #[test]
    fn from_dates_sorts_and_dedups() {
        let cal = TradingCalendar::from_dates([d(3), d(1), d(3), d(2)]);
        assert_eq!(cal.as_slice(), &[d(1), d(2), d(3)]);
    }

    #[test]
    fn anchor_index_resolves_at_or_before() {
        let cal = TradingCalendar::from_dates([d(4), d(5), d(8)]);
        assert_eq!(cal.anchor_index(d(5)), Some(1));
        // Weekend falls back to the previous trading day.
        assert_eq!(cal.anchor_index(d(7)), Some(1));
        assert_eq!(cal.anchor_index(d(20)), Some(2));
        assert_eq!(cal.anchor_index(d(3)), None);
        assert_eq!(cal.position(d(7)), None);
    }

    #[test]
    fn empty_calendar_has_no_anchor() {
        let cal = TradingCalendar::from_prices(&PriceSeries::default());
        assert!(cal.is_empty());
        assert_eq!(cal.anchor_index(d(1)), None);
    }
}
