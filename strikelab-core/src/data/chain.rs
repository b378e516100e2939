//! Option chain for one trading date.
//!
//! Groups a day's bars by instrument and keeps each series sorted by time.
//! Duplicate (instrument, time) pairs are rejected here so the resolver can
//! rely on at most one bar per time.

use super::provider::DataError;
use crate::domain::{Bar, InstrumentKey, OptionType};
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;

/// All option bars of one date, grouped per instrument.
#[derive(Debug, Clone, Default)]
pub struct OptionChain {
    series: BTreeMap<InstrumentKey, Vec<Bar>>,
}

impl OptionChain {
    /// An empty chain (no session that day).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Group `bars` into per-instrument series for `date`.
    pub fn from_bars(date: NaiveDate, bars: Vec<Bar>) -> Result<Self, DataError> {
        let mut series: BTreeMap<InstrumentKey, Vec<Bar>> = BTreeMap::new();
        for bar in bars {
            if bar.key.date != date {
                return Err(DataError::WrongDate {
                    expected: date,
                    found: bar.key.date,
                });
            }
            series.entry(bar.key).or_default().push(bar);
        }

        for (key, bars) in series.iter_mut() {
            bars.sort_by_key(|b| b.time);
            if let Some(pair) = bars.windows(2).find(|w| w[0].time == w[1].time) {
                return Err(DataError::DuplicateBar {
                    key: key.to_string(),
                    time: pair[0].time,
                });
            }
        }

        Ok(Self { series })
    }

    /// Time-ordered bars of one instrument (empty if unknown).
    pub fn series(&self, key: &InstrumentKey) -> &[Bar] {
        self.series.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Bars of `option_type` stamped exactly at `time`, ascending by strike.
    pub fn quotes_at(&self, option_type: OptionType, time: NaiveTime) -> Vec<&Bar> {
        self.series
            .iter()
            .filter(|(key, _)| key.option_type == option_type)
            .filter_map(|(_, bars)| {
                bars.binary_search_by_key(&time, |b| b.time)
                    .ok()
                    .map(|i| &bars[i])
            })
            .collect()
    }

    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentKey> {
        self.series.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total number of bars across all instruments.
    pub fn bar_count(&self) -> usize {
        self.series.values().map(|v| v.len()).sum()
    }
}
