//! Price and lot-size loading for the runner.
//!
//! Two sources:
//! 1. CSV exports of the intraday option table (`tr_date, tr_time, tr_open,
//!    tr_high, tr_low, tr_close, strike_price, otype[, week_expiry, tr_segment]`),
//!    the spot index table (`tr_date, tr_time, tr_close`) and the lot-size
//!    sheet (`Date, <column>`).
//! 2. Synthetic chains from a seeded random walk (`--synthetic`).
//!
//! Synthetic data is a developer-only debug mode. Results produced on it are
//! tagged as synthetic.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use strikelab_core::data::{DataError, InMemoryLoader, LotSizeTable, OptionChain, PriceSeriesLoader};
use strikelab_core::domain::{Bar, InstrumentKey, OptionType};

/// Row filters applied while reading the option table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniverseFilter {
    pub week_expiry: Option<i64>,
    pub segment: Option<i64>,
}

/// Option and spot bars loaded from CSV, grouped by date.
///
/// Chains are built lazily per date so a malformed day (duplicate bars, an
/// unparseable cell) only fails that day. Rows without a usable date cannot
/// be attributed to any day; they are dropped and counted.
#[derive(Debug, Default)]
pub struct CsvChainStore {
    bars: BTreeMap<NaiveDate, Vec<Bar>>,
    spot: HashMap<(NaiveDate, NaiveTime), Decimal>,
    /// First malformed option row per date, as `(line, reason)`.
    bad_option_rows: BTreeMap<NaiveDate, (u64, String)>,
    /// First malformed spot row per date, as `(line, reason)`.
    bad_spot_rows: BTreeMap<NaiveDate, (u64, String)>,
    skipped_rows: usize,
}

/// Column positions of the option table.
struct OptionColumns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    strike: usize,
    otype: usize,
    week_expiry: Option<usize>,
    segment: Option<usize>,
}

impl CsvChainStore {
    /// Load the option table and, if given, the spot table from disk.
    pub fn open(
        options_csv: &Path,
        spot_csv: Option<&Path>,
        filter: UniverseFilter,
    ) -> Result<Self, DataError> {
        let options = std::fs::File::open(options_csv)?;
        let mut store = Self::from_option_reader(options, filter)?;
        if let Some(path) = spot_csv {
            store.load_spot_reader(std::fs::File::open(path)?)?;
        }
        tracing::info!(
            path = %options_csv.display(),
            dates = store.bars.len(),
            bad_dates = store.bad_option_rows.len(),
            skipped_rows = store.skipped_rows,
            "loaded option table"
        );
        Ok(store)
    }

    /// Parse an option table from any reader.
    ///
    /// Fails only when the table as a whole is unusable (I/O error, missing
    /// column). Row-level problems are attached to the row's date.
    pub fn from_option_reader<R: Read>(reader: R, filter: UniverseFilter) -> Result<Self, DataError> {
        let mut rdr = csv_reader(reader);
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let col = |name: &str| column(&headers, name);

        let date_i = col("tr_date")?;
        let cols = OptionColumns {
            time: col("tr_time")?,
            open: col("tr_open")?,
            high: col("tr_high")?,
            low: col("tr_low")?,
            close: col("tr_close")?,
            strike: col("strike_price")?,
            otype: col("otype")?,
            week_expiry: filter.week_expiry.map(|_| col("week_expiry")).transpose()?,
            segment: filter.segment.map(|_| col("tr_segment")).transpose()?,
        };

        let mut store = Self::default();
        for record in rdr.records() {
            let Some(record) = store.readable(record)? else {
                continue;
            };
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let Some(date) = store.row_date(&record, date_i, line) else {
                continue;
            };

            match parse_option_row(&record, &cols, filter, date, line) {
                Ok(None) => {}
                Ok(Some(bar)) if !bar.is_sane() => {
                    tracing::warn!(line, instrument = %bar.key, time = %bar.time, "dropping inconsistent OHLC row");
                    store.skipped_rows += 1;
                }
                Ok(Some(bar)) => store.bars.entry(date).or_default().push(bar),
                Err(e) => record_bad_row(&mut store.bad_option_rows, date, line, e),
            }
        }
        Ok(store)
    }

    /// Merge a spot table (`tr_date, tr_time, tr_close`) into the store.
    pub fn load_spot_reader<R: Read>(&mut self, reader: R) -> Result<(), DataError> {
        let mut rdr = csv_reader(reader);
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let date_i = column(&headers, "tr_date")?;
        let time_i = column(&headers, "tr_time")?;
        let close_i = column(&headers, "tr_close")?;

        for record in rdr.records() {
            let Some(record) = self.readable(record)? else {
                continue;
            };
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let Some(date) = self.row_date(&record, date_i, line) else {
                continue;
            };
            let field = |i: usize| record.get(i).unwrap_or("");
            let parsed = parse_time(field(time_i), line)
                .and_then(|time| Ok((time, parse_decimal(field(close_i), line)?)));
            match parsed {
                Ok((time, close)) => {
                    self.spot.insert((date, time), close);
                }
                Err(e) => record_bad_row(&mut self.bad_spot_rows, date, line, e),
            }
        }
        Ok(())
    }

    /// Dates that have at least one option row, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .bars
            .keys()
            .chain(self.bad_option_rows.keys())
            .copied()
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// Deterministic BLAKE3 hash over every option bar, in date/key/time order.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (date, bars) in &self.bars {
            hasher.update(date.to_string().as_bytes());
            let mut sorted: Vec<&Bar> = bars.iter().collect();
            sorted.sort_by(|a, b| (a.key, a.time).cmp(&(b.key, b.time)));
            for bar in sorted {
                hasher.update(bar.key.to_string().as_bytes());
                hasher.update(bar.time.to_string().as_bytes());
                for price in [bar.open, bar.high, bar.low, bar.close] {
                    hasher.update(&price.serialize());
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Pass through a CSV record. I/O errors abort the load; an undecodable
    /// row is dropped and counted.
    fn readable(
        &mut self,
        record: Result<csv::StringRecord, csv::Error>,
    ) -> Result<Option<csv::StringRecord>, DataError> {
        match record {
            Ok(r) => Ok(Some(r)),
            Err(e) if e.is_io_error() => Err(csv_error(e)),
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable row");
                self.skipped_rows += 1;
                Ok(None)
            }
        }
    }

    /// The row's trading date, or `None` (dropped and counted) if it has none.
    fn row_date(&mut self, record: &csv::StringRecord, date_i: usize, line: u64) -> Option<NaiveDate> {
        match parse_date(record.get(date_i).unwrap_or(""), line) {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::warn!(line, error = %e, "dropping row without a usable date");
                self.skipped_rows += 1;
                None
            }
        }
    }
}

impl PriceSeriesLoader for CsvChainStore {
    fn name(&self) -> &str {
        "csv"
    }

    fn load_chain(&self, date: NaiveDate) -> Result<OptionChain, DataError> {
        if let Some((line, reason)) = self.bad_option_rows.get(&date) {
            return Err(DataError::Parse {
                line: *line,
                reason: reason.clone(),
            });
        }
        match self.bars.get(&date) {
            Some(bars) => OptionChain::from_bars(date, bars.clone()),
            None => Ok(OptionChain::empty()),
        }
    }

    fn load_spot(&self, date: NaiveDate, time: NaiveTime) -> Result<Option<Decimal>, DataError> {
        if let Some((line, reason)) = self.bad_spot_rows.get(&date) {
            return Err(DataError::Parse {
                line: *line,
                reason: format!("spot table: {reason}"),
            });
        }
        Ok(self.spot.get(&(date, time)).copied())
    }

    fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

/// Parse one option row. `Ok(None)` means the universe filter excluded it.
fn parse_option_row(
    record: &csv::StringRecord,
    cols: &OptionColumns,
    filter: UniverseFilter,
    date: NaiveDate,
    line: u64,
) -> Result<Option<Bar>, DataError> {
    let field = |i: usize| record.get(i).unwrap_or("");

    if let (Some(i), Some(want)) = (cols.week_expiry, filter.week_expiry) {
        if parse_int(field(i), line)? != want {
            return Ok(None);
        }
    }
    if let (Some(i), Some(want)) = (cols.segment, filter.segment) {
        if parse_int(field(i), line)? != want {
            return Ok(None);
        }
    }

    let option_type = OptionType::from_str(field(cols.otype)).map_err(|e| DataError::Parse {
        line,
        reason: e.to_string(),
    })?;
    Ok(Some(Bar {
        key: InstrumentKey::new(date, option_type, parse_decimal(field(cols.strike), line)?),
        time: parse_time(field(cols.time), line)?,
        open: parse_decimal(field(cols.open), line)?,
        high: parse_decimal(field(cols.high), line)?,
        low: parse_decimal(field(cols.low), line)?,
        close: parse_decimal(field(cols.close), line)?,
    }))
}

/// Keep the first bad row of `date`; later ones add nothing new.
fn record_bad_row(
    bad: &mut BTreeMap<NaiveDate, (u64, String)>,
    date: NaiveDate,
    line: u64,
    error: DataError,
) {
    let reason = match error {
        DataError::Parse { reason, .. } => reason,
        other => other.to_string(),
    };
    tracing::warn!(%date, line, %reason, "malformed row; date will be skipped");
    bad.entry(date).or_insert((line, reason));
}

// ─── Lot sizes ──────────────────────────────────────────────────────

/// Load a lot-size sheet with a `Date` column and one column per index.
///
/// Blank cells are skipped; the date has no lot size. Cells that are not a
/// whole number, and rows without a usable date, are logged and skipped the
/// same way.
pub fn load_lot_sizes(path: &Path, column_name: &str) -> Result<LotSizeTable, DataError> {
    let table = lot_sizes_from_reader(std::fs::File::open(path)?, column_name)?;
    tracing::info!(path = %path.display(), dates = table.len(), column = column_name, "loaded lot sizes");
    Ok(table)
}

pub fn lot_sizes_from_reader<R: Read>(reader: R, column_name: &str) -> Result<LotSizeTable, DataError> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let date_i = column(&headers, "Date")?;
    let size_i = column(&headers, column_name)?;

    let mut table = LotSizeTable::new();
    for record in rdr.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) if e.is_io_error() => return Err(csv_error(e)),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable lot-size row");
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw = record.get(size_i).unwrap_or("");
        if raw.is_empty() {
            continue;
        }
        let parsed = parse_date(record.get(date_i).unwrap_or(""), line)
            .and_then(|date| Ok((date, parse_lot_size(raw, line)?)));
        match parsed {
            Ok((date, lot)) => table.insert(date, lot),
            Err(e) => tracing::warn!(line, error = %e, "skipping lot-size row"),
        }
    }
    Ok(table)
}

fn parse_lot_size(raw: &str, line: u64) -> Result<u32, DataError> {
    let size = parse_decimal(raw, line)?;
    size.normalize()
        .to_u32()
        .filter(|_| size.fract().is_zero())
        .ok_or_else(|| DataError::Parse {
            line,
            reason: format!("lot size '{raw}' is not a whole number"),
        })
}

// ─── Synthetic data ─────────────────────────────────────────────────

/// Shape of a synthetic session.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticParams {
    pub spot_start: f64,
    pub strike_step: u32,
    pub strikes_each_side: u32,
    pub session_open: NaiveTime,
    pub minutes: u32,
    pub lot_size: u32,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            spot_start: 27_000.0,
            strike_step: 100,
            strikes_each_side: 10,
            session_open: NaiveTime::from_hms_opt(9, 15, 59).unwrap_or_default(),
            minutes: 375,
            lot_size: 20,
        }
    }
}

/// Synthetic option chains, spot and lot sizes for every weekday in `dates`.
///
/// Spot follows a minute-level random walk; each strike's premium is
/// intrinsic value plus a time value that decays through the session and
/// shrinks with distance from the money. Same seed, same data.
pub fn generate_synthetic_chain(
    dates: &[NaiveDate],
    params: &SyntheticParams,
    seed: u64,
) -> Result<(InMemoryLoader, LotSizeTable), DataError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let mut loader = InMemoryLoader::new();
    let mut lots = LotSizeTable::new();
    let mut spot = params.spot_start;
    let step = f64::from(params.strike_step);

    for &date in dates {
        let weekday = date.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            continue;
        }

        let atm = (spot / step).round() * step;
        let strikes: Vec<f64> = (-(params.strikes_each_side as i64)..=params.strikes_each_side as i64)
            .map(|i| atm + i as f64 * step)
            .collect();

        let mut bars = Vec::with_capacity(strikes.len() * 2 * params.minutes as usize);
        let mut prev: HashMap<(OptionType, i64), f64> = HashMap::new();

        for m in 0..params.minutes {
            let time = params.session_open + chrono::Duration::minutes(i64::from(m));
            spot *= 1.0 + rng.gen_range(-0.0008..0.0008);
            loader = loader.with_spot(date, time, to_price(spot)?);

            let decay = 1.0 - 0.6 * f64::from(m) / f64::from(params.minutes.max(1));
            for &strike in &strikes {
                for ot in OptionType::ALL {
                    let intrinsic = match ot {
                        OptionType::Call => (spot - strike).max(0.0),
                        OptionType::Put => (strike - spot).max(0.0),
                    };
                    let distance = ((spot - strike) / step).abs();
                    let time_value = 250.0 * decay * (-distance / 4.0).exp();
                    let close = (intrinsic + time_value).max(0.05);

                    let slot = (ot, strike as i64);
                    let open = prev.get(&slot).copied().unwrap_or(close);
                    let wiggle = 1.0 + rng.gen_range(0.0..0.03);
                    let high = open.max(close) * wiggle;
                    let low = (open.min(close) / wiggle).max(0.05);
                    prev.insert(slot, close);

                    bars.push(Bar {
                        key: InstrumentKey::new(date, ot, Decimal::from(strike as i64)),
                        time,
                        open: to_price(open)?,
                        high: to_price(high)?,
                        low: to_price(low)?,
                        close: to_price(close)?,
                    });
                }
            }
        }

        loader = loader.with_bars(date, bars)?;
        lots.insert(date, params.lot_size);
    }

    Ok((loader, lots))
}

fn to_price(x: f64) -> Result<Decimal, DataError> {
    Decimal::try_from(x)
        .map(|d| d.round_dp(2))
        .map_err(|e| DataError::Other(format!("synthetic price {x}: {e}")))
}

// ─── CSV helpers ────────────────────────────────────────────────────

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

fn csv_error(e: csv::Error) -> DataError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return DataError::Io(io);
        }
        return DataError::Other("csv I/O error".into());
    }
    DataError::Parse {
        line,
        reason: e.to_string(),
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| DataError::MissingColumn(name.to_string()))
}

fn parse_date(value: &str, line: u64) -> Result<NaiveDate, DataError> {
    // Some exports carry a midnight timestamp after the date.
    let v = value.split_whitespace().next().unwrap_or("");
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(v, "%d-%m-%Y"))
        .map_err(|_| DataError::Parse {
            line,
            reason: format!("invalid date '{value}'"),
        })
}

fn parse_time(value: &str, line: u64) -> Result<NaiveTime, DataError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| DataError::Parse {
            line,
            reason: format!("invalid time '{value}'"),
        })
}

fn parse_decimal(value: &str, line: u64) -> Result<Decimal, DataError> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| DataError::Parse {
            line,
            reason: format!("invalid number '{value}'"),
        })
}

fn parse_int(value: &str, line: u64) -> Result<i64, DataError> {
    let d = parse_decimal(value, line)?;
    d.trunc().to_i64().ok_or_else(|| DataError::Parse {
        line,
        reason: format!("invalid integer '{value}'"),
    })
}
