//! TOML backtest configuration.
//!
//! A config file has six sections: `[backtest]` (instrument, dates, universe
//! filters), `[strategy]` (times, multipliers, tie break), `[selection]`,
//! `[entry]`, `[reentry]` and `[data]`. Everything is validated up front; any
//! error here is fatal before a single date is processed.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use strikelab_core::cascade::{CascadeConfig, ReentryPolicy};
use strikelab_core::domain::{Multipliers, OptionType};
use strikelab_core::entry_rule::EntryRule;
use strikelab_core::resolver::TieBreak;
use strikelab_core::selection::StrikeSelection;
use strikelab_core::strategy::StrategyParams;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Bounds on ATM strike steps accepted from a config.
pub const MIN_STRIKE_STEP: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
pub const MAX_STRIKE_STEP: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Largest accepted stoploss multiplier.
pub const MAX_STOPLOSS_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid time for {field}: '{value}'")]
    InvalidTime { field: &'static str, value: String },

    #[error("invalid date for {field}: '{value}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid decimal for {field}: '{value}'")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("unknown option type '{0}'")]
    UnknownOptionType(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// A decimal written either as a TOML number or a string.
///
/// Floats are converted through their shortest decimal representation, so
/// `0.1` becomes exactly `0.1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl DecimalValue {
    pub fn to_decimal(&self, field: &'static str) -> Result<Decimal, ConfigError> {
        let text = match self {
            DecimalValue::Int(i) => return Ok(Decimal::from(*i)),
            DecimalValue::Float(f) => f.to_string(),
            DecimalValue::Text(s) => s.trim().to_string(),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| ConfigError::InvalidDecimal { field, value: text })
    }
}

impl From<i64> for DecimalValue {
    fn from(v: i64) -> Self {
        DecimalValue::Int(v)
    }
}

impl From<f64> for DecimalValue {
    fn from(v: f64) -> Self {
        DecimalValue::Float(v)
    }
}

// ─── Sections ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub stock_name: String,
    pub start_date: String,
    pub end_date: String,
    /// Keep only rows whose `week_expiry` column equals this value.
    #[serde(default)]
    pub week_expiry: Option<i64>,
    /// Keep only rows whose `tr_segment` column equals this value.
    #[serde(default)]
    pub segment: Option<i64>,
    #[serde(default = "default_option_types")]
    pub option_types: Vec<String>,
}

fn default_option_types() -> Vec<String> {
    vec!["CE".into(), "PE".into()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    pub entry_time: String,
    pub squareoff_time: String,
    #[serde(default = "default_target_multiplier")]
    pub target_multiplier: DecimalValue,
    #[serde(default = "default_stoploss_multiplier")]
    pub stoploss_multiplier: DecimalValue,
    #[serde(default)]
    pub tie_break: TieBreak,
}

fn default_target_multiplier() -> DecimalValue {
    DecimalValue::Text("0.5".into())
}

fn default_stoploss_multiplier() -> DecimalValue {
    DecimalValue::Text("1.5".into())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    PremiumFloor,
    #[default]
    NearestPremium,
    AtTheMoney,
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSection {
    #[serde(default)]
    pub mode: SelectionMode,
    /// Premium level for `premium_floor` and `nearest_premium`.
    #[serde(default)]
    pub closest_val: Option<DecimalValue>,
    /// Strike step for `at_the_money`.
    #[serde(default)]
    pub step: Option<DecimalValue>,
    /// Strike for `fixed`.
    #[serde(default)]
    pub strike: Option<DecimalValue>,
}

impl Default for SelectionSection {
    fn default() -> Self {
        Self {
            mode: SelectionMode::NearestPremium,
            closest_val: Some(DecimalValue::Int(200)),
            step: None,
            strike: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRuleKind {
    #[default]
    AtEntryTime,
    OnPullback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntrySection {
    #[serde(default)]
    pub rule: EntryRuleKind,
    /// Pullback trigger as a fraction of the entry-time close.
    #[serde(default)]
    pub trigger_val: Option<DecimalValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReentrySection {
    #[serde(default)]
    pub policy: ReentryPolicy,
    #[serde(default)]
    pub max_legs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default)]
    pub options_csv: Option<PathBuf>,
    #[serde(default)]
    pub spot_csv: Option<PathBuf>,
    #[serde(default)]
    pub lot_size_csv: Option<PathBuf>,
    #[serde(default = "default_lot_size_column")]
    pub lot_size_column: String,
}

fn default_lot_size_column() -> String {
    "BankNifty".into()
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            options_csv: None,
            spot_csv: None,
            lot_size_csv: None,
            lot_size_column: default_lot_size_column(),
        }
    }
}

// ─── Top level ──────────────────────────────────────────────────────

/// Complete configuration for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    #[serde(default)]
    pub selection: SelectionSection,
    #[serde(default)]
    pub entry: EntrySection,
    #[serde(default)]
    pub reentry: ReentrySection,
    #[serde(default)]
    pub data: DataSection,
}

impl BacktestConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting without touching any data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (start, end) = self.date_range()?;
        if start > end {
            return Err(ConfigError::InvalidRange(format!(
                "start_date {start} is after end_date {end}"
            )));
        }
        self.to_params().map(|_| ())
    }

    /// Inclusive `(start, end)` dates.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), ConfigError> {
        Ok((
            parse_date("backtest.start_date", &self.backtest.start_date)?,
            parse_date("backtest.end_date", &self.backtest.end_date)?,
        ))
    }

    /// Build the immutable strategy parameters for the evaluation kernel.
    pub fn to_params(&self) -> Result<StrategyParams, ConfigError> {
        let entry_time = parse_time("strategy.entry_time", &self.strategy.entry_time)?;
        let squareoff_time = parse_time("strategy.squareoff_time", &self.strategy.squareoff_time)?;
        if entry_time >= squareoff_time {
            return Err(ConfigError::InvalidRange(format!(
                "entry_time {entry_time} must be before squareoff_time {squareoff_time}"
            )));
        }

        let multipliers = Multipliers {
            target: positive(
                "strategy.target_multiplier",
                &self.strategy.target_multiplier,
            )?,
            stoploss: positive(
                "strategy.stoploss_multiplier",
                &self.strategy.stoploss_multiplier,
            )?,
        };
        if multipliers.target >= Decimal::ONE || multipliers.stoploss <= Decimal::ONE {
            return Err(ConfigError::InvalidRange(
                "short premium needs target_multiplier < 1 < stoploss_multiplier".into(),
            ));
        }
        if multipliers.stoploss > MAX_STOPLOSS_MULTIPLIER {
            return Err(ConfigError::InvalidRange(format!(
                "stoploss_multiplier must be at most {MAX_STOPLOSS_MULTIPLIER}"
            )));
        }

        let mut option_types = Vec::with_capacity(self.backtest.option_types.len());
        for code in &self.backtest.option_types {
            let ot = OptionType::from_str(code)
                .map_err(|_| ConfigError::UnknownOptionType(code.clone()))?;
            if !option_types.contains(&ot) {
                option_types.push(ot);
            }
        }
        if option_types.is_empty() {
            return Err(ConfigError::Missing("backtest.option_types"));
        }

        let cascade = CascadeConfig {
            policy: self.reentry.policy,
            max_legs: self.reentry.max_legs,
        };
        if cascade.max_legs == Some(0) {
            return Err(ConfigError::InvalidRange("reentry.max_legs must be at least 1".into()));
        }

        Ok(StrategyParams {
            entry_time,
            squareoff_time,
            multipliers,
            selection: self.strike_selection()?,
            entry_rule: self.entry_rule()?,
            tie_break: self.strategy.tie_break,
            cascade,
            option_types,
        })
    }

    fn strike_selection(&self) -> Result<StrikeSelection, ConfigError> {
        let s = &self.selection;
        Ok(match s.mode {
            SelectionMode::PremiumFloor => StrikeSelection::PremiumFloor {
                min_premium: required_positive("selection.closest_val", s.closest_val.as_ref())?,
            },
            SelectionMode::NearestPremium => StrikeSelection::NearestPremium {
                target_premium: required_positive("selection.closest_val", s.closest_val.as_ref())?,
            },
            SelectionMode::AtTheMoney => {
                let step = required("selection.step", s.step.as_ref())?;
                if step < MIN_STRIKE_STEP || step > MAX_STRIKE_STEP {
                    return Err(ConfigError::InvalidRange(format!(
                        "selection.step must lie between {MIN_STRIKE_STEP} and {MAX_STRIKE_STEP}"
                    )));
                }
                StrikeSelection::AtTheMoney { step }
            }
            SelectionMode::Fixed => StrikeSelection::Fixed {
                strike: required("selection.strike", s.strike.as_ref())?,
            },
        })
    }

    fn entry_rule(&self) -> Result<EntryRule, ConfigError> {
        Ok(match self.entry.rule {
            EntryRuleKind::AtEntryTime => EntryRule::AtEntryTime,
            EntryRuleKind::OnPullback => {
                let trigger_multiplier = required("entry.trigger_val", self.entry.trigger_val.as_ref())?;
                if trigger_multiplier <= Decimal::ZERO || trigger_multiplier >= Decimal::ONE {
                    return Err(ConfigError::InvalidRange(
                        "entry.trigger_val must lie strictly between 0 and 1".into(),
                    ));
                }
                EntryRule::OnPullback { trigger_multiplier }
            }
        })
    }

    /// Deterministic hash of the full configuration.
    ///
    /// Two runs with identical configs share a run id.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

// ─── Parsing helpers ────────────────────────────────────────────────

/// Accepts `HH:MM:SS` or `HH:MM`.
pub fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    let v = value.trim();
    NaiveTime::parse_from_str(v, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(v, "%H:%M"))
        .map_err(|_| ConfigError::InvalidTime {
            field,
            value: value.to_string(),
        })
}

/// Accepts `YYYY-MM-DD` or `DD-MM-YYYY`.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    let v = value.trim();
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(v, "%d-%m-%Y"))
        .map_err(|_| ConfigError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

fn required(field: &'static str, value: Option<&DecimalValue>) -> Result<Decimal, ConfigError> {
    value.ok_or(ConfigError::Missing(field))?.to_decimal(field)
}

fn required_positive(field: &'static str, value: Option<&DecimalValue>) -> Result<Decimal, ConfigError> {
    positive(field, value.ok_or(ConfigError::Missing(field))?)
}

fn positive(field: &'static str, value: &DecimalValue) -> Result<Decimal, ConfigError> {
    let d = value.to_decimal(field)?;
    if d <= Decimal::ZERO {
        return Err(ConfigError::InvalidRange(format!("{field} must be positive")));
    }
    Ok(d)
}
