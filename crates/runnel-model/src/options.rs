//! `[OPTIONS]` section: units, infiltration method, horizon and step size.
//!
//! Keywords the runoff engine does not use (routing method, ponding,
//! report steps, ...) are accepted and ignored so that complete model files
//! written for full hydraulic solvers still load.

use std::fmt;

use crate::error::ModelError;
use crate::section::Row;

const SECTION: &str = "OPTIONS";

/// Default routing step in seconds when `ROUTING_STEP` is absent.
pub const DEFAULT_ROUTING_STEP_SECONDS: f64 = 20.0;

/// Unit system selected by `FLOW_UNITS`.
///
/// US customary flow units imply rainfall in in/hr, areas in acres and
/// lengths in feet; SI flow units imply mm/hr, hectares and metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlowUnits {
    /// Cubic feet per second.
    #[default]
    Cfs,
    /// US gallons per minute.
    Gpm,
    /// Million US gallons per day.
    Mgd,
    /// Cubic metres per second.
    Cms,
    /// Litres per second.
    Lps,
    /// Million litres per day.
    Mld,
}

impl FlowUnits {
    fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "CFS" => Some(Self::Cfs),
            "GPM" => Some(Self::Gpm),
            "MGD" => Some(Self::Mgd),
            "CMS" => Some(Self::Cms),
            "LPS" => Some(Self::Lps),
            "MLD" => Some(Self::Mld),
            _ => None,
        }
    }

    /// Whether these units belong to the SI system.
    pub fn is_metric(self) -> bool {
        matches!(self, Self::Cms | Self::Lps | Self::Mld)
    }

    /// Factor converting the base flow unit (cfs or cms) into these units.
    pub fn from_base_factor(self) -> f64 {
        match self {
            Self::Cfs | Self::Cms => 1.0,
            Self::Gpm => 448.831,
            Self::Mgd => 0.646317,
            Self::Lps => 1000.0,
            Self::Mld => 86.4,
        }
    }
}

impl fmt::Display for FlowUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cfs => "CFS",
            Self::Gpm => "GPM",
            Self::Mgd => "MGD",
            Self::Cms => "CMS",
            Self::Lps => "LPS",
            Self::Mld => "MLD",
        };
        f.write_str(s)
    }
}

/// Years a model date may name.
const YEAR_RANGE: std::ops::RangeInclusive<i64> = 1..=9999;

/// A calendar date and time of day, stored as seconds since 1970-01-01.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Timestamp {
    seconds: f64,
}

impl Timestamp {
    /// Build from calendar fields. Returns `None` for impossible dates and
    /// for years outside 1 to 9999.
    pub fn from_calendar(year: i64, month: u32, day: u32, seconds_of_day: f64) -> Option<Self> {
        if !YEAR_RANGE.contains(&year)
            || !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
        {
            return None;
        }
        if !(seconds_of_day.is_finite() && seconds_of_day >= 0.0) {
            return None;
        }
        let days = days_from_civil(year, month, day);
        Some(Self {
            seconds: days as f64 * 86_400.0 + seconds_of_day,
        })
    }

    /// Seconds since 1970-01-01 00:00:00.
    pub fn seconds(self) -> f64 {
        self.seconds
    }

    /// Seconds from `self` to `later`.
    pub fn seconds_until(self, later: Timestamp) -> f64 {
        later.seconds - self.seconds
    }
}

/// Days from 1970-01-01 to the given proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Parse `MM/DD/YYYY`.
fn parse_date(text: &str) -> Option<(i64, u32, u32)> {
    let mut parts = text.split('/');
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((year, month, day))
}

/// Parse a clock or duration value.
///
/// `H:MM` and `H:MM:SS` are read as hours, minutes and seconds; a bare
/// number is read in `bare_unit_seconds` (1 for seconds, 3600 for hours).
pub(crate) fn parse_duration(text: &str, bare_unit_seconds: f64) -> Option<f64> {
    if !text.contains(':') {
        let v: f64 = text.parse().ok()?;
        return (v.is_finite() && v >= 0.0).then_some(v * bare_unit_seconds);
    }
    let mut parts = text.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0.0,
    };
    if parts.next().is_some() {
        return None;
    }
    if hours < 0.0 || !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Parsed `[OPTIONS]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Flow units, which also select the unit system.
    pub flow_units: FlowUnits,
    /// Simulation start.
    pub start: Timestamp,
    /// Simulation end.
    pub end: Timestamp,
    /// Engine step size in seconds (`ROUTING_STEP`).
    pub routing_step_seconds: f64,
}

impl Default for Options {
    fn default() -> Self {
        // 01/01/2000 00:00 for one day, matching an options-free file.
        let start = Timestamp {
            seconds: days_from_civil(2000, 1, 1) as f64 * 86_400.0,
        };
        Self {
            flow_units: FlowUnits::Cfs,
            start,
            end: Timestamp {
                seconds: start.seconds + 86_400.0,
            },
            routing_step_seconds: DEFAULT_ROUTING_STEP_SECONDS,
        }
    }
}

impl Options {
    /// Simulation duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.start.seconds_until(self.end)
    }

    /// Build options from the rows of `[OPTIONS]`.
    pub fn from_rows(rows: &[Row]) -> Result<Self, ModelError> {
        let mut opts = Options::default();
        let mut start_date: Option<(i64, u32, u32)> = None;
        let mut start_time = 0.0;
        let mut end_date: Option<(i64, u32, u32)> = None;
        let mut end_time: Option<f64> = None;
        let mut start_text = String::from("01/01/2000");
        let mut end_text: Option<String> = None;

        for row in rows {
            let key = row.name().to_ascii_uppercase();
            let value = row.field(1).ok_or(ModelError::MissingField {
                section: SECTION,
                line: row.line,
                field: "option value",
            })?;
            let invalid = |reason: &str| ModelError::InvalidValue {
                section: SECTION,
                line: row.line,
                field: "option",
                reason: format!("{key} {reason}, got '{value}'"),
            };
            match key.as_str() {
                "FLOW_UNITS" => {
                    opts.flow_units =
                        FlowUnits::parse(value).ok_or_else(|| ModelError::UnsupportedOption {
                            line: row.line,
                            key: key.clone(),
                            value: value.to_string(),
                        })?;
                }
                "INFILTRATION" => {
                    if !value.eq_ignore_ascii_case("HORTON") {
                        return Err(ModelError::UnsupportedOption {
                            line: row.line,
                            key: key.clone(),
                            value: value.to_string(),
                        });
                    }
                }
                "START_DATE" => {
                    start_date = Some(parse_date(value).ok_or_else(|| invalid("expects MM/DD/YYYY"))?);
                    start_text = value.to_string();
                }
                "START_TIME" => {
                    start_time =
                        parse_duration(value, 3600.0).ok_or_else(|| invalid("expects HH:MM:SS"))?;
                }
                "END_DATE" => {
                    end_date = Some(parse_date(value).ok_or_else(|| invalid("expects MM/DD/YYYY"))?);
                    end_text = Some(value.to_string());
                }
                "END_TIME" => {
                    end_time =
                        Some(parse_duration(value, 3600.0).ok_or_else(|| invalid("expects HH:MM:SS"))?);
                }
                "ROUTING_STEP" => {
                    let step = parse_duration(value, 1.0)
                        .ok_or_else(|| invalid("expects seconds or HH:MM:SS"))?;
                    if step <= 0.0 {
                        return Err(invalid("must be positive"));
                    }
                    opts.routing_step_seconds = step;
                }
                _ => {
                    tracing::trace!(line = row.line, option = %key, "ignoring option");
                }
            }
        }

        let (sy, sm, sd) = start_date.unwrap_or((2000, 1, 1));
        opts.start = Timestamp::from_calendar(sy, sm, sd, start_time).ok_or_else(|| {
            ModelError::InvalidValue {
                section: SECTION,
                line: rows.first().map(|r| r.line).unwrap_or(0),
                field: "START_DATE",
                reason: format!("is not a calendar date: {start_text}"),
            }
        })?;
        opts.end = match (end_date, end_time) {
            (None, None) => Timestamp {
                seconds: opts.start.seconds + 86_400.0,
            },
            (date, time) => {
                let (ey, em, ed) = date.unwrap_or((sy, sm, sd));
                Timestamp::from_calendar(ey, em, ed, time.unwrap_or(0.0)).ok_or_else(|| {
                    ModelError::InvalidValue {
                        section: SECTION,
                        line: rows.first().map(|r| r.line).unwrap_or(0),
                        field: "END_DATE",
                        reason: format!(
                            "is not a calendar date: {}",
                            end_text.as_deref().unwrap_or(&start_text)
                        ),
                    }
                })?
            }
        };
        if opts.end.seconds <= opts.start.seconds {
            return Err(ModelError::EmptyHorizon {
                start: format!("{start_text} +{start_time}s"),
                end: format!(
                    "{} +{}s",
                    end_text.as_deref().unwrap_or(&start_text),
                    end_time.unwrap_or(0.0)
                ),
            });
        }
        Ok(opts)
    }
}
