//! Typed construction of a [`Model`] from tokenized sections.

use std::collections::HashMap;

use crate::error::ModelError;
use crate::model::{HortonParams, Model, RainFormat, RainGage, RouteTo, Subarea, Subcatchment};
use crate::options::{parse_duration, Options};
use crate::section::{Row, SectionMap};

/// Column accessors bound to one row of one section.
struct Cols<'a> {
    section: &'static str,
    row: &'a Row,
}

impl<'a> Cols<'a> {
    fn new(section: &'static str, row: &'a Row) -> Self {
        Self { section, row }
    }

    fn text(&self, index: usize, field: &'static str) -> Result<&'a str, ModelError> {
        self.row.field(index).ok_or(ModelError::MissingField {
            section: self.section,
            line: self.row.line,
            field,
        })
    }

    fn number(&self, index: usize, field: &'static str) -> Result<f64, ModelError> {
        let text = self.text(index, field)?;
        self.parse_number(text, field)
    }

    fn number_or(&self, index: usize, field: &'static str, default: f64) -> Result<f64, ModelError> {
        match self.row.field(index) {
            Some(text) => self.parse_number(text, field),
            None => Ok(default),
        }
    }

    fn parse_number(&self, text: &str, field: &'static str) -> Result<f64, ModelError> {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ModelError::InvalidNumber {
                section: self.section,
                line: self.row.line,
                field,
                value: text.to_string(),
            })
    }

    fn invalid(&self, field: &'static str, reason: String) -> ModelError {
        ModelError::InvalidValue {
            section: self.section,
            line: self.row.line,
            field,
            reason,
        }
    }

    fn positive(&self, value: f64, field: &'static str) -> Result<f64, ModelError> {
        if value > 0.0 {
            Ok(value)
        } else {
            Err(self.invalid(field, format!("must be positive, got {value}")))
        }
    }

    fn non_negative(&self, value: f64, field: &'static str) -> Result<f64, ModelError> {
        if value >= 0.0 {
            Ok(value)
        } else {
            Err(self.invalid(field, format!("must not be negative, got {value}")))
        }
    }

    fn percent(&self, value: f64, field: &'static str) -> Result<f64, ModelError> {
        if (0.0..=100.0).contains(&value) {
            Ok(value)
        } else {
            Err(self.invalid(field, format!("must be between 0 and 100, got {value}")))
        }
    }
}

pub(crate) fn build_model(sections: &SectionMap) -> Result<Model, ModelError> {
    let options = Options::from_rows(sections.rows("OPTIONS"))?;
    let title = sections
        .rows("TITLE")
        .first()
        .map(|row| row.fields.join(" "));

    let subcatch_rows = sections.rows("SUBCATCHMENTS");
    if subcatch_rows.is_empty() {
        return Err(ModelError::NoSubcatchments);
    }
    if sections.rows("RAINGAGES").is_empty() {
        return Err(ModelError::MissingSection {
            section: "RAINGAGES",
        });
    }

    let gages = parse_gages(sections.rows("RAINGAGES"))?;
    let gage_index: HashMap<&str, usize> = gages
        .iter()
        .enumerate()
        .map(|(i, g)| (g.name.as_str(), i))
        .collect();

    let mut pending = Vec::with_capacity(subcatch_rows.len());
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for row in subcatch_rows {
        let c = Cols::new("SUBCATCHMENTS", row);
        let name = row.name().to_string();
        let gage_name = c.text(1, "rain gage")?;
        let gage = *gage_index
            .get(gage_name)
            .ok_or_else(|| ModelError::UnknownReference {
                section: "SUBCATCHMENTS",
                line: row.line,
                kind: "rain gage",
                name: gage_name.to_string(),
            })?;
        let outlet = c.text(2, "outlet")?.to_string();
        let area = c.positive(c.number(3, "area")?, "area")?;
        let pct_imperv = c.percent(c.number(4, "percent impervious")?, "percent impervious")?;
        let width = c.positive(c.number(5, "width")?, "width")?;
        let slope = c.positive(c.number(6, "slope")?, "slope")?;
        let curb_length = c.non_negative(c.number_or(7, "curb length", 0.0)?, "curb length")?;

        if by_name.insert(name.clone(), pending.len()).is_some() {
            return Err(ModelError::DuplicateName {
                section: "SUBCATCHMENTS",
                line: row.line,
                name,
            });
        }
        pending.push(PendingSubcatchment {
            name,
            gage,
            outlet,
            area,
            pct_imperv,
            width,
            slope,
            curb_length,
            subarea: None,
            infiltration: None,
        });
    }

    for row in sections.rows("SUBAREAS") {
        let idx = lookup(&by_name, "SUBAREAS", row)?;
        let subarea = parse_subarea(row)?;
        let slot = &mut pending[idx].subarea;
        if slot.is_some() {
            return Err(duplicate("SUBAREAS", row));
        }
        *slot = Some(subarea);
    }

    for row in sections.rows("INFILTRATION") {
        let idx = lookup(&by_name, "INFILTRATION", row)?;
        let params = parse_horton(row)?;
        let slot = &mut pending[idx].infiltration;
        if slot.is_some() {
            return Err(duplicate("INFILTRATION", row));
        }
        *slot = Some(params);
    }

    let subcatchments = pending
        .into_iter()
        .map(PendingSubcatchment::finish)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        gages = gages.len(),
        subcatchments = subcatchments.len(),
        "model parsed"
    );

    Ok(Model {
        title,
        options,
        gages,
        subcatchments,
    })
}

struct PendingSubcatchment {
    name: String,
    gage: usize,
    outlet: String,
    area: f64,
    pct_imperv: f64,
    width: f64,
    slope: f64,
    curb_length: f64,
    subarea: Option<Subarea>,
    infiltration: Option<HortonParams>,
}

impl PendingSubcatchment {
    fn finish(self) -> Result<Subcatchment, ModelError> {
        let subarea = self.subarea.ok_or_else(|| ModelError::MissingEntry {
            section: "SUBAREAS",
            name: self.name.clone(),
        })?;
        let infiltration = self.infiltration.ok_or_else(|| ModelError::MissingEntry {
            section: "INFILTRATION",
            name: self.name.clone(),
        })?;
        Ok(Subcatchment {
            name: self.name,
            gage: self.gage,
            outlet: self.outlet,
            area: self.area,
            pct_imperv: self.pct_imperv,
            width: self.width,
            slope: self.slope,
            curb_length: self.curb_length,
            subarea,
            infiltration,
        })
    }
}

fn lookup(
    by_name: &HashMap<String, usize>,
    section: &'static str,
    row: &Row,
) -> Result<usize, ModelError> {
    by_name
        .get(row.name())
        .copied()
        .ok_or_else(|| ModelError::UnknownReference {
            section,
            line: row.line,
            kind: "subcatchment",
            name: row.name().to_string(),
        })
}

fn duplicate(section: &'static str, row: &Row) -> ModelError {
    ModelError::DuplicateName {
        section,
        line: row.line,
        name: row.name().to_string(),
    }
}

fn parse_gages(rows: &[Row]) -> Result<Vec<RainGage>, ModelError> {
    let mut gages: Vec<RainGage> = Vec::with_capacity(rows.len());
    for row in rows {
        let c = Cols::new("RAINGAGES", row);
        let format_text = c.text(1, "rain format")?;
        let format = match format_text.to_ascii_uppercase().as_str() {
            "INTENSITY" => RainFormat::Intensity,
            "VOLUME" => RainFormat::Volume,
            "CUMULATIVE" => RainFormat::Cumulative,
            _ => {
                return Err(c.invalid(
                    "rain format",
                    format!("must be INTENSITY, VOLUME or CUMULATIVE, got {format_text}"),
                ))
            }
        };
        let interval_text = c.text(2, "recording interval")?;
        let interval_seconds = parse_duration(interval_text, 3600.0)
            .filter(|s| *s > 0.0)
            .ok_or_else(|| {
                c.invalid(
                    "recording interval",
                    format!("must be a positive duration, got {interval_text}"),
                )
            })?;
        let snow_catch_factor =
            c.positive(c.number_or(3, "snow catch factor", 1.0)?, "snow catch factor")?;
        let source = row.fields.get(4..).map(|f| f.join(" ")).unwrap_or_default();

        if gages.iter().any(|g| g.name == row.name()) {
            return Err(duplicate("RAINGAGES", row));
        }
        gages.push(RainGage {
            name: row.name().to_string(),
            format,
            interval_seconds,
            snow_catch_factor,
            source,
        });
    }
    Ok(gages)
}

fn parse_subarea(row: &Row) -> Result<Subarea, ModelError> {
    let c = Cols::new("SUBAREAS", row);
    let n_imperv = c.positive(c.number(1, "N-Imperv")?, "N-Imperv")?;
    let n_perv = c.positive(c.number(2, "N-Perv")?, "N-Perv")?;
    let s_imperv = c.non_negative(c.number(3, "S-Imperv")?, "S-Imperv")?;
    let s_perv = c.non_negative(c.number(4, "S-Perv")?, "S-Perv")?;
    let pct_zero = c.percent(c.number(5, "PctZero")?, "PctZero")?;
    let route_to = match row.field(6).map(str::to_ascii_uppercase).as_deref() {
        None | Some("OUTLET") => RouteTo::Outlet,
        Some("IMPERVIOUS") => RouteTo::Impervious,
        Some("PERVIOUS") => RouteTo::Pervious,
        Some(other) => {
            return Err(c.invalid(
                "RouteTo",
                format!("must be OUTLET, IMPERVIOUS or PERVIOUS, got {other}"),
            ))
        }
    };
    let pct_routed = c.percent(c.number_or(7, "PctRouted", 100.0)?, "PctRouted")?;
    Ok(Subarea {
        n_imperv,
        n_perv,
        s_imperv,
        s_perv,
        pct_zero,
        route_to,
        pct_routed,
    })
}

fn parse_horton(row: &Row) -> Result<HortonParams, ModelError> {
    let c = Cols::new("INFILTRATION", row);
    let max_rate = c.non_negative(c.number(1, "MaxRate")?, "MaxRate")?;
    let min_rate = c.non_negative(c.number(2, "MinRate")?, "MinRate")?;
    if min_rate > max_rate {
        return Err(c.invalid(
            "MinRate",
            format!("must not exceed MaxRate {max_rate}, got {min_rate}"),
        ));
    }
    let decay = c.non_negative(c.number(3, "Decay")?, "Decay")?;
    let dry_time_days = c.positive(c.number(4, "DryTime")?, "DryTime")?;
    let max_infil = c.non_negative(c.number_or(5, "MaxInfil", 0.0)?, "MaxInfil")?;
    Ok(HortonParams {
        max_rate,
        min_rate,
        decay,
        dry_time_days,
        max_infil,
    })
}
