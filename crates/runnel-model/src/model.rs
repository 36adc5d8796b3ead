//! Validated model description consumed by the runoff engine.

use std::str::FromStr;

use crate::error::ModelError;
use crate::options::Options;
use crate::section::SectionMap;

/// How a rain gage reports rainfall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RainFormat {
    /// Average intensity over the recording interval.
    Intensity,
    /// Depth accumulated over the recording interval.
    Volume,
    /// Depth accumulated since the start of the record.
    Cumulative,
}

/// A rain gage from `[RAINGAGES]`.
///
/// When the bridge drives the engine, the forcing value replaces the
/// gage's recorded series; `format`, `interval_seconds` and `source` are
/// kept for reporting only.
#[derive(Clone, Debug, PartialEq)]
pub struct RainGage {
    /// Gage name.
    pub name: String,
    /// Recording format.
    pub format: RainFormat,
    /// Recording interval in seconds.
    pub interval_seconds: f64,
    /// Snow catch factor, applied to every rainfall value.
    pub snow_catch_factor: f64,
    /// Data source description (`TIMESERIES TS1`, `FILE ...`).
    pub source: String,
}

/// Where runoff from one subarea is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteTo {
    /// Both subareas drain straight to the outlet.
    Outlet,
    /// Pervious runoff is routed across the impervious subarea.
    Impervious,
    /// Impervious runoff is routed across the pervious subarea.
    Pervious,
}

/// Overland-flow parameters from `[SUBAREAS]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Subarea {
    /// Manning's n for the impervious subarea.
    pub n_imperv: f64,
    /// Manning's n for the pervious subarea.
    pub n_perv: f64,
    /// Depression storage on the impervious subarea (in or mm).
    pub s_imperv: f64,
    /// Depression storage on the pervious subarea (in or mm).
    pub s_perv: f64,
    /// Percent of impervious area with no depression storage.
    pub pct_zero: f64,
    /// Internal routing between subareas.
    pub route_to: RouteTo,
    /// Percent of runoff routed between subareas.
    pub pct_routed: f64,
}

/// Horton infiltration parameters from `[INFILTRATION]`.
#[derive(Clone, Debug, PartialEq)]
pub struct HortonParams {
    /// Maximum infiltration rate (in/hr or mm/hr).
    pub max_rate: f64,
    /// Minimum infiltration rate (in/hr or mm/hr).
    pub min_rate: f64,
    /// Decay constant (1/hr).
    pub decay: f64,
    /// Days for a fully saturated soil to dry completely.
    pub dry_time_days: f64,
    /// Maximum infiltration volume (in or mm); 0 means unlimited.
    pub max_infil: f64,
}

/// A subcatchment with its subarea and infiltration parameters resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct Subcatchment {
    /// Subcatchment name.
    pub name: String,
    /// Index into [`Model::gages`] of the rain gage.
    pub gage: usize,
    /// Outlet node or subcatchment name (not routed by the runoff engine).
    pub outlet: String,
    /// Area (acres or hectares).
    pub area: f64,
    /// Percent impervious.
    pub pct_imperv: f64,
    /// Characteristic overland flow width (ft or m).
    pub width: f64,
    /// Average surface slope, percent.
    pub slope: f64,
    /// Total curb length (any length unit).
    pub curb_length: f64,
    /// Overland-flow parameters.
    pub subarea: Subarea,
    /// Infiltration parameters.
    pub infiltration: HortonParams,
}

/// A loaded, cross-referenced model.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// First line of `[TITLE]`, if any.
    pub title: Option<String>,
    /// Simulation options.
    pub options: Options,
    /// Rain gages in file order.
    pub gages: Vec<RainGage>,
    /// Subcatchments in file order. Never empty.
    pub subcatchments: Vec<Subcatchment>,
}

impl Model {
    /// Parse and validate model text.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let sections = SectionMap::parse(text)?;
        crate::parse::build_model(&sections)
    }

    /// Index of the subcatchment named `name`.
    pub fn subcatchment_index(&self, name: &str) -> Option<usize> {
        self.subcatchments.iter().position(|s| s.name == name)
    }

    /// Index of the rain gage named `name`.
    pub fn gage_index(&self, name: &str) -> Option<usize> {
        self.gages.iter().position(|g| g.name == name)
    }
}

impl FromStr for Model {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::parse(s)
    }
}
