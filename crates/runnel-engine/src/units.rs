//! Conversions between user units and the engine's internal units.
//!
//! Internally the engine works in feet (US customary) or metres (SI) and
//! seconds: depths in ft or m, rates in ft/s or m/s, areas in ft² or m²,
//! flows in cfs or cms. The unit system follows `FLOW_UNITS`.

use runnel_model::FlowUnits;

const SECONDS_PER_HOUR: f64 = 3600.0;
const INCHES_PER_FOOT: f64 = 12.0;
const MM_PER_METRE: f64 = 1000.0;
const SQFT_PER_ACRE: f64 = 43_560.0;
const SQM_PER_HECTARE: f64 = 10_000.0;

/// Unit conversions for one model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Units {
    flow_units: FlowUnits,
}

impl Units {
    /// Units implied by the model's flow units.
    pub fn new(flow_units: FlowUnits) -> Self {
        Self { flow_units }
    }

    /// The configured flow units.
    pub fn flow_units(self) -> FlowUnits {
        self.flow_units
    }

    /// Whether the model uses SI units.
    pub fn is_metric(self) -> bool {
        self.flow_units.is_metric()
    }

    fn depth_per_length(self) -> f64 {
        if self.is_metric() {
            MM_PER_METRE
        } else {
            INCHES_PER_FOOT
        }
    }

    /// Rainfall or infiltration rate: in/hr or mm/hr to ft/s or m/s.
    pub fn rate_to_internal(self, rate: f64) -> f64 {
        rate / self.depth_per_length() / SECONDS_PER_HOUR
    }

    /// Rate: ft/s or m/s to in/hr or mm/hr.
    pub fn rate_from_internal(self, rate: f64) -> f64 {
        rate * self.depth_per_length() * SECONDS_PER_HOUR
    }

    /// Depth: in or mm to ft or m.
    pub fn depth_to_internal(self, depth: f64) -> f64 {
        depth / self.depth_per_length()
    }

    /// Depth: ft or m to in or mm.
    pub fn depth_from_internal(self, depth: f64) -> f64 {
        depth * self.depth_per_length()
    }

    /// Area: acres or hectares to ft² or m².
    pub fn area_to_internal(self, area: f64) -> f64 {
        if self.is_metric() {
            area * SQM_PER_HECTARE
        } else {
            area * SQFT_PER_ACRE
        }
    }

    /// Flow: cfs or cms to the configured flow units.
    pub fn flow_from_internal(self, flow: f64) -> f64 {
        flow * self.flow_units.from_base_factor()
    }

    /// Manning's equation coefficient (1.49 in US units, 1.0 in SI).
    pub fn manning_factor(self) -> f64 {
        if self.is_metric() {
            1.0
        } else {
            1.49
        }
    }
}
