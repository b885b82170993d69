/// Shared data types for the climate API.
///
/// Row types returned by the store and the JSON bodies the endpoint emits.
/// Field names on the serialized types are part of the public API.

use serde::{Deserialize, Serialize};

/// One `(date, prcp)` row from the `measurement` table.
///
/// `prcp` is nullable in the source dataset; missing readings stay `None`
/// and serialize as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationReading {
    pub date: String,
    pub prcp: Option<f64>,
}

/// One `(date, tobs)` row for a single station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureObservation {
    pub date: String,
    pub tobs: f64,
}

/// Min / mean / max of `tobs` over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureStats {
    #[serde(rename = "TMIN")]
    pub tmin: f64,
    #[serde(rename = "TAVG")]
    pub tavg: f64,
    #[serde(rename = "TMAX")]
    pub tmax: f64,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorBody { error: message.into() }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
