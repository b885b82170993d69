/// Test fixtures: an in-memory `ClimateStore` and a small sample dataset.
///
/// The sample rows are taken from the tail of the Hawaii climate dataset
/// (last recorded date 2017-08-23) plus a few hand-placed rows around the
/// trailing-year boundary. `MemoryStore` answers the same six reads as
/// `PgClimateStore` with the same semantics: storage order, inclusive date
/// bounds, smallest-id tie-break for the most active station.

use crate::dates::ObservationDate;
use crate::model::{PrecipitationReading, TemperatureObservation, TemperatureStats};
use crate::store::{ClimateStore, StoreError};
use std::collections::BTreeMap;

/// One `measurement` row.
#[derive(Debug, Clone)]
pub(crate) struct MeasurementRow {
    pub station: &'static str,
    pub date: &'static str,
    pub prcp: Option<f64>,
    pub tobs: f64,
}

pub(crate) fn row(station: &'static str, date: &'static str, prcp: Option<f64>, tobs: f64) -> MeasurementRow {
    MeasurementRow { station, date, prcp, tobs }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStore {
    pub measurements: Vec<MeasurementRow>,
    pub stations: Vec<&'static str>,
}

impl MemoryStore {
    pub fn new(measurements: Vec<MeasurementRow>, stations: Vec<&'static str>) -> Self {
        Self { measurements, stations }
    }
}

impl ClimateStore for MemoryStore {
    fn most_recent_date(&mut self) -> Result<ObservationDate, StoreError> {
        let latest = self
            .measurements
            .iter()
            .map(|m| m.date)
            .max()
            .ok_or(StoreError::EmptyDataset)?;
        Ok(ObservationDate::parse(latest)?)
    }

    fn precipitation_since(&mut self, cutoff: ObservationDate) -> Result<Vec<PrecipitationReading>, StoreError> {
        let cutoff = cutoff.to_string();
        Ok(self
            .measurements
            .iter()
            .filter(|m| m.date >= cutoff.as_str())
            .map(|m| PrecipitationReading { date: m.date.to_string(), prcp: m.prcp })
            .collect())
    }

    fn all_station_ids(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.stations.iter().map(|s| s.to_string()).collect())
    }

    fn most_active_station(&mut self) -> Result<String, StoreError> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for m in &self.measurements {
            *counts.entry(m.station).or_default() += 1;
        }
        // BTreeMap iterates in id order; max_by_key keeps the last maximum,
        // so reverse to make the smallest id win ties
        counts
            .into_iter()
            .rev()
            .max_by_key(|(_, count)| *count)
            .map(|(station, _)| station.to_string())
            .ok_or(StoreError::EmptyDataset)
    }

    fn temperature_observations(
        &mut self,
        station: &str,
        cutoff: ObservationDate,
    ) -> Result<Vec<TemperatureObservation>, StoreError> {
        let cutoff = cutoff.to_string();
        Ok(self
            .measurements
            .iter()
            .filter(|m| m.station == station && m.date >= cutoff.as_str())
            .map(|m| TemperatureObservation { date: m.date.to_string(), tobs: m.tobs })
            .collect())
    }

    fn temperature_stats(
        &mut self,
        start: ObservationDate,
        end: Option<ObservationDate>,
    ) -> Result<Option<TemperatureStats>, StoreError> {
        let start = start.to_string();
        let end = end.map(|d| d.to_string());

        let tobs: Vec<f64> = self
            .measurements
            .iter()
            .filter(|m| m.date >= start.as_str())
            .filter(|m| end.as_deref().is_none_or(|end| m.date <= end))
            .map(|m| m.tobs)
            .collect();

        if tobs.is_empty() {
            return Ok(None);
        }

        let tmin = tobs.iter().copied().fold(f64::INFINITY, f64::min);
        let tmax = tobs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tavg = tobs.iter().sum::<f64>() / tobs.len() as f64;
        Ok(Some(TemperatureStats { tmin, tavg, tmax }))
    }
}

/// Sample dataset ending 2017-08-23.
///
/// - USC00519281 has the most rows (4), USC00519397 has 3, USC00516128 has 2.
/// - 2016-08-23 sits exactly on the trailing-year cutoff; 2016-08-22 is one
///   day before it.
/// - 2017-08-23 appears for three stations so the precipitation map has a
///   duplicate key.
pub(crate) fn hawaii_sample() -> MemoryStore {
    MemoryStore::new(
        vec![
            row("USC00519397", "2016-08-22", Some(0.40), 76.0),
            row("USC00519397", "2016-08-23", Some(0.00), 81.0),
            row("USC00519281", "2016-08-23", Some(1.79), 77.0),
            row("USC00519281", "2017-01-15", None, 66.0),
            row("USC00516128", "2017-05-01", Some(0.13), 72.0),
            row("USC00519281", "2017-08-18", Some(0.06), 79.0),
            row("USC00519281", "2017-08-23", Some(0.08), 76.0),
            row("USC00516128", "2017-08-23", Some(0.45), 76.0),
            row("USC00519397", "2017-08-23", Some(0.00), 81.0),
        ],
        vec!["USC00519397", "USC00513117", "USC00514830", "USC00517948", "USC00518838", "USC00519523", "USC00519281", "USC00511918", "USC00516128"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> ObservationDate {
        ObservationDate::parse(s).unwrap()
    }

    #[test]
    fn test_sample_most_recent_date() {
        assert_eq!(hawaii_sample().most_recent_date().unwrap(), date("2017-08-23"));
    }

    #[test]
    fn test_sample_most_active_station() {
        assert_eq!(hawaii_sample().most_active_station().unwrap(), "USC00519281");
    }

    #[test]
    fn test_tie_goes_to_smallest_station_id() {
        let mut store = MemoryStore::new(
            vec![
                row("USC00519397", "2017-01-01", None, 70.0),
                row("USC00511918", "2017-01-01", None, 70.0),
            ],
            vec![],
        );
        assert_eq!(store.most_active_station().unwrap(), "USC00511918");
    }

    #[test]
    fn test_empty_store() {
        let mut store = MemoryStore::default();
        assert!(matches!(store.most_recent_date(), Err(StoreError::EmptyDataset)));
        assert!(matches!(store.most_active_station(), Err(StoreError::EmptyDataset)));
        assert_eq!(store.temperature_stats(date("2017-01-01"), None).unwrap(), None);
    }
}
