/// Read-only queries over the climate tables.
///
/// `ClimateStore` is the seam between the HTTP layer and the database: the
/// endpoint is written against the trait and each server worker hands it a
/// `PgClimateStore` wrapping that worker's own connection.
///
/// All date filtering is string comparison on the `date` column, which holds
/// zero-padded ISO dates and therefore sorts in calendar order.
///
/// Numeric columns are read as `col::text::float8`. Going through the
/// shortest text form keeps a `real` value like 0.13 as 0.13 instead of the
/// widened 0.12999999523162842; `double precision` and `numeric` round-trip
/// unchanged.

use crate::dates::{InvalidDate, ObservationDate};
use crate::model::{PrecipitationReading, TemperatureObservation, TemperatureStats};
use crate::schema::{MEASUREMENT_TABLE, STATION_TABLE};
use postgres::Client;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The measurement table has no rows, so there is no "most recent" anything
    #[error("measurement table is empty")]
    EmptyDataset,

    #[error("database query failed: {0}")]
    Query(#[from] postgres::Error),

    /// A stored `date` value is not `YYYY-MM-DD`
    #[error("stored date is malformed: {0}")]
    MalformedDate(#[from] InvalidDate),
}

/// The six reads the API is built on.
pub trait ClimateStore {
    /// Latest `date` in the measurement table.
    fn most_recent_date(&mut self) -> Result<ObservationDate, StoreError>;

    /// Every `(date, prcp)` row on or after `cutoff`, in storage order.
    fn precipitation_since(
        &mut self,
        cutoff: ObservationDate,
    ) -> Result<Vec<PrecipitationReading>, StoreError>;

    /// Station identifiers in table order.
    fn all_station_ids(&mut self) -> Result<Vec<String>, StoreError>;

    /// Station with the most measurement rows; ties go to the smallest id.
    fn most_active_station(&mut self) -> Result<String, StoreError>;

    /// `(date, tobs)` rows for one station on or after `cutoff`.
    fn temperature_observations(
        &mut self,
        station: &str,
        cutoff: ObservationDate,
    ) -> Result<Vec<TemperatureObservation>, StoreError>;

    /// Min/avg/max `tobs` with `start <= date` and, if given, `date <= end`.
    ///
    /// `None` when no rows match.
    fn temperature_stats(
        &mut self,
        start: ObservationDate,
        end: Option<ObservationDate>,
    ) -> Result<Option<TemperatureStats>, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// `ClimateStore` over a single PostgreSQL connection.
///
/// The schema name is interpolated into SQL, so it must already have passed
/// `config::is_sql_identifier` (guaranteed by `ServiceConfig` and
/// `db::verify_schema`).
pub struct PgClimateStore {
    client: Client,
    measurement: String,
    station: String,
}

impl PgClimateStore {
    pub fn new(client: Client, schema: &str) -> Self {
        Self {
            client,
            measurement: format!("{}.{}", schema, MEASUREMENT_TABLE),
            station: format!("{}.{}", schema, STATION_TABLE),
        }
    }
}

impl ClimateStore for PgClimateStore {
    fn most_recent_date(&mut self) -> Result<ObservationDate, StoreError> {
        let row = self.client.query_one(
            &format!("SELECT MAX(date)::text FROM {}", self.measurement),
            &[],
        )?;

        let latest: Option<String> = row.get(0);
        let latest = latest.ok_or(StoreError::EmptyDataset)?;
        Ok(ObservationDate::parse(&latest)?)
    }

    fn precipitation_since(
        &mut self,
        cutoff: ObservationDate,
    ) -> Result<Vec<PrecipitationReading>, StoreError> {
        let rows = self.client.query(
            &format!(
                "SELECT date::text, prcp::text::float8 FROM {} WHERE date >= $1",
                self.measurement
            ),
            &[&cutoff.to_string()],
        )?;

        Ok(rows
            .iter()
            .map(|row| PrecipitationReading {
                date: row.get(0),
                prcp: row.get(1),
            })
            .collect())
    }

    fn all_station_ids(&mut self) -> Result<Vec<String>, StoreError> {
        let rows = self
            .client
            .query(&format!("SELECT station::text FROM {}", self.station), &[])?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn most_active_station(&mut self) -> Result<String, StoreError> {
        let rows = self.client.query(
            &format!(
                "SELECT station::text
                 FROM {}
                 GROUP BY station
                 ORDER BY COUNT(*) DESC, station ASC
                 LIMIT 1",
                self.measurement
            ),
            &[],
        )?;

        rows.first()
            .map(|row| row.get(0))
            .ok_or(StoreError::EmptyDataset)
    }

    fn temperature_observations(
        &mut self,
        station: &str,
        cutoff: ObservationDate,
    ) -> Result<Vec<TemperatureObservation>, StoreError> {
        let rows = self.client.query(
            &format!(
                "SELECT date::text, tobs::text::float8
                 FROM {}
                 WHERE station = $1 AND date >= $2 AND tobs IS NOT NULL",
                self.measurement
            ),
            &[&station, &cutoff.to_string()],
        )?;

        Ok(rows
            .iter()
            .map(|row| TemperatureObservation {
                date: row.get(0),
                tobs: row.get(1),
            })
            .collect())
    }

    fn temperature_stats(
        &mut self,
        start: ObservationDate,
        end: Option<ObservationDate>,
    ) -> Result<Option<TemperatureStats>, StoreError> {
        // A NULL upper bound disables the end filter
        let row = self.client.query_one(
            &format!(
                "SELECT MIN(tobs)::text::float8, AVG(tobs::text::float8), MAX(tobs)::text::float8
                 FROM {}
                 WHERE date >= $1 AND ($2::text IS NULL OR date <= $2::text)",
                self.measurement
            ),
            &[&start.to_string(), &end.map(|d| d.to_string())],
        )?;

        let tmin: Option<f64> = row.get(0);
        let tavg: Option<f64> = row.get(1);
        let tmax: Option<f64> = row.get(2);

        Ok(match (tmin, tavg, tmax) {
            (Some(tmin), Some(tavg), Some(tmax)) => Some(TemperatureStats { tmin, tavg, tmax }),
            _ => None,
        })
    }
}
