/// HTTP endpoint for querying climate data
///
/// Read-only JSON API over the `measurement` and `station` tables.
///
/// Endpoints:
/// - GET /                         - HTML page listing the routes
/// - GET /api/v1.0/precipitation   - trailing-year precipitation, keyed by date
/// - GET /api/v1.0/stations        - station identifiers
/// - GET /api/v1.0/tobs            - trailing-year temperatures, most active station
/// - GET /api/v1.0/{start}         - TMIN/TAVG/TMAX from `start` onwards
/// - GET /api/v1.0/{start}/{end}   - TMIN/TAVG/TMAX for `start..=end`
/// - GET /health                   - Service health check
///
/// Request handling is split from the server loop: `handle_request` turns a
/// method and URL into an `ApiResponse` using whatever `ClimateStore` it is
/// given, and `start_endpoint_server` feeds it requests from tiny_http, one
/// worker thread and one database connection per store.

use crate::config::ServiceConfig;
use crate::dates::ObservationDate;
use crate::db::{self, DbConfigError};
use crate::model::{ErrorBody, TemperatureObservation, TemperatureStats};
use crate::store::{ClimateStore, PgClimateStore, StoreError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use threadpool::ThreadPool;
use tiny_http::{Header, Method, Server, StatusCode};

/// Prefix shared by all data routes.
pub const API_PREFIX: &str = "/api/v1.0/";

pub const INVALID_DATE_MESSAGE: &str = "Invalid date format. Use YYYY-MM-DD.";
pub const NO_DATA_MESSAGE: &str = "No data found for the given date range.";
pub const EMPTY_DATASET_MESSAGE: &str = "Measurement table is empty.";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

const JSON: &str = "application/json";
const HTML: &str = "text/html; charset=utf-8";

const AVAILABLE_ENDPOINTS: &[&str] = &[
    "/",
    "/api/v1.0/precipitation",
    "/api/v1.0/stations",
    "/api/v1.0/tobs",
    "/api/v1.0/{start}",
    "/api/v1.0/{start}/{end}",
    "/health",
];

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Climate Data API</title>
</head>
<body>
  <h1>Climate Data API</h1>
  <p>Precipitation and temperature observations from Hawaii weather stations.</p>
  <ol>
    <li>Precipitation: daily precipitation over the last year of recorded data.</li>
    <li>Stations: identifiers of every weather station in the dataset.</li>
    <li>Temperature observations: the last year of readings from the most active station.</li>
    <li>Temperature statistics: minimum, average and maximum temperature from a start date, or between a start and end date.</li>
  </ol>
  <h2>Available Routes</h2>
  <ul>
    <li><a href="/api/v1.0/precipitation">/api/v1.0/precipitation</a></li>
    <li><a href="/api/v1.0/stations">/api/v1.0/stations</a></li>
    <li><a href="/api/v1.0/tobs">/api/v1.0/tobs</a></li>
    <li>/api/v1.0/&lt;start&gt; (dates as YYYY-MM-DD)</li>
    <li>/api/v1.0/&lt;start&gt;/&lt;end&gt;</li>
  </ul>
</body>
</html>
"#;

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// A recognised request path. Date segments are kept raw (percent-decoded)
/// so that malformed dates produce 400 rather than 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Health,
    Precipitation,
    Stations,
    Tobs,
    StatsFrom { start: String },
    StatsRange { start: String, end: String },
}

/// Matches a request URL (query string ignored) against the route table.
pub fn parse_route(url: &str) -> Option<Route> {
    let path = url.split_once('?').map_or(url, |(path, _)| path);

    match path {
        "/" => return Some(Route::Landing),
        "/health" => return Some(Route::Health),
        _ => {}
    }

    let rest = path.strip_prefix(API_PREFIX)?;
    let segments: Vec<&str> = rest.split('/').collect();

    match segments.as_slice() {
        ["precipitation"] => Some(Route::Precipitation),
        ["stations"] => Some(Route::Stations),
        ["tobs"] => Some(Route::Tobs),
        [start] => Some(Route::StatsFrom { start: decode_segment(start) }),
        [start, end] => Some(Route::StatsRange {
            start: decode_segment(start),
            end: decode_segment(end),
        }),
        _ => None,
    }
}

/// Percent-decodes a path segment. Undecodable input is kept as-is; it can
/// never pass date validation anyway.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

// ---------------------------------------------------------------------------
// Responses and errors
// ---------------------------------------------------------------------------

/// A fully rendered response, independent of the HTTP server.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Result<Self, ApiError> {
        Ok(ApiResponse {
            status,
            content_type: JSON,
            body: serde_json::to_string(value)?,
        })
    }

    fn html(body: &str) -> Self {
        ApiResponse {
            status: 200,
            content_type: HTML,
            body: body.to_string(),
        }
    }

    /// Parses the body back into JSON; used by tests and diagnostics.
    pub fn json_body(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

/// Everything a handler can fail with, each mapped to a status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid date parameter '{0}'")]
    InvalidDate(String),

    #[error("no rows in the requested date range")]
    NoData,

    #[error("no route for path")]
    NotFound,

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("measurement table is empty")]
    EmptyDataset,

    #[error(transparent)]
    Store(StoreError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EmptyDataset => ApiError::EmptyDataset,
            other => ApiError::Store(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::InvalidDate(_) => 400,
            ApiError::NoData | ApiError::NotFound => 404,
            ApiError::MethodNotAllowed(_) => 405,
            ApiError::EmptyDataset | ApiError::Store(_) | ApiError::Serialize(_) => 500,
        }
    }

    /// Renders the error as a JSON body. Server-side failures are logged here
    /// and reported to the client without detail.
    pub fn into_response(self) -> ApiResponse {
        let status = self.status();
        let body = match &self {
            ApiError::InvalidDate(_) => json_error(INVALID_DATE_MESSAGE),
            ApiError::NoData => json_error(NO_DATA_MESSAGE),
            ApiError::NotFound => serde_json::json!({
                "error": "Not found",
                "available_endpoints": AVAILABLE_ENDPOINTS,
            }),
            ApiError::MethodNotAllowed(_) => json_error("Method not allowed"),
            ApiError::EmptyDataset => {
                log::error!("Query needs at least one measurement row: {}", self);
                json_error(EMPTY_DATASET_MESSAGE)
            }
            ApiError::Store(_) | ApiError::Serialize(_) => {
                log::error!("Request failed: {}", self);
                json_error(INTERNAL_ERROR_MESSAGE)
            }
        };

        ApiResponse {
            status,
            content_type: JSON,
            body: body.to_string(),
        }
    }
}

fn json_error(message: &str) -> Value {
    serde_json::json!(ErrorBody::new(message))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Routes and answers one request against `store`.
pub fn handle_request<S: ClimateStore + ?Sized>(store: &mut S, method: &Method, url: &str) -> ApiResponse {
    let result = if *method != Method::Get {
        Err(ApiError::MethodNotAllowed(method.clone()))
    } else {
        match parse_route(url) {
            Some(route) => dispatch(store, route),
            None => Err(ApiError::NotFound),
        }
    };

    result.unwrap_or_else(ApiError::into_response)
}

fn dispatch<S: ClimateStore + ?Sized>(store: &mut S, route: Route) -> Result<ApiResponse, ApiError> {
    match route {
        Route::Landing => Ok(ApiResponse::html(LANDING_PAGE)),
        Route::Health => handle_health(),
        Route::Precipitation => ApiResponse::json(200, &precipitation(store)?),
        Route::Stations => ApiResponse::json(200, &store.all_station_ids()?),
        Route::Tobs => ApiResponse::json(200, &tobs(store)?),
        Route::StatsFrom { start } => {
            log::debug!("Received start date: {}", start);
            let start = parse_date(&start)?;
            ApiResponse::json(200, &temperature_stats(store, start, None)?)
        }
        Route::StatsRange { start, end } => {
            log::debug!("Received start date: {} and end date: {}", start, end);
            let start = parse_date(&start)?;
            let end = parse_date(&end)?;
            ApiResponse::json(200, &temperature_stats(store, start, Some(end))?)
        }
    }
}

/// Handle /health endpoint
fn handle_health() -> Result<ApiResponse, ApiError> {
    ApiResponse::json(
        200,
        &serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn parse_date(raw: &str) -> Result<ObservationDate, ApiError> {
    ObservationDate::parse(raw).map_err(|_| ApiError::InvalidDate(raw.to_string()))
}

/// Trailing-year precipitation as a `date -> prcp` map.
///
/// Several stations report the same date; later rows overwrite earlier ones.
pub fn precipitation<S: ClimateStore + ?Sized>(store: &mut S) -> Result<Map<String, Value>, ApiError> {
    let cutoff = store.most_recent_date()?.trailing_year_cutoff();
    let readings = store.precipitation_since(cutoff)?;

    let mut by_date = Map::new();
    for reading in readings {
        by_date.insert(reading.date, serde_json::json!(reading.prcp));
    }
    Ok(by_date)
}

/// Trailing-year temperature observations for the most active station.
pub fn tobs<S: ClimateStore + ?Sized>(store: &mut S) -> Result<Vec<TemperatureObservation>, ApiError> {
    let station = store.most_active_station()?;
    let cutoff = store.most_recent_date()?.trailing_year_cutoff();
    log::debug!("Most active station {}, observations since {}", station, cutoff);
    Ok(store.temperature_observations(&station, cutoff)?)
}

/// TMIN/TAVG/TMAX for a date range; `NoData` when nothing matches.
pub fn temperature_stats<S: ClimateStore + ?Sized>(
    store: &mut S,
    start: ObservationDate,
    end: Option<ObservationDate>,
) -> Result<TemperatureStats, ApiError> {
    store.temperature_stats(start, end)?.ok_or(ApiError::NoData)
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Failed to start HTTP server on {address}: {message}")]
    Bind { address: String, message: String },

    #[error(transparent)]
    Database(#[from] DbConfigError),
}

/// Start the HTTP endpoint server and block serving requests.
///
/// Opens `server.workers` database connections up front (the first one also
/// verifies the schema), so a bad `DATABASE_URL` fails here rather than on
/// the first request.
pub fn start_endpoint_server(config: &ServiceConfig) -> Result<(), EndpointError> {
    let schema = &config.database.schema;
    let workers = config.server.workers;

    let mut stores = Vec::with_capacity(workers);
    stores.push(PgClimateStore::new(db::connect_and_verify(schema)?, schema));
    for _ in 1..workers {
        stores.push(PgClimateStore::new(db::connect_with_validation()?, schema));
    }
    log::info!("Opened {} database connections (schema '{}')", workers, schema);

    let address = config.listen_address();
    let server = Server::http(&address).map_err(|e| EndpointError::Bind {
        address: address.clone(),
        message: e.to_string(),
    })?;
    let server = Arc::new(server);

    log::info!("HTTP endpoint listening on http://{}", address);
    for endpoint in AVAILABLE_ENDPOINTS {
        log::info!("   GET {}", endpoint);
    }

    let pool = ThreadPool::with_name("climate-http".to_string(), workers);
    for (worker, store) in stores.into_iter().enumerate() {
        let server = Arc::clone(&server);
        pool.execute(move || serve_requests(worker, &server, store));
    }
    pool.join();

    Ok(())
}

/// Worker loop: pull requests off the shared listener until it shuts down.
fn serve_requests<S: ClimateStore>(worker: usize, server: &Server, mut store: S) {
    for request in server.incoming_requests() {
        let response = handle_request(&mut store, request.method(), request.url());
        log::info!(
            "[worker {}] {} {} -> {}",
            worker,
            request.method(),
            request.url(),
            response.status
        );

        if let Err(e) = request.respond(to_http_response(response)) {
            log::warn!("Failed to send response: {}", e);
        }
    }
}

/// Create HTTP response from a rendered `ApiResponse`
fn to_http_response(response: ApiResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let mut http = tiny_http::Response::from_data(response.body.into_bytes())
        .with_status_code(StatusCode(response.status));

    match Header::from_bytes(&b"Content-Type"[..], response.content_type.as_bytes()) {
        Ok(header) => http.add_header(header),
        Err(()) => log::warn!("Invalid content type header: {}", response.content_type),
    }
    http
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
