/// Static description of the tables this service reads.
///
/// The dataset is loaded by an external process, so nothing here creates
/// tables. At startup the columns reported by `information_schema.columns`
/// are checked against `CLIMATE_SCHEMA` and the service refuses to start if a
/// table or column it queries is missing or has an unusable type. Extra
/// columns (the original dataset carries `id`, `name`, `latitude`, ...) are
/// ignored.

// ---------------------------------------------------------------------------
// Description
// ---------------------------------------------------------------------------

/// PostgreSQL `data_type` values for text columns.
const TEXT_TYPES: &[&str] = &["text", "character varying", "character"];

/// Numeric column types the queries read through their text form as `double precision`.
const FLOAT_TYPES: &[&str] = &["double precision", "real", "numeric"];

/// A column the service depends on.
#[derive(Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    /// Accepted `information_schema.columns.data_type` values.
    pub accepted_types: &'static [&'static str],
}

/// A table the service depends on.
#[derive(Debug)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

pub const MEASUREMENT_TABLE: &str = "measurement";
pub const STATION_TABLE: &str = "station";

/// Everything the queries in `store` touch.
pub static CLIMATE_SCHEMA: &[TableSpec] = &[
    TableSpec {
        name: MEASUREMENT_TABLE,
        columns: &[
            ColumnSpec { name: "station", accepted_types: TEXT_TYPES },
            // ISO text, compared lexically
            ColumnSpec { name: "date", accepted_types: TEXT_TYPES },
            ColumnSpec { name: "prcp", accepted_types: FLOAT_TYPES },
            ColumnSpec { name: "tobs", accepted_types: FLOAT_TYPES },
        ],
    },
    TableSpec {
        name: STATION_TABLE,
        columns: &[ColumnSpec { name: "station", accepted_types: TEXT_TYPES }],
    },
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A mismatch between the live database and `CLIMATE_SCHEMA`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error(
        "Required table '{schema}.{table}' does not exist.\n\n  \
         Load the climate dataset (measurement and station tables) into schema '{schema}',\n  \
         or set [database] schema in climate_service.toml."
    )]
    MissingTable {
        schema: String,
        table: String,
    },

    #[error(
        "Table '{schema}.{table}' has no column '{column}'.\n\n  Expected columns: {}",
        expected_columns(.table)
    )]
    MissingColumn {
        schema: String,
        table: String,
        column: String,
    },

    #[error(
        "Column '{schema}.{table}.{column}' has type '{found}'.\n\n  Expected one of: {}",
        .expected.join(", ")
    )]
    ColumnType {
        schema: String,
        table: String,
        column: String,
        found: String,
        expected: Vec<String>,
    },
}

fn expected_columns(table: &str) -> String {
    find_table(table)
        .map(|t| t.columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", "))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Checking
// ---------------------------------------------------------------------------

/// Looks up a table in `CLIMATE_SCHEMA` by name.
pub fn find_table(name: &str) -> Option<&'static TableSpec> {
    CLIMATE_SCHEMA.iter().find(|t| t.name == name)
}

/// Compares introspected `(column_name, data_type)` pairs for one table
/// against its description.
///
/// An empty `found` list means the table does not exist.
pub fn check_table(
    schema: &str,
    table: &TableSpec,
    found: &[(String, String)],
) -> Result<(), SchemaError> {
    if found.is_empty() {
        return Err(SchemaError::MissingTable {
            schema: schema.to_string(),
            table: table.name.to_string(),
        });
    }

    for column in table.columns {
        let data_type = found
            .iter()
            .find(|(name, _)| name == column.name)
            .map(|(_, data_type)| data_type)
            .ok_or_else(|| SchemaError::MissingColumn {
                schema: schema.to_string(),
                table: table.name.to_string(),
                column: column.name.to_string(),
            })?;

        if !column.accepted_types.contains(&data_type.as_str()) {
            return Err(SchemaError::ColumnType {
                schema: schema.to_string(),
                table: table.name.to_string(),
                column: column.name.to_string(),
                found: data_type.clone(),
                expected: column.accepted_types.iter().map(|t| t.to_string()).collect(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
