//! Loading of CSV inputs

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::DataError;
use crate::attenuation::GroundSample;
use crate::orbit::{OrbitalElements, RelayCatalog};

/// Catalog number column shared by the id list and the TLE table
pub const NORAD_ID_COLUMN: &str = "norad_id";

/// A list of satellites to download, with whatever other columns the file carried
#[derive(Debug, Clone, Default)]
pub struct CatalogIdTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Catalog number of each row, same order as `rows`
    pub ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TleRecord {
    norad_id: String,
    tle1: String,
    tle2: String,
}

#[derive(Debug, Deserialize)]
struct TrajectoryRecord {
    altitude: String,
    longitude: String,
    latitude: String,
    time: String,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader)
}

/// Position of each required column in the header
fn header_indexes(header: &csv::StringRecord, fields: &[&str]) -> Result<Vec<usize>, DataError> {
    if header.is_empty() {
        return Err(DataError::Empty);
    }

    fields
        .iter()
        .map(|field| {
            header
                .iter()
                .position(|h| h == *field)
                .ok_or_else(|| DataError::MissingColumn {
                    column: field.to_string(),
                })
        })
        .collect()
}

/// Finite number in a cell; `NaN` and `inf` are rejected like any other non-number
fn parse_number(row: usize, column: &str, value: &str) -> Result<f64, DataError> {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(DataError::MalformedField {
            row,
            column: column.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_catalog_id(row: usize, value: &str) -> Result<u32, DataError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| DataError::MalformedField {
            row,
            column: NORAD_ID_COLUMN.to_string(),
            value: value.to_string(),
        })
}

/// Read a CSV with a `norad_id` column
pub fn read_catalog_ids<R: Read>(reader: R) -> Result<CatalogIdTable, DataError> {
    let mut reader = csv_reader(reader);
    let header = reader.headers()?.clone();
    let id_index = header_indexes(&header, &[NORAD_ID_COLUMN])?[0];

    let mut table = CatalogIdTable {
        header: header.iter().map(str::to_string).collect(),
        ..CatalogIdTable::default()
    };

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let value = record.get(id_index).unwrap_or_default();
        table.ids.push(parse_catalog_id(i + 1, value)?);
        table.rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}

/// Read a CSV with `norad_id`, `tle1` and `tle2` columns into a relay catalog
pub fn read_relay_catalog<R: Read>(reader: R) -> Result<RelayCatalog, DataError> {
    let mut reader = csv_reader(reader);
    let header = reader.headers()?.clone();
    header_indexes(&header, &["tle1", "tle2", NORAD_ID_COLUMN])?;

    let mut catalog = RelayCatalog::new();
    for (i, record) in reader.deserialize::<TleRecord>().enumerate() {
        let record = record?;
        let row = i + 1;
        let catalog_id = parse_catalog_id(row, &record.norad_id)?;
        let elements = OrbitalElements::parse_for(catalog_id, &record.tle1, &record.tle2)
            .map_err(|source| DataError::InvalidElements { row, source })?;
        catalog.insert(elements);
    }

    Ok(catalog)
}

/// Read a ground track with `altitude`, `longitude`, `latitude` and `time` columns.
///
/// Any non-numeric or non-finite cell rejects the whole file.
pub fn read_trajectory<R: Read>(reader: R) -> Result<Vec<GroundSample>, DataError> {
    let mut reader = csv_reader(reader);
    let header = reader.headers()?.clone();
    header_indexes(&header, &["altitude", "longitude", "latitude", "time"])?;

    let mut samples = Vec::new();
    for (i, record) in reader.deserialize::<TrajectoryRecord>().enumerate() {
        let record = record?;
        let row = i + 1;
        samples.push(GroundSample {
            altitude_m: parse_number(row, "altitude", &record.altitude)?,
            longitude_deg: parse_number(row, "longitude", &record.longitude)?,
            latitude_deg: parse_number(row, "latitude", &record.latitude)?,
            time_s: parse_number(row, "time", &record.time)?,
        });
    }

    Ok(samples)
}

fn open(path: &Path, what: &str) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {} file: {:?}", what, path))?;
    Ok(BufReader::new(file))
}

/// Load the list of satellites to download
pub fn load_catalog_ids(path: impl AsRef<Path>) -> Result<CatalogIdTable> {
    let path = path.as_ref();
    log::info!("Loading satellite ids from {:?}", path);

    let table = read_catalog_ids(open(path, "satellite id")?)
        .with_context(|| format!("Failed to read {:?}", path))?;
    log::info!("Loaded {} satellite ids", table.ids.len());
    Ok(table)
}

/// Load the relay TLE table
pub fn load_relay_catalog(path: impl AsRef<Path>) -> Result<RelayCatalog> {
    let path = path.as_ref();
    log::info!("Loading TLEs from {:?}", path);

    let catalog = read_relay_catalog(open(path, "TLE")?)
        .with_context(|| format!("Failed to read {:?}", path))?;
    log::info!("Loaded {} satellites", catalog.len());
    Ok(catalog)
}

/// Load the ground trajectory
pub fn load_trajectory(path: impl AsRef<Path>) -> Result<Vec<GroundSample>> {
    let path = path.as_ref();
    log::info!("Loading trajectory from {:?}", path);

    let samples = read_trajectory(open(path, "trajectory")?)
        .with_context(|| format!("Failed to read {:?}", path))?;
    log::info!("Loaded {} trajectory samples", samples.len());
    Ok(samples)
}
