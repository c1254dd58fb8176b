//! Writing of CSV outputs

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::{CatalogIdTable, DataError};
use crate::attenuation::{OutputRow, RelayEvaluation, RowDetail};
use crate::orbit::FetchOutcome;

const PER_RELAY_COLUMNS: usize = 3;
const SUBPOINT_COLUMNS: usize = 3;

/// Column names of the attenuation table
pub fn output_header(relay_ids: &[u32], detail: RowDetail) -> Vec<String> {
    let mut header: Vec<String> = [
        "time (s)",
        "longitude (°)",
        "latitude (°)",
        "altitude (m)",
        "minimum_dist (m)",
        "minimum_name (norad id)",
        "path_loss (dB)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if detail.per_relay || detail.relay_subpoints {
        for id in relay_ids {
            header.push(format!("{}:dist (m)", id));
            header.push(format!("{}:path_loss (dB)", id));
            header.push(format!("{}:los", id));
            if detail.relay_subpoints {
                header.push(format!("{}:longitude (°)", id));
                header.push(format!("{}:latitude (°)", id));
                header.push(format!("{}:altitude (m)", id));
            }
        }
    }

    header
}

fn relay_cells(evaluation: &RelayEvaluation, subpoints: bool, record: &mut Vec<String>) {
    record.push(evaluation.distance_m.to_string());
    record.push(
        evaluation
            .path_loss_db
            .map(|loss| loss.to_string())
            .unwrap_or_default(),
    );
    record.push(if evaluation.line_of_sight { "True" } else { "False" }.to_string());

    if subpoints {
        match evaluation.subpoint {
            Some(p) => {
                record.push(p.longitude_deg.to_string());
                record.push(p.latitude_deg.to_string());
                record.push(p.altitude_m.to_string());
            }
            None => record.extend(std::iter::repeat(String::new()).take(SUBPOINT_COLUMNS)),
        }
    }
}

/// Format one result row to match `output_header`
pub fn output_record(row: &OutputRow, relay_count: usize, detail: RowDetail) -> Vec<String> {
    let mut record = vec![
        row.epoch_s.to_string(),
        row.longitude_deg.to_string(),
        row.latitude_deg.to_string(),
        row.altitude_m.to_string(),
        row.min_distance_m().to_string(),
        row.selected_relay()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "None".to_string()),
        row.min_path_loss_db().to_string(),
    ];

    if detail.per_relay || detail.relay_subpoints {
        for evaluation in row.relays.iter().take(relay_count) {
            relay_cells(evaluation, detail.relay_subpoints, &mut record);
        }

        // Keep the table rectangular if the row carries fewer relays than the header
        let per_relay = PER_RELAY_COLUMNS
            + if detail.relay_subpoints {
                SUBPOINT_COLUMNS
            } else {
                0
            };
        let missing = relay_count.saturating_sub(row.relays.len()) * per_relay;
        record.extend(std::iter::repeat(String::new()).take(missing));
    }

    record
}

/// Write the attenuation table, one line per row in order
pub fn write_output<W: Write>(
    writer: W,
    rows: &[OutputRow],
    relay_ids: &[u32],
    detail: RowDetail,
) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(output_header(relay_ids, detail))?;

    for row in rows {
        writer.write_record(output_record(row, relay_ids.len(), detail))?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the id table back with `tle1` and `tle2` columns, keeping only successful rows.
///
/// `outcomes` must be in the same order as `table.rows`.
pub fn write_tle_table<W: Write>(
    writer: W,
    table: &CatalogIdTable,
    outcomes: &[FetchOutcome],
) -> Result<usize, DataError> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = table.header.clone();
    header.push("tle1".to_string());
    header.push("tle2".to_string());
    writer.write_record(&header)?;

    let mut written = 0;
    for (row, outcome) in table.rows.iter().zip(outcomes) {
        let Ok(elements) = &outcome.result else {
            continue;
        };

        let mut record = row.clone();
        record.push(elements.line1().to_string());
        record.push(elements.line2().to_string());
        writer.write_record(&record)?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    Ok(BufWriter::new(file))
}

/// Save the attenuation table
pub fn save_output(
    path: impl AsRef<Path>,
    rows: &[OutputRow],
    relay_ids: &[u32],
    detail: RowDetail,
) -> Result<()> {
    let path = path.as_ref();
    write_output(create(path)?, rows, relay_ids, detail)
        .with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}

/// Save downloaded TLEs alongside the original id table
pub fn save_tle_table(
    path: impl AsRef<Path>,
    table: &CatalogIdTable,
    outcomes: &[FetchOutcome],
) -> Result<usize> {
    let path = path.as_ref();
    let written = write_tle_table(create(path)?, table, outcomes)
        .with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Wrote {} TLEs to {:?}", written, path);
    Ok(written)
}
