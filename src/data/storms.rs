//! Storm observation table

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, warn};

use super::schema::{ColumnMap, Parsed, StormField};
use super::DataError;

/// One row of the observation table, parsed per the schema
#[derive(Debug, Clone, PartialEq)]
pub struct StormObservation {
    pub serial_num: String,
    pub season: Parsed<f64>,
    pub sequence_num: Parsed<f64>,
    pub basin: String,
    pub sub_basin: String,
    pub name: String,
    pub observed_at: Parsed<NaiveDateTime>,
    pub nature: String,
    pub latitude: Parsed<f64>,
    pub longitude: Parsed<f64>,
    pub wind_speed: Parsed<f64>,
    pub pressure: Parsed<f64>,
    pub center: String,
    pub wind_speed_percentile: Parsed<f64>,
    pub pressure_percentile: Parsed<f64>,
    pub track_type: String,
}

impl StormObservation {
    pub fn from_record(record: &StringRecord, columns: &ColumnMap) -> Self {
        let text = |f| columns.value(record, f).into_text();
        let number = |f| columns.value(record, f).into_number();

        Self {
            serial_num: text(StormField::SerialNum),
            season: number(StormField::Season),
            sequence_num: number(StormField::Num),
            basin: text(StormField::Basin),
            sub_basin: text(StormField::SubBasin),
            name: text(StormField::Name),
            observed_at: columns.value(record, StormField::IsoTime).into_timestamp(),
            nature: text(StormField::Nature),
            latitude: number(StormField::Latitude),
            longitude: number(StormField::Longitude),
            wind_speed: number(StormField::Wind),
            pressure: number(StormField::Pressure),
            center: text(StormField::Center),
            wind_speed_percentile: number(StormField::WindPercentile),
            pressure_percentile: number(StormField::PressurePercentile),
            track_type: text(StormField::TrackType),
        }
    }

    /// Wind speed when it parsed and is strictly positive
    pub fn positive_wind_speed(&self) -> Option<f64> {
        self.wind_speed.value().filter(|&w| w > 0.0)
    }

    /// `[longitude, latitude]` when both parsed
    pub fn position(&self) -> Option<[f64; 2]> {
        Some([self.longitude.value()?, self.latitude.value()?])
    }
}

/// Rows read from one table
#[derive(Debug, Clone, Default)]
pub struct StormTable {
    pub rows: Vec<StormObservation>,
    /// Records dropped because they had the wrong number of fields
    pub malformed: usize,
}

/// Summary printed by the `stats` command
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub malformed: usize,
    pub invalid_wind: usize,
    pub non_positive_wind: usize,
}

impl StormTable {
    pub fn summary(&self) -> TableSummary {
        let invalid_wind = self.rows.iter().filter(|r| !r.wind_speed.is_valid()).count();
        let non_positive_wind = self
            .rows
            .iter()
            .filter(|r| matches!(r.wind_speed, Parsed::Valid(w) if w <= 0.0))
            .count();
        TableSummary {
            rows: self.rows.len(),
            malformed: self.malformed,
            invalid_wind,
            non_positive_wind,
        }
    }
}

/// Parse a delimited observation table; the header must match the schema
pub fn parse_storms(bytes: &[u8]) -> Result<StormTable, DataError> {
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(bytes);

    let columns = ColumnMap::resolve(reader.headers()?)?;
    debug!("Observation header accepted ({} columns)", columns.width());

    let mut table = StormTable::default();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != columns.width() {
            warn!(
                "Skipping observation record {}: {} fields, expected {}",
                line + 1,
                record.len(),
                columns.width()
            );
            table.malformed += 1;
            continue;
        }
        table.rows.push(StormObservation::from_record(&record, &columns));
    }

    debug!("Parsed {} observation rows ({} malformed)", table.rows.len(), table.malformed);
    Ok(table)
}
