//! Observation table schema
//!
//! The header is checked against an explicit, ordered list of columns before
//! any row is read. Each column declares how its text is parsed.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use super::DataError;

/// Result of parsing one numeric or timestamp field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parsed<T> {
    Valid(T),
    /// The text was present but is not a value of this kind
    Invalid,
}

impl<T: Copy> Parsed<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Parsed::Valid(v) => Some(*v),
            Parsed::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Parsed::Valid(_))
    }
}

/// How a column's text is turned into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Timestamp,
}

/// A parsed field, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Parsed<f64>),
    Timestamp(Parsed<NaiveDateTime>),
}

impl FieldKind {
    pub fn parse(self, raw: &str) -> FieldValue {
        match self {
            FieldKind::Text => FieldValue::Text(raw.trim().to_string()),
            FieldKind::Number => FieldValue::Number(parse_number(raw)),
            FieldKind::Timestamp => FieldValue::Timestamp(parse_timestamp(raw)),
        }
    }
}

impl FieldValue {
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Text(s) => s,
            _ => String::new(),
        }
    }

    pub fn into_number(self) -> Parsed<f64> {
        match self {
            FieldValue::Number(n) => n,
            _ => Parsed::Invalid,
        }
    }

    pub fn into_timestamp(self) -> Parsed<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(t) => t,
            _ => Parsed::Invalid,
        }
    }
}

/// Finite number from trimmed text. Empty text is not zero.
pub fn parse_number(raw: &str) -> Parsed<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Parsed::Valid(v),
        _ => Parsed::Invalid,
    }
}

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub fn parse_timestamp(raw: &str) -> Parsed<NaiveDateTime> {
    let raw = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Parsed::Valid(t);
        }
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Parsed::Valid(t.naive_utc());
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_hms_opt(0, 0, 0)) {
        Ok(Some(t)) => Parsed::Valid(t),
        _ => Parsed::Invalid,
    }
}

/// Number of columns in the observation table
pub const FIELD_COUNT: usize = 16;

/// Columns of the IBTrACS WMO observation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StormField {
    SerialNum,
    Season,
    Num,
    Basin,
    SubBasin,
    Name,
    IsoTime,
    Nature,
    Latitude,
    Longitude,
    Wind,
    Pressure,
    Center,
    WindPercentile,
    PressurePercentile,
    TrackType,
}

impl StormField {
    /// Schema order
    pub const ALL: [StormField; FIELD_COUNT] = [
        StormField::SerialNum,
        StormField::Season,
        StormField::Num,
        StormField::Basin,
        StormField::SubBasin,
        StormField::Name,
        StormField::IsoTime,
        StormField::Nature,
        StormField::Latitude,
        StormField::Longitude,
        StormField::Wind,
        StormField::Pressure,
        StormField::Center,
        StormField::WindPercentile,
        StormField::PressurePercentile,
        StormField::TrackType,
    ];

    pub fn header(self) -> &'static str {
        match self {
            StormField::SerialNum => "Serial_Num",
            StormField::Season => "Season",
            StormField::Num => "Num",
            StormField::Basin => "Basin",
            StormField::SubBasin => "Sub_basin",
            StormField::Name => "Name",
            StormField::IsoTime => "ISO_time",
            StormField::Nature => "Nature",
            StormField::Latitude => "Latitude",
            StormField::Longitude => "Longitude",
            StormField::Wind => "Wind(WMO)",
            StormField::Pressure => "Pres(WMO)",
            StormField::Center => "Center",
            StormField::WindPercentile => "Wind(WMO) Percentile",
            StormField::PressurePercentile => "Pres(WMO) Percentile",
            StormField::TrackType => "Track_type",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            StormField::Season
            | StormField::Num
            | StormField::Latitude
            | StormField::Longitude
            | StormField::Wind
            | StormField::Pressure
            | StormField::WindPercentile
            | StormField::PressurePercentile => FieldKind::Number,
            StormField::IsoTime => FieldKind::Timestamp,
            _ => FieldKind::Text,
        }
    }

    fn from_header(name: &str) -> Option<StormField> {
        StormField::ALL.into_iter().find(|f| f.header() == name)
    }
}

/// Position of every schema column in the file's header
#[derive(Debug, Clone)]
pub struct ColumnMap {
    indices: [usize; FIELD_COUNT],
    width: usize,
}

impl ColumnMap {
    /// Check a header row against the schema; columns may come in any order
    pub fn resolve(header: &StringRecord) -> Result<Self, DataError> {
        let mut found: [Option<usize>; FIELD_COUNT] = [None; FIELD_COUNT];

        for (index, name) in header.iter().enumerate() {
            let name = name.trim();
            let field = StormField::from_header(name)
                .ok_or_else(|| DataError::UnexpectedColumn(name.to_string()))?;
            let slot = &mut found[field as usize];
            if slot.is_some() {
                return Err(DataError::DuplicateColumn(name.to_string()));
            }
            *slot = Some(index);
        }

        let mut indices = [0; FIELD_COUNT];
        for field in StormField::ALL {
            indices[field as usize] = found[field as usize]
                .ok_or_else(|| DataError::MissingColumn(field.header().to_string()))?;
        }

        Ok(Self { indices, width: header.len() })
    }

    /// Number of columns a well-formed record has
    pub fn width(&self) -> usize {
        self.width
    }

    /// Parse one field of a record with its declared kind
    pub fn value(&self, record: &StringRecord, field: StormField) -> FieldValue {
        let raw = record.get(self.indices[field as usize]).unwrap_or("");
        field.kind().parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> StringRecord {
        StringRecord::from(names.to_vec())
    }

    fn full_header() -> Vec<&'static str> {
        StormField::ALL.iter().map(|f| f.header()).collect()
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_number(" 42.5 "), Parsed::Valid(42.5));
        assert_eq!(parse_number("0"), Parsed::Valid(0.0));
        assert_eq!(parse_number(""), Parsed::Invalid);
        assert_eq!(parse_number("   "), Parsed::Invalid);
        assert_eq!(parse_number("abc"), Parsed::Invalid);
        assert_eq!(parse_number("NaN"), Parsed::Invalid);
        assert_eq!(parse_number("inf"), Parsed::Invalid);
    }

    #[test]
    fn test_timestamp_parsing() {
        let t = parse_timestamp("2005-08-29 12:00:00").value().unwrap();
        assert_eq!(t.to_string(), "2005-08-29 12:00:00");
        assert!(parse_timestamp("2005-08-29T06:00:00").is_valid());
        assert!(parse_timestamp("2005-08-29T06:00:00Z").is_valid());
        assert!(parse_timestamp("2005-08-29").is_valid());
        assert_eq!(parse_timestamp("yesterday"), Parsed::Invalid);
    }

    #[test]
    fn test_text_is_trimmed() {
        assert_eq!(FieldKind::Text.parse("  KATRINA "), FieldValue::Text("KATRINA".into()));
    }

    #[test]
    fn test_header_in_any_order() {
        let mut names = full_header();
        names.reverse();
        let columns = ColumnMap::resolve(&header(&names)).unwrap();
        assert_eq!(columns.width(), 16);

        let mut row: Vec<String> = vec![String::new(); 16];
        row[names.iter().position(|n| *n == "Wind(WMO)").unwrap()] = "85".into();
        let record = StringRecord::from(row);
        assert_eq!(columns.value(&record, StormField::Wind), FieldValue::Number(Parsed::Valid(85.0)));
    }

    #[test]
    fn test_header_missing_column() {
        let names: Vec<_> = full_header().into_iter().filter(|n| *n != "Latitude").collect();
        let err = ColumnMap::resolve(&header(&names)).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "Latitude"));
    }

    #[test]
    fn test_header_unknown_column() {
        let mut names = full_header();
        names.push("Dist2Land");
        let err = ColumnMap::resolve(&header(&names)).unwrap_err();
        assert!(matches!(err, DataError::UnexpectedColumn(ref c) if c == "Dist2Land"));
    }

    #[test]
    fn test_header_duplicate_column() {
        let mut names = full_header();
        names.push("Season");
        let err = ColumnMap::resolve(&header(&names)).unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn(ref c) if c == "Season"));
    }
}
