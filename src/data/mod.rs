//! Data pipeline - boundary collection and storm observations
//!
//! Parsing starts from bytes in hand. The async loaders only read the file
//! and hand the bytes over. Each dataset succeeds or fails on its own:
//! - countries: GeoJSON feature collection
//! - storms: delimited table checked against a fixed schema, then filtered,
//!   windowed, and used to derive the wind speed scales

pub mod countries;
pub mod schema;
pub mod storms;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::log_error;
use crate::scale::StormScales;
pub use countries::{parse_countries, CountryFeature};
pub use storms::{parse_storms, StormObservation, StormTable};

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid boundary collection: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid observation table: {0}")]
    Csv(#[from] csv::Error),
    #[error("Observation header is missing column '{0}'")]
    MissingColumn(String),
    #[error("Observation header has unexpected column '{0}'")]
    UnexpectedColumn(String),
    #[error("Observation header repeats column '{0}'")]
    DuplicateColumn(String),
}

/// Which bounded subset of the filtered observations is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// The last N rows in file order
    #[default]
    LastN,
    /// The first N rows after reversing file order
    NewestFirst,
}

impl WindowPolicy {
    pub fn apply<T>(self, mut rows: Vec<T>, max_points: usize) -> Vec<T> {
        match self {
            WindowPolicy::LastN => {
                let excess = rows.len().saturating_sub(max_points);
                rows.drain(..excess);
                rows
            }
            WindowPolicy::NewestFirst => {
                rows.reverse();
                rows.truncate(max_points);
                rows
            }
        }
    }
}

/// Observations ready to bind, with the scales derived from them
#[derive(Debug, Clone)]
pub struct StormSet {
    pub storms: Vec<StormObservation>,
    pub scales: StormScales,
    pub max_wind_speed: f64,
    /// Rows dropped for an invalid or non-positive wind speed or position
    pub rejected: usize,
    /// Valid rows left out by the window
    pub windowed_out: usize,
}

impl StormSet {
    pub fn empty() -> Self {
        Self {
            storms: Vec::new(),
            scales: StormScales::from_max(0.0),
            max_wind_speed: 0.0,
            rejected: 0,
            windowed_out: 0,
        }
    }
}

/// Both datasets; a dataset that failed to load is empty
#[derive(Debug, Clone)]
pub struct Dataset {
    pub countries: Vec<CountryFeature>,
    pub storms: StormSet,
}

/// Where the two datasets live
#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub countries: PathBuf,
    pub storms: PathBuf,
}

/// Completion of one dataset load
#[derive(Debug)]
pub enum LoadEvent {
    Countries(Result<Vec<CountryFeature>, DataError>),
    Storms(Result<StormSet, DataError>),
}

#[derive(Debug, Clone, Copy)]
pub struct DataPipeline {
    max_points: usize,
    window: WindowPolicy,
}

impl DataPipeline {
    pub fn new(max_points: usize, window: WindowPolicy) -> Self {
        Self { max_points, window }
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn window(&self) -> WindowPolicy {
        self.window
    }

    /// Filter, window and derive scales.
    ///
    /// Rows without a positive wind speed or a usable position never reach
    /// the scale domain. The maximum is taken over every filtered row, then
    /// the window bounds how many of them are drawn.
    pub fn prepare(&self, rows: Vec<StormObservation>) -> StormSet {
        let total = rows.len();
        let valid: Vec<StormObservation> = rows
            .into_iter()
            .filter(|r| r.positive_wind_speed().is_some() && r.position().is_some())
            .collect();
        let rejected = total - valid.len();

        let max_wind_speed = valid
            .iter()
            .filter_map(StormObservation::positive_wind_speed)
            .fold(0.0, f64::max);

        let valid_count = valid.len();
        let storms = self.window.apply(valid, self.max_points);
        let windowed_out = valid_count - storms.len();

        debug!(
            "Prepared storms: {} kept, {} rejected, {} outside window, max wind {}",
            storms.len(),
            rejected,
            windowed_out,
            max_wind_speed
        );

        StormSet {
            storms,
            scales: StormScales::from_max(max_wind_speed),
            max_wind_speed,
            rejected,
            windowed_out,
        }
    }

    pub fn parse_storm_set(&self, bytes: &[u8]) -> Result<StormSet, DataError> {
        let table = parse_storms(bytes)?;
        Ok(self.prepare(table.rows))
    }

    pub async fn load_countries(&self, path: &Path) -> Result<Vec<CountryFeature>, DataError> {
        let bytes = read(path).await?;
        parse_countries(&bytes)
    }

    pub async fn load_storm_table(&self, path: &Path) -> Result<StormTable, DataError> {
        let bytes = read(path).await?;
        parse_storms(&bytes)
    }

    pub async fn load_storms(&self, path: &Path) -> Result<StormSet, DataError> {
        let bytes = read(path).await?;
        self.parse_storm_set(&bytes)
    }

    /// Load both datasets concurrently. A failure empties only its own dataset.
    pub async fn load(&self, paths: &DatasetPaths) -> Dataset {
        let (countries, storms) = tokio::join!(
            self.load_countries(&paths.countries),
            self.load_storms(&paths.storms)
        );

        let countries = countries.unwrap_or_else(|e| {
            log_error!(e, dataset = "countries");
            Vec::new()
        });
        let storms = storms.unwrap_or_else(|e| {
            log_error!(e, dataset = "storms");
            StormSet::empty()
        });

        info!("Loaded {} countries and {} storm observations", countries.len(), storms.storms.len());
        Dataset { countries, storms }
    }

    /// Start both loads as independent tasks on `runtime`.
    ///
    /// Each completion is sent as a [`LoadEvent`] and followed by a call to
    /// `notify`, so a UI can wake up and bind.
    pub fn spawn_loads(
        &self,
        runtime: &tokio::runtime::Handle,
        paths: DatasetPaths,
        notify: Arc<dyn Fn() + Send + Sync>,
    ) -> mpsc::Receiver<LoadEvent> {
        let (tx, rx) = mpsc::channel();
        let pipeline = *self;

        {
            let tx = tx.clone();
            let notify = notify.clone();
            let path = paths.countries.clone();
            runtime.spawn(async move {
                let result = pipeline.load_countries(&path).await;
                let _ = tx.send(LoadEvent::Countries(result));
                notify();
            });
        }

        runtime.spawn(async move {
            let result = pipeline.load_storms(&paths.storms).await;
            let _ = tx.send(LoadEvent::Storms(result));
            notify();
        });

        rx
    }
}

async fn read(path: &Path) -> Result<Vec<u8>, DataError> {
    debug!("Reading {:?}", path);
    tokio::fs::read(path).await.map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::countries::tests::COLLECTION;
    use crate::data::schema::Parsed;
    use crate::data::storms::tests::{row, table};
    use std::io::Write;

    fn observation(wind: Parsed<f64>, season: f64) -> StormObservation {
        StormObservation {
            serial_num: String::new(),
            season: Parsed::Valid(season),
            sequence_num: Parsed::Valid(1.0),
            basin: String::new(),
            sub_basin: String::new(),
            name: String::new(),
            observed_at: Parsed::Invalid,
            nature: String::new(),
            latitude: Parsed::Valid(10.0),
            longitude: Parsed::Valid(20.0),
            wind_speed: wind,
            pressure: Parsed::Invalid,
            center: String::new(),
            wind_speed_percentile: Parsed::Invalid,
            pressure_percentile: Parsed::Invalid,
            track_type: String::new(),
        }
    }

    #[test]
    fn test_filter_drops_invalid_and_non_positive() {
        let rows = vec![
            observation(Parsed::Valid(40.0), 1.0),
            observation(Parsed::Invalid, 2.0),
            observation(Parsed::Valid(0.0), 3.0),
            observation(Parsed::Valid(-999.0), 4.0),
            observation(Parsed::Valid(90.0), 5.0),
        ];
        let set = DataPipeline::new(999, WindowPolicy::LastN).prepare(rows);
        assert_eq!(set.storms.len(), 2);
        assert_eq!(set.rejected, 3);
        assert!(set.storms.iter().all(|s| s.positive_wind_speed().is_some()));
        assert_eq!(set.max_wind_speed, 90.0);
        assert_eq!(set.scales.radius(90.0), 5.0);
    }

    #[test]
    fn test_missing_position_is_rejected() {
        let mut obs = observation(Parsed::Valid(50.0), 1.0);
        obs.latitude = Parsed::Invalid;
        let set = DataPipeline::new(999, WindowPolicy::LastN).prepare(vec![obs]);
        assert!(set.storms.is_empty());
        assert_eq!(set.rejected, 1);
    }

    #[test]
    fn test_last_n_window() {
        let rows: Vec<_> = (0..1000).map(|i| observation(Parsed::Valid(10.0), i as f64)).collect();
        let set = DataPipeline::new(999, WindowPolicy::LastN).prepare(rows);
        assert_eq!(set.storms.len(), 999);
        assert_eq!(set.windowed_out, 1);
        assert_eq!(set.storms[0].season, Parsed::Valid(1.0));
        assert_eq!(set.storms[998].season, Parsed::Valid(999.0));
    }

    #[test]
    fn test_newest_first_window() {
        let rows: Vec<_> = (0..1000).map(|i| observation(Parsed::Valid(10.0), i as f64)).collect();
        let set = DataPipeline::new(999, WindowPolicy::NewestFirst).prepare(rows);
        assert_eq!(set.storms.len(), 999);
        assert_eq!(set.storms[0].season, Parsed::Valid(999.0));
        assert_eq!(set.storms[998].season, Parsed::Valid(1.0));
    }

    #[test]
    fn test_window_applies_after_filter() {
        let mut rows: Vec<_> = (0..5).map(|i| observation(Parsed::Valid(10.0), i as f64)).collect();
        rows.push(observation(Parsed::Invalid, 5.0));
        rows.push(observation(Parsed::Valid(0.0), 6.0));
        let set = DataPipeline::new(3, WindowPolicy::LastN).prepare(rows);
        let seasons: Vec<_> = set.storms.iter().filter_map(|s| s.season.value()).collect();
        assert_eq!(seasons, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_max_over_filtered_rows() {
        let csv = table(&[row("10", "10", "150"), row("11", "11", "30"), row("12", "12", "60")]);
        let set = DataPipeline::new(2, WindowPolicy::LastN)
            .parse_storm_set(csv.as_bytes())
            .unwrap();
        assert_eq!(set.storms.len(), 2);
        assert_eq!(set.max_wind_speed, 150.0);
        assert!((set.scales.radius(60.0) - 2.3).abs() < 1e-9);
        assert_eq!(set.scales.color(60.0).r, 102);
        assert_eq!(set.scales.color(150.0).r, 255);
    }

    #[test]
    fn test_empty_set() {
        let set = DataPipeline::new(999, WindowPolicy::LastN).prepare(Vec::new());
        assert!(set.storms.is_empty());
        assert_eq!(set.max_wind_speed, 0.0);
        assert_eq!(set.scales.radius(10.0), 0.5);
    }

    #[test]
    fn test_window_policy_yaml_names() {
        let policy: WindowPolicy = serde_yaml::from_str("newest_first").unwrap();
        assert_eq!(policy, WindowPolicy::NewestFirst);
        let policy: WindowPolicy = serde_yaml::from_str("last_n").unwrap();
        assert_eq!(policy, WindowPolicy::LastN);
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_both_datasets() {
        let countries = write_temp(COLLECTION);
        let storms = write_temp(&table(&[row("25", "-80", "100"), row("26", "-81", "")]));
        let paths = DatasetPaths {
            countries: countries.path().to_path_buf(),
            storms: storms.path().to_path_buf(),
        };

        let dataset = DataPipeline::new(999, WindowPolicy::LastN).load(&paths).await;
        assert_eq!(dataset.countries.len(), 2);
        assert_eq!(dataset.storms.storms.len(), 1);
        assert_eq!(dataset.storms.rejected, 1);
    }

    #[tokio::test]
    async fn test_missing_dataset_leaves_other_intact() {
        let countries = write_temp(COLLECTION);
        let paths = DatasetPaths {
            countries: countries.path().to_path_buf(),
            storms: PathBuf::from("/nonexistent/storms.csv"),
        };

        let pipeline = DataPipeline::new(999, WindowPolicy::LastN);
        assert!(matches!(
            pipeline.load_storms(&paths.storms).await,
            Err(DataError::Read { .. })
        ));

        let dataset = pipeline.load(&paths).await;
        assert_eq!(dataset.countries.len(), 2);
        assert!(dataset.storms.storms.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawned_loads_report_both() {
        let countries = write_temp(COLLECTION);
        let storms = write_temp(&table(&[row("25", "-80", "100")]));
        let paths = DatasetPaths {
            countries: countries.path().to_path_buf(),
            storms: storms.path().to_path_buf(),
        };

        let rx = DataPipeline::new(999, WindowPolicy::LastN).spawn_loads(
            &tokio::runtime::Handle::current(),
            paths,
            Arc::new(|| {}),
        );

        let events = tokio::task::spawn_blocking(move || {
            (0..2).map(|_| rx.recv().unwrap()).collect::<Vec<_>>()
        })
        .await
        .unwrap();

        assert!(events.iter().any(|e| matches!(e, LoadEvent::Countries(Ok(c)) if c.len() == 2)));
        assert!(events.iter().any(|e| matches!(e, LoadEvent::Storms(Ok(s)) if s.storms.len() == 1)));
    }
}
