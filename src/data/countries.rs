//! Country boundary collection (GeoJSON)

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use geo::{Coord, LineString, MultiPolygon, Polygon};

use super::DataError;

/// A named country outline; single polygons are stored as one-part multipolygons
#[derive(Debug, Clone, PartialEq)]
pub struct CountryFeature {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Deserialize)]
struct FeatureCollectionDoc {
    features: Vec<FeatureDoc>,
}

#[derive(Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<GeometryDoc>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeometryDoc {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

fn ring(positions: Vec<Vec<f64>>) -> LineString<f64> {
    positions
        .into_iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect()
}

/// First ring is the exterior, the rest are holes
fn polygon(rings: Vec<Vec<Vec<f64>>>) -> Option<Polygon<f64>> {
    let mut rings = rings.into_iter().map(ring);
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

impl FeatureDoc {
    fn name(&self) -> String {
        let from_properties = self
            .properties
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str);
        let from_id = self.id.as_ref().and_then(Value::as_str);
        from_properties.or(from_id).unwrap_or("").trim().to_string()
    }
}

/// Parse a feature collection, keeping Polygon and MultiPolygon features
pub fn parse_countries(bytes: &[u8]) -> Result<Vec<CountryFeature>, DataError> {
    let doc: FeatureCollectionDoc = serde_json::from_slice(bytes)?;

    let mut countries = Vec::with_capacity(doc.features.len());
    for feature in doc.features {
        let name = feature.name();
        let geometry = match feature.geometry {
            Some(GeometryDoc::Polygon { coordinates }) => {
                MultiPolygon::new(polygon(coordinates).into_iter().collect())
            }
            Some(GeometryDoc::MultiPolygon { coordinates }) => {
                MultiPolygon::new(coordinates.into_iter().filter_map(polygon).collect())
            }
            Some(GeometryDoc::Unsupported) | None => {
                warn!("Skipping feature '{}': no polygon geometry", name);
                continue;
            }
        };
        countries.push(CountryFeature { name, geometry });
    }

    debug!("Parsed {} country features", countries.len());
    Ok(countries)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "ATL",
                "properties": {"name": "Atlantis"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-10, -10], [10, -10], [10, 10], [-10, 10], [-10, -10]]]
                }
            },
            {
                "type": "Feature",
                "id": "ISL",
                "properties": {"name": "Islands"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[170, 0], [175, 0], [175, 5], [170, 0]]],
                        [[[20, 40], [25, 40], [25, 45, 120], [20, 40]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {"name": "Capital"},
                "geometry": {"type": "Point", "coordinates": [1, 2]}
            }
        ]
    }"#;

    #[test]
    fn test_polygon_and_multipolygon() {
        let countries = parse_countries(COLLECTION.as_bytes()).unwrap();
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].name, "Atlantis");
        assert_eq!(countries[0].geometry.0.len(), 1);
        assert_eq!(countries[0].geometry.0[0].exterior().0.len(), 5);
        assert!(countries[0].geometry.0[0].interiors().is_empty());
        assert_eq!(countries[1].name, "Islands");
        assert_eq!(countries[1].geometry.0.len(), 2);
        // Altitude is dropped
        assert_eq!(countries[1].geometry.0[1].exterior().0[2], Coord { x: 25.0, y: 45.0 });
    }

    #[test]
    fn test_name_falls_back_to_id() {
        let json = r#"{"features": [{"id": "XYZ", "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}]}"#;
        let countries = parse_countries(json.as_bytes()).unwrap();
        assert_eq!(countries[0].name, "XYZ");
    }

    #[test]
    fn test_corrupt_collection_is_an_error() {
        assert!(matches!(parse_countries(b"{\"features\": [1, 2"), Err(DataError::Json(_))));
        assert!(matches!(parse_countries(b"not json"), Err(DataError::Json(_))));
    }
}
