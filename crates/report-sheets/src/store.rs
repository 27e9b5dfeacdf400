//! In-memory time-series store
//!
//! Holds the three data sources a report reads from (process parameters,
//! manually entered x-line parameters and laboratory analyses) and serves
//! cipher lookups over them. The store is loaded from a JSON document:
//!
//! ```json
//! {
//!   "technological": {
//!     "500": { "name": "Acid flow", "unit": "t/h",
//!              "samples": [{ "time": "2024-03-01 06:00:00", "value": 10.0 }] }
//!   },
//!   "xline": {},
//!   "laboratory": {
//!     "301": { "name": "Sulfuric acid",
//!              "levels": { "3": [{ "time": "2024-03-01", "tonnage": 120.0,
//!                                  "elements": { "H2SO4": 93.5, "Fe": null } }] } }
//!   }
//! }
//! ```
//!
//! Readings stored as `null` are skipped. Sample order is storage order.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

use report_sheets_formula::{
    parse_timestamp, Cipher, DataResolver, Metric, ResolvedValue, ResolverError, Source, TimeWindow,
};

use crate::error::{Error, Result};

/// One timestamped reading of a process or x-line parameter
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sample {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub time: NaiveDateTime,
    #[serde(default)]
    pub value: Option<f64>,
}

/// A process or x-line parameter
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub samples: Vec<Sample>,
}

/// One laboratory analysis of a product at a sampling level
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabSample {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub time: NaiveDateTime,
    #[serde(default)]
    pub tonnage: Option<f64>,
    /// Element concentrations keyed by element name
    #[serde(default)]
    pub elements: BTreeMap<String, Option<f64>>,
}

/// A laboratory product with its analyses per level
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabProduct {
    pub name: String,
    #[serde(default)]
    pub levels: BTreeMap<String, Vec<LabSample>>,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).map_err(serde::de::Error::custom)
}

/// Time-series store backed by memory
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    technological: BTreeMap<String, Parameter>,
    #[serde(default)]
    xline: BTreeMap<String, Parameter>,
    #[serde(default)]
    laboratory: BTreeMap<String, LabProduct>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a store from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a store from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            technological = store.technological.len(),
            xline = store.xline.len(),
            laboratory = store.laboratory.len(),
            "loaded data store"
        );
        Ok(store)
    }

    /// Add or replace a process parameter
    pub fn insert_technological<S: Into<String>>(&mut self, id: S, parameter: Parameter) {
        self.technological.insert(id.into(), parameter);
    }

    /// Add or replace an x-line parameter
    pub fn insert_xline<S: Into<String>>(&mut self, id: S, parameter: Parameter) {
        self.xline.insert(id.into(), parameter);
    }

    /// Add or replace a laboratory product
    pub fn insert_laboratory<S: Into<String>>(&mut self, id: S, product: LabProduct) {
        self.laboratory.insert(id.into(), product);
    }

    fn parameters(&self, source: Source) -> Option<&BTreeMap<String, Parameter>> {
        match source {
            Source::Technological => Some(&self.technological),
            Source::XLine => Some(&self.xline),
            Source::Laboratory => None,
        }
    }

    fn parameter_values(&self, source: Source, id: &str, window: &TimeWindow) -> ResolvedValue {
        let Some(parameter) = self
            .parameters(source)
            .and_then(|parameters| parameters.get(id))
        else {
            return ResolvedValue::Series(Vec::new());
        };

        let rows: Vec<Option<f64>> = parameter
            .samples
            .iter()
            .filter(|sample| window.contains(sample.time))
            .map(|sample| sample.value)
            .collect();
        readings(rows)
    }

    fn analytical_values(
        &self,
        product: &str,
        level: &str,
        element: &str,
        metric: Option<Metric>,
        window: &TimeWindow,
    ) -> ResolvedValue {
        let Some(samples) = self
            .laboratory
            .get(product)
            .and_then(|product| product.levels.get(level))
        else {
            return ResolvedValue::Series(Vec::new());
        };

        let rows: Vec<Option<f64>> = samples
            .iter()
            .filter(|sample| window.contains(sample.time))
            .map(|sample| match metric {
                Some(Metric::Tonnage) => sample.tonnage,
                Some(Metric::Concentration) | None => sample.elements.get(element).copied().flatten(),
            })
            .collect();
        readings(rows)
    }

    fn product_name(&self, source: Source, id: &str) -> std::result::Result<String, ResolverError> {
        let name = match source {
            Source::Laboratory => self.laboratory.get(id).map(|p| p.name.clone()),
            _ => self
                .parameters(source)
                .and_then(|parameters| parameters.get(id))
                .map(|p| p.name.clone()),
        };
        name.ok_or_else(|| ResolverError::NotFound {
            kind: "product",
            id: format!("{}{}", source.letter(), id),
        })
    }

    fn unit_name(&self, source: Source, id: &str) -> std::result::Result<String, ResolverError> {
        self.parameters(source)
            .and_then(|parameters| parameters.get(id))
            .and_then(|p| p.unit.clone())
            .ok_or_else(|| ResolverError::NotFound {
                kind: "unit of",
                id: format!("{}{}", source.letter(), id),
            })
    }
}

/// Numeric readings of the rows in a window, counting the empty ones
fn readings(rows: Vec<Option<f64>>) -> ResolvedValue {
    let total = rows.len();
    ResolvedValue::readings(rows.into_iter().flatten().collect(), total)
}

impl DataResolver for MemoryStore {
    fn resolve(
        &self,
        cipher: &Cipher,
        window: &TimeWindow,
    ) -> std::result::Result<ResolvedValue, ResolverError> {
        match cipher {
            Cipher::Technological { id } => Ok(self.parameter_values(Source::Technological, id, window)),
            Cipher::XLine { id } => Ok(self.parameter_values(Source::XLine, id, window)),
            Cipher::Analytical {
                product,
                level,
                element,
                metric,
            } => Ok(self.analytical_values(product, level, element, *metric, window)),
            Cipher::NameQuery { source, id } => self.product_name(*source, id).map(ResolvedValue::Text),
            Cipher::UnitQuery { source, id } => self.unit_name(*source, id).map(ResolvedValue::Text),
            Cipher::StartDate | Cipher::EndDate => Err(ResolverError::Unsupported(cipher.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "technological": {
            "500": {
                "name": "Acid flow",
                "unit": "t/h",
                "samples": [
                    { "time": "2024-03-01 06:00:00", "value": 10.0 },
                    { "time": "2024-03-02 06:00:00", "value": null },
                    { "time": "2024-03-03 06:00:00", "value": 30.0 },
                    { "time": "2024-04-01 06:00:00", "value": 99.0 }
                ]
            }
        },
        "xline": {
            "12": { "name": "Manual density", "samples": [{ "time": "01.03.2024", "value": 1.8 }] }
        },
        "laboratory": {
            "301": {
                "name": "Sulfuric acid",
                "levels": {
                    "3": [
                        { "time": "2024-03-01", "tonnage": 120.0, "elements": { "H2SO4": 93.5, "Fe": null } },
                        { "time": "2024-03-02", "tonnage": 80.0, "elements": { "H2SO4": 94.0, "Fe": 0.02 } }
                    ]
                }
            }
        }
    }"#;

    fn march() -> TimeWindow {
        TimeWindow::parse("2024-03-01", "2024-03-31 23:59:59").unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::from_json(FIXTURE).unwrap()
    }

    fn tech(id: &str) -> Cipher {
        Cipher::Technological { id: id.into() }
    }

    fn lab(element: &str, metric: Option<Metric>) -> Cipher {
        Cipher::Analytical {
            product: "301".into(),
            level: "3".into(),
            element: element.into(),
            metric,
        }
    }

    #[test]
    fn test_parameter_series_filters_window_and_nulls() {
        // The null reading is dropped but still counted
        assert_eq!(
            store().resolve(&tech("500"), &march()),
            Ok(ResolvedValue::Readings {
                values: vec![10.0, 30.0],
                total: 3
            })
        );
        assert_eq!(
            store().resolve(&Cipher::XLine { id: "12".into() }, &march()),
            Ok(ResolvedValue::Series(vec![1.8]))
        );
    }

    #[test]
    fn test_unknown_parameter_is_empty_series() {
        assert_eq!(
            store().resolve(&tech("404"), &march()),
            Ok(ResolvedValue::Series(vec![]))
        );
    }

    #[test]
    fn test_analytical_metrics() {
        let store = store();
        assert_eq!(
            store.resolve(&lab("H2SO4", None), &march()),
            Ok(ResolvedValue::Series(vec![93.5, 94.0]))
        );
        assert_eq!(
            store.resolve(&lab("Fe", Some(Metric::Concentration)), &march()),
            Ok(ResolvedValue::Readings {
                values: vec![0.02],
                total: 2
            })
        );
        assert_eq!(
            store.resolve(&lab("H2SO4", Some(Metric::Tonnage)), &march()),
            Ok(ResolvedValue::Series(vec![120.0, 80.0]))
        );
        let unknown = store.resolve(&lab("Cu", None), &march()).unwrap();
        assert_eq!(unknown.samples(), Some(&[][..]));
    }

    #[test]
    fn test_metadata_lookups() {
        let store = store();
        let name = |source, id: &str| Cipher::NameQuery {
            source,
            id: id.into(),
        };
        assert_eq!(
            store.resolve(&name(Source::Laboratory, "301"), &march()),
            Ok(ResolvedValue::Text("Sulfuric acid".into()))
        );
        assert_eq!(
            store.resolve(&name(Source::XLine, "12"), &march()),
            Ok(ResolvedValue::Text("Manual density".into()))
        );
        assert_eq!(
            store.resolve(
                &Cipher::UnitQuery {
                    source: Source::Technological,
                    id: "500".into()
                },
                &march()
            ),
            Ok(ResolvedValue::Text("t/h".into()))
        );

        let missing = store
            .resolve(&name(Source::Technological, "9"), &march())
            .unwrap_err();
        assert_eq!(missing.to_string(), "product T9 not found");

        // The x-line parameter has no unit configured
        let no_unit = store
            .resolve(
                &Cipher::UnitQuery {
                    source: Source::XLine,
                    id: "12".into(),
                },
                &march(),
            )
            .unwrap_err();
        assert_eq!(no_unit.to_string(), "unit of X12 not found");
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let loaded = MemoryStore::from_path(file.path()).unwrap();
        assert_eq!(loaded, store());

        let missing = MemoryStore::from_path(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(Error::Io { .. })));
    }

    #[test]
    fn test_rejects_bad_timestamps() {
        let json = r#"{ "xline": { "1": { "name": "x", "samples": [{ "time": "soon", "value": 1 }] } } }"#;
        assert!(matches!(MemoryStore::from_json(json), Err(Error::Json(_))));
    }
}
