//! Joins spill incident rows from a CSV export onto well locations.
//!
//! Each CSV row carries a `Facility_ID`; wells carry `Facil_Id`. A row that
//! matches a well becomes a Point feature at the well's location, named after
//! the well's operator. Rows without a match are dropped.

use ahash::AHashMap;
use csv::ReaderBuilder;
use geo_types::Coord;
use ordered_float::OrderedFloat;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::JoinConfig;
use crate::error::{Result, SpillmapError, io_err};
use crate::geo_io::{
    feature_collection, point_coords, read_feature_collection, validate_feature_collection,
    write_feature_collection,
};

pub const CSV_ID_COLUMN: &str = "Facility_ID";
pub const WELL_ID_PROPERTY: &str = "Facil_Id";
pub const WELL_OPERATOR_PROPERTY: &str = "Operator";
pub const OUTPUT_NAME_PROPERTY: &str = "FEATURE_NAME";

/// A spill row. Rows without a `Facility_ID` value (short rows, or a file
/// without the column) keep an empty id and never match.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SpillRow {
    #[serde(rename = "Facility_ID", default)]
    pub facility_id: String,
}

#[derive(Debug, Clone)]
struct WellRecord {
    /// Position of the well in the source file
    order: usize,
    coords: Coord<f64>,
    operator: Option<JsonValue>,
}

/// Wells keyed by normalized facility identifier.
///
/// Only the first well carrying a given identifier is kept, so a CSV row
/// always resolves to the earliest well in the source file. Wells with a
/// numeric identifier are also keyed by value, so CSV text such as `0512` or
/// `512.0` finds the well whose id is the number 512.
#[derive(Debug, Default)]
pub struct WellIndex {
    by_id: AHashMap<String, WellRecord>,
    by_number: AHashMap<OrderedFloat<f64>, WellRecord>,
    pub duplicate_ids: usize,
    pub skipped: usize,
}

impl WellIndex {
    pub fn build(wells: &FeatureCollection) -> Self {
        let mut index = WellIndex::default();

        for (order, well) in wells.features.iter().enumerate() {
            let id = well.property(WELL_ID_PROPERTY);
            let key = id.and_then(facility_key);
            let (Some(key), Some(coords)) = (key, point_coords(well)) else {
                index.skipped += 1;
                continue;
            };

            if index.by_id.contains_key(&key) {
                index.duplicate_ids += 1;
                continue;
            }

            let record = WellRecord {
                order,
                coords,
                operator: well.property(WELL_OPERATOR_PROPERTY).cloned(),
            };
            if let Some(number) = id.and_then(|v| v.as_number()).and_then(|n| n.as_f64()) {
                index
                    .by_number
                    .entry(OrderedFloat(number))
                    .or_insert_with(|| record.clone());
            }
            index.by_id.insert(key, record);
        }

        index
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn get(&self, raw_id: &str) -> Option<&WellRecord> {
        let key = raw_id.trim();
        if key.is_empty() {
            return None;
        }

        let exact = self.by_id.get(key);
        let numeric = key
            .parse::<f64>()
            .ok()
            .and_then(|n| self.by_number.get(&OrderedFloat(n)));

        match (exact, numeric) {
            (Some(a), Some(b)) => Some(if b.order < a.order { b } else { a }),
            (a, b) => a.or(b),
        }
    }
}

/// Text key of an identifier property: trimmed strings, and JSON numbers
/// rendered the way the CSV would spell them (`512`, not `512.0`).
pub fn facility_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub collection: FeatureCollection,
    pub matched: usize,
    pub unmatched: usize,
}

pub fn join_spills(rows: &[SpillRow], wells: &WellIndex) -> JoinOutcome {
    let mut features = Vec::new();
    let mut unmatched = 0;

    for row in rows {
        let Some(well) = wells.get(&row.facility_id) else {
            unmatched += 1;
            continue;
        };

        let mut properties = JsonObject::new();
        properties.insert(
            OUTPUT_NAME_PROPERTY.to_string(),
            well.operator.clone().unwrap_or(JsonValue::Null),
        );

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![
                well.coords.x,
                well.coords.y,
            ]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    JoinOutcome {
        matched: features.len(),
        unmatched,
        collection: feature_collection(features),
    }
}

pub fn read_spill_rows<R: Read>(reader: R, delimiter: u8) -> csv::Result<Vec<SpillRow>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    rdr.deserialize().collect()
}

fn read_spill_file(path: &Path, delimiter: u8) -> Result<Vec<SpillRow>> {
    let file = File::open(path).map_err(|e| io_err!(path, e))?;
    read_spill_rows(file, delimiter).map_err(|source| SpillmapError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReport {
    pub rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub duplicate_ids: usize,
    /// False when the joined collection failed validation and nothing was written
    pub written: bool,
}

/// Reads the CSV and well files, joins them and writes the result.
///
/// Read failures are returned as errors. A joined collection that fails
/// validation is logged and not written, but is not an error.
pub fn run_join(config: &JoinConfig) -> Result<JoinReport> {
    let delimiter = u8::try_from(config.csv_delimiter).map_err(|_| {
        SpillmapError::Config(format!(
            "CSV delimiter {:?} is not a single byte",
            config.csv_delimiter
        ))
    })?;

    let rows = read_spill_file(&config.csv_path, delimiter)?;
    let wells = read_feature_collection(&config.wells_path)?;

    let index = WellIndex::build(&wells);
    info!(
        "Indexed {} wells from {}",
        index.len(),
        config.wells_path.display()
    );
    if index.duplicate_ids > 0 {
        warn!(
            "{} wells share an identifier with an earlier well and were ignored",
            index.duplicate_ids
        );
    }
    if index.skipped > 0 {
        warn!(
            "{} wells had no identifier or no point geometry",
            index.skipped
        );
    }

    let outcome = join_spills(&rows, &index);
    info!(
        "{} spill features joined from CSV ({} rows without a matching well)",
        outcome.matched, outcome.unmatched
    );

    let mut report = JoinReport {
        rows: rows.len(),
        matched: outcome.matched,
        unmatched: outcome.unmatched,
        duplicate_ids: index.duplicate_ids,
        written: false,
    };

    report.written = write_if_valid(&config.output_path, &outcome.collection)?;
    Ok(report)
}

/// Validates `fc` and writes it only when valid. An invalid collection is
/// logged and reported as `Ok(false)`; write failures are errors.
pub fn write_if_valid(path: &Path, fc: &FeatureCollection) -> Result<bool> {
    if let Err(issues) = validate_feature_collection(fc) {
        error!("Joined output is not valid GeoJSON, nothing written");
        for issue in issues.iter().take(10) {
            error!("  {}", issue);
        }
        return Ok(false);
    }
    info!("Joined output is valid GeoJSON");

    write_feature_collection(path, fc)?;
    info!("Wrote {}", path.display());
    Ok(true)
}
