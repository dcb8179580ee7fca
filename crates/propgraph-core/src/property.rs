//! Property records and metadata normalization
//!
//! Catalog metadata is loosely typed: numbers may arrive as floats or strings,
//! and the postal address is an embedded JSON document that is sometimes a
//! string and sometimes an object. [`normalize`] turns one raw metadata value
//! into a [`PropertyRecord`] or explains why the record was skipped. It never
//! fails; malformed sub-fields become `None` and are reported as
//! [`NormalizeIssue`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Canonical property record written to the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    /// Unique property key
    pub zpid: i64,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    /// Never `Some("")`
    pub neighborhood: Option<String>,
    pub price: Option<f64>,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub living_area: Option<f64>,
    pub year_built: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub home_type: Option<String>,
    pub description: Option<String>,
}

impl PropertyRecord {
    /// Record with only the key set
    pub fn new(zpid: i64) -> Self {
        Self {
            zpid,
            street_address: None,
            city: None,
            state: None,
            zipcode: None,
            neighborhood: None,
            price: None,
            bedrooms: None,
            bathrooms: None,
            living_area: None,
            year_built: None,
            latitude: None,
            longitude: None,
            home_type: None,
            description: None,
        }
    }

    /// Scalar attributes keyed by their graph property name, absent values omitted
    pub fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("zpid".to_string(), Value::from(self.zpid));

        let strings = [
            ("streetAddress", &self.street_address),
            ("city", &self.city),
            ("state", &self.state),
            ("zipcode", &self.zipcode),
            ("neighborhood", &self.neighborhood),
            ("homeType", &self.home_type),
            ("description", &self.description),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                props.insert(key.to_string(), Value::from(value.clone()));
            }
        }

        let numbers = [
            ("price", self.price),
            ("bedrooms", self.bedrooms),
            ("bathrooms", self.bathrooms),
            ("livingArea", self.living_area),
            ("yearBuilt", self.year_built),
            ("latitude", self.latitude),
            ("longitude", self.longitude),
        ];
        for (key, value) in numbers {
            if let Some(number) = value.and_then(serde_json::Number::from_f64) {
                props.insert(key.to_string(), Value::Number(number));
            }
        }

        props
    }
}

/// Why a catalog record produced no graph node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The catalog returned no metadata for the id
    MissingMetadata,
    /// Metadata is present but has no `zpid`
    MissingZpid,
    /// `zpid` is present but not a finite number
    InvalidZpid(String),
}

impl SkipReason {
    /// Stable label used when tallying skips
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingMetadata => "missing_metadata",
            Self::MissingZpid => "missing_zpid",
            Self::InvalidZpid(_) => "invalid_zpid",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMetadata => f.write_str("no metadata returned"),
            Self::MissingZpid => f.write_str("zpid is missing"),
            Self::InvalidZpid(raw) => write!(f, "zpid {} is not a finite number", raw),
        }
    }
}

/// A tolerated defect in an otherwise usable record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeIssue {
    /// The embedded address could not be decoded; its fields were nulled
    MalformedAddress(String),
}

/// Result of normalizing one catalog record
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record {
        record: PropertyRecord,
        issues: Vec<NormalizeIssue>,
    },
    Skipped {
        reason: SkipReason,
    },
}

/// Normalize raw catalog metadata for one id
///
/// `metadata` is `None` when the catalog listed the id but returned nothing
/// for it on fetch.
pub fn normalize(metadata: Option<&Value>) -> Normalized {
    let Some(Value::Object(meta)) = metadata else {
        return Normalized::Skipped {
            reason: SkipReason::MissingMetadata,
        };
    };

    let zpid = match parse_zpid(meta.get("zpid")) {
        Ok(zpid) => zpid,
        Err(reason) => return Normalized::Skipped { reason },
    };

    let mut issues = Vec::new();
    let address = match decode_address(meta.get("address")) {
        Ok(address) => address,
        Err(message) => {
            issues.push(NormalizeIssue::MalformedAddress(message));
            None
        }
    };
    let from_address = |key: &str| address.as_ref().and_then(|a| string_field(a.get(key)));

    let record = PropertyRecord {
        zpid,
        street_address: from_address("streetAddress"),
        city: string_field(meta.get("city")).or_else(|| from_address("city")),
        state: string_field(meta.get("state")).or_else(|| from_address("state")),
        zipcode: from_address("zipcode"),
        neighborhood: from_address("neighborhood"),
        price: number_field(meta.get("price")),
        bedrooms: number_field(meta.get("bedrooms")),
        bathrooms: number_field(meta.get("bathrooms")),
        living_area: number_field(meta.get("livingArea")),
        year_built: number_field(meta.get("yearBuilt")),
        latitude: number_field(meta.get("latitude")),
        longitude: number_field(meta.get("longitude")),
        home_type: string_field(meta.get("homeType")),
        description: string_field(meta.get("description")),
    };

    Normalized::Record { record, issues }
}

fn parse_zpid(value: Option<&Value>) -> Result<i64, SkipReason> {
    let value = match value {
        None | Some(Value::Null) => return Err(SkipReason::MissingZpid),
        Some(value) => value,
    };
    if let Some(exact) = value.as_i64() {
        return Ok(exact);
    }

    let invalid = || SkipReason::InvalidZpid(value.to_string());
    let float = number_field(Some(value)).ok_or_else(invalid)?;
    let truncated = float.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(truncated as i64)
}

/// Decode the embedded address; `Ok(None)` when there is no address at all
fn decode_address(value: Option<&Value>) -> Result<Option<Map<String, Value>>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(other) => Err(format!("address decoded to a non-object: {}", other)),
            Err(e) => Err(format!("address is not valid JSON: {}", e)),
        },
        Some(other) => Err(format!("unexpected address type: {}", other)),
    }
}

/// Trimmed non-empty string; integral numbers are rendered without a fraction
fn string_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i.to_string());
            }
            let f = n.as_f64()?;
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                Some(format!("{}", f as i64))
            } else {
                Some(n.to_string())
            }
        }
        _ => None,
    }
}

/// Finite number from a JSON number or numeric string
fn number_field(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}
