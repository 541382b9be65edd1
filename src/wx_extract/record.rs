// wx_extract - Forecast API client and GRIB area extraction tools
//
// Copyright 2026 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use std::collections::BTreeMap;
use std::error;
use std::fmt;

/// Problem with a single coordinate or measurement value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    MissingField(String),
    NotNumeric { field: String, value: String },
    OutOfRange { field: String, value: f64 },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field {}", field),
            Self::NotNumeric { field, value } => write!(f, "non-numeric value {:?} for {}", value, field),
            Self::OutOfRange { field, value } => write!(f, "value {} out of range for {}", value, field),
        }
    }
}

impl error::Error for DataError {}

/// Map a longitude in degrees into the range [-180, 180).
///
/// Grid sources commonly use [0, 360) which must be remapped before comparing
/// against a `Region` since regions are always expressed in [-180, 180]. Values
/// already in range are returned unchanged.
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Parse a coordinate from a text field, failing if it is absent, blank, or not a number.
pub fn parse_coordinate(field: &str, value: Option<&str>) -> Result<f64, DataError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DataError::MissingField(field.to_owned()))?;

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataError::NotNumeric {
            field: field.to_owned(),
            value: raw.to_owned(),
        })
}

/// A single geo-tagged data point: a location plus named scalar measurements.
///
/// Longitude is normalized on construction so every record is directly comparable
/// with a `Region`. Records are never mutated once built; derived values produce a
/// new record.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    latitude: f64,
    longitude: f64,
    values: BTreeMap<String, f64>,
}

impl GeoRecord {
    pub const LATITUDE: &'static str = "latitude";
    pub const LONGITUDE: &'static str = "longitude";

    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DataError> {
        if !latitude.is_finite() {
            return Err(DataError::NotNumeric {
                field: Self::LATITUDE.to_owned(),
                value: latitude.to_string(),
            });
        }

        if !longitude.is_finite() {
            return Err(DataError::NotNumeric {
                field: Self::LONGITUDE.to_owned(),
                value: longitude.to_string(),
            });
        }

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(DataError::OutOfRange {
                field: Self::LATITUDE.to_owned(),
                value: latitude,
            });
        }

        Ok(GeoRecord {
            latitude,
            longitude: normalize_longitude(longitude),
            values: BTreeMap::new(),
        })
    }

    pub fn with_value<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Like `value` but a missing measurement is an error.
    pub fn require(&self, name: &str) -> Result<f64, DataError> {
        self.value(name).ok_or_else(|| DataError::MissingField(name.to_owned()))
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

/// Split built records from the errors of records that could not be built.
///
/// Records that fail are dropped while the rest keep their input order. The errors
/// are returned so the caller can report what was left out.
pub fn keep_valid<I>(results: I) -> (Vec<GeoRecord>, Vec<DataError>)
where
    I: IntoIterator<Item = Result<GeoRecord, DataError>>,
{
    let mut records = Vec::new();
    let mut dropped = Vec::new();
    for res in results {
        match res {
            Ok(r) => records.push(r),
            Err(e) => dropped.push(e),
        }
    }

    (records, dropped)
}
