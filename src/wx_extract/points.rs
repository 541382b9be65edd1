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

//! Sampling forecast files at a list of locations.

use crate::fields::{forecast_valid_time, read_fields, FieldSelector};
use crate::grid::GridError;
use crate::record::{parse_coordinate, DataError, GeoRecord};
use crate::sink::Report;
use chrono::NaiveDateTime;
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MISSING: &str = "Missing";

#[derive(Debug)]
pub enum PointsError {
    Io(io::Error),
    Csv(csv::Error),
    Row { line: u64, error: DataError },
    Grid(GridError),
}

impl fmt::Display for PointsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{}", e),
            Self::Csv(e) => write!(f, "unable to read points: {}", e),
            Self::Row { line, error } => write!(f, "invalid point on line {}: {}", line, error),
            Self::Grid(e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for PointsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Row { error, .. } => Some(error),
            Self::Grid(e) => Some(e),
        }
    }
}

impl From<io::Error> for PointsError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for PointsError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<GridError> for PointsError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

/// Read locations from a CSV file with `latitude` and `longitude` columns. Other
/// columns are ignored.
pub fn read_points_csv<P: AsRef<Path>>(path: P) -> Result<Vec<GeoRecord>, PointsError> {
    read_points(csv::Reader::from_path(path)?)
}

fn read_points<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<GeoRecord>, PointsError> {
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let lat_idx = column(GeoRecord::LATITUDE);
    let lon_idx = column(GeoRecord::LONGITUDE);

    let mut points = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let parse = || -> Result<GeoRecord, DataError> {
            let lat = parse_coordinate(GeoRecord::LATITUDE, lat_idx.and_then(|i| row.get(i)))?;
            let lon = parse_coordinate(GeoRecord::LONGITUDE, lon_idx.and_then(|i| row.get(i)))?;
            GeoRecord::new(lat, lon)
        };

        points.push(parse().map_err(|error| PointsError::Row { line, error })?);
    }

    Ok(points)
}

/// GRIB2 files (`*.grib2`) directly inside `dir`, sorted by name.
pub fn grib_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, PointsError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "grib2") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Value of one field at one location and time.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSample {
    pub valid_time: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub variable: String,
    /// Long name of the field, `None` when the file does not contain it.
    pub name: Option<String>,
    pub value: Option<f64>,
    pub units: Option<String>,
}

/// Interpolate every selected field of a forecast file at each point.
///
/// Fields missing from the file still produce a sample for every point, with no
/// name, units or value.
pub fn sample_file<P: AsRef<Path>>(
    path: P,
    selectors: &[FieldSelector],
    points: &[GeoRecord],
) -> Result<Vec<PointSample>, PointsError> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| GridError::InvalidFileName(path.display().to_string()))?;
    let valid_time = forecast_valid_time(file_name)?;
    let found = read_fields(path, selectors)?;

    let mut samples = Vec::with_capacity(points.len() * selectors.len());
    for point in points {
        for (selector, entry) in selectors.iter().zip(found.iter()) {
            let sample = match entry {
                Some((grid, field)) => PointSample {
                    valid_time,
                    latitude: point.latitude(),
                    longitude: point.longitude(),
                    variable: selector.name.clone(),
                    name: Some(selector.long_name.clone()),
                    value: grid.interpolate(&field.values, point.latitude(), point.longitude()),
                    units: Some(selector.units.clone()),
                },
                None => PointSample {
                    valid_time,
                    latitude: point.latitude(),
                    longitude: point.longitude(),
                    variable: selector.name.clone(),
                    name: None,
                    value: None,
                    units: None,
                },
            };
            samples.push(sample);
        }
    }

    tracing::debug!(message = "sampled file", path = %path.display(), samples = samples.len());
    Ok(samples)
}

/// Sample every file in order. Stops at the first file that cannot be read.
pub fn sample_files(
    files: &[PathBuf],
    selectors: &[FieldSelector],
    points: &[GeoRecord],
) -> Result<Vec<PointSample>, PointsError> {
    let mut samples = Vec::new();
    for path in files {
        samples.extend(sample_file(path, selectors, points)?);
    }

    Ok(samples)
}

pub fn samples_report(samples: &[PointSample]) -> Report {
    let mut report = Report::new(vec![
        "Datetime",
        "Latitude",
        "Longitude",
        "Variable",
        "Name",
        "Value",
        "Units",
    ]);

    for s in samples {
        report.push(vec![
            s.valid_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            s.latitude.to_string(),
            s.longitude.to_string(),
            s.variable.clone(),
            s.name.clone().unwrap_or_else(|| MISSING.to_owned()),
            s.value.map(|v| v.to_string()).unwrap_or_else(|| MISSING.to_owned()),
            s.units.clone().unwrap_or_else(|| MISSING.to_owned()),
        ]);
    }

    report
}
