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

use crate::record::{keep_valid, DataError, GeoRecord};
use std::error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum GridError {
    Io(io::Error),
    Grib(grib::GribError),
    Data(DataError),
    IrregularGrid(String),
    GridMismatch { field: String, expected: usize, actual: usize },
    IncompatibleGrids,
    FieldNotFound(String),
    InvalidSelector(String),
    InvalidFileName(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{}", e),
            Self::Grib(e) => write!(f, "unable to decode GRIB: {}", e),
            Self::Data(e) => write!(f, "{}", e),
            Self::IrregularGrid(msg) => write!(f, "not a regular lat/lon grid: {}", msg),
            Self::GridMismatch { field, expected, actual } => write!(
                f,
                "field {} has {} points, expected {} to match other fields",
                field, actual, expected
            ),
            Self::IncompatibleGrids => write!(f, "files do not share the same grid"),
            Self::FieldNotFound(name) => write!(f, "field {} not found", name),
            Self::InvalidSelector(s) => write!(f, "invalid field selector {}", s),
            Self::InvalidFileName(s) => write!(f, "unable to parse forecast time from file name {}", s),
        }
    }
}

impl error::Error for GridError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Grib(e) => Some(e),
            Self::Data(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GridError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<grib::GribError> for GridError {
    fn from(e: grib::GribError) -> Self {
        Self::Grib(e)
    }
}

impl From<DataError> for GridError {
    fn from(e: DataError) -> Self {
        Self::Data(e)
    }
}

/// Regular latitude/longitude grid with points stored row by row, longitude varying fastest.
///
/// Longitudes are kept as the source wrote them (often [0, 360)) and only normalized
/// when records are produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    points: Vec<(f32, f32)>,
    ni: usize,
    nj: usize,
}

impl LatLonGrid {
    const EPSILON: f64 = 1e-6;

    /// Build a grid from (latitude, longitude) pairs, inferring the row length from
    /// where the latitude first changes.
    pub fn from_points(points: Vec<(f32, f32)>) -> Result<Self, GridError> {
        let first_lat = match points.first() {
            Some((lat, _)) => *lat,
            None => return Err(GridError::IrregularGrid("no points".to_owned())),
        };

        let ni = points.iter().take_while(|(lat, _)| *lat == first_lat).count();
        if ni == 0 {
            return Err(GridError::IrregularGrid(format!("invalid first latitude {}", first_lat)));
        }

        if points.len() % ni != 0 {
            return Err(GridError::IrregularGrid(format!(
                "{} points is not a multiple of row length {}",
                points.len(),
                ni
            )));
        }

        let nj = points.len() / ni;
        let grid = LatLonGrid { points, ni, nj };
        if ni > 1 && grid.dlon() <= 0.0 {
            return Err(GridError::IrregularGrid("longitudes must increase along a row".to_owned()));
        }

        Ok(grid)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Number of points along a row (longitudes) and number of rows (latitudes).
    pub fn shape(&self) -> (usize, usize) {
        (self.ni, self.nj)
    }

    fn lat0(&self) -> f64 {
        self.points[0].0 as f64
    }

    fn lon0(&self) -> f64 {
        self.points[0].1 as f64
    }

    fn dlon(&self) -> f64 {
        self.points[1].1 as f64 - self.lon0()
    }

    fn dlat(&self) -> f64 {
        self.points[self.ni].0 as f64 - self.lat0()
    }

    fn is_global(&self) -> bool {
        self.ni > 1 && (self.ni as f64 * self.dlon() - 360.0).abs() < self.dlon() / 2.0
    }

    /// Bilinear interpolation of `values` (one per grid point) at a location.
    ///
    /// Global grids wrap around in longitude. Returns `None` for locations outside the
    /// grid or when any surrounding value is missing (NaN).
    pub fn interpolate(&self, values: &[f32], lat: f64, lon: f64) -> Option<f64> {
        if values.len() != self.points.len() || self.ni < 2 || self.nj < 2 {
            return None;
        }

        let x = (lon - self.lon0()).rem_euclid(360.0) / self.dlon();
        let y = (lat - self.lat0()) / self.dlat();
        let max_x = if self.is_global() { self.ni as f64 } else { (self.ni - 1) as f64 };
        let max_y = (self.nj - 1) as f64;
        if x > max_x + Self::EPSILON || y < -Self::EPSILON || y > max_y + Self::EPSILON {
            return None;
        }

        let x = x.min(max_x);
        let y = y.clamp(0.0, max_y);
        let i0 = (x.floor() as usize).min(self.ni - 1);
        let j0 = (y.floor() as usize).min(self.nj - 1);
        let fx = x - i0 as f64;
        let fy = y - j0 as f64;

        let i1 = if self.is_global() {
            (i0 + 1) % self.ni
        } else {
            (i0 + 1).min(self.ni - 1)
        };
        let j1 = (j0 + 1).min(self.nj - 1);

        let at = |i: usize, j: usize| values[j * self.ni + i] as f64;
        let v = at(i0, j0) * (1.0 - fx) * (1.0 - fy)
            + at(i1, j0) * fx * (1.0 - fy)
            + at(i0, j1) * (1.0 - fx) * fy
            + at(i1, j1) * fx * fy;

        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }
}

/// A decoded GRIB field: its name and one value per grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub values: Vec<f32>,
}

/// One or more fields sharing a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridData {
    grid: LatLonGrid,
    fields: Vec<Field>,
}

impl GridData {
    pub fn new(grid: LatLonGrid, fields: Vec<Field>) -> Result<Self, GridError> {
        for field in fields.iter() {
            if field.values.len() != grid.len() {
                return Err(GridError::GridMismatch {
                    field: field.name.clone(),
                    expected: grid.len(),
                    actual: field.values.len(),
                });
            }
        }

        Ok(GridData { grid, fields })
    }

    pub fn grid(&self) -> &LatLonGrid {
        &self.grid
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// One record per grid point, in grid order, with normalized longitude and one
    /// measurement per field. Masked (NaN) values are left out of the record.
    ///
    /// Points with an invalid coordinate are dropped and their errors returned along
    /// with the records that were built.
    pub fn records(&self) -> (Vec<GeoRecord>, Vec<DataError>) {
        keep_valid(self.grid.points().iter().enumerate().map(|(i, (lat, lon))| {
            let record = GeoRecord::new(*lat as f64, *lon as f64)?;
            Ok(self
                .fields
                .iter()
                .filter(|f| !f.values[i].is_nan())
                .fold(record, |r, f| r.with_value(f.name.as_str(), f.values[i] as f64)))
        }))
    }

    /// Subtract the fields of an earlier forecast from the fields of the same name here.
    ///
    /// Accumulated fields such as total precipitation count from the start of the
    /// forecast, so the difference is the amount over the interval between the two
    /// files. Both must be on the same grid. A value masked in either is masked in the
    /// result.
    pub fn difference(&self, earlier: &GridData) -> Result<GridData, GridError> {
        if self.grid != earlier.grid {
            return Err(GridError::IncompatibleGrids);
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        for field in self.fields.iter() {
            let before = earlier
                .fields
                .iter()
                .find(|f| f.name == field.name)
                .ok_or_else(|| GridError::FieldNotFound(field.name.clone()))?;

            fields.push(Field {
                name: field.name.clone(),
                values: field.values.iter().zip(before.values.iter()).map(|(a, b)| a - b).collect(),
            });
        }

        Ok(GridData {
            grid: self.grid.clone(),
            fields,
        })
    }
}
