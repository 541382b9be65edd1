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

//! Reading named fields out of GRIB2 forecast files.
//!
//! Decoding is done by the `grib` crate. This module only decides which submessages
//! to decode and arranges the values on a `LatLonGrid`.

use crate::grid::{Field, GridData, GridError, LatLonGrid};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Fixed surface types (GRIB2 code table 4.5) used by the catalog.
pub const SURFACE_GROUND: u8 = 1;
pub const SURFACE_ISOBARIC: u8 = 100;
pub const SURFACE_MEAN_SEA_LEVEL: u8 = 101;
pub const SURFACE_ALTITUDE_MSL: u8 = 102;
pub const SURFACE_HEIGHT_ABOVE_GROUND: u8 = 103;

/// Fields of the Basic bundle, extracted by default when sampling points.
pub const BASIC_FIELDS: &[&str] = &[
    "TMP_P0_L103_GLL0",
    "DPT_P0_L103_GLL0",
    "RH_P0_L103_GLL0",
    "UGRD_P0_L103_GLL0",
    "VGRD_P0_L103_GLL0",
    "GUST_P0_L1_GLL0",
    "PRMSL_P0_L101_GLL0",
    "APCP_P8_L1_GLL0_acc",
];

// name, long name, units, discipline, category, number, surface type, surface value
type CatalogEntry = (&'static str, &'static str, &'static str, u8, u8, u8, u8, Option<f64>);

const CATALOG: &[CatalogEntry] = &[
    ("TMP_P0_L103_GLL0", "Temperature", "K", 0, 0, 0, SURFACE_HEIGHT_ABOVE_GROUND, Some(2.0)),
    ("DPT_P0_L103_GLL0", "Dew point temperature", "K", 0, 0, 6, SURFACE_HEIGHT_ABOVE_GROUND, Some(2.0)),
    ("RH_P0_L103_GLL0", "Relative humidity", "%", 0, 1, 1, SURFACE_HEIGHT_ABOVE_GROUND, Some(2.0)),
    ("UGRD_P0_L103_GLL0", "U-component of wind", "m s-1", 0, 2, 2, SURFACE_HEIGHT_ABOVE_GROUND, Some(10.0)),
    ("VGRD_P0_L103_GLL0", "V-component of wind", "m s-1", 0, 2, 3, SURFACE_HEIGHT_ABOVE_GROUND, Some(10.0)),
    ("GUST_P0_L1_GLL0", "Wind speed (gust)", "m s-1", 0, 2, 22, SURFACE_GROUND, None),
    ("PRMSL_P0_L101_GLL0", "Pressure reduced to MSL", "Pa", 0, 3, 1, SURFACE_MEAN_SEA_LEVEL, None),
    ("APCP_P8_L1_GLL0_acc", "Total precipitation", "kg m-2", 0, 1, 8, SURFACE_GROUND, None),
    ("TMP_P0_L100_GLL0", "Temperature", "K", 0, 0, 0, SURFACE_ISOBARIC, None),
    ("UGRD_P0_L100_GLL0", "U-component of wind", "m s-1", 0, 2, 2, SURFACE_ISOBARIC, None),
    ("VGRD_P0_L100_GLL0", "V-component of wind", "m s-1", 0, 2, 3, SURFACE_ISOBARIC, None),
    ("VVEL_P0_L100_GLL0", "Vertical velocity (pressure)", "Pa s-1", 0, 2, 8, SURFACE_ISOBARIC, None),
    ("HGT_P0_L100_GLL0", "Geopotential height", "gpm", 0, 3, 5, SURFACE_ISOBARIC, None),
    ("TMP_P0_L102_GLL0", "Temperature", "K", 0, 0, 0, SURFACE_ALTITUDE_MSL, None),
    ("RH_P0_L102_GLL0", "Relative humidity", "%", 0, 1, 1, SURFACE_ALTITUDE_MSL, None),
    ("UGRD_P0_L102_GLL0", "U-component of wind", "m s-1", 0, 2, 2, SURFACE_ALTITUDE_MSL, None),
    ("VGRD_P0_L102_GLL0", "V-component of wind", "m s-1", 0, 2, 3, SURFACE_ALTITUDE_MSL, None),
    ("CAT_P0_L102_GLL0", "Clear air turbulence", "%", 0, 19, 22, SURFACE_ALTITUDE_MSL, None),
    ("TIPD_P0_L102_GLL0", "Total icing potential diagnostic", "", 0, 19, 37, SURFACE_ALTITUDE_MSL, None),
    (
        "HTSGW_P0_L1_GLL0",
        "Significant height of combined wind waves and swell",
        "m",
        10,
        0,
        3,
        SURFACE_GROUND,
        None,
    ),
];

/// Identifies one GRIB2 parameter, optionally on one fixed surface and level.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelector {
    pub name: String,
    pub long_name: String,
    pub units: String,
    pub discipline: u8,
    pub category: u8,
    pub number: u8,
    pub surface_type: Option<u8>,
    pub surface_value: Option<f64>,
}

impl FieldSelector {
    /// Look up a field of the built-in catalog by name.
    pub fn catalog(name: &str) -> Option<FieldSelector> {
        CATALOG
            .iter()
            .find(|entry| entry.0 == name)
            .map(|&(name, long_name, units, discipline, category, number, surface, value)| FieldSelector {
                name: name.to_owned(),
                long_name: long_name.to_owned(),
                units: units.to_owned(),
                discipline,
                category,
                number,
                surface_type: Some(surface),
                surface_value: value,
            })
    }

    /// Parse a selector.
    ///
    /// * `NAME` - a catalog field.
    /// * `NAME@LEVEL` - a catalog field on a specific level of its surface, e.g.
    ///   `TMP_P0_L100_GLL0@2000` for temperature at 2000 Pa. Altitude levels may be
    ///   given as a flight level, `CAT_P0_L102_GLL0@FL100` is the same as `@3048`.
    /// * `NAME=D.C.N[/SURFACE[@LEVEL]]` - any parameter by discipline, category and
    ///   number, optionally restricted to a fixed surface type and level.
    pub fn parse(s: &str) -> Result<FieldSelector, GridError> {
        let invalid = || GridError::InvalidSelector(s.to_owned());

        if let Some((name, definition)) = s.split_once('=') {
            let (param, surface) = match definition.split_once('/') {
                Some((p, surface)) => (p, Some(surface)),
                None => (definition, None),
            };

            let codes = param
                .split('.')
                .map(|c| c.trim().parse::<u8>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            let (discipline, category, number) = match codes.as_slice() {
                [d, c, n] => (*d, *c, *n),
                _ => return Err(invalid()),
            };

            let (surface_type, surface_value) = match surface {
                Some(surface) => {
                    let (kind, level) = split_level(surface).ok_or_else(invalid)?;
                    (Some(kind.parse::<u8>().map_err(|_| invalid())?), level)
                }
                None => (None, None),
            };

            if name.trim().is_empty() {
                return Err(invalid());
            }

            return Ok(FieldSelector {
                name: name.trim().to_owned(),
                long_name: name.trim().to_owned(),
                units: String::new(),
                discipline,
                category,
                number,
                surface_type,
                surface_value,
            });
        }

        let (name, level) = split_level(s).ok_or_else(invalid)?;
        let mut selector = Self::catalog(name).ok_or_else(invalid)?;
        if level.is_some() {
            selector.surface_value = level;
        }

        Ok(selector)
    }

    fn matches(&self, key: &SubmessageKey) -> bool {
        self.discipline == key.discipline
            && Some(self.category) == key.category
            && Some(self.number) == key.number
            && self.surface_type.map_or(true, |t| Some(t) == key.surface_type)
            && self.surface_value.map_or(true, |v| {
                key.surface_value
                    .map_or(false, |kv| (kv - v).abs() <= 1e-6 * v.abs().max(1.0))
            })
    }
}

/// Split `NAME@LEVEL` where the level is a number or a flight level like `FL100`.
fn split_level(s: &str) -> Option<(&str, Option<f64>)> {
    match s.split_once('@') {
        Some((name, level)) => {
            let level = level.trim();
            let value = match level.strip_prefix("FL") {
                Some(fl) => flight_level_altitude(fl.parse::<u32>().ok()?) as f64,
                None => level.parse::<f64>().ok()?,
            };
            Some((name.trim(), Some(value)))
        }
        None => Some((s.trim(), None)),
    }
}

/// Altitude in whole metres of a flight level (hundreds of feet), rounded down:
/// FL100 is 3048 m and FL110 is 3352 m.
pub fn flight_level_altitude(level: u32) -> u64 {
    u64::from(level) * 3048 / 100
}

/// Parameter and first fixed surface of a submessage.
#[derive(Debug, Clone, PartialEq)]
struct SubmessageKey {
    discipline: u8,
    category: Option<u8>,
    number: Option<u8>,
    surface_type: Option<u8>,
    surface_value: Option<f64>,
}

/// Decode the first submessage matching each selector. Entries are `None` for selectors
/// without a match in the file.
pub fn read_fields<P: AsRef<Path>>(
    path: P,
    selectors: &[FieldSelector],
) -> Result<Vec<Option<(LatLonGrid, Field)>>, GridError> {
    let path = path.as_ref();
    tracing::debug!(message = "reading GRIB file", path = %path.display(), fields = selectors.len());

    let f = BufReader::new(File::open(path)?);
    let grib2 = grib::from_reader(f)?;
    let mut out: Vec<Option<(LatLonGrid, Field)>> = vec![None; selectors.len()];

    for (_index, submessage) in grib2.iter() {
        let prod_def = submessage.prod_def();
        let surface = prod_def.fixed_surfaces().map(|(first, _second)| first);
        let key = SubmessageKey {
            discipline: submessage.indicator().discipline,
            category: prod_def.parameter_category(),
            number: prod_def.parameter_number(),
            surface_type: surface.as_ref().map(|s| s.surface_type),
            surface_value: surface.as_ref().map(|s| s.value()),
        };

        let wanted: Vec<usize> = selectors
            .iter()
            .enumerate()
            .filter(|(i, s)| out[*i].is_none() && s.matches(&key))
            .map(|(i, _)| i)
            .collect();
        if wanted.is_empty() {
            continue;
        }

        let points: Vec<(f32, f32)> = submessage.latlons()?.collect();
        let grid = LatLonGrid::from_points(points)?;
        let decoder = grib::Grib2SubmessageDecoder::from(submessage)?;
        let values: Vec<f32> = decoder.dispatch()?.collect();

        for i in wanted {
            let field = Field {
                name: selectors[i].name.clone(),
                values: values.clone(),
            };
            out[i] = Some((grid.clone(), field));
        }

        if out.iter().all(Option::is_some) {
            break;
        }
    }

    Ok(out)
}

/// Decode every selected field into one `GridData`. All fields must be present and
/// share a grid.
pub fn read_grid<P: AsRef<Path>>(path: P, selectors: &[FieldSelector]) -> Result<GridData, GridError> {
    let found = read_fields(path, selectors)?;
    let mut grid: Option<LatLonGrid> = None;
    let mut fields = Vec::with_capacity(found.len());

    for (selector, entry) in selectors.iter().zip(found) {
        let (g, field) = entry.ok_or_else(|| GridError::FieldNotFound(selector.name.clone()))?;
        match &grid {
            Some(existing) if *existing != g => {
                return Err(GridError::GridMismatch {
                    field: field.name,
                    expected: existing.len(),
                    actual: g.len(),
                });
            }
            Some(_) => {}
            None => grid = Some(g),
        }
        fields.push(field);
    }

    let grid = grid.ok_or_else(|| GridError::FieldNotFound("(no fields selected)".to_owned()))?;
    GridData::new(grid, fields)
}

/// Valid time of a forecast file named like
/// `sof-d.20200317.t06z.0p125.basic.global.f000.grib2`: the issuance date and hour
/// plus the lead time in hours.
pub fn forecast_valid_time(file_name: &str) -> Result<NaiveDateTime, GridError> {
    let invalid = || GridError::InvalidFileName(file_name.to_owned());
    let parts: Vec<&str> = file_name.split('.').collect();
    if parts.len() < 4 {
        return Err(invalid());
    }

    let date = NaiveDate::parse_from_str(parts[1], "%Y%m%d").map_err(|_| invalid())?;
    let issuance_hour = parts[2]
        .strip_prefix('t')
        .and_then(|s| s.strip_suffix('z'))
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(invalid)?;
    let lead_hours = parts[parts.len() - 2]
        .strip_prefix('f')
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(invalid)?;

    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Ok(midnight + Duration::hours(issuance_hour + lead_hours))
}
