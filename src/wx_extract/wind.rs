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

pub const WIND_SPEED: &str = "wind_speed";
pub const WIND_DIRECTION: &str = "wind_direction";

/// Wind speed from eastward (`u`) and northward (`v`) components, in the units of the input.
pub fn speed(u: f64, v: f64) -> f64 {
    (u * u + v * v).sqrt()
}

/// Meteorological wind direction in degrees: the bearing the wind blows *from*.
///
/// 90 is wind from the east, 180 from the south, 270 from the west and 360 from
/// the north. Calm wind (both components exactly zero) is reported as 0, which
/// consumers cannot tell apart from a northerly reported as 0.
pub fn direction(u: f64, v: f64) -> f64 {
    if u == 0.0 && v == 0.0 {
        0.0
    } else {
        // Arguments are (u, v), not (v, u): this yields the "from" bearing directly
        u.atan2(v).to_degrees() + 180.0
    }
}

/// Eastward and northward wind components in the same units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindVector {
    pub u: f64,
    pub v: f64,
}

impl WindVector {
    pub fn new(u: f64, v: f64) -> Self {
        WindVector { u, v }
    }

    pub fn speed(&self) -> f64 {
        speed(self.u, self.v)
    }

    pub fn direction(&self) -> f64 {
        direction(self.u, self.v)
    }
}

/// Names of the measurements holding the wind components of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindFields {
    pub eastward: String,
    pub northward: String,
}

impl WindFields {
    pub fn new<S: Into<String>>(eastward: S, northward: S) -> Self {
        WindFields {
            eastward: eastward.into(),
            northward: northward.into(),
        }
    }
}

impl Default for WindFields {
    /// Field names used by the point forecast API.
    fn default() -> Self {
        Self::new("eastward_wind", "northward_wind")
    }
}

/// Return a copy of the record with `wind_speed` and `wind_direction` added.
pub fn derive_wind(record: &GeoRecord, fields: &WindFields) -> Result<GeoRecord, DataError> {
    let wind = WindVector::new(record.require(&fields.eastward)?, record.require(&fields.northward)?);
    Ok(record
        .clone()
        .with_value(WIND_SPEED, wind.speed())
        .with_value(WIND_DIRECTION, wind.direction()))
}

/// Derive wind for every record. Records missing a component are dropped and their
/// errors returned next to the records that were kept.
pub fn derive_wind_all(records: &[GeoRecord], fields: &WindFields) -> (Vec<GeoRecord>, Vec<DataError>) {
    keep_valid(records.iter().map(|r| derive_wind(r, fields)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() < 1e-9,
            "expected {} but got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_calm_wind() {
        assert_eq!(0.0, speed(0.0, 0.0));
        assert_eq!(0.0, direction(0.0, 0.0));
        assert_eq!(0.0, direction(-0.0, 0.0));
    }

    #[test]
    fn test_speed() {
        assert_close(5.0, speed(3.0, 4.0));
        assert_close(5.0, speed(-3.0, -4.0));
        assert_close(2.5, speed(0.0, -2.5));
    }

    #[test]
    fn test_direction_cardinal() {
        // Blowing toward the north means wind from the south
        assert_close(180.0, direction(0.0, 1.0));
        assert_close(180.0, direction(0.0, 5.0));
        assert_close(270.0, direction(1.0, 0.0));
        assert_close(90.0, direction(-1.0, 0.0));
        assert_close(360.0, direction(0.0, -1.0));
    }

    #[test]
    fn test_direction_diagonal() {
        // Toward the north east is from the south west
        assert_close(225.0, direction(1.0, 1.0));
        assert_close(135.0, direction(-1.0, 1.0));
    }

    #[test]
    fn test_wind_vector() {
        let w = WindVector::new(-1.0, 0.0);
        assert_close(1.0, w.speed());
        assert_close(90.0, w.direction());
    }

    #[test]
    fn test_derive_wind() {
        let fields = WindFields::new("u10", "v10");
        let rec = GeoRecord::new(10.0, 20.0)
            .unwrap()
            .with_value("u10", 3.0)
            .with_value("v10", 4.0);

        let out = derive_wind(&rec, &fields).unwrap();
        assert_close(5.0, out.value(WIND_SPEED).unwrap());
        assert_close(direction(3.0, 4.0), out.value(WIND_DIRECTION).unwrap());
        assert_eq!(Some(3.0), out.value("u10"));
        // Source record is untouched
        assert_eq!(None, rec.value(WIND_SPEED));
    }

    #[test]
    fn test_derive_wind_missing_component() {
        let rec = GeoRecord::new(10.0, 20.0).unwrap().with_value("eastward_wind", 3.0);
        assert_eq!(
            Err(DataError::MissingField("northward_wind".to_owned())),
            derive_wind(&rec, &WindFields::default())
        );
    }

    #[test]
    fn test_derive_wind_all_drops_incomplete() {
        let fields = WindFields::default();
        let records = vec![
            GeoRecord::new(10.0, 20.0)
                .unwrap()
                .with_value("eastward_wind", 3.0)
                .with_value("northward_wind", 4.0),
            GeoRecord::new(11.0, 20.0).unwrap().with_value("eastward_wind", 1.0),
            GeoRecord::new(12.0, 20.0)
                .unwrap()
                .with_value("eastward_wind", 0.0)
                .with_value("northward_wind", 2.0),
        ];

        let (kept, dropped) = derive_wind_all(&records, &fields);
        assert_eq!(2, kept.len());
        assert_eq!(10.0, kept[0].latitude());
        assert_eq!(12.0, kept[1].latitude());
        assert_close(2.0, kept[1].value(WIND_SPEED).unwrap());
        assert_eq!(vec![DataError::MissingField("northward_wind".to_owned())], dropped);
    }
}
