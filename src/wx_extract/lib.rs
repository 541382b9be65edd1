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

//! Forecast API client and GRIB area extraction tools
//!
//! ## Features
//!
//! `wx_extract` talks to a point and file based weather forecast API and works with the
//! GRIB2 files it serves.
//!
//! * Point forecasts: temperature, wind speed and wind direction or every returned value
//!   for a single location, plus precipitation per forecast interval.
//! * Complete issuances: detect whether the latest forecast issuance has every lead time
//!   and fall back to the previous one, or download all files of an issuance.
//! * Bulk downloads: fetch many forecast or export files with bounded parallelism.
//! * Area extraction: decode fields from a GRIB2 file and keep only the grid points
//!   inside a region loaded from GeoJSON, deriving wind speed and direction on the way.
//!   Accumulated fields can be differenced against an earlier file of the same forecast.
//! * Point sampling: interpolate fields from a directory of GRIB2 files at a list of
//!   locations read from CSV.
//!
//! ## Usage
//!
//! The point forecast and forecast file commands need an API key. It is read from the
//! `SPIRE_API_KEY` environment variable or the `--api-key` option.
//!
//! ```text
//! export SPIRE_API_KEY=...
//! ./wx_extract point --lat 49.6 --lon 6.1
//! ./wx_extract issuance-files --output-directory ./forecasts
//! ./wx_extract crop ./forecasts/sof-d.20200317.t00z.0p125.basic.global.f000.grib2 \
//!     --region ./luxembourg.geojson --fields TMP,UGRD,VGRD --wind UGRD,VGRD --csv area.csv
//! ./wx_extract points ./stations.csv ./forecasts --variables TMP,RH --output output.csv
//! ```
//!
//! Logs are written to stderr so tables and CSV output on stdout can be piped.

pub mod area;
pub mod client;
pub mod download;
pub mod fields;
pub mod forecast;
pub mod grid;
pub mod issuance;
pub mod points;
pub mod record;
pub mod region;
pub mod sink;
pub mod wind;
