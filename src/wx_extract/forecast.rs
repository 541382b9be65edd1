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

use crate::client::ForecastEntry;
use crate::record::DataError;
use crate::sink::{format_value, Report};
use crate::wind::{WindFields, WindVector};
use std::collections::BTreeSet;

pub const AIR_TEMPERATURE: &str = "air_temperature";
pub const PRECIPITATION_AMOUNT: &str = "precipitation_amount";

/// Temperature plus wind speed and direction derived from the wind components of each entry.
pub fn wind_report(entries: &[ForecastEntry]) -> Result<Report, DataError> {
    let fields = WindFields::default();
    let mut report = Report::new(vec![
        "issuance_time",
        "valid_time",
        AIR_TEMPERATURE,
        "wind_speed",
        "wind_direction",
    ]);

    for entry in entries {
        let wind = WindVector::new(entry.require(&fields.eastward)?, entry.require(&fields.northward)?);
        report.push(vec![
            entry.times.issuance_time.clone(),
            entry.times.valid_time.clone(),
            format_value(entry.value(AIR_TEMPERATURE)),
            wind.speed().to_string(),
            wind.direction().to_string(),
        ]);
    }

    Ok(report)
}

/// Every value returned, one column per name, sorted by name.
pub fn values_report(entries: &[ForecastEntry]) -> Report {
    let names: BTreeSet<&str> = entries
        .iter()
        .flat_map(|e| e.values.keys().map(String::as_str))
        .collect();

    let mut headers = vec!["issuance_time".to_owned(), "valid_time".to_owned()];
    headers.extend(names.iter().map(|n| n.to_string()));

    let mut report = Report::new(headers);
    for entry in entries {
        let mut row = vec![entry.times.issuance_time.clone(), entry.times.valid_time.clone()];
        row.extend(names.iter().map(|n| format_value(entry.value(n))));
        report.push(row);
    }

    report
}

/// Precipitation that fell between consecutive lead times.
///
/// The API reports the total accumulated since the start of the forecast, so each
/// interval is the difference from the previous entry (zero before the first).
pub fn precipitation_intervals(entries: &[ForecastEntry]) -> Result<Vec<(String, f64)>, DataError> {
    let mut previous = 0.0;
    let mut out = Vec::with_capacity(entries.len());

    for entry in entries {
        let total = entry.require(PRECIPITATION_AMOUNT)?;
        out.push((entry.times.valid_time.clone(), total - previous));
        previous = total;
    }

    Ok(out)
}

pub fn precipitation_report(entries: &[ForecastEntry]) -> Result<Report, DataError> {
    let mut report = Report::new(vec!["valid_time", PRECIPITATION_AMOUNT]);
    for (valid_time, amount) in precipitation_intervals(entries)? {
        report.push(vec![valid_time, amount.to_string()]);
    }

    Ok(report)
}
