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

use crate::record::GeoRecord;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use std::collections::BTreeSet;
use std::error;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

#[derive(Debug)]
pub enum SinkError {
    Csv(csv::Error),
    Io(io::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(e) => write!(f, "unable to write CSV: {}", e),
            Self::Io(e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for SinkError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Csv(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<csv::Error> for SinkError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Rows of already formatted cells under a header, ready to print or save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    pub fn new<S: Into<String>>(headers: Vec<S>) -> Self {
        Report {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render as a table for a terminal.
    pub fn to_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(self.headers.clone());
        for row in self.rows.iter() {
            table.add_row(row.clone());
        }

        table.to_string()
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), SinkError> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.headers)?;
        for row in self.rows.iter() {
            out.write_record(row)?;
        }

        out.flush()?;
        Ok(())
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), SinkError> {
        let path = path.as_ref();
        self.write_csv(File::create(path)?)?;
        tracing::info!(message = "wrote CSV", path = %path.display(), rows = self.rows.len());
        Ok(())
    }
}

/// Format a measurement, empty when absent.
pub fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per record: latitude, longitude, then each measurement. With no explicit
/// `columns` every measurement name found in any record is used, sorted.
pub fn records_report(records: &[GeoRecord], columns: &[String]) -> Report {
    let columns: Vec<String> = if columns.is_empty() {
        records
            .iter()
            .flat_map(|r| r.values().keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        columns.to_vec()
    };

    let mut headers = vec![GeoRecord::LATITUDE.to_owned(), GeoRecord::LONGITUDE.to_owned()];
    headers.extend(columns.iter().cloned());

    let mut report = Report::new(headers);
    for r in records {
        let mut row = vec![r.latitude().to_string(), r.longitude().to_string()];
        row.extend(columns.iter().map(|c| format_value(r.value(c))));
        report.push(row);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<GeoRecord> {
        vec![
            GeoRecord::new(45.0, 10.0).unwrap().with_value("t", 280.5),
            GeoRecord::new(45.5, 200.0)
                .unwrap()
                .with_value("t", 281.0)
                .with_value("rh", 80.0),
        ]
    }

    #[test]
    fn test_records_report_all_columns() {
        let report = records_report(&records(), &[]);
        assert_eq!(vec!["latitude", "longitude", "rh", "t"], report.headers);
        assert_eq!(vec!["45", "10", "", "280.5"], report.rows[0]);
        assert_eq!(vec!["45.5", "-160", "80", "281"], report.rows[1]);
    }

    #[test]
    fn test_records_report_selected_columns() {
        let report = records_report(&records(), &["t".to_owned()]);
        assert_eq!(vec!["latitude", "longitude", "t"], report.headers);
        assert_eq!(2, report.rows.len());
    }

    #[test]
    fn test_write_csv() {
        let mut report = Report::new(vec!["valid_time", "precipitation_amount"]);
        report.push(vec!["2020-03-17T06:00:00+00:00".to_owned(), "1.5".to_owned()]);

        let mut buf = Vec::new();
        report.write_csv(&mut buf).unwrap();
        assert_eq!(
            "valid_time,precipitation_amount\n2020-03-17T06:00:00+00:00,1.5\n",
            String::from_utf8(buf).unwrap()
        );
    }

    #[test]
    fn test_save_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        records_report(&records(), &[]).save_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("latitude,longitude,rh,t\n"));
    }

    #[test]
    fn test_to_table_contains_cells() {
        let table = records_report(&records(), &[]).to_table();
        assert!(table.contains("latitude"));
        assert!(table.contains("280.5"));
    }
}
