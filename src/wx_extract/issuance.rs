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

//! Forecast issuances and detecting whether one is complete.
//!
//! A new issuance appears in the API lead time by lead time while it is being
//! produced. Consumers that need a whole forecast compare the number of entries or
//! files against the size of the time bundle and fall back to the previous issuance.

use crate::client::{ClientError, FileSource, ForecastClient, ForecastEntry, PointQuery};
use crate::download::{download_all, DownloadReport};
use chrono::{DateTime, Duration};
use std::error;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug)]
pub enum IssuanceError {
    Client(ClientError),
    EmptyForecast,
    InvalidIssuanceTime(String, chrono::ParseError),
    Incomplete { found: usize, expected: usize },
}

impl fmt::Display for IssuanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(e) => write!(f, "{}", e),
            Self::EmptyForecast => write!(f, "forecast response contained no entries"),
            Self::InvalidIssuanceTime(s, e) => write!(f, "invalid issuance time {}: {}", s, e),
            Self::Incomplete { found, expected } => {
                write!(f, "there are {} files and we were expecting {}", found, expected)
            }
        }
    }
}

impl error::Error for IssuanceError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Client(e) => Some(e),
            Self::InvalidIssuanceTime(_, e) => Some(e),
            _ => None,
        }
    }
}

impl From<ClientError> for IssuanceError {
    fn from(e: ClientError) -> Self {
        Self::Client(e)
    }
}

/// Set of forecast lead times offered by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBundle {
    /// Hourly from 0 to 24 hours.
    ShortRangeHighFreq,
    /// Every six hours from 0 to 168 hours.
    MediumRangeStdFreq,
    /// Hourly from 0 to 24 hours, then every six hours up to 168 hours.
    MediumRangeHighFreq,
}

impl TimeBundle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortRangeHighFreq => "short_range_high_freq",
            Self::MediumRangeStdFreq => "medium_range_std_freq",
            Self::MediumRangeHighFreq => "medium_range_high_freq",
        }
    }

    /// Number of lead times (and so entries or files) in a complete issuance.
    pub fn expected_forecast_size(&self) -> usize {
        match self {
            Self::ShortRangeHighFreq => 25,
            Self::MediumRangeStdFreq => 29,
            Self::MediumRangeHighFreq => 49,
        }
    }

    /// Time between consecutive issuances.
    pub fn issuance_interval(&self) -> Duration {
        match self {
            Self::ShortRangeHighFreq => Duration::hours(6),
            Self::MediumRangeStdFreq | Self::MediumRangeHighFreq => Duration::hours(12),
        }
    }
}

impl fmt::Display for TimeBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeBundle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_range_high_freq" => Ok(Self::ShortRangeHighFreq),
            "medium_range_std_freq" => Ok(Self::MediumRangeStdFreq),
            "medium_range_high_freq" => Ok(Self::MediumRangeHighFreq),
            _ => Err(format!("unexpected time bundle {}", s)),
        }
    }
}

/// Issuance time one issuance interval before the given RFC 3339 time.
pub fn previous_issuance(issuance_time: &str, bundle: TimeBundle) -> Result<String, IssuanceError> {
    let dt = DateTime::parse_from_rfc3339(issuance_time)
        .map_err(|e| IssuanceError::InvalidIssuanceTime(issuance_time.to_owned(), e))?;
    Ok((dt - bundle.issuance_interval()).to_rfc3339())
}

/// Latest forecast for the point that contains every lead time of the bundle.
///
/// If the most recent issuance is still being populated the previous issuance is
/// requested instead. The query's `time_bundle` and `issuance_time` are overwritten.
pub async fn last_complete_issuance(
    client: &ForecastClient,
    query: &PointQuery,
    bundle: TimeBundle,
) -> Result<Vec<ForecastEntry>, IssuanceError> {
    let mut query = PointQuery {
        time_bundle: Some(bundle.as_str().to_owned()),
        issuance_time: None,
        ..query.clone()
    };

    let data = client.point_forecast(&query).await?;
    let expected = bundle.expected_forecast_size();
    if data.len() == expected {
        return Ok(data);
    }

    let latest = data.first().ok_or(IssuanceError::EmptyForecast)?;
    let previous = previous_issuance(&latest.times.issuance_time, bundle)?;
    tracing::info!(
        message = "latest issuance incomplete, requesting previous",
        issuance_time = %latest.times.issuance_time,
        found = data.len(),
        expected = expected,
        previous = %previous,
    );

    query.issuance_time = Some(previous);
    Ok(client.point_forecast(&query).await?)
}

/// Download every forecast file of the current issuance, only if all of them are available.
pub async fn download_complete_issuance(
    client: &ForecastClient,
    bundles: &str,
    bundle: TimeBundle,
    destination: &Path,
    parallelism: usize,
) -> Result<Vec<DownloadReport>, IssuanceError> {
    let files = client.forecast_files(bundles, bundle.as_str()).await?;
    let expected = bundle.expected_forecast_size();
    if files.len() != expected {
        return Err(IssuanceError::Incomplete {
            found: files.len(),
            expected,
        });
    }

    Ok(download_all(client, &FileSource::Forecast, &files, destination, parallelism).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_bundle_from_str() {
        for bundle in [
            TimeBundle::ShortRangeHighFreq,
            TimeBundle::MediumRangeStdFreq,
            TimeBundle::MediumRangeHighFreq,
        ] {
            assert_eq!(Ok(bundle), bundle.as_str().parse::<TimeBundle>());
        }

        assert!("long_range".parse::<TimeBundle>().is_err());
    }

    #[test]
    fn test_expected_sizes() {
        assert_eq!(25, TimeBundle::ShortRangeHighFreq.expected_forecast_size());
        assert_eq!(29, TimeBundle::MediumRangeStdFreq.expected_forecast_size());
        assert_eq!(49, TimeBundle::MediumRangeHighFreq.expected_forecast_size());
    }

    #[test]
    fn test_previous_issuance() {
        assert_eq!(
            "2020-03-16T12:00:00+00:00",
            previous_issuance("2020-03-17T00:00:00+00:00", TimeBundle::MediumRangeHighFreq).unwrap()
        );
        assert_eq!(
            "2020-03-17T00:00:00+00:00",
            previous_issuance("2020-03-17T06:00:00+00:00", TimeBundle::ShortRangeHighFreq).unwrap()
        );
        assert_eq!(
            "2020-03-17T00:00:00+00:00",
            previous_issuance("2020-03-17T12:00:00Z", TimeBundle::MediumRangeStdFreq).unwrap()
        );
    }

    #[test]
    fn test_previous_issuance_invalid() {
        assert!(matches!(
            previous_issuance("yesterday", TimeBundle::ShortRangeHighFreq),
            Err(IssuanceError::InvalidIssuanceTime(..))
        ));
    }
}
