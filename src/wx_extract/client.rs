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

use crate::record::DataError;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::StreamExt;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    Io(io::Error),
    InvalidUrl(String),
    InvalidPath(String),
    NotFound(Url),
    Unauthorized(StatusCode),
    Unexpected(StatusCode, Url),
    MissingElement(&'static str),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "{}", e),
            Self::InvalidUrl(s) => write!(f, "invalid base URL {}", s),
            Self::InvalidPath(s) => write!(f, "invalid remote file path {}", s),
            Self::NotFound(url) => write!(f, "not found {}", url),
            Self::Unauthorized(status) => write!(f, "request not authorized ({}), check the API key", status),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::MissingElement(e) => write!(f, "response did not contain a {} element", e),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Parameters of a point forecast request. Only `lat` and `lon` are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointQuery {
    pub lat: f64,
    pub lon: f64,
    pub bundles: Option<String>,
    pub time_bundle: Option<String>,
    pub valid_time_interval: Option<String>,
    pub issuance_time: Option<String>,
}

impl PointQuery {
    pub fn new(lat: f64, lon: f64) -> Self {
        PointQuery {
            lat,
            lon,
            ..Default::default()
        }
    }

    /// Only return forecasts valid between `start` and `hours` later.
    pub fn valid_within(self, start: DateTime<Utc>, hours: u32) -> Self {
        PointQuery {
            valid_time_interval: Some(valid_time_interval(start, hours)),
            ..self
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("lat", self.lat.to_string()), ("lon", self.lon.to_string())];
        let optional = [
            ("bundles", &self.bundles),
            ("time_bundle", &self.time_bundle),
            ("valid_time_interval", &self.valid_time_interval),
            ("issuance_time", &self.issuance_time),
        ];

        for (name, value) in optional {
            if let Some(v) = value {
                params.push((name, v.clone()));
            }
        }

        params
    }
}

/// ISO 8601 interval starting at `start` and lasting `hours`, like
/// `2020-03-17T06:00:00Z/P0DT15H`.
pub fn valid_time_interval(start: DateTime<Utc>, hours: u32) -> String {
    format!("{}/P0DT{}H", start.to_rfc3339_opts(SecondsFormat::Secs, true), hours)
}

/// Where a downloadable file lives: the forecast file API or a data export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Forecast,
    Export(String),
}

/// Result of a download that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloaded { bytes: u64 },
    AlreadyPresent,
    NotFound,
}

/// Client for the Spire Weather API: point forecasts, forecast files, and data exports.
#[derive(Debug)]
pub struct ForecastClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ForecastClient {
    const USER_AGENT: &'static str = concat!("wx_extract/", env!("CARGO_PKG_VERSION"));
    const JSON_RESPONSE: &'static str = "application/json";
    const ANY_RESPONSE: &'static str = "*/*";
    const API_KEY_HEADER: &'static str = "spire-api-key";

    pub fn new(client: Client, base_url: &str, api_key: Option<String>) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(ForecastClient {
            client,
            base_url,
            api_key,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Forecast entries for a single location, ordered by valid time.
    pub async fn point_forecast(&self, query: &PointQuery) -> Result<Vec<ForecastEntry>, ClientError> {
        let request_url = self.url(["forecast", "point"]);
        tracing::debug!(message = "making point forecast request", url = %request_url, lat = query.lat, lon = query.lon);

        let res = self.make_request(request_url, &query.params(), Self::JSON_RESPONSE).await?;
        let body = res.json::<PointResponse>().await.map_err(ClientError::Internal)?;
        body.data.ok_or(ClientError::MissingElement("data"))
    }

    /// Names of the forecast files currently available for the bundles and time bundle.
    pub async fn forecast_files(&self, bundles: &str, time_bundle: &str) -> Result<Vec<String>, ClientError> {
        let request_url = self.url(["forecast", "file"]);
        tracing::debug!(message = "making forecast file list request", url = %request_url);

        let params = [("bundles", bundles.to_owned()), ("time_bundle", time_bundle.to_owned())];
        let res = self.make_request(request_url, &params, Self::JSON_RESPONSE).await?;
        let body = res.json::<FileListResponse>().await.map_err(ClientError::Internal)?;
        body.files.ok_or(ClientError::MissingElement("files"))
    }

    /// Paths of every file in a data export.
    pub async fn export_files(&self, export_id: &str) -> Result<Vec<String>, ClientError> {
        let request_url = self.url(["export", export_id]);
        tracing::debug!(message = "making export file list request", url = %request_url);

        let res = self.make_request(request_url, &[], Self::JSON_RESPONSE).await?;
        let body = res.json::<FileListResponse>().await.map_err(ClientError::Internal)?;
        body.files.ok_or(ClientError::MissingElement("files"))
    }

    /// Stream one remote file to `destination/path`.
    ///
    /// Nothing is fetched if the local file already exists. The body is written to a
    /// `.part` file that is renamed once complete and removed on failure, so a local file
    /// is never left half written under its final name.
    pub async fn download(
        &self,
        source: &FileSource,
        path: &str,
        destination: &Path,
    ) -> Result<DownloadStatus, ClientError> {
        let local = local_path(destination, path)?;
        if fs::metadata(&local).await.is_ok() {
            return Ok(DownloadStatus::AlreadyPresent);
        }

        let request_url = self.file_url(source, path);
        tracing::debug!(message = "making file download request", url = %request_url);

        let res = match self.make_request(request_url, &[], Self::ANY_RESPONSE).await {
            Ok(res) => res,
            Err(ClientError::NotFound(_)) => return Ok(DownloadStatus::NotFound),
            Err(e) => return Err(e),
        };

        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(&local);
        match write_body(res, &partial).await {
            Ok(bytes) => {
                fs::rename(&partial, &local).await?;
                Ok(DownloadStatus::Downloaded { bytes })
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    tracing::warn!(message = "unable to remove partial download", path = %partial.display(), error = %cleanup);
                }
                Err(e)
            }
        }
    }

    async fn make_request(
        &self,
        url: Url,
        params: &[(&'static str, String)],
        accept: &'static str,
    ) -> Result<Response, ClientError> {
        let mut req = self
            .client
            .get(url.clone())
            .query(params)
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, accept);

        if let Some(key) = &self.api_key {
            req = req.header(Self::API_KEY_HEADER, key);
        }

        let res = req.send().await.map_err(ClientError::Internal)?;
        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else if status == StatusCode::NOT_FOUND {
            Err(ClientError::NotFound(url))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(ClientError::Unauthorized(status))
        } else {
            Err(ClientError::Unexpected(status, url))
        }
    }

    fn file_url(&self, source: &FileSource, path: &str) -> Url {
        let prefix = match source {
            FileSource::Forecast => vec!["forecast", "file"],
            FileSource::Export(id) => vec!["export", id.as_str()],
        };

        self.url(prefix.into_iter().chain(path.split('/').filter(|s| !s.is_empty())))
    }

    fn url<'a, I>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always has path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }
}

/// Local destination for a remote path, refusing anything that would escape `destination`.
fn local_path(destination: &Path, path: &str) -> Result<PathBuf, ClientError> {
    let relative = Path::new(path);
    let is_plain = relative.components().all(|c| matches!(c, Component::Normal(_)));
    if path.is_empty() || !is_plain {
        return Err(ClientError::InvalidPath(path.to_owned()));
    }

    Ok(destination.join(relative))
}

fn partial_path(local: &Path) -> PathBuf {
    let mut name = local.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_body(res: Response, partial: &Path) -> Result<u64, ClientError> {
    let mut file = fs::File::create(partial).await?;
    let mut stream = res.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ClientError::Internal)?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

#[derive(Deserialize, Debug)]
struct PointResponse {
    data: Option<Vec<ForecastEntry>>,
}

#[derive(Deserialize, Debug)]
struct FileListResponse {
    files: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub times: ForecastTimes,
    #[serde(default)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl ForecastEntry {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    pub fn require(&self, name: &str) -> Result<f64, DataError> {
        self.value(name).ok_or_else(|| DataError::MissingField(name.to_owned()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ForecastTimes {
    pub issuance_time: String,
    pub valid_time: String,
}
