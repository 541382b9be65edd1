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

use crate::client::{ClientError, DownloadStatus, FileSource, ForecastClient};
use futures::stream::{self, StreamExt};
use std::path::Path;

/// Outcome of downloading a single file.
#[derive(Debug)]
pub struct DownloadReport {
    pub path: String,
    pub result: Result<DownloadStatus, ClientError>,
}

impl DownloadReport {
    /// Downloaded now or already on disk. A file missing on the remote side is a failure.
    pub fn is_success(&self) -> bool {
        matches!(
            self.result,
            Ok(DownloadStatus::Downloaded { .. }) | Ok(DownloadStatus::AlreadyPresent)
        )
    }
}

/// Download every file with at most `parallelism` requests in flight.
///
/// Each download is independent and best effort: a failure does not stop the others
/// and nothing is retried. Reports are returned once every download has finished, in
/// the same order as `files`.
pub async fn download_all(
    client: &ForecastClient,
    source: &FileSource,
    files: &[String],
    destination: &Path,
    parallelism: usize,
) -> Vec<DownloadReport> {
    let mut reports: Vec<(usize, DownloadReport)> = stream::iter(files.iter().enumerate())
        .map(|(i, path)| async move {
            let result = client.download(source, path, destination).await;
            match &result {
                Ok(status) => {
                    tracing::debug!(message = "finished download", path = %path, status = ?status);
                }
                Err(e) => {
                    tracing::warn!(message = "download failed", path = %path, error = %e);
                }
            }

            (
                i,
                DownloadReport {
                    path: path.clone(),
                    result,
                },
            )
        })
        .buffer_unordered(parallelism.max(1))
        .collect()
        .await;

    reports.sort_by_key(|(i, _)| *i);
    let reports: Vec<DownloadReport> = reports.into_iter().map(|(_, r)| r).collect();

    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    tracing::info!(
        message = "download cycle complete",
        success = succeeded,
        failed = reports.len() - succeeded,
    );

    reports
}
