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

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::Level;
use wx_extract::area;
use wx_extract::client::{DownloadStatus, FileSource, ForecastClient, PointQuery};
use wx_extract::download::{download_all, DownloadReport};
use wx_extract::fields::{read_grid, FieldSelector, BASIC_FIELDS};
use wx_extract::forecast;
use wx_extract::issuance::{self, TimeBundle};
use wx_extract::points::{grib_files, read_points_csv, sample_files, samples_report};
use wx_extract::region::load_region;
use wx_extract::sink::{records_report, Report};
use wx_extract::record::DataError;
use wx_extract::wind::{self, WindFields};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_TIMEOUT_MILLIS: u64 = 30000;
const DEFAULT_API_URL: &str = "https://api.wx.spire.com/";
const DEFAULT_LAT: f64 = 49.6;
const DEFAULT_LON: f64 = 6.1;
const DEFAULT_BUNDLES: &str = "basic";
const DEFAULT_ISSUANCE_PARALLELISM: usize = 4;
const DEFAULT_EXPORT_PARALLELISM: usize = 8;

#[derive(Debug, Parser)]
#[clap(name = "wx_extract", version = clap::crate_version!())]
struct WxExtractApplication {
    /// Base URL for the forecast API
    #[clap(long, global = true, default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// API key sent with every request. Required by all commands that fetch forecasts
    #[clap(long, global = true, env = "SPIRE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, global = true, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Timeout for requests to the forecast API, in milliseconds.
    #[clap(long, global = true, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Point forecast for a location: temperature and wind by default
    Point(PointArgs),

    /// Precipitation per forecast interval for a location
    Precip(PrecipArgs),

    /// Latest forecast for a location that contains every lead time
    LastIssuance(LastIssuanceArgs),

    /// Download all forecast files of the current issuance, if it is complete
    IssuanceFiles(IssuanceFilesArgs),

    /// Download every file of a data export
    Export(ExportArgs),

    /// Extract fields of a GRIB2 file inside a GeoJSON region
    Crop(CropArgs),

    /// Sample fields of a directory of GRIB2 files at locations listed in a CSV file
    Points(PointsArgs),
}

#[derive(Debug, Args)]
struct Location {
    /// Latitude of the location, in degrees
    #[clap(long, default_value_t = DEFAULT_LAT, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude of the location, in degrees
    #[clap(long, default_value_t = DEFAULT_LON, allow_negative_numbers = true)]
    lon: f64,
}

#[derive(Debug, Args)]
struct PointArgs {
    #[clap(flatten)]
    location: Location,

    /// Comma separated data bundles to request
    #[clap(long)]
    bundles: Option<String>,

    /// Lead times to request: short_range_high_freq, medium_range_std_freq or medium_range_high_freq
    #[clap(long)]
    time_bundle: Option<TimeBundle>,

    /// Only return forecasts valid within this many hours from now
    #[clap(long)]
    valid_within_hours: Option<u32>,

    /// Show every returned value instead of temperature and wind
    #[clap(long)]
    all_values: bool,

    /// Write the table to this CSV file instead of printing it
    #[clap(long)]
    csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct PrecipArgs {
    #[clap(flatten)]
    location: Location,

    /// Comma separated data bundles to request
    #[clap(long, default_value_t = DEFAULT_BUNDLES.into())]
    bundles: String,

    /// Lead times to request
    #[clap(long, default_value_t = TimeBundle::MediumRangeStdFreq)]
    time_bundle: TimeBundle,

    /// Write the table to this CSV file instead of printing it
    #[clap(long)]
    csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct LastIssuanceArgs {
    #[clap(flatten)]
    location: Location,

    /// Comma separated data bundles to request
    #[clap(long)]
    bundles: Option<String>,

    /// Lead times that make up a complete issuance
    #[clap(long, default_value_t = TimeBundle::MediumRangeHighFreq)]
    time_bundle: TimeBundle,

    /// Show every returned value instead of temperature and wind
    #[clap(long)]
    all_values: bool,

    /// Write the table to this CSV file instead of printing it
    #[clap(long)]
    csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct IssuanceFilesArgs {
    /// Comma separated data bundles to download
    #[clap(long, default_value_t = DEFAULT_BUNDLES.into())]
    bundles: String,

    /// Lead times that make up a complete issuance
    #[clap(long, default_value_t = TimeBundle::MediumRangeStdFreq)]
    time_bundle: TimeBundle,

    /// Directory to write files to
    #[clap(long, default_value = ".")]
    output_directory: PathBuf,

    /// Number of files to download at the same time
    #[clap(long, default_value_t = DEFAULT_ISSUANCE_PARALLELISM)]
    parallelism: usize,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// ID of the data export
    export_id: String,

    /// Number of files to download at the same time
    #[clap(long, default_value_t = DEFAULT_EXPORT_PARALLELISM)]
    parallelism: usize,

    /// Directory to write files to
    #[clap(long, default_value = ".")]
    prefix: PathBuf,
}

#[derive(Debug, Args)]
struct CropArgs {
    /// GRIB2 file to read
    grib: PathBuf,

    /// GeoJSON file with the polygons of the region to keep
    #[clap(long)]
    region: PathBuf,

    /// Comma separated fields to extract, by catalog name or NAME=D.C.N[/SURFACE[@LEVEL]].
    /// Altitude levels may be written as flight levels, e.g. CAT_P0_L102_GLL0@FL100
    #[clap(long, value_delimiter = ',', default_value = "TMP_P0_L103_GLL0")]
    fields: Vec<String>,

    /// Earlier GRIB2 file of the same forecast whose fields are subtracted, turning
    /// accumulated values like APCP_P8_L1_GLL0_acc into the amount between the two files
    #[clap(long)]
    minus: Option<PathBuf>,

    /// Eastward and northward wind fields (comma separated) to derive wind speed and direction from
    #[clap(long, value_parser = parse_wind_fields)]
    wind: Option<WindFields>,

    /// Write the records to this CSV file instead of printing them
    #[clap(long)]
    csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct PointsArgs {
    /// CSV file with latitude and longitude columns
    points_csv: PathBuf,

    /// Directory containing GRIB2 forecast files
    data_dir: PathBuf,

    /// Comma separated fields to sample. Defaults to the fields of the basic bundle
    #[clap(long, value_delimiter = ',')]
    variables: Vec<String>,

    /// CSV file to write samples to
    #[clap(long, default_value = "output.csv")]
    output: PathBuf,
}

fn parse_wind_fields(s: &str) -> Result<WindFields, String> {
    match s.split_once(',') {
        Some((u, v)) if !u.trim().is_empty() && !v.trim().is_empty() => Ok(WindFields::new(u.trim(), v.trim())),
        _ => Err(format!("expected EASTWARD,NORTHWARD field names, got {}", s)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let opts = WxExtractApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .with_writer(io::stderr)
            .finish(),
    )?;

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = ForecastClient::new(http_client, &opts.api_url, opts.api_key.clone()).unwrap_or_else(|e| {
        tracing::error!(message = "invalid API URL", api_url = %opts.api_url, error = %e);
        process::exit(1)
    });

    let res = match opts.command {
        Command::Point(args) => point(&client, args).await,
        Command::Precip(args) => precip(&client, args).await,
        Command::LastIssuance(args) => last_issuance(&client, args).await,
        Command::IssuanceFiles(args) => issuance_files(&client, args).await,
        Command::Export(args) => export(&client, args).await,
        Command::Crop(args) => crop(args),
        Command::Points(args) => points(args),
    };

    if let Err(e) = res {
        tracing::error!(message = "command failed", error = %e);
        process::exit(1);
    }

    Ok(())
}

fn require_api_key(client: &ForecastClient) -> Result<(), Box<dyn Error>> {
    if client.has_api_key() {
        Ok(())
    } else {
        Err("an API key is required, set SPIRE_API_KEY or use --api-key".into())
    }
}

fn emit(report: &Report, csv: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match csv {
        Some(path) => report.save_csv(path)?,
        None => println!("{}", report.to_table()),
    }

    Ok(())
}

fn log_dropped(what: &str, dropped: &[DataError]) {
    if let Some(first) = dropped.first() {
        tracing::warn!(message = "dropped invalid records", kind = what, dropped = dropped.len(), first_error = %first);
    }
}

fn print_downloads(reports: &[DownloadReport]) {
    for r in reports {
        match &r.result {
            Ok(DownloadStatus::Downloaded { .. }) | Ok(DownloadStatus::AlreadyPresent) => println!("{}", r.path),
            Ok(DownloadStatus::NotFound) => println!("Failed to download {}: not found", r.path),
            Err(e) => println!("Failed to download {}: {}", r.path, e),
        }
    }
}

async fn point(client: &ForecastClient, args: PointArgs) -> Result<(), Box<dyn Error>> {
    require_api_key(client)?;

    let query = PointQuery {
        bundles: args.bundles,
        time_bundle: args.time_bundle.map(|b| b.as_str().to_owned()),
        ..PointQuery::new(args.location.lat, args.location.lon)
    };
    let query = match args.valid_within_hours {
        Some(hours) => query.valid_within(Utc::now(), hours),
        None => query,
    };

    let entries = client.point_forecast(&query).await?;
    tracing::info!(message = "fetched point forecast", entries = entries.len());

    let report = if args.all_values {
        forecast::values_report(&entries)
    } else {
        forecast::wind_report(&entries)?
    };

    emit(&report, args.csv.as_deref())
}

async fn precip(client: &ForecastClient, args: PrecipArgs) -> Result<(), Box<dyn Error>> {
    require_api_key(client)?;

    let query = PointQuery {
        bundles: Some(args.bundles),
        time_bundle: Some(args.time_bundle.as_str().to_owned()),
        ..PointQuery::new(args.location.lat, args.location.lon)
    };

    let entries = client.point_forecast(&query).await?;
    emit(&forecast::precipitation_report(&entries)?, args.csv.as_deref())
}

async fn last_issuance(client: &ForecastClient, args: LastIssuanceArgs) -> Result<(), Box<dyn Error>> {
    require_api_key(client)?;

    let query = PointQuery {
        bundles: args.bundles,
        ..PointQuery::new(args.location.lat, args.location.lon)
    };

    let entries = issuance::last_complete_issuance(client, &query, args.time_bundle).await?;
    if let Some(first) = entries.first() {
        tracing::info!(
            message = "found complete issuance",
            issuance_time = %first.times.issuance_time,
            entries = entries.len(),
        );
    }

    let report = if args.all_values {
        forecast::values_report(&entries)
    } else {
        forecast::wind_report(&entries)?
    };

    emit(&report, args.csv.as_deref())
}

async fn issuance_files(client: &ForecastClient, args: IssuanceFilesArgs) -> Result<(), Box<dyn Error>> {
    require_api_key(client)?;

    let reports = issuance::download_complete_issuance(
        client,
        &args.bundles,
        args.time_bundle,
        &args.output_directory,
        args.parallelism,
    )
    .await?;

    print_downloads(&reports);
    Ok(())
}

async fn export(client: &ForecastClient, args: ExportArgs) -> Result<(), Box<dyn Error>> {
    let files = client.export_files(&args.export_id).await?;
    tracing::info!(message = "listed export files", export_id = %args.export_id, files = files.len());

    let source = FileSource::Export(args.export_id);
    let reports = download_all(client, &source, &files, &args.prefix, args.parallelism).await;
    print_downloads(&reports);
    Ok(())
}

fn crop(args: CropArgs) -> Result<(), Box<dyn Error>> {
    let region = load_region(&args.region)?;

    let mut names = args.fields;
    if let Some(w) = &args.wind {
        for name in [&w.eastward, &w.northward] {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }

    let selectors = names
        .iter()
        .map(|n| FieldSelector::parse(n))
        .collect::<Result<Vec<_>, _>>()?;
    let data = read_grid(&args.grib, &selectors)?;
    let data = match &args.minus {
        Some(earlier) => data.difference(&read_grid(earlier, &selectors)?)?,
        None => data,
    };

    let (records, dropped) = data.records();
    log_dropped("grid points", &dropped);
    let records = area::filter(records, &region);
    tracing::info!(message = "cropped grid to region", grid_points = data.grid().len(), kept = records.len());

    let records = match &args.wind {
        Some(w) => {
            let (records, dropped) = wind::derive_wind_all(&records, w);
            log_dropped("records without wind", &dropped);
            records
        }
        None => records,
    };

    emit(&records_report(&records, &[]), args.csv.as_deref())
}

fn points(args: PointsArgs) -> Result<(), Box<dyn Error>> {
    let names: Vec<String> = if args.variables.is_empty() {
        BASIC_FIELDS.iter().map(|s| s.to_string()).collect()
    } else {
        args.variables
    };

    let selectors = names
        .iter()
        .map(|n| FieldSelector::parse(n))
        .collect::<Result<Vec<_>, _>>()?;
    let locations = read_points_csv(&args.points_csv)?;
    let files = grib_files(&args.data_dir)?;
    if files.is_empty() {
        return Err(format!("no GRIB2 files found in {}", args.data_dir.display()).into());
    }

    tracing::info!(message = "sampling forecast files", files = files.len(), points = locations.len());
    let samples = sample_files(&files, &selectors, &locations)?;
    samples_report(&samples).save_csv(&args.output)?;
    Ok(())
}
