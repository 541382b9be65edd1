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

mod common;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use chrono::{DateTime, Utc};
use wx_extract::client::{ClientError, PointQuery};

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("spire-api-key")
        .map_or(false, |v| v.as_bytes() == common::API_KEY.as_bytes())
}

async fn point(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if params.get("lat").map(String::as_str) != Some("49.6") || params.get("lon").map(String::as_str) != Some("6.1") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let echo = if params.contains_key("time_bundle") { 1.0 } else { 0.0 };
    Json(json!({
        "data": [
            common::entry(
                "2020-03-17T00:00:00+00:00",
                "2020-03-17T00:00:00+00:00",
                json!({"air_temperature": 281.5, "eastward_wind": 3.0, "northward_wind": 4.0}),
            ),
            common::entry(
                "2020-03-17T00:00:00+00:00",
                "2020-03-17T06:00:00+00:00",
                json!({"air_temperature": null, "bundle_echo": echo}),
            ),
        ]
    }))
    .into_response()
}

/// Accepts only an interval of an RFC 3339 instant followed by a duration.
async fn point_interval(Query(params): Query<HashMap<String, String>>) -> Response {
    let valid = params
        .get("valid_time_interval")
        .and_then(|i| i.split_once('/'))
        .map_or(false, |(start, duration)| {
            DateTime::parse_from_rfc3339(start).is_ok() && duration == "P0DT15H"
        });

    if !valid {
        return StatusCode::BAD_REQUEST.into_response();
    }

    Json(json!({
        "data": [common::entry(
            "2020-03-17T00:00:00+00:00",
            "2020-03-17T06:00:00+00:00",
            json!({"air_temperature": 280.0}),
        )]
    }))
    .into_response()
}

fn app() -> Router {
    Router::new()
        .route("/forecast/point", get(point))
        .route(
            "/forecast/file",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let name = format!(
                    "sof-d.20200317.t00z.0p125.{}.global.f000.grib2",
                    params.get("bundles").cloned().unwrap_or_default()
                );
                Json(json!({ "files": [name] }))
            }),
        )
        .route("/export/empty", get(|| async { Json(json!({ "meta": {} })) }))
        .route(
            "/export/abc",
            get(|| async { Json(json!({ "files": ["2020/03/a.grib2", "2020/03/b.grib2"] })) }),
        )
        .route("/broken/forecast/point", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/interval/forecast/point", get(point_interval))
        .route("/nodata/forecast/point", get(|| async { Json(json!({ "meta": {} })) }))
}

#[tokio::test]
async fn test_point_forecast() {
    let base = common::serve(app()).await;
    let client = common::client(&base, Some(common::API_KEY));

    let entries = client.point_forecast(&PointQuery::new(49.6, 6.1)).await.unwrap();
    assert_eq!(2, entries.len());
    assert_eq!(Some(281.5), entries[0].value("air_temperature"));
    assert_eq!(None, entries[1].value("air_temperature"));
    assert_eq!(Some(0.0), entries[1].value("bundle_echo"));
}

#[tokio::test]
async fn test_point_forecast_optional_params() {
    let base = common::serve(app()).await;
    let client = common::client(&base, Some(common::API_KEY));

    let query = PointQuery {
        time_bundle: Some("short_range_high_freq".to_owned()),
        ..PointQuery::new(49.6, 6.1)
    };
    let entries = client.point_forecast(&query).await.unwrap();
    assert_eq!(Some(1.0), entries[1].value("bundle_echo"));
}

#[tokio::test]
async fn test_point_forecast_valid_time_interval() {
    let base = common::serve(app()).await;
    let client = common::client(&format!("{}interval/", base), Some(common::API_KEY));

    let query = PointQuery::new(49.6, 6.1).valid_within(Utc::now(), 15);
    let entries = client.point_forecast(&query).await.unwrap();
    assert_eq!(1, entries.len());

    let literal = PointQuery {
        valid_time_interval: Some("now/P0DT15H".to_owned()),
        ..PointQuery::new(49.6, 6.1)
    };
    assert!(matches!(
        client.point_forecast(&literal).await,
        Err(ClientError::Unexpected(StatusCode::BAD_REQUEST, _))
    ));
}

#[tokio::test]
async fn test_point_forecast_without_key() {
    let base = common::serve(app()).await;
    let client = common::client(&base, None);

    let res = client.point_forecast(&PointQuery::new(49.6, 6.1)).await;
    assert!(matches!(res, Err(ClientError::Unauthorized(StatusCode::UNAUTHORIZED))));
}

#[tokio::test]
async fn test_point_forecast_unexpected_status() {
    let base = common::serve(app()).await;
    let client = common::client(&format!("{}broken/", base), Some(common::API_KEY));

    let res = client.point_forecast(&PointQuery::new(49.6, 6.1)).await;
    assert!(matches!(
        res,
        Err(ClientError::Unexpected(StatusCode::INTERNAL_SERVER_ERROR, _))
    ));
}

#[tokio::test]
async fn test_point_forecast_missing_data() {
    let base = common::serve(app()).await;
    let client = common::client(&format!("{}nodata/", base), Some(common::API_KEY));

    let res = client.point_forecast(&PointQuery::new(49.6, 6.1)).await;
    assert!(matches!(res, Err(ClientError::MissingElement("data"))));
}

#[tokio::test]
async fn test_forecast_files() {
    let base = common::serve(app()).await;
    let client = common::client(&base, Some(common::API_KEY));

    let files = client.forecast_files("basic", "medium_range_std_freq").await.unwrap();
    assert_eq!(vec!["sof-d.20200317.t00z.0p125.basic.global.f000.grib2"], files);
}

#[tokio::test]
async fn test_export_files() {
    let base = common::serve(app()).await;
    let client = common::client(&base, None);

    let files = client.export_files("abc").await.unwrap();
    assert_eq!(vec!["2020/03/a.grib2", "2020/03/b.grib2"], files);
}

#[tokio::test]
async fn test_export_files_missing_element() {
    let base = common::serve(app()).await;
    let client = common::client(&base, None);

    let res = client.export_files("empty").await;
    assert!(matches!(res, Err(ClientError::MissingElement("files"))));
}

#[tokio::test]
async fn test_export_files_not_found() {
    let base = common::serve(app()).await;
    let client = common::client(&base, None);

    let res = client.export_files("does-not-exist").await;
    assert!(matches!(res, Err(ClientError::NotFound(_))));
}
