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

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wx_extract::client::{ForecastEntry, PointQuery};
use wx_extract::issuance::{last_complete_issuance, IssuanceError, TimeBundle};

const LATEST: &str = "2020-03-17T12:00:00+00:00";
const PREVIOUS: &str = "2020-03-17T00:00:00+00:00";

/// Query strings of every request received.
#[derive(Clone, Default)]
struct Requests(Arc<Mutex<Vec<HashMap<String, String>>>>);

impl Requests {
    fn all(&self) -> Vec<HashMap<String, String>> {
        self.0.lock().unwrap().clone()
    }
}

/// Latest issuance has `latest_count` entries, the one before it is complete.
fn app(requests: Requests, latest_count: usize) -> Router {
    let handler = move |State(requests): State<Requests>, Query(params): Query<HashMap<String, String>>| async move {
        requests.0.lock().unwrap().push(params.clone());
        let response: Response = match params.get("issuance_time").map(String::as_str) {
            None => Json(common::issuance(LATEST, latest_count)).into_response(),
            Some(PREVIOUS) => Json(common::issuance(PREVIOUS, 49)).into_response(),
            Some(_) => StatusCode::BAD_REQUEST.into_response(),
        };
        response
    };

    Router::new().route("/forecast/point", get(handler)).with_state(requests)
}

#[tokio::test]
async fn test_latest_issuance_complete() {
    let requests = Requests::default();
    let base = common::serve(app(requests.clone(), 49)).await;
    let client = common::client(&base, Some(common::API_KEY));

    let entries = last_complete_issuance(&client, &PointQuery::new(49.6, 6.1), TimeBundle::MediumRangeHighFreq)
        .await
        .unwrap();

    assert_eq!(49, entries.len());
    assert_eq!(LATEST, entries[0].times.issuance_time);

    let seen = requests.all();
    assert_eq!(1, seen.len());
    assert_eq!(Some("medium_range_high_freq"), seen[0].get("time_bundle").map(String::as_str));
}

#[tokio::test]
async fn test_latest_issuance_incomplete_falls_back() {
    let requests = Requests::default();
    let base = common::serve(app(requests.clone(), 7)).await;
    let client = common::client(&base, Some(common::API_KEY));

    let query = PointQuery {
        issuance_time: Some("2019-01-01T00:00:00+00:00".to_owned()),
        ..PointQuery::new(49.6, 6.1)
    };
    let entries = last_complete_issuance(&client, &query, TimeBundle::MediumRangeHighFreq)
        .await
        .unwrap();

    assert_eq!(49, entries.len());
    assert!(entries.iter().all(|e| e.times.issuance_time == PREVIOUS));

    let seen = requests.all();
    assert_eq!(2, seen.len());
    assert_eq!(None, seen[0].get("issuance_time"));
    assert_eq!(Some(PREVIOUS), seen[1].get("issuance_time").map(String::as_str));
}

#[tokio::test]
async fn test_latest_issuance_empty() {
    let base = common::serve(app(Requests::default(), 0)).await;
    let client = common::client(&base, Some(common::API_KEY));

    let res = last_complete_issuance(&client, &PointQuery::new(49.6, 6.1), TimeBundle::MediumRangeHighFreq).await;
    assert!(matches!(res, Err(IssuanceError::EmptyForecast)));
}

#[tokio::test]
async fn test_latest_issuance_unauthorized() {
    let app = Router::new().route("/forecast/point", get(|| async { StatusCode::FORBIDDEN }));
    let base = common::serve(app).await;
    let client = common::client(&base, None);

    let res = last_complete_issuance(&client, &PointQuery::new(49.6, 6.1), TimeBundle::ShortRangeHighFreq).await;
    assert!(matches!(res, Err(IssuanceError::Client(_))));
}

#[test]
fn test_wind_report_of_issuance() {
    let entries: Vec<ForecastEntry> = serde_json::from_value(common::issuance(LATEST, 3)["data"].clone()).unwrap();
    let report = wx_extract::forecast::wind_report(&entries).unwrap();

    assert_eq!(3, report.rows.len());
    let speed: f64 = report.rows[0][3].parse().unwrap();
    let direction: f64 = report.rows[0][4].parse().unwrap();
    assert!((speed - 2f64.sqrt()).abs() < 1e-9);
    assert!((direction - 225.0).abs() < 1e-9);
}
