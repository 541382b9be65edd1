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

use axum::Router;
use reqwest::Client;
use serde_json::{json, Value};
use wx_extract::client::ForecastClient;

pub const API_KEY: &str = "test-key";

/// Serve the router on an ephemeral local port, returning its base URL.
pub async fn serve(app: Router) -> String {
    let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);
    format!("http://{}/", addr)
}

pub fn client(base_url: &str, api_key: Option<&str>) -> ForecastClient {
    ForecastClient::new(Client::new(), base_url, api_key.map(str::to_owned)).unwrap()
}

/// Point forecast entry as returned by the API.
#[allow(dead_code)]
pub fn entry(issuance_time: &str, valid_time: &str, values: Value) -> Value {
    json!({
        "location": {"coordinates": {"lat": 49.6, "lon": 6.1}},
        "times": {"issuance_time": issuance_time, "valid_time": valid_time},
        "values": values,
    })
}

/// `count` hourly entries of one issuance.
#[allow(dead_code)]
pub fn issuance(issuance_time: &str, count: usize) -> Value {
    let entries: Vec<Value> = (0..count)
        .map(|i| {
            entry(
                issuance_time,
                &format!("lead+{}h", i),
                json!({"air_temperature": 280.0, "eastward_wind": 1.0, "northward_wind": 1.0}),
            )
        })
        .collect();

    json!({ "data": entries })
}
