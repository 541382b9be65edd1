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

//! Restrict geo-tagged records to a polygonal region.
//!
//! Filtering happens in two stages: a cheap bounding box test that throws away most
//! records of a global grid, followed by an exact point-in-polygon test against each
//! feature of the region. All functions keep the relative order of their input.

use crate::record::GeoRecord;
use crate::region::{BoundingBox, Region};

/// Bounding box of the region, `None` if the region has no features.
pub fn bounding_box(region: &Region) -> Option<BoundingBox> {
    region.bounding_box()
}

/// Keep records inside the box, edges included.
///
/// Never drops a record `precise_filter` would keep but may keep records it would drop.
pub fn coarse_filter<I>(records: I, bbox: &BoundingBox) -> Vec<GeoRecord>
where
    I: IntoIterator<Item = GeoRecord>,
{
    records
        .into_iter()
        .filter(|r| bbox.contains(r.latitude(), r.longitude()))
        .collect()
}

/// Keep records contained by any feature of the region. Points on a feature boundary
/// are not contained.
pub fn precise_filter<I>(records: I, region: &Region) -> Vec<GeoRecord>
where
    I: IntoIterator<Item = GeoRecord>,
{
    records
        .into_iter()
        .filter(|r| region.contains(r.latitude(), r.longitude()))
        .collect()
}

/// Keep exactly the records inside the region. A region without features keeps nothing.
pub fn filter<I>(records: I, region: &Region) -> Vec<GeoRecord>
where
    I: IntoIterator<Item = GeoRecord>,
{
    match bounding_box(region) {
        Some(bbox) => {
            let candidates = coarse_filter(records, &bbox);
            let kept = precise_filter(candidates, region);
            tracing::debug!(message = "filtered records to region", kept = kept.len());
            kept
        }
        None => Vec::new(),
    }
}
