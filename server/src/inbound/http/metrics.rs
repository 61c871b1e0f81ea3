//! Time-range series APIs: service metrics, availability, and remote probe
//! response times.

use std::collections::BTreeMap;

use actix_web::web;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::range::parse_range;
use crate::outbound::persistence::{MetricPoint, Store};

use super::error::{ApiError, ApiResult, run_blocking};
use super::{iso8601, iso8601_collected};

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub host_id: String,
    pub service: String,
    pub range: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub host_id: String,
    pub range: String,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub host_id: String,
    pub hostname: String,
    pub service: String,
    pub start_time: String,
    pub end_time: String,
    pub metrics: Vec<Series>,
}

/// One series: parallel timestamp and value arrays, ascending.
#[derive(Debug, Serialize)]
pub struct Series {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub timestamps: Vec<String>,
    pub values: Vec<f64>,
}

/// Group raw points by (metric_type, metric_name). Points arrive ordered by
/// `collected_at`, so each series stays ascending.
pub(crate) fn group_series(points: Vec<MetricPoint>, scale: f64) -> Vec<Series> {
    let mut grouped: BTreeMap<(String, String), Series> = BTreeMap::new();
    for point in points {
        let key = (point.metric_type.clone(), point.metric_name.clone());
        let series = grouped.entry(key).or_insert_with(|| Series {
            name: point.metric_name.clone(),
            metric_type: point.metric_type.clone(),
            timestamps: Vec::new(),
            values: Vec::new(),
        });
        series.timestamps.push(iso8601_collected(point.collected_at));
        series.values.push(point.value * scale);
    }
    grouped.into_values().collect()
}

struct Window {
    t0: f64,
    t1: f64,
    start_time: String,
    end_time: String,
}

fn window(range: &str) -> Result<Window, ApiError> {
    let duration = parse_range(range).map_err(|err| ApiError::bad_request(err.to_string()))?;
    let now = Utc::now().timestamp();
    let t0 = now - duration.as_secs() as i64;
    Ok(Window {
        t0: t0 as f64,
        t1: now as f64,
        start_time: iso8601(t0),
        end_time: iso8601(now),
    })
}

/// Hostname for a series response; falls back to the id when the lookup
/// finds nothing.
fn hostname_or_id(store: &Store, host_id: &str) -> String {
    store
        .hostname(host_id)
        .ok()
        .flatten()
        .unwrap_or_else(|| host_id.to_owned())
}

pub async fn metrics_series(
    store: web::Data<Store>,
    query: web::Query<SeriesQuery>,
) -> ApiResult<web::Json<SeriesResponse>> {
    let SeriesQuery {
        host_id,
        service,
        range,
    } = query.into_inner();
    let window = window(&range)?;
    let store = store.get_ref().clone();

    let response = run_blocking(move || {
        let points = store.metrics_range(&host_id, &service, window.t0, window.t1)?;
        Ok(SeriesResponse {
            hostname: hostname_or_id(&store, &host_id),
            host_id,
            service,
            start_time: window.start_time,
            end_time: window.end_time,
            metrics: group_series(points, 1.0),
        })
    })
    .await?;
    Ok(web::Json(response))
}

pub async fn availability_series(
    store: web::Data<Store>,
    query: web::Query<AvailabilityQuery>,
) -> ApiResult<web::Json<SeriesResponse>> {
    let AvailabilityQuery { host_id, range } = query.into_inner();
    let window = window(&range)?;
    let store = store.get_ref().clone();

    let response = run_blocking(move || {
        let points = store.availability_range(&host_id, window.t0, window.t1)?;
        Ok(SeriesResponse {
            hostname: hostname_or_id(&store, &host_id),
            host_id,
            service: String::new(),
            start_time: window.start_time,
            end_time: window.end_time,
            metrics: group_series(points, 1.0),
        })
    })
    .await?;
    Ok(web::Json(response))
}

/// Probe response times are persisted in seconds; this surface reports
/// milliseconds.
pub async fn remote_metrics_series(
    store: web::Data<Store>,
    query: web::Query<SeriesQuery>,
) -> ApiResult<web::Json<SeriesResponse>> {
    let SeriesQuery {
        host_id,
        service,
        range,
    } = query.into_inner();
    let window = window(&range)?;
    let store = store.get_ref().clone();

    let response = run_blocking(move || {
        let points = store.remote_metrics_range(&host_id, &service, window.t0, window.t1)?;
        Ok(SeriesResponse {
            hostname: hostname_or_id(&store, &host_id),
            host_id,
            service,
            start_time: window.start_time,
            end_time: window.end_time,
            metrics: group_series(points, 1000.0),
        })
    })
    .await?;
    Ok(web::Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(metric_type: &str, name: &str, value: f64, at: f64) -> MetricPoint {
        MetricPoint {
            metric_type: metric_type.to_owned(),
            metric_name: name.to_owned(),
            value,
            collected_at: at,
        }
    }

    #[test]
    fn grouping_splits_by_type_and_name() {
        let series = group_series(
            vec![
                point("cpu", "user", 10.0, 100.0),
                point("cpu", "system", 5.0, 100.0),
                point("cpu", "user", 12.0, 160.0),
                point("memory", "percent", 40.0, 100.0),
            ],
            1.0,
        );

        assert_eq!(series.len(), 3);
        let user = series
            .iter()
            .find(|s| s.metric_type == "cpu" && s.name == "user")
            .expect("user series");
        assert_eq!(user.values, vec![10.0, 12.0]);
        assert_eq!(user.timestamps.len(), 2);
    }

    #[test]
    fn scale_converts_seconds_to_milliseconds() {
        let series = group_series(vec![point("icmp", "responsetime", 0.004, 100.0)], 1000.0);
        assert_eq!(series[0].values, vec![4.0]);
    }
}
