//! Endpoint coverage for the query, action, and product-compatible
//! surfaces, driven through the real route table against a tempfile store.

use std::sync::{Arc, Mutex};

use actix_web::{App, test, web};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use tempfile::TempDir;

use crate::domain::model::{
    AgentEvent, ControlTarget, DirectoryDetail, FilesystemDetail, HostInfo, LoadAverages,
    ServiceDetail, ServiceKind, ServiceRecord, Snapshot, StorageUsage, SystemCpu, SystemDetail,
    SystemMemory,
};
use crate::domain::ports::{AgentAction, AgentCommander, ControlError};
use crate::outbound::persistence::Store;

use super::configure;

struct RecordingCommander {
    calls: Mutex<Vec<(String, &'static str)>>,
    outcome: Option<ControlError>,
}

impl RecordingCommander {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            outcome: None,
        })
    }

    fn failing(error: ControlError) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            outcome: Some(error),
        })
    }
}

#[async_trait]
impl AgentCommander for RecordingCommander {
    async fn perform(
        &self,
        _target: &ControlTarget,
        service: &str,
        action: AgentAction,
    ) -> Result<(), ControlError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((service.to_owned(), action.as_str()));
        match &self.outcome {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

macro_rules! web_app {
    ($store:expr, $commander:expr) => {{
        let commander: Arc<dyn AgentCommander> = $commander;
        test::init_service(
            App::new()
                .app_data(web::Data::new($store.clone()))
                .app_data(web::Data::from(commander))
                .configure(configure),
        )
        .await
    }};
}

fn host(id: &str, hostname: &str) -> HostInfo {
    HostInfo {
        id: id.to_owned(),
        hostname: hostname.to_owned(),
        version: "5.35".to_owned(),
        incarnation: 1_700_000_000,
        uptime: Some(7200),
        poll_interval: Some(30),
        control: Some(ControlTarget {
            address: "10.0.0.5".to_owned(),
            port: 2812,
            ssl: false,
            username: "admin".to_owned(),
            password: "pw".to_owned(),
        }),
    }
}

fn directory_service(name: &str, status: i64, collected_at: f64) -> ServiceRecord {
    ServiceRecord {
        name: name.to_owned(),
        kind: ServiceKind::Directory,
        status,
        monitor: 1,
        collected_at,
        detail: ServiceDetail::Directory(DirectoryDetail::default()),
    }
}

fn system_service(name: &str, collected_at: f64) -> ServiceRecord {
    ServiceRecord {
        name: name.to_owned(),
        kind: ServiceKind::System,
        status: 0,
        monitor: 1,
        collected_at,
        detail: ServiceDetail::System(SystemDetail {
            load: Some(LoadAverages {
                avg01: Some(0.5),
                avg05: Some(0.7),
                avg15: Some(1.0),
            }),
            cpu: Some(SystemCpu {
                user: Some(10.0),
                system: Some(5.0),
                nice: Some(0.0),
                wait: Some(1.0),
            }),
            memory: Some(SystemMemory {
                percent: Some(40.0),
                kilobyte: Some(3_200_000),
            }),
            swap: Some(SystemMemory {
                percent: Some(0.0),
                kilobyte: Some(0),
            }),
        }),
    }
}

fn snapshot(host: HostInfo, services: Vec<ServiceRecord>) -> Snapshot {
    Snapshot {
        host,
        platform: None,
        services,
        events: Vec::new(),
    }
}

fn store_with(dir: &TempDir) -> Store {
    Store::open(&dir.path().join("api.db")).expect("store opens")
}

#[actix_web::test]
async fn status_hosts_is_critical_when_any_service_fails() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let now = Utc::now();
    store
        .persist_snapshot(
            &snapshot(
                host("h1", "alpha"),
                vec![
                    directory_service("svc_a", 0, now.timestamp() as f64),
                    directory_service("svc_b", 0x20, now.timestamp() as f64),
                ],
            ),
            now,
        )
        .expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());
    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/status/hosts").to_request(),
    )
    .await;

    let records = body["records"].as_array().expect("records array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "h1");
    assert_eq!(records[0]["status"], 2);
    assert_eq!(records[0]["statusname"], "critical");
    assert_eq!(records[0]["services"], 2);
    assert_eq!(records[0]["servicesup"], 1);
}

#[actix_web::test]
async fn overview_shows_orange_for_partial_failure() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let now = Utc::now();
    store
        .persist_snapshot(
            &snapshot(
                host("h1", "alpha"),
                vec![
                    directory_service("svc_a", 0, now.timestamp() as f64),
                    directory_service("svc_b", 0x20, now.timestamp() as f64),
                ],
            ),
            now,
        )
        .expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;

    let hosts = body["hosts"].as_array().expect("hosts array");
    assert_eq!(hosts[0]["color"], "orange");
    assert_eq!(hosts[0]["description"], "1 out of 2 services are available");
    assert_eq!(hosts[0]["status"], 2);
}

#[actix_web::test]
async fn overview_shows_red_for_a_stale_host() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let stale_report = Utc::now() - ChronoDuration::minutes(10);
    store
        .persist_snapshot(
            &snapshot(
                host("h1", "alpha"),
                vec![directory_service("svc_a", 0, stale_report.timestamp() as f64)],
            ),
            stale_report,
        )
        .expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;

    let hosts = body["hosts"].as_array().expect("hosts array");
    assert_eq!(hosts[0]["color"], "red");
    assert!(
        hosts[0]["description"]
            .as_str()
            .expect("description string")
            .starts_with("No report from"),
        "stale hosts explain the silence"
    );
    assert_eq!(hosts[0]["status"], 2, "stale is critical regardless of services");
}

#[actix_web::test]
async fn metrics_series_returns_the_cpu_user_series() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let now = Utc::now();
    store
        .persist_snapshot(
            &snapshot(
                host("h1", "alpha"),
                vec![system_service("alpha", now.timestamp() as f64)],
            ),
            now,
        )
        .expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());
    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/metrics?host_id=h1&service=alpha&range=1h")
            .to_request(),
    )
    .await;

    assert_eq!(body["host_id"], "h1");
    assert_eq!(body["hostname"], "alpha");
    let metrics = body["metrics"].as_array().expect("metrics array");
    let user = metrics
        .iter()
        .find(|series| series["type"] == "cpu" && series["name"] == "user")
        .expect("user series present");
    let values = user["values"].as_array().expect("values");
    assert_eq!(values.last().expect("non-empty"), 10.0);
    let timestamps = user["timestamps"].as_array().expect("timestamps");
    assert_eq!(timestamps.len(), values.len());
}

#[actix_web::test]
async fn availability_series_counts_heartbeat_ticks() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let start = Utc::now() - ChronoDuration::minutes(12);
    store
        .persist_snapshot(&snapshot(host("h1", "alpha"), vec![]), start)
        .expect("persist");
    for tick in 1..=10 {
        store
            .record_availability_for_all(start + ChronoDuration::seconds(tick * 60))
            .expect("tick");
    }

    let app = web_app!(store, RecordingCommander::succeeding());
    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/availability?host_id=h1&range=15m")
            .to_request(),
    )
    .await;

    let metrics = body["metrics"].as_array().expect("metrics array");
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["type"], "availability");
    assert!(
        metrics[0]["values"].as_array().expect("values").len() >= 10,
        "one sample per tick even though the host went silent"
    );
}

#[actix_web::test]
async fn bad_range_strings_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let app = web_app!(store, RecordingCommander::succeeding());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/metrics?host_id=h1&service=alpha&range=foo")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn missing_query_parameters_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let app = web_app!(store, RecordingCommander::succeeding());

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/metrics?range=1h").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn unknown_hosts_are_404() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let app = web_app!(store, RecordingCommander::succeeding());

    for uri in [
        "/host/ghost",
        "/host/ghost/events",
        "/host/ghost/service/foo",
        "/status/hosts/ghost",
        "/status/hosts/ghost/services",
    ] {
        let resp =
            test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), 404, "expected 404 for {uri}");
    }
}

#[actix_web::test]
async fn host_detail_includes_services_and_control_sans_credentials() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let now = Utc::now();
    store
        .persist_snapshot(
            &snapshot(
                host("h1", "alpha"),
                vec![directory_service("svc_a", 0, now.timestamp() as f64)],
            ),
            now,
        )
        .expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());
    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/host/h1").to_request(),
    )
    .await;

    assert_eq!(body["hostname"], "alpha");
    assert_eq!(body["control"]["address"], "10.0.0.5");
    assert_eq!(body["control"]["port"], 2812);
    assert!(
        body["control"].get("password").is_none(),
        "credentials must not leave the store"
    );
    assert_eq!(body["services"].as_array().expect("services").len(), 1);
}

#[actix_web::test]
async fn service_detail_carries_the_filesystem_payload() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let now = Utc::now();
    let filesystem = ServiceRecord {
        name: "rootfs".to_owned(),
        kind: ServiceKind::Filesystem,
        status: 0,
        monitor: 1,
        collected_at: now.timestamp() as f64,
        detail: ServiceDetail::Filesystem(FilesystemDetail {
            mode: Some(755),
            uid: Some(0),
            gid: Some(0),
            fstype: Some("ext4".to_owned()),
            fsflags: None,
            block: Some(StorageUsage {
                percent: Some(42.5),
                usage: Some(425.0),
                total: Some(1000.0),
            }),
            inode: None,
            read: None,
            write: None,
        }),
    };
    store
        .persist_snapshot(&snapshot(host("h1", "alpha"), vec![filesystem]), now)
        .expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());
    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/host/h1/service/rootfs")
            .to_request(),
    )
    .await;

    assert_eq!(body["type_name"], "filesystem");
    assert_eq!(body["filesystem"]["block_percent"], 42.5);
    assert_eq!(body["filesystem"]["mode"], 755);
}

#[actix_web::test]
async fn events_surfaces_list_and_fetch() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let now = Utc::now();
    let mut snap = snapshot(host("h1", "alpha"), vec![]);
    snap.events.push(AgentEvent {
        service: "nginx".to_owned(),
        kind: 0x20,
        message: "connection failed".to_owned(),
        collected_at: now.timestamp() as f64,
    });
    store.persist_snapshot(&snap, now).expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());

    let listed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/events/list?hostid=h1&limit=10&offset=0")
            .to_request(),
    )
    .await;
    assert_eq!(listed["total"], 1);
    let record = &listed["records"].as_array().expect("records")[0];
    assert_eq!(record["service"], "nginx");
    assert_eq!(record["typename"], "connection");

    let id = record["id"].as_i64().expect("event id");
    let fetched: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/events/get/{id}"))
            .to_request(),
    )
    .await;
    assert_eq!(fetched["record"]["message"], "connection failed");

    let host_events: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/host/h1/events").to_request(),
    )
    .await;
    assert_eq!(host_events["events"].as_array().expect("events").len(), 1);
}

#[actix_web::test]
async fn admin_hosts_lists_but_refuses_mutations() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    store
        .persist_snapshot(&snapshot(host("h1", "alpha"), vec![]), Utc::now())
        .expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());

    let listed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/admin/hosts").to_request(),
    )
    .await;
    assert_eq!(listed["records"].as_array().expect("records").len(), 1);

    for request in [
        test::TestRequest::post().uri("/admin/hosts").to_request(),
        test::TestRequest::delete().uri("/admin/hosts").to_request(),
    ] {
        let resp = test::call_service(&app, request).await;
        assert_eq!(resp.status(), 501);
    }
}

#[actix_web::test]
async fn actions_round_trip_through_the_commander() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    store
        .persist_snapshot(&snapshot(host("h1", "alpha"), vec![]), Utc::now())
        .expect("persist");

    let commander = RecordingCommander::succeeding();
    let app = web_app!(store, commander.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/action")
            .set_json(serde_json::json!({
                "host_id": "h1", "service": "nginx", "action": "restart"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);

    let calls = commander.calls.lock().expect("calls lock");
    assert_eq!(calls.as_slice(), &[("nginx".to_owned(), "restart")]);
}

#[actix_web::test]
async fn actions_reject_unknown_names_without_io() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    store
        .persist_snapshot(&snapshot(host("h1", "alpha"), vec![]), Utc::now())
        .expect("persist");

    let commander = RecordingCommander::succeeding();
    let app = web_app!(store, commander.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/action")
            .set_json(serde_json::json!({
                "host_id": "h1", "service": "nginx", "action": "reboot"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    assert!(
        commander.calls.lock().expect("calls lock").is_empty(),
        "whitelist failures must never reach the agent"
    );
}

#[actix_web::test]
async fn actions_surface_agent_failures_as_500() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    store
        .persist_snapshot(&snapshot(host("h1", "alpha"), vec![]), Utc::now())
        .expect("persist");

    let app = web_app!(
        store,
        RecordingCommander::failing(ControlError::Status {
            status: 503,
            body: "agent busy".to_owned(),
        })
    );

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/action")
            .set_json(serde_json::json!({
                "host_id": "h1", "service": "nginx", "action": "stop"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(
        body["message"].as_str().expect("message").contains("503"),
        "the agent's status must surface to the client"
    );
}

#[actix_web::test]
async fn actions_against_unknown_hosts_are_404() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    let app = web_app!(store, RecordingCommander::succeeding());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/action")
            .set_json(serde_json::json!({
                "host_id": "ghost", "service": "nginx", "action": "start"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn host_description_updates_are_visible() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_with(&dir);
    store
        .persist_snapshot(&snapshot(host("h1", "alpha"), vec![]), Utc::now())
        .expect("persist");

    let app = web_app!(store, RecordingCommander::succeeding());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/host/description")
            .set_json(serde_json::json!({
                "host_id": "h1", "description": "rack 4, row 2"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let detail: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/host/h1").to_request(),
    )
    .await;
    assert_eq!(detail["description"], "rack 4, row 2");
}
