//! The agent-facing ingestion endpoint: `POST /collector`.
//!
//! Order of operations per request: method gate (the route table answers 405
//! for anything but POST), Basic auth, optional gzip, bounded full read,
//! decode, persist. A decode failure is the agent's problem (400); a
//! persistence failure is ours, so the agent still gets 200 and keeps
//! sending while we log the error.

use std::io::Read;

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use tracing::{error, warn};

use crate::decoder;
use crate::inbound::auth::CollectorAuth;
use crate::outbound::persistence::Store;

/// Snapshots are small; anything beyond this is not a snapshot.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// How much of a rejected body makes it into the error log.
const BODY_LOG_HEAD: usize = 200;

pub async fn ingest(
    req: HttpRequest,
    mut payload: web::Payload,
    store: web::Data<Store>,
    auth: web::Data<CollectorAuth>,
) -> HttpResponse {
    let remote = req
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_owned());

    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if let Err(rejection) = auth.authorize(authorization) {
        warn!(remote = %remote, %rejection, "collector auth failed");
        return HttpResponse::Unauthorized()
            .insert_header((header::WWW_AUTHENTICATE, "Basic realm=\"monhive\""))
            .body("authentication required\n");
    }

    // Bounded full read of the raw stream; the explicit decompressor below
    // is the only content-encoding handling on this endpoint.
    let mut raw = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!(remote = %remote, error = %err, "collector body read failed");
                return HttpResponse::BadRequest().body("unreadable body\n");
            }
        };
        if raw.len() + chunk.len() > MAX_BODY_BYTES {
            warn!(remote = %remote, "collector body exceeds size cap");
            return HttpResponse::BadRequest().body("body too large\n");
        }
        raw.extend_from_slice(&chunk);
    }

    let body = if is_gzip(&req) {
        let mut inflated = Vec::new();
        match GzDecoder::new(raw.as_ref()).read_to_end(&mut inflated) {
            Ok(_) => inflated,
            Err(err) => {
                warn!(remote = %remote, error = %err, "collector gzip decompression failed");
                return HttpResponse::BadRequest().body("bad gzip body\n");
            }
        }
    } else {
        raw.to_vec()
    };

    let snapshot = match decoder::decode(&body) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!(
                remote = %remote,
                error = %err,
                head = %String::from_utf8_lossy(&body[..body.len().min(BODY_LOG_HEAD)]),
                "snapshot decode failed"
            );
            return HttpResponse::BadRequest().body("unreadable snapshot\n");
        }
    };

    let host_id = snapshot.host.id.clone();
    let persisted = web::block(move || store.persist_snapshot(&snapshot, Utc::now())).await;
    match persisted {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            // The snapshot was valid; storage is our problem. Answer 200 so
            // the agent does not stop reporting over a transient failure.
            error!(host_id = %host_id, error = %err, "snapshot persistence failed");
        }
        Err(err) => {
            error!(host_id = %host_id, error = %err, "snapshot persistence task failed");
        }
    }

    HttpResponse::Ok().body("OK\n")
}

/// 405 for everything that is not a POST.
pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().body("collector accepts POST only\n")
}

fn is_gzip(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("gzip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::auth::PasswordVerifier;
    use actix_web::{App, test};
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    const SNAPSHOT: &str = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\
        <monit><server><id>h1</id><incarnation>1700000000</incarnation>\
        <version>5.35</version><localhostname>alpha</localhostname>\
        <httpd><address>10.0.0.5</address><port>2812</port><ssl>0</ssl></httpd>\
        <credentials><username>admin</username><password>pw</password></credentials>\
        </server><platform><name>Linux</name><cpu>4</cpu><memory>8000000000</memory>\
        </platform><services/></monit>";

    fn basic_header() -> (&'static str, String) {
        (
            "Authorization",
            format!("Basic {}", BASE64.encode("monit:monit")),
        )
    }

    fn test_store(dir: &TempDir) -> Store {
        Store::open(&dir.path().join("test.db")).expect("store opens")
    }

    fn test_auth() -> CollectorAuth {
        CollectorAuth::new("monit", PasswordVerifier::Plain("monit".to_owned()))
    }

    macro_rules! collector_app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($store.clone()))
                    .app_data(web::Data::new(test_auth()))
                    .service(
                        web::resource("/collector")
                            .route(web::post().to(ingest))
                            .route(web::route().to(method_not_allowed)),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn fresh_host_snapshot_creates_the_host_row() {
        let dir = TempDir::new().expect("tempdir");
        let store = test_store(&dir);
        let app = collector_app!(store);

        let req = test::TestRequest::post()
            .uri("/collector")
            .insert_header(basic_header())
            .set_payload(SNAPSHOT)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let host = store.host("h1").expect("query").expect("row");
        assert_eq!(host.hostname, "alpha");
        assert_eq!(host.created_at, host.last_seen);
    }

    #[actix_web::test]
    async fn gzip_bodies_are_inflated() {
        let dir = TempDir::new().expect("tempdir");
        let store = test_store(&dir);
        let app = collector_app!(store);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SNAPSHOT.as_bytes()).expect("compress");
        let compressed = encoder.finish().expect("finish");

        let req = test::TestRequest::post()
            .uri("/collector")
            .insert_header(basic_header())
            .insert_header(("Content-Encoding", "gzip"))
            .set_payload(compressed)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert!(store.host("h1").expect("query").is_some());
    }

    #[actix_web::test]
    async fn truncated_gzip_is_rejected_without_partial_persistence() {
        let dir = TempDir::new().expect("tempdir");
        let store = test_store(&dir);
        let app = collector_app!(store);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SNAPSHOT.as_bytes()).expect("compress");
        let mut compressed = encoder.finish().expect("finish");
        compressed.truncate(compressed.len() - 1);

        let req = test::TestRequest::post()
            .uri("/collector")
            .insert_header(basic_header())
            .insert_header(("Content-Encoding", "gzip"))
            .set_payload(compressed)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        assert!(store.host("h1").expect("query").is_none());
    }

    #[actix_web::test]
    async fn missing_credentials_get_a_challenge() {
        let dir = TempDir::new().expect("tempdir");
        let store = test_store(&dir);
        let app = collector_app!(store);

        let req = test::TestRequest::post()
            .uri("/collector")
            .set_payload(SNAPSHOT)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        assert_eq!(
            resp.headers()
                .get("WWW-Authenticate")
                .and_then(|v| v.to_str().ok()),
            Some("Basic realm=\"monhive\"")
        );
    }

    #[actix_web::test]
    async fn wrong_method_is_405() {
        let dir = TempDir::new().expect("tempdir");
        let store = test_store(&dir);
        let app = collector_app!(store);

        let req = test::TestRequest::get().uri("/collector").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 405);
    }

    #[actix_web::test]
    async fn undecodable_bodies_are_400() {
        let dir = TempDir::new().expect("tempdir");
        let store = test_store(&dir);
        let app = collector_app!(store);

        let req = test::TestRequest::post()
            .uri("/collector")
            .insert_header(basic_header())
            .set_payload("not xml at all")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
