#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::head;
use axum::Router;
use chrono::NaiveDate;
use quotawatch::config::ServerConfig;
use quotawatch::models::Reimbursement;
use quotawatch::receipt::ReceiptClient;
use quotawatch::server::{build_router, AppState};
use quotawatch::storage::ReimbursementStore;

static DOCUMENT_COUNTER: AtomicI64 = AtomicI64::new(1_000);

/// A running quotawatch instance on an ephemeral port, backed by an
/// in-memory store that tests can seed directly.
pub struct TestApp {
    pub base_url: String,
    pub store: ReimbursementStore,
}

pub async fn spawn_app(receipt_base_url: &str) -> TestApp {
    let store = ReimbursementStore::open_in_memory().expect("open in-memory store");
    let config = ServerConfig {
        http_host: "127.0.0.1".to_string(),
        http_port: 8080, // the test listener below picks the real port
        database_path: ":memory:".to_string(),
        receipt_base_url: receipt_base_url.to_string(),
        receipt_timeout_ms: 2_000,
        default_page_size: 100,
        max_page_size: 1000,
        daemon: false,
    };
    let receipt = ReceiptClient::new(&config.receipt_base_url, config.receipt_timeout_ms)
        .expect("build receipt client");

    let app = build_router(AppState {
        store: store.clone(),
        receipt,
        config,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });

    TestApp {
        base_url: format!("http://{}", addr),
        store,
    }
}

/// A stand-in for the chamber's document host: answers every receipt HEAD
/// with a fixed status and counts how often it was probed.
pub struct MockChamber {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
}

impl MockChamber {
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn spawn_mock_chamber(status: StatusCode) -> MockChamber {
    let hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new().route(
        "/cota-parlamentar/documentos/publ/{applicant}/{year}/{doc}",
        head({
            let hits = hits.clone();
            move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    status
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock chamber listener");
    let addr = listener.local_addr().expect("mock chamber address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock chamber");
    });

    MockChamber {
        base_url: format!("http://{}", addr),
        hits,
    }
}

/// Builds a record with plausible defaults and a fresh document id, in the
/// spirit of a fixture factory: tests override just the fields they assert
/// on.
pub fn reimbursement_fixture() -> Reimbursement {
    let n = DOCUMENT_COUNTER.fetch_add(1, Ordering::Relaxed);
    Reimbursement {
        document_id: n,
        applicant_id: 500 + n % 50,
        year: 2016,
        month: 4,
        congressperson_name: Some(format!("Deputy {}", n)),
        state: Some("SP".to_string()),
        cnpj_cpf: Some(format!("{:014}", n)),
        supplier: format!("Supplier {}", n),
        subquota_id: 1,
        subquota_description: "Flight tickets".to_string(),
        issue_date: NaiveDate::from_ymd_opt(2016, 4, 10).unwrap(),
        net_values: "1.99,2.99".to_string(),
        reimbursement_values: Some("200.00,500.00".to_string()),
        reimbursement_numbers: "2,3".to_string(),
        total_net_value: 4.98,
        suspicious: false,
        probability: None,
        receipt_fetched: false,
        receipt_url: None,
    }
}
