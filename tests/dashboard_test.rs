//! Dashboard routes served on a loopback port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use fanledger::dashboard::{self, AppState};
use fanledger::{Amount, Collector, DataSource, RawTransaction, Store, TransactionKind};
use tempfile::TempDir;
use tokio::net::TcpListener;

mod common;
use common::{
    FakeBroker, FakePage, FakeTelemetry, instant_load_options, listing_page, subscriber_block, test_config,
};

struct Served {
    _dir: TempDir,
    addr: SocketAddr,
    store: Store,
    telemetry: FakeTelemetry,
}

async fn serve(broker: impl FnOnce(&fanledger::CollectorConfig) -> FakeBroker) -> Result<Served> {
    let dir = TempDir::new()?;
    let config = test_config(&dir);
    std::fs::write(config.log_file(), "2024-01-01T00:00:00 INFO <run> started\n")?;

    let broker = broker(&config);
    let telemetry = broker.telemetry.clone();
    let store = Store::initialize(config.database_path(), config.retention_days()).await?;
    let options = instant_load_options(&config);
    let log_file = config.log_file().to_path_buf();
    let recent_days = config.recent_days();
    let collector = Arc::new(
        Collector::new(broker, store.clone(), Arc::new(config)).with_load_options(options),
    );

    let router = dashboard::router(Arc::new(AppState {
        collector,
        store: store.clone(),
        log_file,
        recent_days,
    }));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(Served {
        _dir: dir,
        addr,
        store,
        telemetry,
    })
}

#[tokio::test]
async fn index_shows_filtered_transactions() -> Result<()> {
    let served = serve(|_| FakeBroker::signed_in()).await?;
    let today = Local::now().date_naive();
    served.store.upsert_subscriber("alice", today).await?;
    for (username, kind) in [("alice", TransactionKind::Tip), ("bob_88", TransactionKind::Purchase)] {
        served
            .store
            .upsert_transaction(&RawTransaction {
                username: username.to_string(),
                amount: Amount::from_cents(999),
                kind,
                date: today,
            })
            .await?;
    }

    let body = reqwest::get(format!("http://{}/?type=tip&date=not-a-date", served.addr))
        .await?
        .text()
        .await?;

    assert!(body.contains("<td>alice</td>"));
    assert!(!body.contains("<td>bob_88</td>"));
    assert!(body.contains(r#"<option value="tip" selected>"#));
    assert!(body.contains("No collection has run since startup"));
    Ok(())
}

#[tokio::test]
async fn update_runs_and_redirects_with_a_banner() -> Result<()> {
    let served = serve(|config| {
        FakeBroker::signed_in().with_page(
            config,
            DataSource::Subscribers,
            FakePage::Html(listing_page(&[subscriber_block("alice", "Alice")])),
        )
    })
    .await?;

    // reqwest follows the redirect back to the index
    let response = reqwest::get(format!("http://{}/update", served.addr)).await?;
    assert_eq!(response.url().path(), "/");
    let body = response.text().await?;

    assert!(body.contains(r#"class="status success""#));
    assert!(body.contains("Collection finished: 1 new rows"));
    assert!(body.contains("<td>alice</td>"));
    assert_eq!(served.store.subscriber_count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn failed_update_shows_an_error_banner() -> Result<()> {
    let served = serve(|_| FakeBroker {
        signed_in: false,
        ..FakeBroker::signed_in()
    })
    .await?;

    let body = reqwest::get(format!("http://{}/update", served.addr))
        .await?
        .text()
        .await?;

    assert!(body.contains(r#"class="status error""#));
    assert!(body.contains("Collection failed"));
    Ok(())
}

#[tokio::test]
async fn logs_are_served_escaped() -> Result<()> {
    let served = serve(|_| FakeBroker::signed_in()).await?;

    let body = reqwest::get(format!("http://{}/logs", served.addr))
        .await?
        .text()
        .await?;

    assert!(body.contains("<pre>"));
    assert!(body.contains("INFO &lt;run&gt; started"));
    Ok(())
}

#[tokio::test]
async fn status_endpoint_reports_the_last_run() -> Result<()> {
    let served = serve(|_| FakeBroker::signed_in()).await?;

    let before: serde_json::Value = reqwest::get(format!("http://{}/api/status", served.addr))
        .await?
        .json()
        .await?;
    assert_eq!(before["phase"], "Idle");
    assert!(before["last_report"].is_null());

    reqwest::get(format!("http://{}/update", served.addr)).await?;

    let after: serde_json::Value = reqwest::get(format!("http://{}/api/status", served.addr))
        .await?
        .json()
        .await?;
    assert_eq!(after["phase"], "Done");
    assert_eq!(after["last_report"]["outcome"]["outcome"], "done");
    assert_eq!(after["last_report"]["passes"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn update_survives_a_client_disconnect() -> Result<()> {
    let served = serve(|config| FakeBroker {
        load_delay: Duration::from_millis(200),
        ..FakeBroker::signed_in().with_page(
            config,
            DataSource::Subscribers,
            FakePage::Html(listing_page(&[subscriber_block("alice", "Alice")])),
        )
    })
    .await?;

    // Give up on the request long before the run is over
    let url = format!("http://{}/update", served.addr);
    let gave_up = tokio::time::timeout(Duration::from_millis(50), reqwest::get(url)).await;
    assert!(gave_up.is_err());

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let status: serde_json::Value = reqwest::get(format!("http://{}/api/status", served.addr))
        .await?
        .json()
        .await?;
    assert_eq!(status["phase"], "Done");
    assert_eq!(served.telemetry.released(), 1);
    assert_eq!(served.store.subscriber_count().await?, 1);
    Ok(())
}
