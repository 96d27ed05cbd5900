#![forbid(unsafe_code)]

//! HTTP fetcher against an in-process provider.
//!
//! The provider is a small axum app on an ephemeral port, run by a tokio
//! runtime on its own thread so the blocking client never executes inside
//! an async context.
//!
//! Run:
//!   cargo test -p dice-roll --test http_fetcher

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use dice_core::{Face, FaceError};
use dice_roll::{
    EventLog, FetchError, HttpResultFetcher, ProviderConfig, ResultFetcher, RollConfig,
    RollController, RollEvent, RollMsg,
};
use dice_runtime::{Clock, Program, SystemClock};

fn provider() -> Router {
    Router::new()
        .route("/roll", get(|| async { "4" }))
        .route("/padded", get(|| async { " 6\n" }))
        .route("/json", get(|| async { axum::Json(5) }))
        .route("/oob", get(|| async { "9" }))
        .route("/words", get(|| async { "four" }))
        .route(
            "/fail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "2"
            }),
        )
}

fn spawn_provider() -> SocketAddr {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, provider()).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

fn fetch(addr: SocketAddr, path: &str) -> Result<Face, FetchError> {
    HttpResultFetcher::new(format!("http://{addr}{path}"), None)
        .unwrap()
        .fetch()
}

#[test]
fn plain_integer_body_is_accepted() {
    let addr = spawn_provider();
    assert_eq!(fetch(addr, "/roll"), Ok(Face::new(4).unwrap()));
    assert_eq!(fetch(addr, "/padded"), Ok(Face::new(6).unwrap()));
    assert_eq!(fetch(addr, "/json"), Ok(Face::new(5).unwrap()));
}

#[test]
fn out_of_range_body_is_invalid_payload() {
    let addr = spawn_provider();
    assert_eq!(
        fetch(addr, "/oob"),
        Err(FetchError::InvalidPayload(FaceError::OutOfRange(9)))
    );
    assert!(matches!(
        fetch(addr, "/words"),
        Err(FetchError::InvalidPayload(FaceError::NotAnInteger(_)))
    ));
}

#[test]
fn error_status_is_reported() {
    let addr = spawn_provider();
    assert_eq!(fetch(addr, "/fail"), Err(FetchError::Status(500)));
    assert_eq!(fetch(addr, "/missing"), Err(FetchError::Status(404)));
}

#[test]
fn refused_connection_is_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    assert!(matches!(fetch(addr, "/roll"), Err(FetchError::Transport(_))));
}

#[test]
fn configured_timeout_bounds_the_request() {
    let addr = spawn_provider();
    let provider = ProviderConfig {
        url: format!("http://{addr}/slow"),
        timeout_ms: Some(50),
    };
    let fetcher = HttpResultFetcher::from_config(&provider).unwrap();
    assert!(matches!(fetcher.fetch(), Err(FetchError::Transport(_))));

    // Without a timeout the slow answer still arrives.
    assert_eq!(fetch(addr, "/slow"), Ok(Face::new(2).unwrap()));
}

#[test]
fn program_rolls_against_live_provider() {
    let addr = spawn_provider();
    let mut config = RollConfig::default();
    config.provider.url = format!("http://{addr}/roll");
    config.timing.min_spin_duration_ms = 50;
    config.timing.cooldown_ms = 100;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let log = EventLog::new();
    let controller = RollController::new(
        &config,
        Arc::new(HttpResultFetcher::from_config(&config.provider).unwrap()),
        Arc::clone(&clock),
    )
    .with_observer(log.clone());
    let mut program = Program::with_clock(controller, clock);

    let handle = program.handle();
    let driver = thread::spawn(move || {
        handle.send(RollMsg::Begin);
        thread::sleep(Duration::from_millis(600));
        handle.send(RollMsg::Quit);
    });
    program.run();
    driver.join().unwrap();

    let committed = log.snapshot().into_iter().find_map(|e| match e {
        RollEvent::Committed { face, at_ms, .. } => Some((face, at_ms)),
        _ => None,
    });
    let (face, at_ms) = committed.expect("roll should commit before quit");
    assert_eq!(face, Face::new(4).unwrap());
    assert!(at_ms >= 50, "committed before minimum spin: {at_ms}ms");
    assert_eq!(program.model().confirmed_face(), face);
    assert!(program.model().trigger().enabled);
}
