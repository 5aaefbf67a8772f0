//! Shared utilities for the integration suites.
#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use chrono::{TimeZone, Utc};
use tokio::task::JoinHandle;

use contest_portal::config::{PortalConfig, TeamConfig};
use contest_portal::contest::{event_zone, Clock};
use contest_portal::http::server::router;
use contest_portal::{PortalState, SharedState, Shutdown};

/// A portal instance serving on an ephemeral port.
pub struct TestPortal {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestPortal {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Two seeded teams, default window (10..18).
pub fn test_config() -> PortalConfig {
    let mut config = PortalConfig::default();
    config.teams = vec![
        TeamConfig {
            id: 1,
            name: "alpacas".to_string(),
            password: "grass".to_string(),
            instance_addr: "10.0.1.1".to_string(),
        },
        TeamConfig {
            id: 2,
            name: "llamas".to_string(),
            password: "hay".to_string(),
            instance_addr: "10.0.1.2".to_string(),
        },
    ];
    config
}

/// A clock pinned to today's date at the given event-local time.
pub fn clock_at(hour: u32, minute: u32) -> Clock {
    let zone = event_zone();
    let today = Utc::now().with_timezone(&zone).date_naive();
    let local = today.and_hms_opt(hour, minute, 0).unwrap();
    let instant = zone
        .from_local_datetime(&local)
        .single()
        .unwrap()
        .with_timezone(&Utc);
    Clock::Fixed(instant)
}

/// Shared state with the test config and a pinned clock.
pub fn state_at(hour: u32, minute: u32) -> SharedState {
    PortalState::new(test_config())
        .with_clock(clock_at(hour, minute))
        .into_shared()
}

/// Serve the full portal route table for the given state.
pub async fn spawn_state(state: SharedState) -> TestPortal {
    spawn_router(router(state)).await
}

/// Serve an arbitrary router on an ephemeral port with graceful shutdown.
pub async fn spawn_router(router: Router) -> TestPortal {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let mut rx = shutdown.subscribe();

    let app = router.into_make_service_with_connect_info::<SocketAddr>();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await
    });

    TestPortal {
        addr,
        shutdown,
        handle,
    }
}

/// An HTTP client that does not follow redirects, so 302s stay observable.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub fn internal_path(tail: &str) -> String {
    format!(
        "/{}/{}",
        contest_portal::config::schema::DEFAULT_INTERNAL_PREFIX,
        tail
    )
}
