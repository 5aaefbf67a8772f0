//! Graceful shutdown: in-flight requests finish, new connections are
//! refused, and the serving call returns.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;

use contest_portal::http::dispatch::dispatch;
use contest_portal::http::ResponseBuffer;
use contest_portal::SharedState;

mod common;

#[tokio::test]
async fn shutdown_drains_the_inflight_request_then_stops_accepting() {
    let state = common::state_at(12, 0);
    let router = Router::new()
        .route(
            "/slow",
            dispatch(
                |_state: SharedState, _req: Request<Body>, mut res: ResponseBuffer| async move {
                    tokio::time::sleep(Duration::from_millis(400)).await;
                    res.write("slept well");
                    Ok(res)
                },
            ),
        )
        .with_state(state);
    let portal = common::spawn_router(router).await;
    let addr = portal.addr;

    let client = common::client();
    let url = portal.url("/slow");
    let inflight = tokio::spawn(async move {
        client
            .get(url)
            .header("connection", "close")
            .send()
            .await
            .unwrap()
    });

    // Let the request reach the handler, then pull the plug.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(portal.shutdown.trigger());

    // The in-flight request still completes, fully formed.
    let response = inflight.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "slept well");

    // The serving call returns once draining is done...
    let served = portal.handle.await.unwrap();
    assert!(served.is_ok());

    // ...and nothing is accepting on that address anymore.
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn a_second_trigger_has_no_further_effect() {
    let portal = common::spawn_state(common::state_at(12, 0)).await;

    assert!(portal.shutdown.trigger());
    assert!(!portal.shutdown.trigger());

    let served = portal.handle.await.unwrap();
    assert!(served.is_ok());
}
