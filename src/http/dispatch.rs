//! Request dispatch: the wrapper every business handler runs inside.
//!
//! # Responsibilities
//! - Consult the contest gate before any handler runs
//! - Run the handler against a fresh [`ResponseBuffer`] under panic isolation
//! - Commit the buffer on success, substitute a clean error response otherwise
//! - Emit exactly one access-log line per request with the wire status
//!
//! # Design Decisions
//! - The handler future owns the buffer; a panic drops it, so partial
//!   writes are unreachable and the substituted 500 is always well-formed
//! - The gate's 403 short-circuit is the one response written without
//!   buffering: no handler runs in that branch
//! - Outcome classification happens at the point the handler returns,
//!   as a discriminated type, not by runtime inspection

use std::backtrace::Backtrace;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, MethodRouter};
use futures_util::FutureExt;
use uuid::Uuid;

use crate::contest::ContestPhase;
use crate::http::error::PortalError;
use crate::http::response::{plain_text, ResponseBuffer};
use crate::http::HandlerResult;
use crate::portal::state::SharedState;

/// Header stamped onto every committed response.
pub const VERSION_HEADER: &str = "x-portal-version";

/// Wrap a portal handler into a method-agnostic route.
///
/// The handler receives the shared state, the request, and a fresh buffer,
/// and returns the buffer on success. Everything else (gating, panic
/// recovery, commit, logging) is the dispatcher's job.
pub fn dispatch<H, Fut>(handler: H) -> MethodRouter<SharedState>
where
    H: Fn(SharedState, Request<Body>, ResponseBuffer) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    any(
        move |State(state): State<SharedState>,
              ConnectInfo(remote): ConnectInfo<SocketAddr>,
              req: Request<Body>| {
            let handler = handler.clone();
            async move { run(handler, state, remote, req).await }
        },
    )
}

/// What a guarded handler invocation produced.
enum HandlerOutcome {
    /// Handler returned; the buffer is complete and committable.
    Success(ResponseBuffer),
    /// Handler failed with a status-carrying business error.
    Business { status: StatusCode, message: String },
    /// Handler panicked or failed with an opaque error.
    Fault {
        cause: String,
        backtrace: Option<Backtrace>,
    },
}

/// Dispatch one request. Produces exactly one response and one log line.
pub(crate) async fn run<H, Fut>(
    handler: H,
    state: SharedState,
    remote: SocketAddr,
    req: Request<Body>,
) -> Response
where
    H: Fn(SharedState, Request<Body>, ResponseBuffer) -> Fut,
    Fut: Future<Output = HandlerResult>,
{
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let request_uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let path = req.uri().path().to_owned();

    state.metrics.requests.increment();

    let gated = state.phase() == ContestPhase::NotStarted
        && !is_internal(&path, &state.config.internal.path_prefix);

    let response = if gated {
        // No handler runs here, so writing directly is safe.
        state.metrics.gate_rejections.increment();
        plain_text(StatusCode::FORBIDDEN, "Contest has not started yet")
    } else {
        let buffer = ResponseBuffer::new();
        match guarded(handler(state.clone(), req, buffer)).await {
            HandlerOutcome::Success(mut buffer) => {
                if let Ok(version) = HeaderValue::from_str(state.version) {
                    buffer.insert_header(HeaderName::from_static(VERSION_HEADER), version);
                }
                buffer.into_response()
            }
            HandlerOutcome::Business { status, message } => {
                state.metrics.business_errors.increment();
                tracing::debug!(
                    %request_id,
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    "handler returned business error"
                );
                plain_text(status, message)
            }
            HandlerOutcome::Fault { cause, backtrace } => {
                state.metrics.faults.increment();
                match backtrace {
                    Some(backtrace) => tracing::error!(
                        %request_id,
                        method = %method,
                        path = %path,
                        %cause,
                        %backtrace,
                        "handler panicked"
                    ),
                    None => tracing::error!(
                        %request_id,
                        method = %method,
                        path = %path,
                        %cause,
                        "handler failed"
                    ),
                }
                plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    };

    // The status logged is the one on the wire, not the buffer's nominal
    // one, so short-circuit and fault paths log correctly too.
    let status = response.status();
    tracing::info!(
        %request_id,
        method = %method,
        path = %request_uri,
        status = status.as_u16(),
        remote = %remote,
        "access"
    );

    response
}

/// Run the handler future with panic isolation and classify the result.
async fn guarded<Fut>(fut: Fut) -> HandlerOutcome
where
    Fut: Future<Output = HandlerResult>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(buffer)) => HandlerOutcome::Success(buffer),
        Ok(Err(PortalError::Http { status, message })) => {
            HandlerOutcome::Business { status, message }
        }
        Ok(Err(err)) => HandlerOutcome::Fault {
            cause: err.to_string(),
            backtrace: None,
        },
        Err(payload) => HandlerOutcome::Fault {
            cause: panic_message(payload.as_ref()),
            backtrace: Some(Backtrace::force_capture()),
        },
    }
}

/// Paths under the secret prefix bypass the NotStarted gate.
fn is_internal(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    let mut guarded_prefix = String::with_capacity(prefix.len() + 2);
    guarded_prefix.push('/');
    guarded_prefix.push_str(prefix);
    guarded_prefix.push('/');
    path.starts_with(&guarded_prefix)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_prefix_requires_full_segment_match() {
        assert!(is_internal("/secret/debug/vars", "secret"));
        assert!(is_internal("/secret/job/new", "secret"));
        assert!(!is_internal("/secretish/debug/vars", "secret"));
        assert!(!is_internal("/secret", "secret"));
        assert!(!is_internal("/queue", "secret"));
        assert!(!is_internal("/queue", ""));
    }

    #[tokio::test]
    async fn guarded_classifies_success_business_and_fault() {
        let ok = guarded(async { Ok(ResponseBuffer::new()) }).await;
        assert!(matches!(ok, HandlerOutcome::Success(_)));

        let business = guarded(async {
            Err(PortalError::http(StatusCode::IM_A_TEAPOT, "short and stout"))
        })
        .await;
        match business {
            HandlerOutcome::Business { status, message } => {
                assert_eq!(status, StatusCode::IM_A_TEAPOT);
                assert_eq!(message, "short and stout");
            }
            _ => panic!("expected business outcome"),
        }

        let fault = guarded(async { Err(PortalError::from(std::io::Error::other("boom"))) }).await;
        match fault {
            HandlerOutcome::Fault { backtrace, .. } => assert!(backtrace.is_none()),
            _ => panic!("expected fault outcome"),
        }
    }

    #[tokio::test]
    async fn guarded_recovers_panics_with_backtrace() {
        let outcome = guarded(async {
            panic!("handler exploded");
            #[allow(unreachable_code)]
            Ok(ResponseBuffer::new())
        })
        .await;

        match outcome {
            HandlerOutcome::Fault { cause, backtrace } => {
                assert_eq!(cause, "handler exploded");
                assert!(backtrace.is_some());
            }
            _ => panic!("expected fault outcome"),
        }
    }
}
