//! Internal-operations handlers.
//!
//! Everything here is routed under the secret path prefix and therefore
//! bypasses the contest gate: benchmark workers and operator tooling must
//! keep working before the contest opens.

use axum::body::Body;
use axum::extract::{FromRequest, Json};
use axum::http::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};

use crate::http::error::PortalError;
use crate::http::response::ResponseBuffer;
use crate::http::HandlerResult;
use crate::portal::handlers::require_method;
use crate::portal::state::{BenchResult, ProxyNode, SharedState};

fn write_json(res: &mut ResponseBuffer, value: &impl Serialize) -> Result<(), PortalError> {
    let body = serde_json::to_vec(value)?;
    res.content_type("application/json");
    res.write(body);
    Ok(())
}

/// `POST {prefix}/proxy/update`: replace the proxy node list.
pub async fn serve_proxy_update(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::POST)?;

    let Json(nodes) = Json::<Vec<ProxyNode>>::from_request(req, &())
        .await
        .map_err(|_| PortalError::bad_request("malformed proxy list"))?;

    let count = nodes.len();
    state.set_proxies(nodes);
    tracing::info!(count, "proxy node list updated");

    write_json(&mut res, &serde_json::json!({ "count": count }))?;
    Ok(res)
}

/// `GET {prefix}/proxy/nginx.conf`: the upstream block for the proxy
/// fleet, as plain text.
pub async fn serve_proxy_nginx_conf(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::GET)?;

    let nodes = state.proxies();

    let mut conf = String::new();
    conf.push_str("upstream contest_portal {\n");
    if nodes.is_empty() {
        conf.push_str("    # no proxy nodes registered\n");
    }
    for node in &nodes {
        conf.push_str("    server ");
        conf.push_str(&node.address);
        conf.push_str(";\n");
    }
    conf.push_str("}\n");

    res.content_type("text/plain; charset=utf-8");
    res.write(conf);
    Ok(res)
}

/// `POST {prefix}/job/new`: a benchmark worker leases the oldest queued
/// job. 204 when the queue is empty.
pub async fn serve_new_job(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::POST)?;

    match state.lease_job() {
        Some(job) => {
            tracing::debug!(job_id = job.id, team_id = job.team_id, "job leased");
            write_json(&mut res, &job)?;
        }
        None => res.set_status(StatusCode::NO_CONTENT),
    }
    Ok(res)
}

#[derive(Debug, Deserialize)]
struct ResultPayload {
    job_id: u64,
    team_id: u64,
    score: i64,
    passed: bool,
}

/// `POST {prefix}/job/result`: a benchmark worker reports a finished run.
pub async fn serve_post_result(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::POST)?;

    let Json(payload) = Json::<ResultPayload>::from_request(req, &())
        .await
        .map_err(|_| PortalError::bad_request("malformed result payload"))?;

    if state.team(payload.team_id).is_none() {
        return Err(PortalError::bad_request("unknown team"));
    }

    let result = BenchResult {
        job_id: payload.job_id,
        team_id: payload.team_id,
        score: payload.score,
        passed: payload.passed,
        completed_at: state.now(),
    };
    tracing::info!(
        job_id = result.job_id,
        team_id = result.team_id,
        score = result.score,
        passed = result.passed,
        "bench result recorded"
    );
    state.record_result(result);

    write_json(&mut res, &serde_json::json!({ "ok": true }))?;
    Ok(res)
}

/// `GET {prefix}/debug/vars`: process introspection snapshot.
pub async fn serve_debug_vars(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::GET)?;

    let vars = serde_json::json!({
        "version": state.version,
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": state.uptime_secs(),
        "phase": state.phase().as_str(),
        "ranking_freeze_at": state.ranking_freeze_at().to_rfc3339(),
        "queue_depth": state.queue_depth(),
        "counters": state.metrics.snapshot(),
    });

    write_json(&mut res, &vars)?;
    Ok(res)
}

/// `GET {prefix}/debug/queue`: the queued jobs, oldest first.
pub async fn serve_debug_queue(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::GET)?;
    write_json(&mut res, &state.queue_snapshot())?;
    Ok(res)
}

/// `GET {prefix}/debug/leaderboard`: the unfrozen ranking.
pub async fn serve_debug_leaderboard(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::GET)?;
    write_json(&mut res, &state.leaderboard(None))?;
    Ok(res)
}

/// `GET {prefix}/debug/proxies`: the registered proxy nodes.
pub async fn serve_debug_proxies(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::GET)?;
    write_json(&mut res, &state.proxies())?;
    Ok(res)
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    body: String,
}

/// `GET|POST {prefix}/messages`: list or append operator notices.
pub async fn serve_messages(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    match *req.method() {
        Method::GET => {
            write_json(&mut res, &state.messages())?;
            Ok(res)
        }
        Method::POST => {
            let Json(payload) = Json::<MessagePayload>::from_request(req, &())
                .await
                .map_err(|_| PortalError::bad_request("malformed message payload"))?;

            let message = state.post_message(payload.body);
            write_json(&mut res, &message)?;
            Ok(res)
        }
        _ => Err(PortalError::method_not_allowed()),
    }
}
