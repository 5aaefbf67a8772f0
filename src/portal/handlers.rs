//! Public page handlers.
//!
//! Every handler conforms to the dispatch contract: receive the shared
//! state, the request, and a fresh response buffer; return the buffer on
//! success or a `PortalError` that knows its wire status.

use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::{Form, FromRequest};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use serde::Deserialize;

use crate::http::error::PortalError;
use crate::http::response::ResponseBuffer;
use crate::http::HandlerResult;
use crate::portal::state::SharedState;

/// 405 unless the request uses the expected method.
pub(crate) fn require_method(req: &Request<Body>, expected: Method) -> Result<(), PortalError> {
    if req.method() == expected {
        Ok(())
    } else {
        Err(PortalError::method_not_allowed())
    }
}

/// The logged-in team id, from the plain session cookie.
pub(crate) fn team_cookie(req: &Request<Body>) -> Option<u64> {
    let header = req.headers().get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == "team_id" {
            value.parse().ok()
        } else {
            None
        }
    })
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `GET /`: phase banner, operator messages, the frozen public ranking.
pub async fn serve_index(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::GET)?;

    let phase = state.phase();
    let messages = state.messages();
    let board = state.public_leaderboard();
    let team = team_cookie(&req).and_then(|id| state.team(id));

    res.content_type("text/html; charset=utf-8");
    write!(
        res,
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Contest Portal</title></head>\n<body>\n"
    )?;
    write!(res, "<h1>Contest Portal</h1>\n")?;
    write!(res, "<p>Phase: {}</p>\n", phase.as_str())?;

    match &team {
        Some(team) => write!(
            res,
            "<p>Logged in as {} (#{})</p>\n",
            escape_html(&team.name),
            team.id
        )?,
        None => write!(res, "<p><a href=\"/login\">Log in</a></p>\n")?,
    }

    if !messages.is_empty() {
        write!(res, "<ul class=\"messages\">\n")?;
        for message in &messages {
            write!(res, "<li>{}</li>\n", escape_html(&message.body))?;
        }
        write!(res, "</ul>\n")?;
    }

    write!(
        res,
        "<table class=\"leaderboard\">\n<tr><th>#</th><th>Team</th><th>Best</th><th>Latest</th></tr>\n"
    )?;
    for (rank, row) in board.iter().enumerate() {
        write!(
            res,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            rank + 1,
            escape_html(&row.team_name),
            row.best_score,
            row.latest_score
        )?;
    }
    write!(res, "</table>\n</body>\n</html>\n")?;

    Ok(res)
}

/// `/favicon.ico`: always 404, but through the dispatcher so it is
/// gated and logged like everything else.
pub async fn serve_favicon(
    _state: SharedState,
    _req: Request<Body>,
    _res: ResponseBuffer,
) -> HandlerResult {
    Err(PortalError::not_found("Not Found"))
}

/// Fallback for unmatched paths.
pub async fn serve_not_found(
    _state: SharedState,
    _req: Request<Body>,
    _res: ResponseBuffer,
) -> HandlerResult {
    Err(PortalError::not_found("Not Found"))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    team_id: u64,
    password: String,
}

/// `GET|POST /login`: form display and session establishment.
pub async fn serve_login(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    match *req.method() {
        Method::GET => {
            res.content_type("text/html; charset=utf-8");
            write!(
                res,
                "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Log in</title></head>\n<body>\n\
                 <form method=\"post\" action=\"/login\">\n\
                 <label>Team ID <input type=\"text\" name=\"team_id\"></label>\n\
                 <label>Password <input type=\"password\" name=\"password\"></label>\n\
                 <button type=\"submit\">Log in</button>\n\
                 </form>\n</body>\n</html>\n"
            )?;
            Ok(res)
        }
        Method::POST => {
            let Form(input) = Form::<LoginForm>::from_request(req, &())
                .await
                .map_err(|_| PortalError::bad_request("malformed login form"))?;

            let team = state
                .authenticate(input.team_id, &input.password)
                .ok_or_else(|| PortalError::forbidden("wrong team id or password"))?;

            res.set_status(StatusCode::FOUND);
            res.try_header(LOCATION, "/")?;
            res.try_header(SET_COOKIE, &format!("team_id={}; Path=/", team.id))?;
            Ok(res)
        }
        _ => Err(PortalError::method_not_allowed()),
    }
}

/// `GET /static/{*path}`: assets from the configured static directory.
pub async fn serve_static(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::GET)?;

    let relative = req
        .uri()
        .path()
        .strip_prefix("/static/")
        .ok_or_else(|| PortalError::not_found("Not Found"))?;

    let file_path = resolve_static_path(&state.config.static_files.dir, relative)
        .ok_or_else(|| PortalError::not_found("Not Found"))?;

    let contents = match tokio::fs::read(&file_path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(PortalError::not_found("Not Found"));
        }
        Err(err) => return Err(err.into()),
    };

    res.content_type(content_type_for(&file_path));
    res.write(contents);
    Ok(res)
}

/// Resolve a request path against the static root, refusing anything that
/// would escape it.
fn resolve_static_path(root: &str, relative: &str) -> Option<PathBuf> {
    if relative.is_empty() {
        return None;
    }
    let relative = Path::new(relative);
    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            _ => return None,
        }
    }
    Some(Path::new(root).join(relative))
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// `POST /queue`: benchmark job admission for the logged-in team.
pub async fn serve_queue_job(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::POST)?;

    if state.phase() == crate::contest::ContestPhase::Ended {
        return Err(PortalError::forbidden("contest has finished"));
    }

    let team_id = team_cookie(&req).ok_or_else(|| PortalError::forbidden("login required"))?;
    let team = state
        .team(team_id)
        .ok_or_else(|| PortalError::forbidden("login required"))?;

    let job = state
        .enqueue_job(team.id)
        .map_err(|_| PortalError::conflict("a job for this team is already queued or running"))?;

    tracing::debug!(team_id = team.id, job_id = job.id, "job enqueued");

    res.set_status(StatusCode::FOUND);
    res.try_header(LOCATION, "/")?;
    Ok(res)
}

#[derive(Debug, Deserialize)]
struct TeamUpdateForm {
    name: Option<String>,
    instance_addr: Option<String>,
}

/// `POST /team`: update the logged-in team's display name or instance
/// address. Empty fields are left untouched.
pub async fn serve_update_team(
    state: SharedState,
    req: Request<Body>,
    mut res: ResponseBuffer,
) -> HandlerResult {
    require_method(&req, Method::POST)?;

    let team_id = team_cookie(&req).ok_or_else(|| PortalError::forbidden("login required"))?;

    let Form(input) = Form::<TeamUpdateForm>::from_request(req, &())
        .await
        .map_err(|_| PortalError::bad_request("malformed team form"))?;

    let name = input.name.filter(|s| !s.is_empty());
    let instance_addr = input.instance_addr.filter(|s| !s.is_empty());

    if !state.update_team(team_id, name, instance_addr) {
        return Err(PortalError::forbidden("login required"));
    }

    res.set_status(StatusCode::FOUND);
    res.try_header(LOCATION, "/")?;
    Ok(res)
}
