//! Local HTTP endpoint serving parsed reference pages as JSON.
//!
//! Two routes, both GET:
//!
//! - `/entry/{name}`: the whole page for any alias, as stored
//! - `/{name}`: one function joined with its page - the summary, the
//!   function's own arguments with their descriptions, and the page's
//!   cross references and error constants
//!
//! Unknown names answer 400 with a plain-text message, everything
//! outside the two routes 404.

use serde::Serialize;
use thiserror::Error;
use tiny_http::{Header, Method, Response, Server};

use crate::refpage::{find_entry, Spec};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

/// Function-shaped view of a page, returned by the `/{name}` route.
#[derive(Serialize)]
struct FunctionDoc<'a> {
    name: &'a str,
    desc: &'a str,
    args: Vec<ArgDoc<'a>>,
    seealso: &'a [String],
    errors: &'a [String],
}

/// One argument with the page's description for it.
#[derive(Serialize)]
struct ArgDoc<'a> {
    name: &'a str,
    desc: &'a str,
}

/// Outcome of routing one request.
struct Reply {
    status: u16,
    body: String,
    json: bool,
}

impl Reply {
    fn json(body: String) -> Reply {
        Reply {
            status: 200,
            body,
            json: true,
        }
    }

    fn text(status: u16, body: &str) -> Reply {
        Reply {
            status,
            body: body.to_string(),
            json: false,
        }
    }
}

/// Serve requests on `addr` (e.g. "localhost:8888") until the process
/// is stopped.
pub fn serve(addr: &str, specs: &[Spec]) -> Result<(), ServerError> {
    let server = Server::http(addr).map_err(|e| ServerError::Bind {
        addr: addr.to_string(),
        reason: e.to_string(),
    })?;

    for request in server.incoming_requests() {
        let reply = route(specs, request.method(), request.url());
        respond(request, reply);
    }
    Ok(())
}

/// Resolve one request against the loaded specs.
fn route(specs: &[Spec], method: &Method, url: &str) -> Reply {
    if *method != Method::Get {
        return Reply::text(405, "method not allowed");
    }

    let path = url.split('?').next().unwrap_or("");
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["entry", name] => match find_entry(specs, name) {
            Some(entry) => match serde_json::to_string(entry) {
                Ok(body) => Reply::json(body),
                Err(e) => Reply::text(500, &e.to_string()),
            },
            None => Reply::text(400, "invalid function name"),
        },
        [name] => match function_doc(specs, name) {
            Some(doc) => match serde_json::to_string(&doc) {
                Ok(body) => Reply::json(body),
                Err(e) => Reply::text(500, &e.to_string()),
            },
            None => Reply::text(400, "invalid function name"),
        },
        _ => Reply::text(404, "not found"),
    }
}

/// Join a function with its page. `name` must resolve to a page that
/// actually prototypes a function of that exact name, so a page alias
/// like "glUniform" is not itself servable here.
fn function_doc<'a>(specs: &'a [Spec], name: &str) -> Option<FunctionDoc<'a>> {
    let entry = find_entry(specs, name)?;
    let func = entry.func(name)?;
    let args = func
        .args
        .iter()
        .map(|arg| ArgDoc {
            name: arg,
            desc: entry.params.get(arg).map(String::as_str).unwrap_or(""),
        })
        .collect();
    Some(FunctionDoc {
        name: &func.name,
        desc: &entry.desc,
        args,
        seealso: &entry.seealso,
        errors: &entry.errors,
    })
}

fn respond(request: tiny_http::Request, reply: Reply) {
    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if reply.json {
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
            response = response.with_header(header);
        }
    }
    let _ = request.respond(response);
}
