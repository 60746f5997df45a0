//! Per-request handling: body collection, middleware chain, metrics.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming as IncomingBody;
use tracing::debug;

use super::{routing, AppState};
use crate::core::{Context, Request, Response};

/// Convert a chain response into what hyper writes.
pub(crate) fn into_hyper(res: Response) -> hyper::Response<Full<Bytes>> {
    http::Response::<Bytes>::from(res).map(Full::new)
}

pub(crate) async fn handle_request(
    state: Arc<AppState>,
    req: hyper::Request<IncomingBody>,
    remote_addr: SocketAddr,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let method = parts.method.clone();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("Failed to read request body: {}", e);
            let res = Response::bad_request("Failed to read request body");
            state
                .metrics
                .record_http_request(method.as_str(), res.status().as_u16(), 0.0);
            return Ok(into_hyper(res));
        }
    };

    let request = Request::new(parts.method, parts.uri, parts.headers, body);
    let client_ip = remote_addr.ip();
    let mut ctx = Context::new(client_ip, request.request_id());

    let router_state = Arc::clone(&state);
    let mut response = state
        .chain
        .process_async(request, &mut ctx, move |req, _ctx| async move {
            routing::route(&router_state, &req, client_ip)
        })
        .await;

    for (name, value) in ctx.response_headers() {
        response = response.with_header(name, value);
    }
    let response = response.with_header("X-Request-ID", &ctx.request_id);

    state.metrics.record_http_request(
        method.as_str(),
        response.status().as_u16(),
        ctx.elapsed().as_secs_f64(),
    );

    Ok(into_hyper(response))
}
