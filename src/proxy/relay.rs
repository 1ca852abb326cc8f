// ────────────────────────────────
// src/proxy/relay.rs
// Copies an upstream response onto the downstream one without transformation.
// ────────────────────────────────
use hyper::{header::HeaderMap, Body, Response};

/// Turns a proxied upstream response into the response sent to the caller:
/// headers first, then status, then the body streamed as-is.
pub fn relay_response(upstream: reqwest::Response) -> Response<Body> {
    let mut response = Response::new(Body::empty());

    copy_headers(upstream.headers(), response.headers_mut());
    *response.status_mut() = upstream.status();
    *response.body_mut() = Body::wrap_stream(upstream.bytes_stream());

    response
}

/// Copies every header key from `src` onto `dst`.
///
/// A key present in `src` replaces whatever `dst` held for it; all of the
/// upstream values for that key are kept. Keys only present in `dst` are left
/// untouched.
pub fn copy_headers(src: &HeaderMap, dst: &mut HeaderMap) {
    for name in src.keys() {
        dst.remove(name);
        for value in src.get_all(name) {
            dst.append(name.clone(), value.clone());
        }
    }
}
