//! axum integration.
//!
//! [`middleware`] answers the event-stream endpoint and build assets, and
//! hands everything else to the wrapped router. In server-side-render mode
//! the latest [`CompileResult`](crate::CompileResult) is inserted into the
//! forwarded request's extensions as `Arc<CompileResult>`.

use crate::coordinator::{AssetRequest, Outcome};
use crate::events::{EventStream, PREAMBLE_HEADERS};
use crate::session::Hotdev;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Router,
};

/// Middleware serving a [`Hotdev`] session in front of another handler.
pub async fn middleware(State(hotdev): State<Hotdev>, request: Request, next: Next) -> Response {
    if request.method() == Method::GET && request.uri().path() == hotdev.settings().hmr_path {
        return event_stream(hotdev.events());
    }

    let (parts, body) = request.into_parts();
    match hotdev.handle(&AssetRequest::from_parts(&parts)).await {
        Outcome::Served(response) => response.map(Body::from),
        Outcome::PassThrough(result) => {
            let mut request = Request::from_parts(parts, body);
            if let Some(result) = result {
                request.extensions_mut().insert(result);
            }
            next.run(request).await
        }
    }
}

/// Open an event-stream response for a new client.
pub fn event_stream(events: &EventStream) -> Response {
    let mut response = Response::new(Body::from_stream(events.subscribe()));
    let headers = response.headers_mut();
    for (name, value) in PREAMBLE_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    response
}

impl Hotdev {
    /// Put the session in front of `router`.
    pub fn wrap(&self, router: Router) -> Router {
        router.layer(from_fn_with_state(self.clone(), middleware))
    }

    /// A router that only serves the session; everything else is a 404.
    pub fn router(&self) -> Router {
        self.wrap(Router::new().fallback(not_found))
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
