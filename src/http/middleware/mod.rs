//! Middleware composition.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → recovery.rs (catch panics anywhere below, answer 500)
//!     → caller-supplied middleware, in registration order
//!     → access_log.rs (request ID, structured access log, request metrics)
//!     → route handler
//! ```
//!
//! # Design Decisions
//! - Composition is pure: no I/O, cannot fail
//! - Recovery is always outermost so faults in other middleware are caught too
//! - Caller middleware runs before the access log, so the log line is emitted
//!   inside any span a tracing step opened

pub mod access_log;
pub mod recovery;

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use axum::Router;
use futures_util::future::{BoxFuture, FutureExt};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

type Step = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// A named request-processing step supplied by a caller.
#[derive(Clone)]
pub struct Middleware {
    name: Cow<'static, str>,
    step: Step,
}

impl Middleware {
    /// Wrap an async function taking the request and the rest of the chain.
    pub fn from_fn<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            name: name.into(),
            step: Arc::new(move |request, next| f(request, next).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn into_layer_fn(self) -> impl Fn(Request, Next) -> BoxFuture<'static, Response> + Clone {
        let step = self.step;
        move |request: Request, next: Next| step(request, next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub const RECOVERY: &str = "recovery";
pub const ACCESS_LOG: &str = "access_log";

#[derive(Debug)]
enum Link {
    Recovery,
    Custom(Middleware),
    AccessLog,
}

impl Link {
    fn name(&self) -> &str {
        match self {
            Link::Recovery => RECOVERY,
            Link::Custom(m) => m.name(),
            Link::AccessLog => ACCESS_LOG,
        }
    }
}

/// The ordered chain applied to every request before its handler.
#[derive(Debug)]
pub struct MiddlewareChain {
    links: Vec<Link>,
}

impl MiddlewareChain {
    /// Build the chain: recovery, then `extra` in order, then the access log.
    pub fn compose(extra: Vec<Middleware>) -> Self {
        let mut links = Vec::with_capacity(extra.len() + 2);
        links.push(Link::Recovery);
        links.extend(extra.into_iter().map(Link::Custom));
        links.push(Link::AccessLog);
        Self { links }
    }

    /// Step names, outermost first.
    pub fn names(&self) -> Vec<&str> {
        self.links.iter().map(Link::name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.links.iter().any(|link| link.name() == name)
    }

    /// Wrap every route of `router` with the chain.
    ///
    /// The last layer added is the outermost, so links are applied innermost first.
    pub fn apply(self, router: Router) -> Router {
        self.links
            .into_iter()
            .rev()
            .fold(router, |router, link| match link {
                Link::AccessLog => router.layer(
                    ServiceBuilder::new()
                        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                        .layer(PropagateRequestIdLayer::x_request_id())
                        .layer(from_fn(access_log::access_log)),
                ),
                Link::Custom(middleware) => router.layer(from_fn(middleware.into_layer_fn())),
                Link::Recovery => router.layer(CatchPanicLayer::custom(recovery::handle_panic)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::{Route, RouteTable};
    use axum::body::{to_bytes, Body};
    use axum::http::{HeaderValue, Request as HttpRequest, StatusCode};
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn tagging(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Middleware {
        Middleware::from_fn(name, move |request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                next.run(request).await
            }
        })
    }

    fn router_with(chain: MiddlewareChain, extra_routes: Vec<Route>) -> Router {
        let mut table = RouteTable::new();
        table.extend(extra_routes);
        chain.apply(table.into_router().unwrap())
    }

    #[test]
    fn builtins_wrap_caller_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::compose(vec![
            tagging("first", log.clone()),
            tagging("second", log),
        ]);
        assert_eq!(
            chain.names(),
            vec![RECOVERY, "first", "second", ACCESS_LOG]
        );
    }

    #[test]
    fn empty_extra_list_has_only_builtins() {
        let chain = MiddlewareChain::compose(Vec::new());
        assert_eq!(chain.names(), vec![RECOVERY, ACCESS_LOG]);
        assert!(!chain.contains("tracing"));
    }

    #[tokio::test]
    async fn caller_middleware_runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::compose(vec![
            tagging("first", log.clone()),
            tagging("second", log.clone()),
        ]);
        let router = router_with(chain, Vec::new());

        let res = router
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        async fn explode() -> &'static str {
            panic!("handler exploded")
        }

        let router = router_with(
            MiddlewareChain::compose(Vec::new()),
            vec![Route::get("/explode", explode)],
        );

        let res = router
            .clone()
            .oneshot(HttpRequest::get("/explode").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // The router keeps serving.
        let res = router
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn panic_in_caller_middleware_is_caught() {
        let faulty = Middleware::from_fn("faulty", |request: Request, next: Next| async move {
            if request.uri().path() == "/health" {
                panic!("middleware exploded");
            }
            next.run(request).await
        });
        let router = router_with(MiddlewareChain::compose(vec![faulty]), Vec::new());

        let res = router
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(res.into_body(), 1024).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("internal server error"));
    }

    #[tokio::test]
    async fn request_id_is_assigned_and_propagated() {
        let router = router_with(MiddlewareChain::compose(Vec::new()), Vec::new());

        let res = router
            .clone()
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(res.headers().contains_key("x-request-id"));

        let res = router
            .oneshot(
                HttpRequest::get("/health")
                    .header("x-request-id", HeaderValue::from_static("abc-123"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers().get("x-request-id").unwrap(), "abc-123");
    }
}
