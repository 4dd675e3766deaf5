//! Route table of the QR service.
//!
//! | Route              | Response                                        |
//! |--------------------|-------------------------------------------------|
//! | `GET /`            | `200` welcome text                              |
//! | `GET /:identifier` | `200` product page, or `404` not-found page     |
//! | anything else      | `404` (router default)                          |

use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::lookup::LookupService;
use crate::middleware::{LoggerMiddleware, Pipeline};
use crate::pages;
use crate::{Response, Router};

/// Path parameter carrying the scanned identifier.
const IDENTIFIER_PARAM: &str = "identifier";

/// Builds the router for the service.
pub fn router(lookup: LookupService) -> Router {
    let lookup = Arc::new(lookup);
    let mut router = Router::new();

    router.get("/", |_ctx| async { pages::welcome() });
    router.get("/:identifier", move |ctx: Context| {
        let lookup = Arc::clone(&lookup);
        async move { show_product(&lookup, &ctx).await }
    });

    router
}

/// Builds the full request pipeline: request logging in front of [`router`].
pub fn pipeline(lookup: LookupService) -> Pipeline {
    Pipeline::new(router(lookup)).with(LoggerMiddleware)
}

async fn show_product(lookup: &LookupService, ctx: &Context) -> Response {
    let raw = ctx.params().get(IDENTIFIER_PARAM).unwrap_or_default();

    // Scanners sometimes carry padding over as `%20`; decode before normalizing.
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(raw, error = %e, "identifier is not valid percent-encoded UTF-8");
            return pages::product_not_found();
        }
    };

    match lookup.resolve(&decoded).await {
        Some(product) => pages::product_detail(&product),
        None => pages::product_not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CatalogCache;
    use crate::catalog::{CatalogSource, FetchError, Snapshot, fetcher::decode_snapshot};
    use crate::{Request, StatusCode};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Fixed(&'static str);

    #[async_trait]
    impl CatalogSource for Fixed {
        async fn fetch(&self) -> Result<Snapshot, FetchError> {
            Ok(decode_snapshot(self.0.as_bytes()).expect("valid json"))
        }
    }

    fn app() -> Pipeline {
        let source = Fixed(
            r#"{"record":[{"qr_uuid":"a1111111-1111-4111-8111-111111111111","nombre":"Widget","precio":"12.50"}]}"#,
        );
        let cache = CatalogCache::new(source, Duration::from_secs(60));
        pipeline(LookupService::new(Arc::new(cache)))
    }

    async fn get(app: &Pipeline, path: &str) -> Response {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: qr.local\r\n\r\n");
        app.handle(Request::parse(raw.as_bytes()).unwrap().0).await
    }

    fn body(response: &Response) -> &str {
        std::str::from_utf8(response.payload()).unwrap()
    }

    #[tokio::test]
    async fn root_is_welcome() {
        let res = get(&app(), "/").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(body(&res), pages::WELCOME);
    }

    #[tokio::test]
    async fn known_identifier_renders_detail() {
        let res = get(&app(), "/A1111111-1111-4111-8111-111111111111").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(body(&res).contains("<h1>Widget</h1>"));
        assert!(body(&res).contains("12.50"));
    }

    #[tokio::test]
    async fn percent_encoded_padding_is_tolerated() {
        let res = get(&app(), "/%20a1111111-1111-4111-8111-111111111111%20").await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn unknown_and_malformed_identifiers_are_404() {
        let app = app();
        for path in [
            "/ffffffff-ffff-4fff-8fff-ffffffffffff",
            "/not-a-uuid",
            "/a1111111-1111-1111-8111-111111111111",
            "/%FF%FE",
        ] {
            let res = get(&app, path).await;
            assert_eq!(res.status(), StatusCode::NotFound, "{path}");
            assert!(body(&res).contains("Product not found"), "{path}");
        }
    }

    #[tokio::test]
    async fn other_routes_fall_through_to_404() {
        let app = app();
        assert_eq!(get(&app, "/a/b").await.status(), StatusCode::NotFound);

        let raw = b"POST /a1111111-1111-4111-8111-111111111111 HTTP/1.1\r\n\r\n";
        let res = app.handle(Request::parse(raw).unwrap().0).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }
}
