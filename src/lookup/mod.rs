//! Lookup service — resolves a scanned identifier to a catalog product.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::CatalogCache;
use crate::catalog::{Product, normalize};

// Canonical hyphenated UUID with version nibble 4 and an RFC 4122 variant nibble.
static UUID_V4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("UUIDv4 pattern is valid")
});

/// An identifier rejected before the catalog is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{normalized}` is not a canonical version-4 UUID")]
pub struct ValidationError {
    pub normalized: String,
}

/// Normalizes `raw` and checks that it is a canonical UUIDv4.
///
/// # Examples
///
/// ```
/// use qr_catalog::lookup::validate_identifier;
///
/// let id = validate_identifier(" A1111111-1111-4111-8111-111111111111 ").unwrap();
/// assert_eq!(id, "a1111111-1111-4111-8111-111111111111");
///
/// assert!(validate_identifier("not-a-uuid").is_err());
/// ```
///
/// # Errors
///
/// Returns [`ValidationError`] when the normalized string is not in the
/// 8-4-4-4-12 form with the version-4 and variant nibbles set.
pub fn validate_identifier(raw: &str) -> Result<String, ValidationError> {
    let normalized = normalize(raw);
    if UUID_V4.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationError { normalized })
    }
}

/// Resolves identifiers against the [`CatalogCache`].
#[derive(Clone)]
pub struct LookupService {
    cache: Arc<CatalogCache>,
}

impl LookupService {
    pub fn new(cache: Arc<CatalogCache>) -> Self {
        Self { cache }
    }

    /// The cache this service reads from.
    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Resolves a raw identifier to the first matching product.
    ///
    /// Malformed identifiers and unknown ones both come back as `None`;
    /// only well-formed identifiers touch the cache, and may trigger a
    /// refresh if the snapshot is stale.
    pub async fn resolve(&self, raw_identifier: &str) -> Option<Product> {
        let identifier = match validate_identifier(raw_identifier) {
            Ok(id) => id,
            Err(e) => {
                debug!(raw = raw_identifier, error = %e, "rejected identifier");
                return None;
            }
        };

        let snapshot = self.cache.get_snapshot().await;
        match snapshot.find(&identifier) {
            Some(product) => {
                info!(
                    identifier = %identifier,
                    name = product.name().unwrap_or_default(),
                    "product found"
                );
                Some(product.clone())
            }
            None => {
                info!(identifier = %identifier, catalog_size = snapshot.len(), "product not found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSource, FetchError, Snapshot};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const WIDGET: &str = "a1111111-1111-4111-8111-111111111111";

    struct Records {
        records: serde_json::Value,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CatalogSource for Records {
        async fn fetch(&self) -> Result<Snapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(crate::catalog::fetcher::decode_snapshot(self.records.to_string().as_bytes())
                .expect("valid json"))
        }
    }

    fn service(records: serde_json::Value) -> (LookupService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Records {
            records,
            calls: Arc::clone(&calls),
        };
        let cache = CatalogCache::new(source, Duration::from_secs(60));
        (LookupService::new(Arc::new(cache)), calls)
    }

    fn widget_catalog() -> serde_json::Value {
        json!([{"qr_uuid": WIDGET, "nombre": "Widget"}])
    }

    // ── validate_identifier ───────────────────────────────────────────────────

    #[test]
    fn accepts_v4_in_any_case_and_padding() {
        assert_eq!(validate_identifier(WIDGET).unwrap(), WIDGET);
        assert_eq!(
            validate_identifier("\tA1111111-1111-4111-8111-111111111111  ").unwrap(),
            WIDGET
        );
        assert!(validate_identifier("ffffffff-ffff-4fff-bfff-ffffffffffff").is_ok());
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for raw in [
            "",
            "   ",
            "not-a-uuid",
            // version 1
            "a1111111-1111-1111-8111-111111111111",
            // variant nibble outside 8..b
            "a1111111-1111-4111-c111-111111111111",
            // simple (unhyphenated) form
            "a1111111111141118111111111111111",
            // braced form
            "{a1111111-1111-4111-8111-111111111111}",
            // non-hex digit
            "g1111111-1111-4111-8111-111111111111",
            // trailing garbage
            "a1111111-1111-4111-8111-111111111111x",
        ] {
            assert!(validate_identifier(raw).is_err(), "accepted {raw:?}");
        }
    }

    // ── resolve ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn resolves_uppercase_identifier() {
        let (svc, _) = service(widget_catalog());
        let product = svc
            .resolve("A1111111-1111-4111-8111-111111111111")
            .await
            .unwrap();
        assert_eq!(product.name(), Some("Widget"));
        assert_eq!(product.identifier(), WIDGET);
    }

    #[tokio::test]
    async fn case_and_whitespace_variants_agree() {
        let (svc, _) = service(widget_catalog());
        let canonical = svc.resolve(WIDGET).await;
        for variant in [
            " a1111111-1111-4111-8111-111111111111",
            "A1111111-1111-4111-8111-111111111111\n",
            "  a1111111-1111-4111-8111-111111111111  ",
        ] {
            assert_eq!(svc.resolve(variant).await, canonical, "{variant:?}");
        }

        let missing = "ffffffff-ffff-4fff-8fff-ffffffffffff";
        assert_eq!(
            svc.resolve(missing).await,
            svc.resolve(&missing.to_uppercase()).await
        );
    }

    #[tokio::test]
    async fn unknown_identifier_against_empty_catalog() {
        let (svc, calls) = service(json!([]));
        assert!(svc.resolve("ffffffff-ffff-4fff-8fff-ffffffffffff").await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_identifier_never_reaches_the_cache() {
        let (svc, calls) = service(widget_catalog());
        for raw in ["not-a-uuid", "", "a1111111-1111-1111-8111-111111111111"] {
            assert!(svc.resolve(raw).await.is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(svc.cache().status().await.last_refresh.is_none());
    }

    #[tokio::test]
    async fn first_duplicate_wins() {
        let (svc, _) = service(json!({"record": [
            {"qr_uuid": WIDGET, "nombre": "first"},
            {"qr_uuid": WIDGET.to_uppercase(), "nombre": "second"},
        ]}));
        assert_eq!(
            svc.resolve(WIDGET).await.as_ref().and_then(Product::name),
            Some("first")
        );
    }

    #[tokio::test]
    async fn no_partial_matches() {
        let (svc, _) = service(widget_catalog());
        assert!(svc
            .resolve("a1111111-1111-4111-8111-11111111111f")
            .await
            .is_none());
    }
}
