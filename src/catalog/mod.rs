//! Product catalog model, identifier normalization, and the remote fetcher.
//!
//! A [`Snapshot`] is the unit the cache swaps: an ordered list of
//! [`Product`]s built in one go from a single fetch.

use serde_json::{Map, Value};

pub mod fetcher;
pub mod normalize;

pub use fetcher::{CatalogSource, FetchError, HttpCatalogFetcher};
pub use normalize::{normalize, normalize_value};

/// JSON field holding a product's QR identifier in catalog records.
pub const IDENTIFIER_FIELD: &str = "qr_uuid";

/// JSON field holding a product's display name, when the catalog provides one.
pub const NAME_FIELD: &str = "nombre";

/// A single catalog record.
///
/// The schema belongs to the remote catalog, so fields are kept as an opaque
/// JSON object. The one field the service relies on, [`IDENTIFIER_FIELD`], is
/// normalized on construction and cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    identifier: String,
    fields: Map<String, Value>,
}

impl Product {
    /// Builds a product from a raw catalog record.
    ///
    /// The identifier field is normalized and written back into the field map,
    /// so rendering shows the same value lookups compare against. Returns
    /// `None` when the record is not a JSON object or has no usable identifier.
    pub fn from_record(record: Value) -> Option<Self> {
        let Value::Object(mut fields) = record else {
            return None;
        };

        let identifier = fields
            .get(IDENTIFIER_FIELD)
            .map(normalize_value)
            .unwrap_or_default();
        if identifier.is_empty() {
            return None;
        }

        fields.insert(
            IDENTIFIER_FIELD.to_owned(),
            Value::String(identifier.clone()),
        );
        Some(Self { identifier, fields })
    }

    /// The normalized identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The display name, if the record carries a string under [`NAME_FIELD`].
    pub fn name(&self) -> Option<&str> {
        self.fields.get(NAME_FIELD).and_then(Value::as_str)
    }

    /// Looks up an arbitrary field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All fields in catalog order, identifier included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// An immutable, ordered list of products produced by one fetch.
///
/// Identifiers are not required to be unique; [`Snapshot::find`] returns the
/// first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    products: Vec<Product>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the first product whose identifier equals `identifier` exactly.
    ///
    /// `identifier` must already be normalized.
    pub fn find(&self, identifier: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.identifier == identifier)
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns `true` if the snapshot holds no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Self {
            products: iter.into_iter().collect(),
        }
    }
}
