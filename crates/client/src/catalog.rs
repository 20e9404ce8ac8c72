//! Product catalog.
//!
//! The catalog is fetched in a single call (products and categories
//! together) and then filtered and paged entirely client-side. There is no
//! incremental fetch; the dataset is small and the backend exposes no paged
//! endpoint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use zafaran_core::{CategoryId, ProductId};

use crate::api::{ApiClient, ApiError, Envelope};

/// Products shown per page when paging client-side.
pub const PRODUCTS_PER_PAGE: usize = 10;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: CategoryId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// URL slug, used for filtering.
    pub slug: String,
}

/// A product's category reference: either a bare slug or an embedded
/// category object, depending on backend population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    /// Bare slug.
    Slug(String),
    /// Populated category.
    Category(Category),
}

impl CategoryRef {
    /// The category slug, regardless of shape.
    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Self::Slug(slug) => slug,
            Self::Category(category) => &category.slug,
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: ProductId,
    /// URL slug.
    #[serde(default)]
    pub slug: Option<String>,
    /// Display name.
    pub name: String,
    /// Description text.
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price.
    pub price: Decimal,
    /// Image path, relative to the image base URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Category reference; `None` for uncategorized products.
    #[serde(default)]
    pub category: Option<CategoryRef>,
    /// Whether this product is the promoted offer.
    #[serde(default)]
    pub promoted: bool,
}

impl Product {
    /// Whether the product belongs to the category with the given slug.
    #[must_use]
    pub fn in_category(&self, slug: &str) -> bool {
        self.category
            .as_ref()
            .is_some_and(|category| category.slug() == slug)
    }
}

/// The full catalog: all products and categories, fetched once.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// All products.
    #[serde(default)]
    pub products: Vec<Product>,
    /// All categories.
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Catalog {
    /// Fetch the full catalog.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a rejected/unparseable
    /// response.
    #[instrument(skip(api))]
    pub async fn fetch(api: &ApiClient) -> Result<Self, ApiError> {
        let envelope: Envelope<Self> = api.get("/products").await?;
        envelope.into_result()
    }

    /// Products in the given category, or all products when `slug` is
    /// `None`.
    #[must_use]
    pub fn filter_by_category(&self, slug: Option<&str>) -> Vec<&Product> {
        match slug {
            Some(slug) => self
                .products
                .iter()
                .filter(|product| product.in_category(slug))
                .collect(),
            None => self.products.iter().collect(),
        }
    }

    /// One page of the (optionally category-filtered) product list.
    ///
    /// Pages are 1-based; a page past the end is empty.
    #[must_use]
    pub fn page(&self, category: Option<&str>, page: usize) -> Vec<&Product> {
        let filtered = self.filter_by_category(category);
        let start = page.saturating_sub(1) * PRODUCTS_PER_PAGE;
        filtered
            .into_iter()
            .skip(start)
            .take(PRODUCTS_PER_PAGE)
            .collect()
    }

    /// Number of pages for the (optionally filtered) product list.
    #[must_use]
    pub fn page_count(&self, category: Option<&str>) -> usize {
        self.filter_by_category(category)
            .len()
            .div_ceil(PRODUCTS_PER_PAGE)
    }

    /// The promoted product, if any is flagged.
    #[must_use]
    pub fn promoted(&self) -> Option<&Product> {
        self.products.iter().find(|product| product.promoted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, category: Option<CategoryRef>) -> Product {
        Product {
            id: ProductId::new(id),
            slug: Some(id.to_owned()),
            name: format!("Product {id}"),
            description: None,
            price: Decimal::from(10),
            image: None,
            category,
            promoted: false,
        }
    }

    fn sample_catalog() -> Catalog {
        let spices = CategoryRef::Category(Category {
            id: CategoryId::new("c1"),
            name: Some("Spices".to_owned()),
            slug: "spices".to_owned(),
        });

        let mut products: Vec<Product> = (0..12)
            .map(|i| product(&format!("p{i}"), Some(spices.clone())))
            .collect();
        products.push(product("gift", Some(CategoryRef::Slug("gifts".to_owned()))));
        products.push(product("loose", None));
        products[3].promoted = true;

        Catalog {
            products,
            categories: vec![Category {
                id: CategoryId::new("c1"),
                name: Some("Spices".to_owned()),
                slug: "spices".to_owned(),
            }],
        }
    }

    #[test]
    fn test_filter_matches_bare_slug_and_embedded_category() {
        let catalog = sample_catalog();
        assert_eq!(catalog.filter_by_category(Some("spices")).len(), 12);
        assert_eq!(catalog.filter_by_category(Some("gifts")).len(), 1);
        assert_eq!(catalog.filter_by_category(None).len(), 14);
    }

    #[test]
    fn test_uncategorized_product_matches_no_category() {
        let catalog = sample_catalog();
        assert!(
            !catalog
                .filter_by_category(Some("spices"))
                .iter()
                .any(|p| p.id == ProductId::new("loose"))
        );
    }

    #[test]
    fn test_paging_is_one_based_with_fixed_size() {
        let catalog = sample_catalog();

        let first = catalog.page(Some("spices"), 1);
        assert_eq!(first.len(), PRODUCTS_PER_PAGE);
        assert_eq!(first[0].id, ProductId::new("p0"));

        let second = catalog.page(Some("spices"), 2);
        assert_eq!(second.len(), 2);

        assert!(catalog.page(Some("spices"), 3).is_empty());
        assert_eq!(catalog.page_count(Some("spices")), 2);
    }

    #[test]
    fn test_promoted_product_found() {
        let catalog = sample_catalog();
        assert_eq!(catalog.promoted().unwrap().id, ProductId::new("p3"));

        let empty = Catalog::default();
        assert!(empty.promoted().is_none());
    }

    #[test]
    fn test_deserialize_product_with_mongo_id_and_slug_category() {
        let raw = r#"{
            "_id": "65a1",
            "name": "Super Negin",
            "price": 28.5,
            "category": "spices",
            "promoted": true
        }"#;
        let product: Product = serde_json::from_str(raw).unwrap();
        assert_eq!(product.id, ProductId::new("65a1"));
        assert!(product.in_category("spices"));
        assert!(product.promoted);
        assert_eq!(product.price, Decimal::new(285, 1));
    }
}
