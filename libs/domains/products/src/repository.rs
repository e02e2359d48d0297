use async_trait::async_trait;
use chrono::Utc;
use query_composer::ComposedQuery;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductImage, UpdateProduct};
use crate::reviews::ReviewOutcome;

/// Repository trait for Product persistence
///
/// Every write bumps `Product::version`. `replace_reviews` only succeeds
/// against the version its caller read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a new product
    async fn create(&self, product: Product) -> ProductResult<Product>;

    /// Get a product by ID
    async fn get_by_id(&self, id: Uuid) -> ProductResult<Option<Product>>;

    /// Products matching scope, search and filter, windowed by the page
    async fn find(&self, query: &ComposedQuery) -> ProductResult<Vec<Product>>;

    /// Products within the query's scope, ignoring search, filter and page
    async fn count(&self, query: &ComposedQuery) -> ProductResult<u64>;

    /// Every product, unpaginated
    async fn list_all(&self) -> ProductResult<Vec<Product>>;

    /// Update an existing product
    async fn update(&self, id: Uuid, input: UpdateProduct) -> ProductResult<Product>;

    /// Delete a product, returning what was removed
    async fn delete(&self, id: Uuid) -> ProductResult<Product>;

    /// Append images to a product
    async fn add_images(&self, id: Uuid, images: Vec<ProductImage>) -> ProductResult<Product>;

    /// Store `outcome` if the product is still at `expected_version`,
    /// otherwise `ProductError::VersionConflict`
    async fn replace_reviews(
        &self,
        id: Uuid,
        expected_version: u64,
        outcome: ReviewOutcome,
    ) -> ProductResult<Product>;
}

/// In-memory implementation of ProductRepository
///
/// Keeps insertion order, like a collection scan. Queries are evaluated on
/// the products' JSON form.
#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<Vec<Product>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching<'a>(
        products: &'a [Product],
        query: &'a ComposedQuery,
    ) -> impl Iterator<Item = ProductResult<&'a Product>> + 'a {
        products.iter().filter_map(move |product| {
            match serde_json::to_value(product) {
                Ok(doc) => query.matches(&doc).then_some(Ok(product)),
                Err(e) => Some(Err(e.into())),
            }
        })
    }

    async fn modify<F>(&self, id: Uuid, apply: F) -> ProductResult<Product>
    where
        F: FnOnce(&mut Product) -> ProductResult<()>,
    {
        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ProductError::NotFound(id))?;

        apply(product)?;
        product.version += 1;
        Ok(product.clone())
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create(&self, product: Product) -> ProductResult<Product> {
        let mut products = self.products.write().await;
        if products.iter().any(|p| p.id == product.id) {
            return Err(ProductError::Conflict(format!(
                "Product {} already exists",
                product.id
            )));
        }
        products.push(product.clone());
        tracing::info!(product_id = %product.id, "Product created in memory");
        Ok(product)
    }

    async fn get_by_id(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn find(&self, query: &ComposedQuery) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;
        let (skip, limit) = match query.page {
            Some(page) => (page.skip(), page.limit()),
            None => (0, u64::MAX),
        };

        Self::matching(&products, query)
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|found| found.cloned())
            .collect()
    }

    async fn count(&self, query: &ComposedQuery) -> ProductResult<u64> {
        let products = self.products.read().await;
        let scope = query.count_query();
        let mut count = 0;
        for found in Self::matching(&products, &scope) {
            found?;
            count += 1;
        }
        Ok(count)
    }

    async fn list_all(&self) -> ProductResult<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn update(&self, id: Uuid, input: UpdateProduct) -> ProductResult<Product> {
        let product = self
            .modify(id, |product| {
                product.apply_update(input);
                Ok(())
            })
            .await?;
        tracing::info!(product_id = %id, "Product updated in memory");
        Ok(product)
    }

    async fn delete(&self, id: Uuid) -> ProductResult<Product> {
        let mut products = self.products.write().await;
        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or(ProductError::NotFound(id))?;
        tracing::info!(product_id = %id, "Product deleted from memory");
        Ok(products.remove(index))
    }

    async fn add_images(&self, id: Uuid, images: Vec<ProductImage>) -> ProductResult<Product> {
        self.modify(id, |product| {
            product.images.extend(images);
            product.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    async fn replace_reviews(
        &self,
        id: Uuid,
        expected_version: u64,
        outcome: ReviewOutcome,
    ) -> ProductResult<Product> {
        self.modify(id, |product| {
            if product.version != expected_version {
                return Err(ProductError::VersionConflict(id));
            }
            product.apply_reviews(outcome);
            Ok(())
        })
        .await
    }
}
