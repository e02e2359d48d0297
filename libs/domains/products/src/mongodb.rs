//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use query_composer::{uuid_to_bson, ComposedQuery};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductImage, UpdateProduct};
use crate::repository::ProductRepository;
use crate::reviews::ReviewOutcome;

/// MongoDB implementation of the ProductRepository
///
/// Writes go through `replace_one` conditioned on the stored `version`, so
/// whole-document updates never overwrite a concurrent writer.
pub struct MongoProductRepository {
    collection: Collection<Product>,
}

impl MongoProductRepository {
    /// Create a new MongoProductRepository
    pub fn new(db: &Database) -> Self {
        let collection = db.collection::<Product>("products");
        Self { collection }
    }

    /// Create a new MongoProductRepository with a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<Product>(collection_name);
        Self { collection }
    }

    /// Initialize indexes for catalog listing and vendor scoping
    pub async fn init_indexes(&self) -> ProductResult<()> {
        let index = |keys: Document, name: &str| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };

        let indexes = vec![
            index(doc! { "name": 1 }, "idx_name"),
            index(doc! { "category": 1 }, "idx_category"),
            index(doc! { "price": 1 }, "idx_price"),
            index(doc! { "ratings": -1 }, "idx_ratings"),
            // Vendor listings
            index(doc! { "user": 1, "_id": 1 }, "idx_user"),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Product> {
        &self.collection
    }

    fn id_filter(id: Uuid) -> Document {
        doc! { "_id": uuid_to_bson(id) }
    }

    async fn load(&self, id: Uuid) -> ProductResult<Product> {
        self.collection
            .find_one(Self::id_filter(id))
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Store `product` if the document is still at `expected_version`.
    async fn replace_versioned(
        &self,
        mut product: Product,
        expected_version: u64,
    ) -> ProductResult<Product> {
        let id = product.id;
        let filter = doc! {
            "_id": uuid_to_bson(id),
            "version": i64::try_from(expected_version).unwrap_or(i64::MAX),
        };
        product.version = expected_version + 1;

        let result = self.collection.replace_one(filter, &product).await?;
        if result.matched_count == 0 {
            // Missing documents surface as NotFound rather than a conflict
            self.load(id).await?;
            return Err(ProductError::VersionConflict(id));
        }
        Ok(product)
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn create(&self, product: Product) -> ProductResult<Product> {
        self.collection.insert_one(&product).await?;

        tracing::info!(product_id = %product.id, "Product created successfully");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let product = self.collection.find_one(Self::id_filter(id)).await?;
        Ok(product)
    }

    #[instrument(skip(self, query))]
    async fn find(&self, query: &ComposedQuery) -> ProductResult<Vec<Product>> {
        let mut options = query.find_options();
        options.sort = Some(doc! { "_id": 1 });

        let cursor = self
            .collection
            .find(query.to_document())
            .with_options(options)
            .await?;
        let products: Vec<Product> = cursor.try_collect().await?;

        Ok(products)
    }

    #[instrument(skip(self, query))]
    async fn count(&self, query: &ComposedQuery) -> ProductResult<u64> {
        let count = self
            .collection
            .count_documents(query.count_document())
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> ProductResult<Vec<Product>> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await?;
        let products: Vec<Product> = cursor.try_collect().await?;
        Ok(products)
    }

    #[instrument(skip(self, input))]
    async fn update(&self, id: Uuid, input: UpdateProduct) -> ProductResult<Product> {
        let mut product = self.load(id).await?;
        let expected_version = product.version;
        product.apply_update(input);

        let updated = self.replace_versioned(product, expected_version).await?;

        tracing::info!(product_id = %id, "Product updated successfully");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> ProductResult<Product> {
        let product = self
            .collection
            .find_one_and_delete(Self::id_filter(id))
            .await?
            .ok_or(ProductError::NotFound(id))?;

        tracing::info!(product_id = %id, "Product deleted successfully");
        Ok(product)
    }

    #[instrument(skip(self, images), fields(count = images.len()))]
    async fn add_images(&self, id: Uuid, images: Vec<ProductImage>) -> ProductResult<Product> {
        let mut product = self.load(id).await?;
        let expected_version = product.version;
        product.images.extend(images);
        product.updated_at = chrono::Utc::now();

        self.replace_versioned(product, expected_version).await
    }

    #[instrument(skip(self, outcome), fields(reviews = outcome.reviews.len()))]
    async fn replace_reviews(
        &self,
        id: Uuid,
        expected_version: u64,
        outcome: ReviewOutcome,
    ) -> ProductResult<Product> {
        let mut product = self.load(id).await?;
        if product.version != expected_version {
            return Err(ProductError::VersionConflict(id));
        }
        product.apply_reviews(outcome);

        let stored = self.replace_versioned(product, expected_version).await?;
        tracing::info!(
            product_id = %id,
            num_of_reviews = stored.num_of_reviews,
            "Reviews stored"
        );
        Ok(stored)
    }
}
