//! Product Service - Business logic layer

use image_store::ImageStore;
use query_composer::{parse_page_size, FilterClause, QueryComposer, QueryParameters};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    Actor, CreateProduct, ImageUpload, Product, ProductImage, ProductPage, ProductReviews,
    UpdateProduct, VendorProducts,
};
use crate::repository::ProductRepository;
use crate::reviews::{self, Review, ReviewError, ReviewOutcome, ReviewSubmission};

/// Catalog page size when the client sends no `limit`
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Review writes give up with `Conflict` after this many lost races
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Image store folder for product pictures
pub const IMAGE_FOLDER: &str = "products";

/// Product service providing business logic operations
///
/// The service layer handles validation, ownership rules, and orchestrates
/// repository and image store operations.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
    images: Arc<dyn ImageStore>,
    page_size: i64,
}

impl<R: ProductRepository> ProductService<R> {
    /// Create a new ProductService with the given repository and image store
    pub fn new(repository: R, images: Arc<dyn ImageStore>) -> Self {
        Self {
            repository: Arc::new(repository),
            images,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Default catalog page size; non-positive values are rejected per request
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Create a new product owned by `owner`
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, owner: Uuid, input: CreateProduct) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        self.repository.create(Product::new(owner, input)).await
    }

    /// One catalog page: keyword search and paging over all products.
    ///
    /// Other query parameters are not filters here; only the vendor listing
    /// filters on product fields.
    #[instrument(skip(self, params))]
    pub async fn list_products(&self, params: &QueryParameters) -> ProductResult<ProductPage> {
        let page_size = parse_page_size(params.limit(), self.page_size)?;
        let query = QueryComposer::new(params)
            .search()
            .paginate(page_size)?
            .build();

        let products = self.repository.find(&query).await?;
        let product_count = self.repository.count(&query).await?;
        let page_size = page_size.unsigned_abs();

        Ok(ProductPage {
            products,
            product_count,
            total_pages: product_count.div_ceil(page_size),
            current_page: query.page.map(|p| p.page_number).unwrap_or(1),
            page_size,
        })
    }

    /// A vendor's products matching keyword and filters, unpaginated
    #[instrument(skip(self, params))]
    pub async fn list_vendor_products(
        &self,
        vendor_id: Uuid,
        params: &QueryParameters,
    ) -> ProductResult<VendorProducts> {
        let query = QueryComposer::new(params)
            .scoped(FilterClause::new().equals("user", vendor_id))
            .search()
            .filter()?
            .build();
        log_dropped(query.dropped());

        let product_count = self.repository.count(&query).await?;
        let products = self.repository.find(&query).await?;

        Ok(VendorProducts {
            products,
            product_count,
        })
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> ProductResult<Product> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Every product, for the admin dashboard
    #[instrument(skip(self))]
    pub async fn list_all_products(&self) -> ProductResult<Vec<Product>> {
        self.repository.list_all().await
    }

    /// Update an existing product
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        actor: Actor,
        id: Uuid,
        input: UpdateProduct,
    ) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        self.authorize(actor, id).await?;
        retry_on_conflict(id, || self.repository.update(id, input.clone())).await
    }

    /// Delete a product and its images
    #[instrument(skip(self))]
    pub async fn delete_product(&self, actor: Actor, id: Uuid) -> ProductResult<()> {
        self.authorize(actor, id).await?;
        let product = self.repository.delete(id).await?;

        for image in &product.images {
            if let Err(e) = self.images.delete(&image.public_id).await {
                tracing::warn!(
                    product_id = %id,
                    public_id = %image.public_id,
                    error = %e,
                    "Failed to delete product image"
                );
            }
        }

        Ok(())
    }

    /// Upload pictures and attach them to a product
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload_images(
        &self,
        actor: Actor,
        id: Uuid,
        files: Vec<ImageUpload>,
    ) -> ProductResult<Product> {
        if files.is_empty() {
            return Err(ProductError::Validation(
                "at least one image is required".to_string(),
            ));
        }
        self.authorize(actor, id).await?;

        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            match self
                .images
                .upload(IMAGE_FOLDER, file.bytes, &file.filename)
                .await
            {
                Ok(stored) => uploaded.push(ProductImage::from(stored)),
                Err(e) => {
                    self.discard_images(&uploaded).await;
                    return Err(e.into());
                }
            }
        }

        let result =
            retry_on_conflict(id, || self.repository.add_images(id, uploaded.clone())).await;
        if result.is_err() {
            self.discard_images(&uploaded).await;
        }
        result
    }

    /// Add or replace the reviewer's review and refresh the product's rating
    #[instrument(skip(self, submission), fields(reviewer_id = %submission.reviewer_id))]
    pub async fn submit_review(
        &self,
        product_id: Uuid,
        submission: ReviewSubmission,
    ) -> ProductResult<Product> {
        let review_id = Uuid::now_v7();
        self.write_reviews(product_id, |existing| {
            reviews::upsert_review(existing, submission.clone(), review_id)
        })
        .await
    }

    /// A product's reviews with their summary
    #[instrument(skip(self))]
    pub async fn get_reviews(&self, product_id: Uuid) -> ProductResult<ProductReviews> {
        let product = self.get_product(product_id).await?;
        Ok(ProductReviews::of(&product))
    }

    /// Remove one review and refresh the product's rating
    #[instrument(skip(self))]
    pub async fn delete_review(&self, product_id: Uuid, review_id: Uuid) -> ProductResult<Product> {
        self.write_reviews(product_id, |existing| {
            reviews::remove_review(existing, review_id)
        })
        .await
    }

    async fn authorize(&self, actor: Actor, id: Uuid) -> ProductResult<Product> {
        let product = self.get_product(id).await?;
        if !actor.may_modify(&product) {
            return Err(ProductError::Forbidden(
                "Only the owning vendor or an admin can modify this product".to_string(),
            ));
        }
        Ok(product)
    }

    async fn write_reviews<F>(&self, product_id: Uuid, apply: F) -> ProductResult<Product>
    where
        F: Fn(&[Review]) -> Result<ReviewOutcome, ReviewError>,
    {
        let apply = &apply;
        retry_on_conflict(product_id, || async move {
            let product = self.get_product(product_id).await?;
            let outcome = apply(&product.reviews)?;
            self.repository
                .replace_reviews(product_id, product.version, outcome)
                .await
        })
        .await
    }

    async fn discard_images(&self, images: &[ProductImage]) {
        for image in images {
            if let Err(e) = self.images.delete(&image.public_id).await {
                tracing::warn!(public_id = %image.public_id, error = %e, "Failed to discard image");
            }
        }
    }
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            images: Arc::clone(&self.images),
            page_size: self.page_size,
        }
    }
}

/// Run `attempt` until it stops losing version races, at most
/// `MAX_WRITE_ATTEMPTS` times.
async fn retry_on_conflict<T, F, Fut>(id: Uuid, mut attempt: F) -> ProductResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProductResult<T>>,
{
    for n in 1..=MAX_WRITE_ATTEMPTS {
        match attempt().await {
            Err(ProductError::VersionConflict(_)) => {
                tracing::debug!(product_id = %id, attempt = n, "Lost a concurrent write, retrying");
            }
            other => return other,
        }
    }

    tracing::warn!(product_id = %id, attempts = MAX_WRITE_ATTEMPTS, "Giving up after repeated conflicts");
    Err(ProductError::Conflict(format!(
        "Product {id} is being modified concurrently, try again"
    )))
}

fn log_dropped(dropped: &[String]) {
    if !dropped.is_empty() {
        tracing::debug!(?dropped, "Ignored unsupported filter parameters");
    }
}
