use chrono::{DateTime, Utc};
use image_store::StoredImage;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::reviews::{list_reviews, RatingSummary, Review, ReviewOutcome};

/// Uploaded product picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    /// Image store identifier, used for deletion
    pub public_id: String,
    /// Public URL
    pub url: String,
}

impl From<StoredImage> for ProductImage {
    fn from(image: StoredImage) -> Self {
        Self {
            public_id: image.public_id,
            url: image.url,
        }
    }
}

/// Product entity - represents a product stored in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Average review rating, 0 when there are no reviews
    #[serde(default)]
    pub ratings: f64,
    #[serde(default)]
    pub num_of_reviews: u32,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    pub category: String,
    pub stock: u32,
    /// Reviews in submission order, at most one per reviewer
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Owning vendor or admin
    pub user: Uuid,
    /// Bumped on every write; review writes are conditional on it
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 4000))]
    pub description: String,
    #[validate(range(min = 0.0, max = 99_999_999.0))]
    pub price: f64,
    #[validate(length(min = 1, max = 60))]
    pub category: String,
    #[validate(range(max = 9999))]
    #[serde(default = "default_stock")]
    pub stock: u32,
}

/// DTO for updating an existing product
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 4000))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 99_999_999.0))]
    pub price: Option<f64>,
    #[validate(length(min = 1, max = 60))]
    pub category: Option<String>,
    #[validate(range(max = 9999))]
    pub stock: Option<u32>,
}

/// Review submission body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitReview {
    pub product_id: Uuid,
    #[validate(range(min = 1.0, max = 5.0))]
    pub rating: f64,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub comment: String,
}

/// `GET /reviews` query
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewsQuery {
    /// Product ID
    pub id: Uuid,
}

/// `DELETE /reviews` query
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteReviewQuery {
    /// Product ID
    pub product_id: Uuid,
    /// Review ID
    pub id: Uuid,
}

/// One page of the public catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Products in the catalog, independent of search terms
    pub product_count: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
}

/// A vendor's products matching the request filters
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorProducts {
    pub products: Vec<Product>,
    /// All products owned by the vendor
    pub product_count: u64,
}

/// Reviews of one product with their summary
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductReviews {
    pub product_id: Uuid,
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
}

impl ProductReviews {
    pub fn of(product: &Product) -> Self {
        Self {
            product_id: product.id,
            summary: product.rating_summary(),
            reviews: list_reviews(product).to_vec(),
        }
    }
}

/// Authenticated caller of a write operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    /// Admins may change any product, vendors only their own.
    pub fn may_modify(&self, product: &Product) -> bool {
        self.is_admin || product.user == self.user_id
    }
}

/// One file of a multipart image upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

fn default_stock() -> u32 {
    1
}

impl Product {
    /// Create a new product owned by `owner`
    pub fn new(owner: Uuid, input: CreateProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            price: input.price,
            ratings: 0.0,
            num_of_reviews: 0,
            images: Vec::new(),
            category: input.category,
            stock: input.stock,
            reviews: Vec::new(),
            user: owner,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply updates from UpdateProduct DTO
    pub fn apply_update(&mut self, update: UpdateProduct) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        self.updated_at = Utc::now();
    }

    /// Store a review list and the summary derived from it.
    pub fn apply_reviews(&mut self, outcome: ReviewOutcome) {
        self.reviews = outcome.reviews;
        self.num_of_reviews = outcome.summary.number_of_reviews;
        self.ratings = outcome.summary.average_rating;
        self.updated_at = Utc::now();
    }

    pub fn rating_summary(&self) -> RatingSummary {
        RatingSummary {
            number_of_reviews: self.num_of_reviews,
            average_rating: self.ratings,
        }
    }
}
