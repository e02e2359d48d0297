//! HTTP handlers for Products API

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestQueryResponse, BadRequestUuidResponse, BadRequestValidationResponse,
        ConflictResponse, ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse,
        UnauthorizedResponse,
    },
    optional_jwt_auth_middleware, AppError, JwtAuth, JwtClaims, UuidPath, ValidatedJson,
};
use query_composer::QueryParams;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::error::ProductResult;
use crate::models::{
    Actor, CreateProduct, DeleteReviewQuery, ImageUpload, Product, ProductImage, ProductPage,
    ProductReviews, ReviewsQuery, SubmitReview, UpdateProduct, VendorProducts,
};
use crate::repository::ProductRepository;
use crate::reviews::{RatingSummary, Review, ReviewSubmission};
use crate::service::ProductService;

const ADMIN: &str = "admin";
const VENDOR: &str = "vendor";

/// Upload size cap for `POST /{id}/images`
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// OpenAPI documentation for Products API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        list_vendor_products,
        list_all_products,
        get_product,
        update_product,
        delete_product,
        upload_images,
        submit_review,
        get_reviews,
        delete_review,
    ),
    components(
        schemas(
            Product, ProductImage, CreateProduct, UpdateProduct, ProductPage,
            VendorProducts, SubmitReview, ProductReviews, Review, RatingSummary,
            ImageUploadForm
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            BadRequestQueryResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Catalog endpoints"),
        (name = "Reviews", description = "Product review endpoints")
    )
)]
pub struct ApiDoc;

/// Multipart body of an image upload
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    /// One or more image files
    #[schema(value_type = Vec<String>, format = Binary)]
    images: Vec<Vec<u8>>,
}

/// Create the products router with all HTTP endpoints
///
/// Requests carrying a valid token get their claims attached; handlers that
/// need a caller reject anonymous requests with 401.
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>, auth: JwtAuth) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/admin/all", get(list_all_products))
        .route("/vendor/{vendor_id}", get(list_vendor_products))
        .route(
            "/reviews",
            get(get_reviews).put(submit_review).delete(delete_review),
        )
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/{id}/images",
            post(upload_images).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .layer(middleware::from_fn_with_state(
            auth,
            optional_jwt_auth_middleware,
        ))
        .with_state(shared_service)
}

/// Vendors and admins may manage products.
fn product_manager(claims: &JwtClaims) -> Result<Actor, AppError> {
    claims.require_any_role(&[ADMIN, VENDOR])?;
    Ok(Actor {
        user_id: claims.user_id()?,
        is_admin: claims.has_role(ADMIN),
    })
}

/// List one page of the catalog
///
/// Only `keyword`, `page` and `limit` are read; other parameters are ignored.
#[utoipa::path(
    get,
    path = "",
    tag = "Products",
    params(
        ("keyword" = Option<String>, Query, description = "Case-insensitive match on the name"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("limit" = Option<u64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "One page of products", body = ProductPage),
        (status = 400, response = BadRequestQueryResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    QueryParams(params): QueryParams,
) -> ProductResult<Json<ProductPage>> {
    let page = service.list_products(&params).await?;
    Ok(Json(page))
}

/// List a vendor's products
///
/// Besides `keyword`, every query parameter filters on the product field of
/// the same name: `category=home`, `price[gte]=10`.
#[utoipa::path(
    get,
    path = "/vendor/{vendor_id}",
    tag = "Products",
    params(
        ("vendor_id" = Uuid, Path, description = "Vendor user ID"),
        ("keyword" = Option<String>, Query, description = "Case-insensitive match on the name")
    ),
    responses(
        (status = 200, description = "The vendor's products", body = VendorProducts),
        (status = 400, response = BadRequestQueryResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_vendor_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    UuidPath(vendor_id): UuidPath,
    QueryParams(params): QueryParams,
) -> ProductResult<Json<VendorProducts>> {
    let products = service.list_vendor_products(vendor_id, &params).await?;
    Ok(Json(products))
}

/// List every product (admin)
#[utoipa::path(
    get,
    path = "/admin/all",
    tag = "Products",
    responses(
        (status = 200, description = "All products", body = Vec<Product>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_all_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    claims: JwtClaims,
) -> Result<Json<Vec<Product>>, AppError> {
    claims.require_any_role(&[ADMIN])?;
    let products = service.list_all_products().await?;
    Ok(Json(products))
}

/// Create a new product
#[utoipa::path(
    post,
    path = "",
    tag = "Products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    claims: JwtClaims,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> Result<impl IntoResponse, AppError> {
    let actor = product_manager(&claims)?;
    let product = service.create_product(actor.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    UuidPath(id): UuidPath,
) -> ProductResult<Json<Product>> {
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    claims: JwtClaims,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> Result<Json<Product>, AppError> {
    let actor = product_manager(&claims)?;
    let product = service.update_product(actor, id, input).await?;
    Ok(Json(product))
}

/// Delete a product and its images
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted successfully"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    claims: JwtClaims,
    UuidPath(id): UuidPath,
) -> Result<impl IntoResponse, AppError> {
    let actor = product_manager(&claims)?;
    service.delete_product(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload product images
#[utoipa::path(
    post,
    path = "/{id}/images",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Images attached", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn upload_images<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    claims: JwtClaims,
    UuidPath(id): UuidPath,
    mut multipart: Multipart,
) -> Result<Json<Product>, AppError> {
    let actor = product_manager(&claims)?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        files.push(ImageUpload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    let product = service.upload_images(actor, id, files).await?;
    Ok(Json(product))
}

/// Add or replace the caller's review
#[utoipa::path(
    put,
    path = "/reviews",
    tag = "Reviews",
    request_body = SubmitReview,
    responses(
        (status = 200, description = "Review stored", body = ProductReviews),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn submit_review<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    claims: JwtClaims,
    ValidatedJson(input): ValidatedJson<SubmitReview>,
) -> Result<Json<ProductReviews>, AppError> {
    let submission = ReviewSubmission {
        reviewer_id: claims.user_id()?,
        reviewer_name: claims.name,
        rating: input.rating,
        comment: input.comment,
    };
    let product = service.submit_review(input.product_id, submission).await?;
    Ok(Json(ProductReviews::of(&product)))
}

/// List a product's reviews
#[utoipa::path(
    get,
    path = "/reviews",
    tag = "Reviews",
    params(ReviewsQuery),
    responses(
        (status = 200, description = "Reviews with summary", body = ProductReviews),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_reviews<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(query): Query<ReviewsQuery>,
) -> ProductResult<Json<ProductReviews>> {
    let reviews = service.get_reviews(query.id).await?;
    Ok(Json(reviews))
}

/// Delete a review
#[utoipa::path(
    delete,
    path = "/reviews",
    tag = "Reviews",
    params(DeleteReviewQuery),
    responses(
        (status = 200, description = "Remaining reviews with summary", body = ProductReviews),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_review<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    _claims: JwtClaims,
    Query(query): Query<DeleteReviewQuery>,
) -> Result<Json<ProductReviews>, AppError> {
    let product = service.delete_review(query.product_id, query.id).await?;
    Ok(Json(ProductReviews::of(&product)))
}
