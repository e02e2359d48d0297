//! Handler tests for Products domain
//!
//! These run the products router against the in-memory repository and
//! image store:
//! - Role checks on product management
//! - Catalog query parameters
//! - Review submission and removal
//! - Error responses

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use axum_helpers::{JwtAuth, JwtConfig};
use domain_products::*;
use http_body_util::BodyExt;
use image_store::InMemoryImageStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

const SECRET: &str = "handler-test-secret-with-enough-chars";

struct TestApp {
    repo: InMemoryProductRepository,
    images: InMemoryImageStore,
    auth: JwtAuth,
}

impl TestApp {
    fn new() -> Self {
        Self {
            repo: InMemoryProductRepository::new(),
            images: InMemoryImageStore::new(),
            auth: JwtAuth::new(&JwtConfig::new(SECRET)),
        }
    }

    fn router(&self) -> Router {
        let service = ProductService::new(self.repo.clone(), Arc::new(self.images.clone()))
            .with_page_size(2);
        handlers::router(service, self.auth.clone())
    }

    fn token(&self, user_id: Uuid, role: &str) -> String {
        self.auth
            .create_token(&user_id.to_string(), "someone@shop.test", "Someone", &[role.to_string()])
            .unwrap()
    }

    async fn seed(&self, owner: Uuid, name: &str, price: f64) -> Product {
        let product = Product::new(
            owner,
            CreateProduct {
                name: name.to_string(),
                description: format!("{name} description"),
                price,
                category: "home".to_string(),
                stock: 5,
            },
        );
        self.repo.create(product).await.unwrap()
    }
}

// Helper to parse JSON response body
async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn lamp_body() -> Value {
    json!({
        "name": "Desk lamp",
        "description": "Adjustable arm",
        "price": 39.5,
        "category": "home",
        "stock": 4
    })
}

#[tokio::test]
async fn test_vendor_creates_product_returns_201() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    let token = app.token(vendor, "vendor");

    let response = app
        .router()
        .oneshot(json_request("POST", "/", Some(&token), lamp_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let product: Product = json_body(response.into_body()).await;
    assert_eq!(product.name, "Desk lamp");
    assert_eq!(product.user, vendor);
    assert_eq!(product.num_of_reviews, 0);
}

#[tokio::test]
async fn test_create_product_requires_login() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(json_request("POST", "/", None, lamp_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_cannot_create_product() {
    let app = TestApp::new();
    let token = app.token(Uuid::now_v7(), "user");

    let response = app
        .router()
        .oneshot(json_request("POST", "/", Some(&token), lamp_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_product_validates_input() {
    let app = TestApp::new();
    let token = app.token(Uuid::now_v7(), "admin");

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/",
            Some(&token),
            json!({ "name": "", "description": "x", "price": 1.0, "category": "home" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_products_searches_and_pages() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    app.seed(vendor, "Desk Lamp", 40.0).await;
    app.seed(vendor, "Floor lamp", 120.0).await;
    app.seed(vendor, "Armchair", 300.0).await;
    app.seed(vendor, "Lamp shade", 15.0).await;

    let response = app.router().oneshot(get("/?keyword=LAMP")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page: ProductPage = json_body(response.into_body()).await;
    let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Desk Lamp", "Floor lamp"]);
    assert_eq!(page.product_count, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.current_page, 1);
}

#[tokio::test]
async fn test_list_products_does_not_filter_on_other_parameters() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    app.seed(vendor, "Desk lamp", 40.0).await;

    let response = app
        .router()
        .oneshot(get("/?per_page=5&_=1718000000&price%5Bgte%5D=500"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page: ProductPage = json_body(response.into_body()).await;
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.product_count, 1);
}

#[tokio::test]
async fn test_list_products_second_page() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    for name in ["a", "b", "c"] {
        app.seed(vendor, name, 10.0).await;
    }

    let response = app.router().oneshot(get("/?page=2")).await.unwrap();

    let page: ProductPage = json_body(response.into_body()).await;
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].name, "c");
    assert_eq!(page.current_page, 2);
}

#[tokio::test]
async fn test_vendor_listing_rejects_nested_operand() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(get(&format!("/vendor/{}?price%5Bgt%5D%5Bx%5D=1", Uuid::now_v7())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["error"], "INVALID_QUERY");
}

#[tokio::test]
async fn test_operator_injection_is_ignored() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    app.seed(vendor, "Desk lamp", 40.0).await;

    let response = app
        .router()
        .oneshot(get(&format!(
            "/vendor/{vendor}?%24where=sleep(1000)&price%5B%24ne%5D=0"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let listed: VendorProducts = json_body(response.into_body()).await;
    assert_eq!(listed.products.len(), 1);
}

#[tokio::test]
async fn test_vendor_listing_counts_only_vendor_products() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    app.seed(vendor, "Desk lamp", 40.0).await;
    app.seed(vendor, "Stool", 25.0).await;
    app.seed(Uuid::now_v7(), "Other lamp", 30.0).await;

    let response = app
        .router()
        .oneshot(get(&format!("/vendor/{vendor}?keyword=lamp")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let listed: VendorProducts = json_body(response.into_body()).await;
    assert_eq!(listed.product_count, 2);
    assert_eq!(listed.products.len(), 1);
    assert_eq!(listed.products[0].name, "Desk lamp");
}

#[tokio::test]
async fn test_get_product_invalid_uuid_returns_400() {
    let app = TestApp::new();

    let response = app.router().oneshot(get("/not-a-uuid")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_product_not_found_returns_404() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(get(&format!("/{}", Uuid::now_v7())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vendor_cannot_update_foreign_product() {
    let app = TestApp::new();
    let product = app.seed(Uuid::now_v7(), "Desk lamp", 40.0).await;
    let token = app.token(Uuid::now_v7(), "vendor");

    let response = app
        .router()
        .oneshot(json_request(
            "PUT",
            &format!("/{}", product.id),
            Some(&token),
            json!({ "price": 1.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_updates_product() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    let product = app.seed(vendor, "Desk lamp", 40.0).await;
    let token = app.token(vendor, "vendor");

    let response = app
        .router()
        .oneshot(json_request(
            "PUT",
            &format!("/{}", product.id),
            Some(&token),
            json!({ "price": 35.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let updated: Product = json_body(response.into_body()).await;
    assert_eq!(updated.price, 35.0);
    assert_eq!(updated.version, product.version + 1);
}

#[tokio::test]
async fn test_admin_lists_all_products() {
    let app = TestApp::new();
    app.seed(Uuid::now_v7(), "Desk lamp", 40.0).await;
    app.seed(Uuid::now_v7(), "Stool", 25.0).await;

    let admin = app.token(Uuid::now_v7(), "admin");
    let mut request = get("/admin/all");
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {admin}").parse().unwrap());
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let products: Vec<Product> = json_body(response.into_body()).await;
    assert_eq!(products.len(), 2);

    let vendor = app.token(Uuid::now_v7(), "vendor");
    let mut request = get("/admin/all");
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {vendor}").parse().unwrap());
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_review_resubmission_keeps_one_review() {
    let app = TestApp::new();
    let product = app.seed(Uuid::now_v7(), "Desk lamp", 40.0).await;
    let customer = app.token(Uuid::now_v7(), "user");
    let other = app.token(Uuid::now_v7(), "user");

    for (token, rating) in [(&customer, 4.0), (&other, 2.0), (&customer, 5.0)] {
        let response = app
            .router()
            .oneshot(json_request(
                "PUT",
                "/reviews",
                Some(token),
                json!({ "product_id": product.id, "rating": rating, "comment": "ok" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .router()
        .oneshot(get(&format!("/reviews?id={}", product.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let reviews: ProductReviews = json_body(response.into_body()).await;
    assert_eq!(reviews.reviews.len(), 2);
    assert_eq!(reviews.reviews[0].rating, 5.0);
    assert_eq!(reviews.summary.number_of_reviews, 2);
    assert_eq!(reviews.summary.average_rating, 3.5);
}

#[tokio::test]
async fn test_review_rating_out_of_range_returns_400() {
    let app = TestApp::new();
    let product = app.seed(Uuid::now_v7(), "Desk lamp", 40.0).await;
    let token = app.token(Uuid::now_v7(), "user");

    let response = app
        .router()
        .oneshot(json_request(
            "PUT",
            "/reviews",
            Some(&token),
            json!({ "product_id": product.id, "rating": 7 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_last_review_resets_rating() {
    let app = TestApp::new();
    let product = app.seed(Uuid::now_v7(), "Desk lamp", 40.0).await;
    let token = app.token(Uuid::now_v7(), "user");

    let response = app
        .router()
        .oneshot(json_request(
            "PUT",
            "/reviews",
            Some(&token),
            json!({ "product_id": product.id, "rating": 4, "comment": "nice" }),
        ))
        .await
        .unwrap();
    let stored: ProductReviews = json_body(response.into_body()).await;
    let review_id = stored.reviews[0].id;

    let mut request = Request::builder()
        .method("DELETE")
        .uri(format!("/reviews?product_id={}&id={review_id}", product.id))
        .body(Body::empty())
        .unwrap();
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let remaining: ProductReviews = json_body(response.into_body()).await;
    assert!(remaining.reviews.is_empty());
    assert_eq!(remaining.summary.number_of_reviews, 0);
    assert_eq!(remaining.summary.average_rating, 0.0);
}

#[tokio::test]
async fn test_delete_unknown_review_returns_404() {
    let app = TestApp::new();
    let product = app.seed(Uuid::now_v7(), "Desk lamp", 40.0).await;
    let token = app.token(Uuid::now_v7(), "user");

    let mut request = Request::builder()
        .method("DELETE")
        .uri(format!("/reviews?product_id={}&id={}", product.id, Uuid::now_v7()))
        .body(Body::empty())
        .unwrap();
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_images_attaches_to_product() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    let product = app.seed(vendor, "Desk lamp", 40.0).await;
    let token = app.token(vendor, "vendor");

    let boundary = "X-SHOP-BOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"images\"; filename=\"lamp.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\r\n\
         not-really-a-jpeg\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/images", product.id))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let updated: Product = json_body(response.into_body()).await;
    assert_eq!(updated.images.len(), 1);
    assert!(updated.images[0].public_id.starts_with("products/"));
    assert!(app.images.contains(&updated.images[0].public_id).await);
}

#[tokio::test]
async fn test_delete_product_removes_images() {
    let app = TestApp::new();
    let vendor = Uuid::now_v7();
    let product = app.seed(vendor, "Desk lamp", 40.0).await;
    let stored = image_store::ImageStore::upload(&app.images, "products", vec![1, 2, 3], "a.jpg")
        .await
        .unwrap();
    app.repo
        .add_images(product.id, vec![ProductImage::from(stored)])
        .await
        .unwrap();

    let token = app.token(vendor, "vendor");
    let mut request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}", product.id))
        .body(Body::empty())
        .unwrap();
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.images.is_empty().await);
    assert!(app.repo.get_by_id(product.id).await.unwrap().is_none());
}
