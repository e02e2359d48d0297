//! Review aggregation.
//!
//! Pure functions over a product's review list: at most one review per
//! reviewer, and a [`RatingSummary`] that is always derived from the list it
//! is stored with. Persistence and id generation belong to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// A customer review, owned by a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    /// 1 to 5
    pub rating: f64,
    pub comment: String,
}

/// An incoming rating from one reviewer
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSubmission {
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    pub rating: f64,
    pub comment: String,
}

/// Review count and mean rating
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct RatingSummary {
    pub number_of_reviews: u32,
    /// 0 when there are no reviews
    pub average_rating: f64,
}

impl RatingSummary {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        if reviews.is_empty() {
            return Self::default();
        }

        let total: f64 = reviews.iter().map(|r| r.rating).sum();
        Self {
            number_of_reviews: u32::try_from(reviews.len()).unwrap_or(u32::MAX),
            average_rating: total / reviews.len() as f64,
        }
    }
}

/// New review list together with its summary
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub reviews: Vec<Review>,
    pub summary: RatingSummary,
}

impl ReviewOutcome {
    fn from_reviews(reviews: Vec<Review>) -> Self {
        let summary = RatingSummary::from_reviews(&reviews);
        Self { reviews, summary }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReviewError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Review not found: {0}")]
    NotFound(Uuid),
}

/// Add `incoming`, or overwrite the rating and comment of the reviewer's
/// existing review in place. `new_review_id` is only used when appending.
pub fn upsert_review(
    existing: &[Review],
    incoming: ReviewSubmission,
    new_review_id: Uuid,
) -> Result<ReviewOutcome, ReviewError> {
    if !incoming.rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&incoming.rating) {
        return Err(ReviewError::InvalidArgument(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {}",
            incoming.rating
        )));
    }

    let mut reviews = existing.to_vec();
    match reviews
        .iter_mut()
        .find(|r| r.reviewer_id == incoming.reviewer_id)
    {
        Some(review) => {
            review.rating = incoming.rating;
            review.comment = incoming.comment;
        }
        None => reviews.push(Review {
            id: new_review_id,
            reviewer_id: incoming.reviewer_id,
            reviewer_name: incoming.reviewer_name,
            rating: incoming.rating,
            comment: incoming.comment,
        }),
    }

    Ok(ReviewOutcome::from_reviews(reviews))
}

/// Drop the review with `review_id`.
pub fn remove_review(existing: &[Review], review_id: Uuid) -> Result<ReviewOutcome, ReviewError> {
    if !existing.iter().any(|r| r.id == review_id) {
        return Err(ReviewError::NotFound(review_id));
    }

    let reviews = existing
        .iter()
        .filter(|r| r.id != review_id)
        .cloned()
        .collect();

    Ok(ReviewOutcome::from_reviews(reviews))
}

/// Reviews in submission order.
pub fn list_reviews(product: &Product) -> &[Review] {
    &product.reviews
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(reviewer_id: Uuid, rating: f64, comment: &str) -> ReviewSubmission {
        ReviewSubmission {
            reviewer_id,
            reviewer_name: format!("reviewer-{}", &reviewer_id.to_string()[..8]),
            rating,
            comment: comment.to_string(),
        }
    }

    fn upsert(existing: &[Review], incoming: ReviewSubmission) -> ReviewOutcome {
        upsert_review(existing, incoming, Uuid::now_v7()).unwrap()
    }

    #[test]
    fn test_first_review_on_empty_product() {
        let reviewer = Uuid::now_v7();
        let review_id = Uuid::now_v7();

        let outcome = upsert_review(&[], submission(reviewer, 4.0, "good"), review_id).unwrap();

        assert_eq!(outcome.reviews.len(), 1);
        assert_eq!(outcome.reviews[0].id, review_id);
        assert_eq!(outcome.summary.number_of_reviews, 1);
        assert_eq!(outcome.summary.average_rating, 4.0);
    }

    #[test]
    fn test_second_reviewer_averages() {
        let first = upsert(&[], submission(Uuid::now_v7(), 4.0, "good"));
        let second = upsert(&first.reviews, submission(Uuid::now_v7(), 2.0, "meh"));

        assert_eq!(second.summary.number_of_reviews, 2);
        assert_eq!(second.summary.average_rating, 3.0);
    }

    #[test]
    fn test_resubmission_replaces_in_place() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let first = upsert(&[], submission(a, 4.0, "good"));
        let both = upsert(&first.reviews, submission(b, 2.0, "meh"));
        let original_id = both.reviews[0].id;

        let outcome = upsert(&both.reviews, submission(a, 5.0, "great"));

        assert_eq!(outcome.reviews.len(), 2);
        assert_eq!(outcome.reviews[0].reviewer_id, a);
        assert_eq!(outcome.reviews[0].id, original_id);
        assert_eq!(outcome.reviews[0].comment, "great");
        assert_eq!(outcome.reviews[1].reviewer_id, b);
        assert_eq!(outcome.summary.number_of_reviews, 2);
        assert_eq!(outcome.summary.average_rating, 3.5);
    }

    #[test]
    fn test_resubmission_keeps_reviewer_name() {
        let a = Uuid::now_v7();
        let first = upsert(&[], submission(a, 3.0, "ok"));

        let mut renamed = submission(a, 4.0, "better");
        renamed.reviewer_name = "someone else".to_string();
        let outcome = upsert(&first.reviews, renamed);

        assert_eq!(outcome.reviews[0].reviewer_name, first.reviews[0].reviewer_name);
    }

    #[test]
    fn test_rating_out_of_range_is_rejected() {
        for rating in [0.0, 0.99, 5.01, -3.0, f64::NAN, f64::INFINITY] {
            let result = upsert_review(&[], submission(Uuid::now_v7(), rating, "x"), Uuid::now_v7());
            assert!(
                matches!(result, Err(ReviewError::InvalidArgument(_))),
                "rating {rating} should be rejected"
            );
        }
    }

    #[test]
    fn test_rating_bounds_are_inclusive() {
        assert!(upsert_review(&[], submission(Uuid::now_v7(), 1.0, ""), Uuid::now_v7()).is_ok());
        assert!(upsert_review(&[], submission(Uuid::now_v7(), 5.0, ""), Uuid::now_v7()).is_ok());
    }

    #[test]
    fn test_remove_one_of_two() {
        let first = upsert(&[], submission(Uuid::now_v7(), 4.0, "good"));
        let both = upsert(&first.reviews, submission(Uuid::now_v7(), 2.0, "meh"));

        let outcome = remove_review(&both.reviews, both.reviews[1].id).unwrap();

        assert_eq!(outcome.reviews.len(), 1);
        assert_eq!(outcome.summary.number_of_reviews, 1);
        assert_eq!(outcome.summary.average_rating, 4.0);
    }

    #[test]
    fn test_remove_last_review_gives_zero_average() {
        let only = upsert(&[], submission(Uuid::now_v7(), 4.0, "good"));

        let outcome = remove_review(&only.reviews, only.reviews[0].id).unwrap();

        assert!(outcome.reviews.is_empty());
        assert_eq!(outcome.summary.number_of_reviews, 0);
        assert_eq!(outcome.summary.average_rating, 0.0);
        assert!(outcome.summary.average_rating.is_finite());
    }

    #[test]
    fn test_remove_absent_id_is_not_found() {
        let only = upsert(&[], submission(Uuid::now_v7(), 4.0, "good"));
        let missing = Uuid::now_v7();

        assert_eq!(
            remove_review(&only.reviews, missing),
            Err(ReviewError::NotFound(missing))
        );
        assert_eq!(only.reviews.len(), 1);
    }

    #[test]
    fn test_summary_of_empty_list() {
        assert_eq!(
            RatingSummary::from_reviews(&[]),
            RatingSummary {
                number_of_reviews: 0,
                average_rating: 0.0
            }
        );
    }

    #[test]
    fn test_at_most_one_review_per_reviewer() {
        let a = Uuid::now_v7();
        let mut reviews = Vec::new();
        for rating in [1.0, 2.0, 3.0, 4.0] {
            reviews = upsert(&reviews, submission(a, rating, "again")).reviews;
        }

        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 4.0);
    }
}
