use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub trabajador_id: ObjectId,
    pub usuario_id: ObjectId,
    pub rating: i32, // 1-5
    pub comment: Option<String>,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewDto {
    pub trabajador_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub trabajador_id: String,
    pub usuario_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        ReviewResponse {
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            trabajador_id: r.trabajador_id.to_hex(),
            usuario_id: r.usuario_id.to_hex(),
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

/// Mean rating and count, `None` when there are no reviews.
pub fn average_rating(ratings: &[i32]) -> (Option<f64>, i32) {
    if ratings.is_empty() {
        return (None, 0);
    }
    let total = ratings.len() as i32;
    let sum: i32 = ratings.iter().sum();
    (Some(sum as f64 / total as f64), total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_no_reviews_is_none() {
        assert_eq!(average_rating(&[]), (None, 0));
    }

    #[test]
    fn average_is_arithmetic_mean() {
        assert_eq!(average_rating(&[5, 4, 3]), (Some(4.0), 3));
        assert_eq!(average_rating(&[5, 4]), (Some(4.5), 2));
    }
}
