use log::{error, info};
use mongodb::bson::{doc, DateTime};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::db::{DbConn, REVIEWS, TRABAJADORES};
use crate::guards::AuthGuard;
use crate::models::{average_rating, CreateReviewDto, Review, ReviewResponse, Trabajador};
use crate::utils::{parse_object_id, ApiError, ApiResponse, Page};

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

#[openapi(tag = "Review")]
#[post("/reviews", data = "<dto>")]
pub async fn create_review(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<CreateReviewDto>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    if dto.rating < 1 || dto.rating > 5 {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }

    let trabajador_id = parse_object_id(&dto.trabajador_id, "trabajador")?;

    db.collection::<Trabajador>(TRABAJADORES)
        .find_one(doc! { "_id": trabajador_id }, None)
        .await
        .map_err(|e| ApiError::database("Failed to load trabajador", e))?
        .ok_or_else(|| ApiError::not_found("Trabajador not found"))?;

    let reviews = db.collection::<Review>(REVIEWS);

    let existing = reviews
        .find_one(doc! { "trabajadorId": trabajador_id, "usuarioId": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::database("Failed to check reviews", e))?;

    if existing.is_some() {
        return Err(ApiError::conflict("You have already reviewed this trabajador"));
    }

    let mut review = Review {
        id: None,
        trabajador_id,
        usuario_id: auth.user_id,
        rating: dto.rating,
        comment: dto
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        created_at: DateTime::now(),
    };

    let result = reviews.insert_one(&review, None).await.map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("You have already reviewed this trabajador")
        } else {
            ApiError::database("Failed to create review", e)
        }
    })?;
    review.id = result.inserted_id.as_object_id();

    // Second, independent write: a failure here leaves the stored average stale.
    if let Err(e) = refresh_rating(db, trabajador_id).await {
        error!("Failed to refresh rating of trabajador {}: {}", trabajador_id, e);
    }

    Ok(Json(ApiResponse::success_with_message(
        "Review submitted successfully",
        ReviewResponse::from(review),
    )))
}

async fn refresh_rating(
    db: &DbConn,
    trabajador_id: mongodb::bson::oid::ObjectId,
) -> Result<(), mongodb::error::Error> {
    let ratings: Vec<i32> = db
        .collection::<Review>(REVIEWS)
        .find(doc! { "trabajadorId": trabajador_id }, None)
        .await?
        .map_ok(|r| r.rating)
        .try_collect()
        .await?;

    let (average, total) = average_rating(&ratings);

    db.collection::<Trabajador>(TRABAJADORES)
        .update_one(
            doc! { "_id": trabajador_id },
            doc! {
                "$set": {
                    "averageRating": average,
                    "totalReviews": total,
                    "updatedAt": DateTime::now()
                }
            },
            None,
        )
        .await?;

    info!("Trabajador {} rating is now {:?} over {} reviews", trabajador_id, average, total);
    Ok(())
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct ReviewListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Review")]
#[get("/trabajadores/<trabajador_id>/reviews?<query..>")]
pub async fn list_trabajador_reviews(
    db: &State<DbConn>,
    trabajador_id: String,
    query: ReviewListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = Page::new(query.page, query.limit);
    let object_id = parse_object_id(&trabajador_id, "trabajador")?;

    let filter = doc! { "trabajadorId": object_id };
    let find_options = FindOptions::builder()
        .skip(page.skip())
        .limit(page.limit)
        .sort(doc! { "createdAt": -1 })
        .build();

    let collection = db.collection::<Review>(REVIEWS);
    let reviews: Vec<ReviewResponse> = collection
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::database("Failed to list reviews", e))?
        .map_ok(ReviewResponse::from)
        .try_collect()
        .await
        .map_err(|e| ApiError::database("Failed to read reviews", e))?;

    let total = collection
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::database("Failed to count reviews", e))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "reviews": reviews,
        "pagination": page.info(total),
    }))))
}
