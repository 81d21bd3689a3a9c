use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartError},
};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use challyme_core::challenge;
use challyme_db::queries;
use challyme_types::api::{ChallengeQuery, Claims, UploadImageResponse};
use challyme_types::models::ChallengeImage;

use crate::{
    AppState, blocking,
    error::ApiError,
    extract::ApiQuery,
    middleware::ensure_actor,
    storage::new_file_ref,
};

/// 5 MB limit per image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Default)]
struct UploadForm {
    image: Option<UploadedImage>,
    challenge_id: Option<String>,
    username: Option<String>,
    day: Option<String>,
}

struct UploadedImage {
    bytes: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::Validation(e.body_text())
}

/// POST /upload-challenge-image: multipart form with `image`, `challengeId`,
/// `username` and optional `day` (defaults to 1). The file is written only
/// after every check passes, and removed again if recording it fails.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<UploadImageResponse>, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                form.image = Some(UploadedImage {
                    bytes,
                    content_type,
                    file_name,
                });
            }
            "challengeId" => form.challenge_id = Some(field.text().await.map_err(bad_multipart)?),
            "username" => form.username = Some(field.text().await.map_err(bad_multipart)?),
            "day" => form.day = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    let image = form
        .image
        .ok_or_else(|| ApiError::Validation("no image uploaded".into()))?;
    let username = form
        .username
        .ok_or_else(|| ApiError::Validation("username is required".into()))?;
    let challenge_id: Uuid = form
        .challenge_id
        .as_deref()
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| ApiError::Validation("a valid challengeId is required".into()))?;
    let day = parse_day(form.day.as_deref());

    ensure_actor(&claims, &username)?;

    if image.bytes.is_empty() {
        return Err(ApiError::Validation("uploaded image is empty".into()));
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        warn!(
            "Rejected {} byte image from {} for challenge {}",
            image.bytes.len(),
            username,
            challenge_id
        );
        return Err(ApiError::Validation("image must be at most 5 MB".into()));
    }
    if !image
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
    {
        return Err(ApiError::Validation("only image uploads are accepted".into()));
    }

    // Membership is checked before anything touches the disk.
    let who = username.clone();
    blocking(&state, move |s| {
        let c = s.db.get_challenge(challenge_id)?.ok_or_else(ApiError::challenge_not_found)?;
        challenge::ensure_participant(&c, &who)?;
        Ok(())
    })
    .await?;

    let file_ref = new_file_ref(image.file_name.as_deref());
    state.storage.save(&file_ref, &image.bytes).await.map_err(|e| {
        error!("Failed to store image {}: {}", file_ref, e);
        ApiError::Internal(e)
    })?;

    let fref = file_ref.clone();
    let who = username.clone();
    let recorded = blocking(&state, move |s| {
        s.db.write_txn(|tx| -> Result<_, ApiError> {
            let mut c = queries::load_challenge(tx, challenge_id)?
                .ok_or_else(ApiError::challenge_not_found)?;
            challenge::attach_image(&mut c, &who, &fref, day, Utc::now())?;
            queries::save_challenge(tx, &c)?;
            Ok(())
        })
    })
    .await;

    if let Err(e) = recorded {
        // The challenge changed underneath us; don't leave an orphan behind.
        state.storage.delete_all(std::slice::from_ref(&file_ref)).await;
        return Err(e);
    }

    info!("{} uploaded image {} for day {} of {}", username, file_ref, day, challenge_id);
    Ok(Json(UploadImageResponse {
        message: "Image uploaded".into(),
        file_ref,
    }))
}

/// GET /challenge-images?challengeId=
pub async fn list_images(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ChallengeQuery>,
) -> Result<Json<Vec<ChallengeImage>>, ApiError> {
    let images = blocking(&state, move |s| {
        let c = s
            .db
            .get_challenge(q.challenge_id)?
            .ok_or_else(ApiError::challenge_not_found)?;
        Ok(c.images)
    })
    .await?;
    Ok(Json(images))
}

/// Anything that is not a positive integer falls back to day 1.
fn parse_day(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|d| *d >= 1)
        .unwrap_or(1)
}
