use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::Utc;
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::core::config::UploadConfig;
use crate::core::jwt_auth::JwtMiddleware;
use crate::core::policy::Capability;
use crate::core::utils::parse_uuid;
use crate::core::{AppError, AppSuccessResponse};
use crate::models::achievements::{
    AchievementRequest, AchievementStatus, Attachment, ListAchievementsQuery,
    VerifyAchievementRequest,
};
use crate::models::uploads::{allowed_file_type, FileUploadResponse, UploadError};
use crate::services::AchievementLifecycle;

#[tracing::instrument(name = "Create Achievement", skip(lifecycle, auth, request), fields(user_id = %auth.user_id))]
#[post("")]
pub async fn create_achievement(
    lifecycle: web::Data<AchievementLifecycle>,
    auth: JwtMiddleware,
    request: web::Json<AchievementRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::AuthorAchievements)?;

    let achievement = lifecycle.create(auth.user_id, request.into_inner()).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        achievement,
        "Achievement created successfully",
    )))
}

#[tracing::instrument(name = "List Achievements", skip(lifecycle, auth))]
#[get("")]
pub async fn list_achievements(
    lifecycle: web::Data<AchievementLifecycle>,
    auth: JwtMiddleware,
    query: web::Query<ListAchievementsQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewAchievements)?;

    let status = query
        .status
        .as_deref()
        .filter(|status| !status.trim().is_empty())
        .map(str::parse::<AchievementStatus>)
        .transpose()?;

    let achievements = lifecycle.list_all(status).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        achievements,
        "Achievements retrieved successfully",
    )))
}

#[tracing::instrument(name = "List My Achievements", skip(lifecycle, auth), fields(user_id = %auth.user_id))]
#[get("/achiev")]
pub async fn list_my_achievements(
    lifecycle: web::Data<AchievementLifecycle>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::AuthorAchievements)?;

    let achievements = lifecycle.list_mine(auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        achievements,
        "Achievements retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get Achievement", skip(lifecycle, auth))]
#[get("/{id}")]
pub async fn get_achievement(
    lifecycle: web::Data<AchievementLifecycle>,
    auth: JwtMiddleware,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewAchievements)?;
    let id = parse_uuid(&id, "achievement id")?;

    let achievement = lifecycle.get(id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        achievement,
        "Achievement retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update Achievement", skip(lifecycle, auth, request), fields(user_id = %auth.user_id))]
#[put("/{id}")]
pub async fn update_achievement(
    lifecycle: web::Data<AchievementLifecycle>,
    auth: JwtMiddleware,
    id: web::Path<String>,
    request: web::Json<AchievementRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::AuthorAchievements)?;
    let id = parse_uuid(&id, "achievement id")?;

    let achievement = lifecycle
        .update(id, auth.user_id, request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        achievement,
        "Achievement updated successfully",
    )))
}

#[tracing::instrument(name = "Delete Achievement", skip(lifecycle, auth), fields(user_id = %auth.user_id))]
#[delete("/{id}")]
pub async fn delete_achievement(
    lifecycle: web::Data<AchievementLifecycle>,
    auth: JwtMiddleware,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::AuthorAchievements)?;
    let id = parse_uuid(&id, "achievement id")?;

    let achievement = lifecycle.soft_delete(id, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        achievement,
        "Achievement deleted successfully",
    )))
}

#[tracing::instrument(name = "Submit Achievement", skip(lifecycle, auth), fields(user_id = %auth.user_id))]
#[patch("/{id}/submit")]
pub async fn submit_achievement(
    lifecycle: web::Data<AchievementLifecycle>,
    auth: JwtMiddleware,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::AuthorAchievements)?;
    let id = parse_uuid(&id, "achievement id")?;

    let achievement = lifecycle.submit(id, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        achievement,
        "Achievement submitted for verification",
    )))
}

#[tracing::instrument(name = "Verify Achievement", skip(lifecycle, auth, request), fields(verifier_id = %auth.user_id))]
#[patch("/{id}/verify")]
pub async fn verify_achievement(
    lifecycle: web::Data<AchievementLifecycle>,
    auth: JwtMiddleware,
    id: web::Path<String>,
    request: web::Json<VerifyAchievementRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::VerifyAchievements)?;
    let id = parse_uuid(&id, "achievement id")?;

    let achievement = lifecycle.verify(id, auth.user_id, &request).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        achievement,
        "Achievement verification saved",
    )))
}

#[tracing::instrument(name = "Upload Achievement Attachment", skip(lifecycle, uploads, auth, payload), fields(user_id = %auth.user_id))]
#[post("/{id}/attachments")]
pub async fn upload_attachment(
    lifecycle: web::Data<AchievementLifecycle>,
    uploads: web::Data<UploadConfig>,
    auth: JwtMiddleware,
    id: web::Path<String>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::AuthorAchievements)?;
    let id = parse_uuid(&id, "achievement id")?;

    // Nothing is written to disk for achievements the caller may not change.
    lifecycle.ensure_editable(id, auth.user_id).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        AppError::validation_error("Invalid file upload format").with_cause(e)
    })? {
        let content_disposition = field.content_disposition();
        if content_disposition.get_name() != Some("file") {
            continue;
        }
        let filename = content_disposition
            .get_filename()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or(UploadError::MissingFilename)?;
        allowed_file_type(&filename)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            AppError::validation_error("Failed to read uploaded file").with_cause(e)
        })? {
            if data.len() + chunk.len() > uploads.max_file_size {
                return Err(UploadError::TooLarge(uploads.max_file_size).into());
            }
            data.extend_from_slice(&chunk);
        }
        upload = Some((filename, data));
        break;
    }

    let (file_name, data) = upload.ok_or(UploadError::MissingFile)?;
    let (extension, mime_type) = allowed_file_type(&file_name)?;

    let stored_name = format!("{}_{}.{}", id.simple(), Uuid::new_v4().simple(), extension);
    let path = store_file(Path::new(&uploads.directory), &stored_name, &data)?;

    let attachment = Attachment {
        file_name: file_name.clone(),
        url: format!(
            "{}/uploads/{}",
            uploads.public_base_url.trim_end_matches('/'),
            stored_name
        ),
        mime_type: mime_type.to_string(),
        uploaded_at: Utc::now(),
    };

    if let Err(e) = lifecycle
        .attach_file(id, auth.user_id, attachment.clone())
        .await
    {
        if let Err(remove_error) = fs::remove_file(&path) {
            tracing::error!(
                path = %path.display(),
                "failed to remove stored upload: {}",
                remove_error
            );
        }
        return Err(e);
    }

    tracing::info!(
        achievement_id = %id,
        stored_name = %stored_name,
        size = data.len(),
        "attachment stored"
    );
    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        FileUploadResponse {
            file_name,
            url: attachment.url,
            file_size: data.len(),
            mime_type: attachment.mime_type,
        },
        "File uploaded successfully",
    )))
}

fn store_file(directory: &Path, stored_name: &str, data: &[u8]) -> Result<PathBuf, AppError> {
    fs::create_dir_all(directory).map_err(|e| {
        tracing::error!("Failed to create upload directory: {:?}", e);
        AppError::internal_error(e)
    })?;

    let path = directory.join(stored_name);
    let mut file = fs::File::create(&path).map_err(AppError::internal_error)?;
    file.write_all(data).map_err(AppError::internal_error)?;
    Ok(path)
}
