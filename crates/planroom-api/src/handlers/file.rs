//! Upload, listing, version, download and preview handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use bytes::Bytes;

use planroom_core::error::{AppError, ErrorKind};
use planroom_core::types::ApiResponse;
use planroom_entity::file::{FileRecord, LatestFile};
use planroom_service::file::naming::parse_tags;
use planroom_service::file::{DownloadLink, DownloadTarget, Disposition, UploadParams, VersionHistory};

use crate::dto::request::{DeleteQuery, ListQuery, PreviewQuery, UpdateMetadataRequest};
use crate::dto::response::{DeleteResponse, FileUrls, RollbackResponse, UploadResponse};
use crate::error::ApiError;
use crate::extractors::{ApiQuery, FileIdPath};
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// POST /api/upload
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<UploadResponse>>)> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut description = String::new();
    let mut tags = Vec::new();
    let mut uploaded_by = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(String::from)
                    .ok_or_else(|| AppError::validation("File field has no file name"))?;
                let content_type = field.content_type().map(String::from);
                let data = field.bytes().await?;
                file = Some((file_name, content_type, data));
            }
            "description" => description = field.text().await?,
            "tags" => tags = parse_tags(&field.text().await?)?,
            "uploaded_by" => uploaded_by = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| AppError::validation("No file uploaded"))?;

    let change = state
        .upload_service
        .upload(UploadParams {
            file_name,
            content_type,
            data,
            description,
            tags,
            uploaded_by,
        })
        .await?;

    let urls = FileUrls::for_record(&change.record);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UploadResponse {
            file: change.record,
            replaced_version: change.replaced_version,
            urls,
        })),
    ))
}

/// GET /api/files?q=&tag=
pub async fn list_files(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<LatestFile>>>> {
    let files = state.file_service.list(&query.into()).await?;
    Ok(Json(ApiResponse::ok(files)))
}

/// GET /api/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    FileIdPath(id): FileIdPath,
) -> ApiResult<Json<ApiResponse<FileRecord>>> {
    let file = state.file_service.get(id).await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// GET /api/files/{base_name}/versions
pub async fn list_versions(
    State(state): State<AppState>,
    Path(base_name): Path<String>,
) -> ApiResult<Json<ApiResponse<VersionHistory>>> {
    let history = state.version_service.list_versions(&base_name).await?;
    Ok(Json(ApiResponse::ok(history)))
}

/// GET /api/files/{id}/url
pub async fn file_url(
    State(state): State<AppState>,
    FileIdPath(id): FileIdPath,
) -> ApiResult<Json<ApiResponse<DownloadLink>>> {
    let link = state.download_service.link(id).await?;
    Ok(Json(ApiResponse::ok(link)))
}

/// PUT /api/files/{id}/metadata
pub async fn update_metadata(
    State(state): State<AppState>,
    FileIdPath(id): FileIdPath,
    body: Result<Json<UpdateMetadataRequest>, axum::extract::rejection::JsonRejection>,
) -> ApiResult<Json<ApiResponse<FileRecord>>> {
    let Json(body) = body?;
    let (description, tags) = body.into_parts()?;
    let file = state
        .file_service
        .update_metadata(id, description, tags)
        .await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// POST /api/files/{id}/rollback
pub async fn rollback(
    State(state): State<AppState>,
    FileIdPath(id): FileIdPath,
) -> ApiResult<Json<ApiResponse<RollbackResponse>>> {
    let change = state.version_service.rollback(id).await?;
    Ok(Json(ApiResponse::ok(RollbackResponse {
        file: change.record,
        replaced_version: change.replaced_version,
    })))
}

/// DELETE /api/files/{id}?all_versions=
pub async fn delete_file(
    State(state): State<AppState>,
    FileIdPath(id): FileIdPath,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> ApiResult<Json<ApiResponse<DeleteResponse>>> {
    let removed = state.file_service.delete(id, query.all_versions).await?;
    Ok(Json(ApiResponse::ok(DeleteResponse {
        deleted: removed.len(),
        ids: removed.iter().map(|r| r.id.to_string()).collect(),
    })))
}

/// DELETE /api/files/{id}/version
pub async fn delete_version(
    State(state): State<AppState>,
    FileIdPath(id): FileIdPath,
) -> ApiResult<Json<ApiResponse<DeleteResponse>>> {
    let removed = state.file_service.delete_version(id).await?;
    Ok(Json(ApiResponse::ok(DeleteResponse {
        deleted: 1,
        ids: vec![removed.id.to_string()],
    })))
}

/// GET /api/download/{id}
pub async fn download(
    State(state): State<AppState>,
    FileIdPath(id): FileIdPath,
) -> ApiResult<Response> {
    let target = state
        .download_service
        .open(id, Disposition::Attachment)
        .await?;
    file_response(target)
}

/// GET /api/preview/{id}?size=
pub async fn preview(
    State(state): State<AppState>,
    FileIdPath(id): FileIdPath,
    ApiQuery(query): ApiQuery<PreviewQuery>,
) -> ApiResult<Response> {
    if let Some(size) = query.size {
        let png = state.preview_service.thumbnail(id, Some(size)).await?;
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/png")
            .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
            .header(header::CACHE_CONTROL, "public, max-age=3600")
            .body(Body::from(png))
            .map_err(response_error);
    }

    let target = state.download_service.open(id, Disposition::Inline).await?;
    file_response(target)
}

fn file_response(target: DownloadTarget) -> ApiResult<Response> {
    match target {
        DownloadTarget::Redirect(url) => Ok(Redirect::temporary(&url).into_response()),
        DownloadTarget::Stream {
            stream,
            content_type,
            filename,
            size,
            disposition,
        } => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, size)
            .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
            .header(
                header::CONTENT_DISPOSITION,
                content_disposition(disposition, &filename),
            )
            .body(Body::from_stream(stream))
            .map_err(response_error),
    }
}

fn response_error(e: axum::http::Error) -> ApiError {
    AppError::with_source(ErrorKind::Internal, "Response build failed", e).into()
}

/// `Content-Disposition` value with an ASCII fallback name and an RFC 5987
/// UTF-8 name.
pub fn content_disposition(disposition: Disposition, filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        ascii,
        urlencoding::encode(filename)
    )
}
