//! Storage provider implementations.

#[cfg(feature = "firebase")]
pub mod firebase;
#[cfg(feature = "local")]
pub mod local;
pub mod memory;
#[cfg(feature = "supabase")]
pub mod supabase;

#[cfg(feature = "firebase")]
pub use firebase::FirebaseStorageProvider;
#[cfg(feature = "local")]
pub use local::LocalStorageProvider;
pub use memory::MemoryStorageProvider;
#[cfg(feature = "supabase")]
pub use supabase::SupabaseStorageProvider;

/// Percent-encode each segment of a `/`-separated key, keeping the slashes.
#[cfg(any(feature = "supabase", feature = "firebase"))]
pub(crate) fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map a transport failure into an external-service error.
#[cfg(any(feature = "supabase", feature = "firebase"))]
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> planroom_core::AppError {
    planroom_core::AppError::with_source(
        planroom_core::error::ErrorKind::ExternalService,
        format!("{provider} request failed: {err}"),
        err,
    )
}

/// Turn a non-success response into an error, reading the body for context.
#[cfg(any(feature = "supabase", feature = "firebase"))]
pub(crate) async fn status_error(
    provider: &str,
    action: &str,
    key: &str,
    response: reqwest::Response,
) -> planroom_core::AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = body.chars().take(300).collect::<String>();
    if status == reqwest::StatusCode::NOT_FOUND {
        return planroom_core::AppError::not_found(format!("Blob not found: {key}"));
    }
    if status == reqwest::StatusCode::CONFLICT {
        return planroom_core::AppError::conflict(format!("Blob already exists: {key}"));
    }
    planroom_core::AppError::external_service(format!(
        "{provider} {action} failed for {key} ({status}): {detail}"
    ))
}

/// Adapt a reqwest body stream to the provider byte stream.
#[cfg(any(feature = "supabase", feature = "firebase"))]
pub(crate) fn response_stream(response: reqwest::Response) -> planroom_core::traits::ByteStream {
    use futures::StreamExt;

    Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other)),
    )
}
