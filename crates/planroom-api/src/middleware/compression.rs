//! Response compression layer.

use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};

/// Builds a gzip layer that skips formats which are already compressed.
///
/// The default predicate already skips images and tiny bodies.
pub fn build_compression_layer() -> CompressionLayer<impl Predicate> {
    CompressionLayer::new().compress_when(
        DefaultPredicate::new()
            .and(NotForContentType::const_new("application/pdf"))
            .and(NotForContentType::const_new("application/zip"))
            .and(NotForContentType::const_new("application/x-zip-compressed"))
            .and(NotForContentType::const_new(
                "application/vnd.openxmlformats-officedocument",
            )),
    )
}
