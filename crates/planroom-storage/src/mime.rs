//! MIME type guessing from file extensions.

/// Guess a MIME type from a file name or path extension.
pub fn mime_from_path(path: &str) -> Option<String> {
    let (_, ext) = path.rsplit_once('.')?;
    let mime = match ext.to_lowercase().as_str() {
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "dwg" => "application/acad",
        "dxf" => "application/dxf",
        "ifc" => "application/x-step",
        _ => return None,
    };
    Some(mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_detection() {
        assert_eq!(mime_from_path("file.pdf"), Some("application/pdf".into()));
        assert_eq!(mime_from_path("img.PNG"), Some("image/png".into()));
        assert_eq!(mime_from_path("A-101 rev C.DWG"), Some("application/acad".into()));
        assert_eq!(mime_from_path("noext"), None);
        assert_eq!(mime_from_path("archive.unknown"), None);
    }
}
