//! Content types for uploads.

use std::path::Path;

const GOOGLE_DOCUMENT: &str = "application/vnd.google-apps.document";
const GOOGLE_SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
const GOOGLE_PRESENTATION: &str = "application/vnd.google-apps.presentation";

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Media type sent with the file content, guessed from the extension.
pub fn media_type(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("csv") => "text/csv",
        Some("tsv") => "text/tab-separated-values",
        Some("txt") | Some("log") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("odt") => "application/vnd.oasis.opendocument.text",
        Some("ods") => "application/vnd.oasis.opendocument.spreadsheet",
        _ => "application/octet-stream",
    }
}

/// Native Google type a file converts to, when conversion is requested.
///
/// `None` for formats Drive keeps as-is.
pub fn native_type(path: &Path) -> Option<&'static str> {
    match extension(path).as_deref() {
        Some("csv") | Some("tsv") | Some("xls") | Some("xlsx") | Some("ods") => {
            Some(GOOGLE_SPREADSHEET)
        }
        Some("doc") | Some("docx") | Some("odt") | Some("html") | Some("htm") => {
            Some(GOOGLE_DOCUMENT)
        }
        Some("pptx") => Some(GOOGLE_PRESENTATION),
        _ => None,
    }
}
