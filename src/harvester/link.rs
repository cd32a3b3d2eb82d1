//! Image link resolution: pulling the `image` field out of a metadata
//! document, rewriting `ipfs://` links onto an HTTP gateway, and naming the
//! downloaded file after the gateway's reported content type.

use serde_json::Value;

/// Scheme used by content-addressed links inside metadata documents
pub const IPFS_SCHEME: &str = "ipfs://";

/// Public gateway used when no other prefix is configured
pub const DEFAULT_GATEWAY_PREFIX: &str = "https://ipfs.io/ipfs/";

/// Preferred extensions for common image types.
///
/// `mime_guess` lists several extensions per type in no particular order, so
/// the usual ones are pinned here and the rest fall through to it.
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/pjpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/bmp", ".bmp"),
    ("image/svg+xml", ".svg"),
    ("image/tiff", ".tiff"),
    ("image/avif", ".avif"),
    // ICO caps entries at 256×256; icons are decoded and re-encoded as PNG
    ("image/x-icon", ".png"),
    ("image/vnd.microsoft.icon", ".png"),
];

/// Extract the `image` link from a metadata document.
///
/// Returns an empty string when the document is not an object, has no
/// `image` key, or the value is not a string.
#[must_use]
pub fn extract_image_link(metadata: &Value) -> &str {
    metadata
        .as_object()
        .and_then(|obj| obj.get("image"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Rewrite the first `ipfs://` occurrence in `link` onto `gateway_prefix`
#[must_use]
pub fn resolve_gateway_url(link: &str, gateway_prefix: &str) -> String {
    link.replacen(IPFS_SCHEME, gateway_prefix, 1)
}

/// Map a `content-type` header value to a file extension with a leading dot.
///
/// Parameters such as `; charset=binary` are ignored. Unknown or missing
/// types map to an empty string.
#[must_use]
pub fn extension_for_content_type(content_type: Option<&str>) -> String {
    let Some(raw) = content_type else {
        return String::new();
    };

    let essence = raw
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if essence.is_empty() {
        return String::new();
    }

    if let Some((_, ext)) = PREFERRED_EXTENSIONS.iter().find(|(mime, _)| *mime == essence) {
        return (*ext).to_string();
    }

    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|exts| exts.first())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
