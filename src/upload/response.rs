//! Reading ids and statuses out of video host responses, and shaping the
//! header values we send.

use serde_json::Value;

use super::ProcessingStatus;

/// `body[key]`, falling back to `body.data[key]`. Numeric ids are rendered
/// in decimal; blank strings count as absent.
pub fn extract_video_id(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(id_string)
        .or_else(|| body.get("data")?.get(key).and_then(id_string))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn status_field(body: &Value) -> Option<&str> {
    body.get("status")
        .and_then(Value::as_str)
        .or_else(|| body.get("data")?.get("status")?.as_str())
}

/// Backend status endpoint: `{"status": "ready" | ...}`.
pub fn proxy_status(body: &Value) -> ProcessingStatus {
    match status_field(body).map(str::to_ascii_lowercase).as_deref() {
        Some("ready") => ProcessingStatus::Ready,
        Some("error") | Some("failed") => ProcessingStatus::Error,
        _ => ProcessingStatus::Processing,
    }
}

/// Host video record: `{"data": {"status": "done" | ...}}`.
pub fn direct_status(body: &Value) -> ProcessingStatus {
    let status = body
        .get("data")
        .and_then(|data| data.get("status"))
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase);
    match status.as_deref() {
        Some("done") | Some("ready") => ProcessingStatus::Ready,
        Some("error") | Some("aborted") => ProcessingStatus::Error,
        _ => ProcessingStatus::Processing,
    }
}

/// File name for the upload: letters, digits, `-` and `_` survive.
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "recording.webm".to_string()
    } else {
        format!("{cleaned}.webm")
    }
}

/// Header-safe title: printable ASCII goes through untouched, anything
/// else is percent-encoded.
pub fn header_title(title: &str) -> String {
    let title = title.trim();
    if title.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        title.to_string()
    } else {
        urlencoding::encode(title).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_at_top_level_or_under_data() {
        assert_eq!(
            extract_video_id(&json!({"id": "v1"}), "id").as_deref(),
            Some("v1")
        );
        assert_eq!(
            extract_video_id(&json!({"data": {"id": "v2"}}), "id").as_deref(),
            Some("v2")
        );
        assert_eq!(
            extract_video_id(&json!({"videoId": 42}), "videoId").as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_missing_or_blank_id() {
        assert!(extract_video_id(&json!({"ok": true}), "id").is_none());
        assert!(extract_video_id(&json!({"id": ""}), "id").is_none());
        assert!(extract_video_id(&json!({"id": null, "data": {}}), "id").is_none());
        // the proxy key is not the direct key
        assert!(extract_video_id(&json!({"id": "v1"}), "videoId").is_none());
    }

    #[test]
    fn test_proxy_status_mapping() {
        assert_eq!(proxy_status(&json!({"status": "ready"})), ProcessingStatus::Ready);
        assert_eq!(
            proxy_status(&json!({"data": {"status": "error"}})),
            ProcessingStatus::Error
        );
        assert_eq!(
            proxy_status(&json!({"status": "processing"})),
            ProcessingStatus::Processing
        );
        assert_eq!(proxy_status(&json!({})), ProcessingStatus::Processing);
    }

    #[test]
    fn test_direct_status_mapping() {
        assert_eq!(
            direct_status(&json!({"data": {"status": "done"}})),
            ProcessingStatus::Ready
        );
        assert_eq!(
            direct_status(&json!({"data": {"status": "aborted"}})),
            ProcessingStatus::Error
        );
        assert_eq!(
            direct_status(&json!({"data": {"status": "pre-processing"}})),
            ProcessingStatus::Processing
        );
        // only data.status counts on the direct path
        assert_eq!(
            direct_status(&json!({"status": "done"})),
            ProcessingStatus::Processing
        );
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Sprint demo #4"), "Sprint_demo__4.webm");
        assert_eq!(sanitize_file_name("  "), "recording.webm");
        assert_eq!(sanitize_file_name("Обзор"), "recording.webm");
        assert_eq!(sanitize_file_name("a-b_c"), "a-b_c.webm");
    }

    #[test]
    fn test_header_title() {
        assert_eq!(header_title(" Sprint demo "), "Sprint demo");
        assert_eq!(header_title("Обзор"), "%D0%9E%D0%B1%D0%B7%D0%BE%D1%80");
    }
}
