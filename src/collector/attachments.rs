//! Attachment decoding: embed, truncate, or omit payloads by media type and size

use super::{AttachmentInput, AttachmentPayload, InlineLimits};
use crate::schema::{self, SummaryPayload};
use crate::{Artifact, ArtifactKind, Encoding};
use base64::Engine;
use std::fs;

/// Result of decoding one attachment
#[derive(Debug)]
pub(crate) enum Decoded {
    /// Ordinary artifact stored on the attempt
    Artifact(Artifact),
    /// Validated summary payload routed to aggregation (not stored as an artifact)
    Summary(Box<SummaryPayload>),
    /// Summary-shaped payload that failed validation; kept as a plain artifact
    Rejected(Artifact),
}

enum SummaryCheck {
    Accepted(SummaryPayload),
    Rejected,
    NotSummary,
}

impl Artifact {
    fn new(name: &str, media_type: &str, kind: ArtifactKind, size: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            media_type: media_type.to_string(),
            kind,
            size_bytes: size,
            omitted: false,
            reason: None,
            limit_bytes: None,
            body: None,
            encoding: None,
            truncated: false,
        }
    }

    /// Omission marker carrying a human-readable reason
    pub fn omitted(
        name: &str,
        media_type: &str,
        reason: impl Into<String>,
        size: Option<u64>,
        limit: Option<u64>,
    ) -> Self {
        let mut a = Self::new(name, media_type, ArtifactKind::from_media_type(media_type), size);
        a.omitted = true;
        a.reason = Some(reason.into());
        a.limit_bytes = limit;
        a
    }
}

fn limit_for(kind: ArtifactKind, limits: &InlineLimits) -> u64 {
    match kind {
        ArtifactKind::Image => limits.max_image_bytes,
        ArtifactKind::Text | ArtifactKind::Json => limits.max_text_bytes,
        ArtifactKind::Binary => limits.max_binary_bytes,
    }
}

fn oversized(input: &AttachmentInput, kind: ArtifactKind, size: u64, limit: u64) -> Artifact {
    let what = match kind {
        ArtifactKind::Image => "image",
        ArtifactKind::Text | ArtifactKind::Json => "text",
        ArtifactKind::Binary => "binary payload",
    };
    tracing::debug!(
        attachment = %input.name,
        size,
        limit,
        "omitting oversized attachment"
    );
    Artifact::omitted(
        &input.name,
        &input.media_type,
        format!("{what} of {size} bytes exceeds inline limit of {limit} bytes"),
        Some(size),
        Some(limit),
    )
}

/// Decode one attachment. Never fails: unreadable or oversized payloads come
/// back as omission markers.
pub(crate) fn decode(input: AttachmentInput, limits: &InlineLimits, test_id: &str) -> Decoded {
    let kind = ArtifactKind::from_media_type(&input.media_type);
    let limit = limit_for(kind, limits);

    let bytes = match &input.payload {
        AttachmentPayload::Bytes(b) => b.clone(),
        AttachmentPayload::Path(path) => {
            // Skip reading files we would refuse to embed anyway, unless they
            // may carry a summary payload.
            if kind != ArtifactKind::Json {
                if let Ok(meta) = fs::metadata(path) {
                    if meta.len() > limit {
                        return Decoded::Artifact(oversized(&input, kind, meta.len(), limit));
                    }
                }
            }
            match fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(
                        test_id,
                        attachment = %input.name,
                        path = %path.display(),
                        error = %e,
                        "attachment could not be read"
                    );
                    return Decoded::Artifact(Artifact::omitted(
                        &input.name,
                        &input.media_type,
                        format!("read error: {e}"),
                        None,
                        None,
                    ));
                }
            }
        }
        AttachmentPayload::Unreadable(reason) => {
            tracing::warn!(test_id, attachment = %input.name, reason = %reason, "attachment payload unreadable");
            return Decoded::Artifact(Artifact::omitted(
                &input.name,
                &input.media_type,
                format!("read error: {reason}"),
                None,
                None,
            ));
        }
        AttachmentPayload::Missing => {
            return Decoded::Artifact(Artifact::omitted(
                &input.name,
                &input.media_type,
                "no payload or path was provided",
                None,
                None,
            ));
        }
    };

    let mut rejected = false;
    if kind == ArtifactKind::Json {
        match check_summary(&input, &bytes, test_id) {
            SummaryCheck::Accepted(summary) => return Decoded::Summary(Box::new(summary)),
            SummaryCheck::Rejected => rejected = true,
            SummaryCheck::NotSummary => {}
        }
    }

    let artifact = embed(&input, kind, &bytes, limit, limits);
    if rejected {
        Decoded::Rejected(artifact)
    } else {
        Decoded::Artifact(artifact)
    }
}

fn embed(
    input: &AttachmentInput,
    kind: ArtifactKind,
    bytes: &[u8],
    limit: u64,
    limits: &InlineLimits,
) -> Artifact {
    let size = bytes.len() as u64;
    if size > limit {
        return oversized(input, kind, size, limit);
    }

    let mut artifact = Artifact::new(&input.name, &input.media_type, kind, Some(size));
    match kind {
        ArtifactKind::Text | ArtifactKind::Json => {
            let text = String::from_utf8_lossy(bytes);
            let (body, truncated) = truncate_chars(&text, limits.max_text_chars);
            artifact.body = Some(body);
            artifact.encoding = Some(Encoding::Utf8);
            artifact.truncated = truncated;
        }
        ArtifactKind::Image | ArtifactKind::Binary => {
            artifact.body = Some(base64::engine::general_purpose::STANDARD.encode(bytes));
            artifact.encoding = Some(Encoding::Base64);
        }
    }
    artifact
}

fn check_summary(input: &AttachmentInput, bytes: &[u8], test_id: &str) -> SummaryCheck {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(test_id, attachment = %input.name, error = %e, "JSON attachment did not parse");
            return SummaryCheck::NotSummary;
        }
    };
    if !schema::looks_like_summary(&value) {
        return SummaryCheck::NotSummary;
    }
    match schema::validate(value) {
        Ok(payload) => SummaryCheck::Accepted(payload),
        Err(e) => {
            tracing::warn!(
                test_id,
                attachment = %input.name,
                reason = %e,
                "dropping invalid summary payload"
            );
            SummaryCheck::Rejected
        }
    }
}

/// Truncate to at most `ceiling` characters, appending a marker when cut.
pub(crate) fn truncate_chars(text: &str, ceiling: usize) -> (String, bool) {
    let total = text.chars().count();
    if total <= ceiling {
        return (text.to_string(), false);
    }
    let mut out: String = text.chars().take(ceiling).collect();
    out.push_str(&format!("\n… [truncated {} characters]", total - ceiling));
    (out, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SCHEMA_ID, SCHEMA_VERSION};
    use serde_json::json;
    use std::path::PathBuf;

    fn limits() -> InlineLimits {
        InlineLimits {
            max_text_bytes: 64,
            max_image_bytes: 32,
            max_binary_bytes: 16,
            max_text_chars: 20,
        }
    }

    fn input(name: &str, media_type: &str, bytes: &[u8]) -> AttachmentInput {
        AttachmentInput {
            name: name.into(),
            media_type: media_type.into(),
            payload: AttachmentPayload::Bytes(bytes.to_vec()),
        }
    }

    fn artifact(d: Decoded) -> Artifact {
        match d {
            Decoded::Artifact(a) | Decoded::Rejected(a) => a,
            Decoded::Summary(_) => panic!("expected artifact"),
        }
    }

    #[test]
    fn small_text_is_embedded() {
        let a = artifact(decode(input("log", "text/plain", b"hello"), &limits(), "t"));
        assert!(!a.omitted);
        assert_eq!(a.body.as_deref(), Some("hello"));
        assert_eq!(a.encoding, Some(Encoding::Utf8));
        assert_eq!(a.size_bytes, Some(5));
    }

    #[test]
    fn text_over_double_limit_is_omitted() {
        let body = vec![b'x'; 128];
        let a = artifact(decode(input("trace", "text/plain", &body), &limits(), "t"));
        assert!(a.omitted);
        assert!(a.body.is_none());
        assert!(a.reason.as_deref().unwrap().contains("exceeds inline limit"));
        assert_eq!(a.size_bytes, Some(128));
        assert_eq!(a.limit_bytes, Some(64));
    }

    #[test]
    fn long_text_is_truncated_with_marker() {
        let body = "a".repeat(50);
        let a = artifact(decode(input("log", "text/plain", body.as_bytes()), &limits(), "t"));
        assert!(a.truncated);
        let text = a.body.unwrap();
        assert!(text.starts_with(&"a".repeat(20)));
        assert!(text.ends_with("[truncated 30 characters]"));
    }

    #[test]
    fn image_becomes_base64() {
        let a = artifact(decode(input("shot", "image/png", &[1, 2, 3]), &limits(), "t"));
        assert_eq!(a.encoding, Some(Encoding::Base64));
        assert_eq!(a.data_uri().unwrap(), "data:image/png;base64,AQID");
    }

    #[test]
    fn oversized_image_is_omitted() {
        let a = artifact(decode(input("shot", "image/png", &[0; 40]), &limits(), "t"));
        assert!(a.omitted);
        assert!(a.reason.unwrap().starts_with("image of 40 bytes"));
    }

    #[test]
    fn unreadable_path_becomes_read_error_marker() {
        let i = AttachmentInput {
            name: "video".into(),
            media_type: "video/webm".into(),
            payload: AttachmentPayload::Path(PathBuf::from("/definitely/not/here.webm")),
        };
        let a = artifact(decode(i, &limits(), "t"));
        assert!(a.omitted);
        assert!(a.reason.unwrap().starts_with("read error"));
    }

    #[test]
    fn oversized_path_is_not_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        let i = AttachmentInput {
            name: "blob".into(),
            media_type: "application/octet-stream".into(),
            payload: AttachmentPayload::Path(path),
        };
        let a = artifact(decode(i, &limits(), "t"));
        assert!(a.omitted);
        assert_eq!(a.size_bytes, Some(100));
    }

    #[test]
    fn valid_summary_is_routed_not_stored() {
        let payload = json!({
            "schema": SCHEMA_ID,
            "version": SCHEMA_VERSION,
            "kind": "run-summary",
            "baseName": "internal-links",
            // large enough to exceed the text limit; summaries are never size-limited
            "overview": { "totalLinks": 12, "brokenCount": 0, "note": "x".repeat(100) }
        });
        let bytes = serde_json::to_vec(&payload).unwrap();
        match decode(input("links", "application/json", &bytes), &limits(), "t") {
            Decoded::Summary(p) => assert_eq!(p.base_name, "internal-links"),
            _ => panic!("expected summary"),
        }
    }

    #[test]
    fn invalid_summary_stays_plain_attachment() {
        let bytes = serde_json::to_vec(&json!({ "schema": "other", "kind": "run-summary", "baseName": "x" })).unwrap();
        let decoded = decode(input("s", "application/json", &bytes), &limits(), "t");
        assert!(matches!(decoded, Decoded::Rejected(_)));
        let a = artifact(decoded);
        assert_eq!(a.kind, ArtifactKind::Json);
        assert!(a.body.unwrap().contains("\"other\""));
    }

    #[test]
    fn missing_payload_is_omitted() {
        let i = AttachmentInput {
            name: "empty".into(),
            media_type: "text/plain".into(),
            payload: AttachmentPayload::Missing,
        };
        let a = artifact(decode(i, &limits(), "t"));
        assert!(a.omitted);
    }

    #[test]
    fn truncate_chars_respects_multibyte() {
        let (s, cut) = truncate_chars("ééééé", 3);
        assert!(cut);
        assert!(s.starts_with("ééé\n"));
        let (s, cut) = truncate_chars("abc", 3);
        assert!(!cut);
        assert_eq!(s, "abc");
    }
}
