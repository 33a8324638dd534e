//! Upstream nominee payload types.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// An image descriptor attached to a nominee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub data: Option<String>,
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub save_file_ext: Option<String>,
}

/// A contestant being voted on.
///
/// `key_nominee` is stable across refreshes and identifies the nominee in
/// every snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nominee {
    pub key_nominee: i64,
    #[serde(default)]
    pub key_brand: i64,
    pub subject: String,
    /// Brand or subtitle.
    #[serde(default)]
    pub etc: Option<String>,
    /// Upstream-computed share, nominally 0–100.
    pub percent: f64,
    #[serde(deserialize_with = "lenient_u64")]
    pub count: u64,
    /// 1-based, assigned upstream.
    #[serde(deserialize_with = "lenient_u32")]
    pub rank: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_file: Option<FileRef>,
}

// Counters arrive as arbitrary JSON numbers. A negative, fractional or null
// value is clamped and rounded so one bad row cannot fail the whole payload.
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let n = Option::<f64>::deserialize(d)?.unwrap_or(0.0);
    Ok(if n.is_finite() && n > 0.0 { n.round() } else { 0.0 })
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    lenient_number(d).map(|n| n as u64)
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    lenient_number(d).map(|n| n as u32)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStatus {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// `{status, nominee}` envelope returned by the nominee endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteEnvelope {
    pub status: ResponseStatus,
    pub nominee: Vec<Nominee>,
}

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoteEnvelope {
    pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "status": {"code": 200, "message": "OK"},
        "nominee": [
            {
                "keyNominee": 11,
                "keyBrand": 3,
                "subject": "Aster",
                "etc": "Lumen",
                "percent": 41.25,
                "count": 1200,
                "rank": 1,
                "file": {"data": "https://cdn.example/a.png", "w": 120, "h": 120, "saveFileExt": "png"}
            },
            {
                "keyNominee": 12,
                "keyBrand": 4,
                "subject": "Birch",
                "etc": null,
                "percent": 30,
                "count": 880,
                "rank": 2
            }
        ]
    }"#;

    #[test]
    fn parses_upstream_envelope() {
        let env = VoteEnvelope::from_json(SAMPLE).unwrap();
        assert_eq!(env.status.code, 200);
        assert_eq!(env.nominee.len(), 2);

        let first = &env.nominee[0];
        assert_eq!(first.key_nominee, 11);
        assert_eq!(first.etc.as_deref(), Some("Lumen"));
        assert_eq!(
            first.file.as_ref().and_then(|f| f.save_file_ext.as_deref()),
            Some("png")
        );
        assert!(first.other_file.is_none());

        let second = &env.nominee[1];
        assert!(second.etc.is_none());
        assert_eq!(second.percent, 30.0);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{
            "status": {"code": 0},
            "nominee": [{"keyNominee": 1, "subject": "A", "percent": 50, "count": 100, "rank": 1}]
        }"#;
        let env = VoteEnvelope::from_json(json).unwrap();
        assert_eq!(env.status.message, "");
        assert_eq!(env.nominee[0].key_brand, 0);
        assert!(env.nominee[0].etc.is_none());
    }

    #[test]
    fn rejects_missing_nominee_array() {
        let json = r#"{"status": {"code": 200, "message": "OK"}}"#;
        assert!(VoteEnvelope::from_json(json).is_err());
    }

    #[test]
    fn malformed_counters_are_clamped_not_rejected() {
        let json = r#"{
            "status": {"code": 200, "message": "OK"},
            "nominee": [
                {"keyNominee": 1, "subject": "A", "percent": 50, "count": -3, "rank": 1},
                {"keyNominee": 2, "subject": "B", "percent": 20, "count": 12.6, "rank": 2.0},
                {"keyNominee": 3, "subject": "C", "percent": 10, "count": null, "rank": -1}
            ]
        }"#;
        let env = VoteEnvelope::from_json(json).unwrap();
        let counts: Vec<u64> = env.nominee.iter().map(|n| n.count).collect();
        let ranks: Vec<u32> = env.nominee.iter().map(|n| n.rank).collect();
        assert_eq!(counts, vec![0, 13, 0]);
        assert_eq!(ranks, vec![1, 2, 0]);
    }

    #[test]
    fn non_numeric_count_still_fails() {
        let json = r#"{
            "status": {"code": 200, "message": "OK"},
            "nominee": [{"keyNominee": 1, "subject": "A", "percent": 50, "count": "lots", "rank": 1}]
        }"#;
        assert!(VoteEnvelope::from_json(json).is_err());
    }
}
