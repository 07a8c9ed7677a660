//! Core data model: waste categories, knowledge-base records, cached
//! provider answers, and image payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::matcher::MatchCandidate;

/// Length of each positional fingerprint segment.
const FINGERPRINT_SEGMENT: usize = 50;

/// Current time in epoch milliseconds, the unit of every persisted timestamp.
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The ten municipal collection streams, labeled the way Czech collection
/// containers are; the label is also the serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WasteCategory {
    #[serde(rename = "Žlutá: Plasty")]
    Plast,
    #[serde(rename = "Modrá: Papír")]
    Papir,
    #[serde(rename = "Zelená/Bílá: Sklo")]
    Sklo,
    #[serde(rename = "Hnědá: Bioodpad")]
    Bio,
    #[serde(rename = "Směsný odpad: Černá popelnice")]
    Smesny,
    #[serde(rename = "Sběrný dvůr: Nebezpečný nebo velkoobjemový odpad")]
    SbernyDvur,
    #[serde(rename = "Šedá: Kovy")]
    Kovy,
    #[serde(rename = "Sběrný kontejner na jedlé oleje")]
    Oleje,
    #[serde(rename = "Sběrný kontejner na textil")]
    Textil,
    #[serde(rename = "Lékárna")]
    Lekarna,
}

impl WasteCategory {
    pub const ALL: [WasteCategory; 10] = [
        WasteCategory::Plast,
        WasteCategory::Papir,
        WasteCategory::Sklo,
        WasteCategory::Bio,
        WasteCategory::Smesny,
        WasteCategory::SbernyDvur,
        WasteCategory::Kovy,
        WasteCategory::Oleje,
        WasteCategory::Textil,
        WasteCategory::Lekarna,
    ];

    /// Czech display label.
    pub fn label(&self) -> &'static str {
        match self {
            WasteCategory::Plast => "Žlutá: Plasty",
            WasteCategory::Papir => "Modrá: Papír",
            WasteCategory::Sklo => "Zelená/Bílá: Sklo",
            WasteCategory::Bio => "Hnědá: Bioodpad",
            WasteCategory::Smesny => "Směsný odpad: Černá popelnice",
            WasteCategory::SbernyDvur => "Sběrný dvůr: Nebezpečný nebo velkoobjemový odpad",
            WasteCategory::Kovy => "Šedá: Kovy",
            WasteCategory::Oleje => "Sběrný kontejner na jedlé oleje",
            WasteCategory::Textil => "Sběrný kontejner na textil",
            WasteCategory::Lekarna => "Lékárna",
        }
    }
}

impl std::fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One knowledge-base item: what it is and where it goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecord {
    pub name: String,
    pub category: WasteCategory,
    #[serde(default)]
    pub note: String,
}

impl WasteRecord {
    pub fn new(
        name: impl Into<String>,
        category: WasteCategory,
        note: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), category, note: note.into() }
    }
}

impl MatchCandidate for WasteRecord {
    fn match_key(&self) -> &str {
        &self.name
    }
}

/// A successful answer from the external identification provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAnswer {
    pub name: String,
    pub category: WasteCategory,
    pub note: Option<String>,
}

/// A cached provider answer. `query` keys text lookups; `image_fingerprint`
/// keys image lookups. Either may be absent, never both in practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub name: String,
    pub category: WasteCategory,
    pub note: String,
    /// Millisecond epoch of the write that produced this entry.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_fingerprint: Option<String>,
}

impl MatchCandidate for CacheEntry {
    fn match_key(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }
}

/// A base64-encoded image. The engine never decodes pixels; it only reads
/// the encoded text to derive the positional fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    base64: String,
}

impl ImagePayload {
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self { base64: data.into() }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { base64: STANDARD.encode(bytes) }
    }

    /// Accepts both bare base64 and `data:<mime>;base64,<data>` URLs.
    pub fn from_data_url(url: &str) -> Self {
        let data = match url.split_once(',') {
            Some((head, tail)) if head.starts_with("data:") => tail,
            _ => url,
        };
        Self { base64: data.to_string() }
    }

    pub fn as_base64(&self) -> &str {
        &self.base64
    }

    /// Positional fingerprint: first, middle, and last 50 characters of the
    /// payload (the whole payload when shorter than 100). Cheap identity
    /// for deduplication, not a content hash.
    pub fn fingerprint(&self) -> String {
        let chars: Vec<char> = self.base64.chars().collect();
        let len = chars.len();
        if len < 2 * FINGERPRINT_SEGMENT {
            return self.base64.clone();
        }

        let mid = len / 2;
        let mut out = String::with_capacity(3 * FINGERPRINT_SEGMENT);
        out.extend(&chars[..FINGERPRINT_SEGMENT]);
        out.extend(&chars[mid - FINGERPRINT_SEGMENT / 2..mid + FINGERPRINT_SEGMENT / 2]);
        out.extend(&chars[len - FINGERPRINT_SEGMENT..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── category tests ───────────────────────────────────────────

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&WasteCategory::Plast).unwrap();
        assert_eq!(json, "\"Žlutá: Plasty\"");

        let parsed: WasteCategory = serde_json::from_str("\"Šedá: Kovy\"").unwrap();
        assert_eq!(parsed, WasteCategory::Kovy);
    }

    #[test]
    fn test_category_labels_are_distinct() {
        for (i, a) in WasteCategory::ALL.iter().enumerate() {
            for b in &WasteCategory::ALL[i + 1..] {
                assert_ne!(a.label(), b.label());
            }
        }
    }

    // ── record serialization tests ───────────────────────────────

    #[test]
    fn test_record_json_shape() {
        let record = WasteRecord::new("PET láhev", WasteCategory::Plast, "Sešlápněte.");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "PET láhev");
        assert_eq!(value["category"], "Žlutá: Plasty");
        assert_eq!(value["note"], "Sešlápněte.");
    }

    #[test]
    fn test_record_note_defaults_to_empty() {
        let record: WasteRecord =
            serde_json::from_str(r#"{"name":"Sklenice","category":"Zelená/Bílá: Sklo"}"#)
                .unwrap();
        assert_eq!(record.note, "");
    }

    #[test]
    fn test_cache_entry_optional_fields() {
        let entry = CacheEntry {
            name: "Plechovka".into(),
            category: WasteCategory::Kovy,
            note: String::new(),
            timestamp: 1_700_000_000_000,
            query: None,
            image_fingerprint: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("query").is_none());
        assert!(value.get("imageFingerprint").is_none());

        let round: CacheEntry = serde_json::from_value(value).unwrap();
        assert_eq!(round, entry);
    }

    #[test]
    fn test_cache_entry_camel_case_fields() {
        let entry = CacheEntry {
            name: "Plechovka".into(),
            category: WasteCategory::Kovy,
            note: String::new(),
            timestamp: 1,
            query: Some("plechovka".into()),
            image_fingerprint: Some("abc".into()),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["imageFingerprint"], "abc");
        assert_eq!(value["query"], "plechovka");
    }

    // ── image payload tests ──────────────────────────────────────

    #[test]
    fn test_fingerprint_short_payload_is_whole() {
        let payload = ImagePayload::from_base64("QUJDRA==");
        assert_eq!(payload.fingerprint(), "QUJDRA==");
    }

    #[test]
    fn test_fingerprint_positional_slices() {
        let data: String = "0123456789".repeat(20);
        let payload = ImagePayload::from_base64(data.clone());
        let fingerprint = payload.fingerprint();
        assert_eq!(fingerprint.len(), 150);
        assert_eq!(
            fingerprint,
            format!("{}{}{}", &data[..50], &data[75..125], &data[150..])
        );
    }

    #[test]
    fn test_fingerprint_exact_boundary() {
        let data: String = "ab".repeat(50);
        let payload = ImagePayload::from_base64(data.clone());
        assert_eq!(
            payload.fingerprint(),
            format!("{}{}{}", &data[..50], &data[25..75], &data[50..])
        );
    }

    #[test]
    fn test_fingerprints_differ_in_the_middle() {
        let a = format!("{}{}{}", "x".repeat(60), "middle-a", "y".repeat(60));
        let b = format!("{}{}{}", "x".repeat(60), "middle-b", "y".repeat(60));
        assert_ne!(
            ImagePayload::from_base64(a).fingerprint(),
            ImagePayload::from_base64(b).fingerprint()
        );
    }

    #[test]
    fn test_data_url_prefix_stripped() {
        let payload = ImagePayload::from_data_url("data:image/jpeg;base64,QUJD");
        assert_eq!(payload.as_base64(), "QUJD");

        let bare = ImagePayload::from_data_url("QUJD");
        assert_eq!(bare.as_base64(), "QUJD");
    }

    #[test]
    fn test_from_bytes_encodes_standard_base64() {
        let payload = ImagePayload::from_bytes(b"hello");
        assert_eq!(payload.as_base64(), "aGVsbG8=");
    }
}
