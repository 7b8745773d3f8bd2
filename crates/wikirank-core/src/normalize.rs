//! Per-row cleaning and derived fields: raw CSV strings → `NormalizedRecord`
//!
//! Nothing in here fails. Unparseable or absent values degrade to `None`
//! (or the `MISSING_BIN` sentinel for bins) and the row is still produced.

use serde::{Deserialize, Serialize};

use crate::config::EtlParams;

/// Bin value for a missing or unparseable input
pub const MISSING_BIN: i64 = -1;

/// Upper bound for quality bins; scores above 100 fold into the last bin
const QUALITY_BIN_MAX: f64 = 100.0;

/// One source row before any coercion. `None` means the field was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub language: Option<String>,
    pub title: Option<String>,
    pub page_id: Option<String>,
    pub quality: Option<String>,
}

impl RawRow {
    pub fn new(
        language: Option<&str>,
        title: Option<&str>,
        page_id: Option<&str>,
        quality: Option<&str>,
    ) -> Self {
        Self {
            language: language.map(str::to_string),
            title: title.map(str::to_string),
            page_id: page_id.map(str::to_string),
            quality: quality.map(str::to_string),
        }
    }
}

/// Cleaned article row, serialized one-per-line into the record sink.
///
/// Field order here is the JSONL key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(rename = "lang")]
    pub language: Option<String>,
    pub title: String,
    pub page_id: Option<i64>,
    pub quality: Option<f64>,
    pub title_len: u64,
    pub quality_bin: i64,
    #[serde(with = "int_flag")]
    pub is_high_quality: bool,
    pub title_len_bin: i64,
}

/// `bool` as `0`/`1` so document stores can `$avg` the flag directly
mod int_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(flag: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*flag))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match u8::deserialize(d)? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(serde::de::Error::custom(format!("expected 0 or 1, got {n}"))),
        }
    }
}

/// Replace tab/CR/LF with a space each, then trim. Absent title → empty.
pub fn clean_title(title: Option<&str>) -> String {
    let Some(title) = title else {
        return String::new();
    };
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '\t' | '\r' | '\n' => ' ',
            c => c,
        })
        .collect();
    replaced.trim().to_string()
}

/// Parse a quality score. Non-finite values count as missing.
pub fn parse_quality(raw: Option<&str>) -> Option<f64> {
    let v: f64 = raw?.trim().parse().ok()?;
    if !v.is_finite() {
        return None;
    }
    // -0.0 + 0.0 == +0.0; keeps total_cmp ordering in line with ==
    Some(v + 0.0)
}

/// Parse a page id. Integral floats such as `"12.0"` are accepted.
pub fn parse_page_id(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim();
    if let Ok(id) = s.parse::<i64>() {
        return Some(id);
    }
    let v: f64 = s.parse().ok()?;
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Lower bound of the quality bin, clamped into `[0, 100]`.
pub fn quality_bin(quality: Option<f64>, bin_size: u32) -> i64 {
    let Some(q) = quality else {
        return MISSING_BIN;
    };
    if q.is_nan() {
        return MISSING_BIN;
    }
    let width = f64::from(bin_size);
    let bin = (q / width).floor() * width;
    bin.clamp(0.0, QUALITY_BIN_MAX) as i64
}

/// Lower bound of the title-length bin. No upper clamp.
pub fn title_len_bin(len: Option<u64>, bin_size: u32) -> i64 {
    let Some(len) = len else {
        return MISSING_BIN;
    };
    let width = u64::from(bin_size);
    i64::try_from(len / width * width).unwrap_or(i64::MAX)
}

/// `quality >= threshold`; missing quality is never high quality.
pub fn is_high_quality(quality: Option<f64>, threshold: f64) -> bool {
    quality.is_some_and(|q| q >= threshold)
}

/// Stateless row normalizer carrying the bin widths and threshold.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    hq_threshold: f64,
    quality_bin_size: u32,
    title_len_bin_size: u32,
}

impl Normalizer {
    pub fn new(params: &EtlParams) -> Self {
        Self {
            hq_threshold: params.hq_threshold,
            quality_bin_size: params.quality_bin_size,
            title_len_bin_size: params.title_len_bin_size,
        }
    }

    pub fn normalize(&self, raw: RawRow) -> NormalizedRecord {
        let title = clean_title(raw.title.as_deref());
        let title_len = title.chars().count() as u64;
        let page_id = parse_page_id(raw.page_id.as_deref());
        let quality = parse_quality(raw.quality.as_deref());
        let language = raw.language.filter(|l| !l.is_empty());

        NormalizedRecord {
            language,
            title,
            page_id,
            quality,
            title_len,
            quality_bin: quality_bin(quality, self.quality_bin_size),
            is_high_quality: is_high_quality(quality, self.hq_threshold),
            title_len_bin: title_len_bin(Some(title_len), self.title_len_bin_size),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&EtlParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_bin_boundaries() {
        assert_eq!(quality_bin(Some(79.999), 10), 70);
        assert_eq!(quality_bin(Some(80.0), 10), 80);
        assert_eq!(quality_bin(None, 10), -1);
        assert_eq!(quality_bin(Some(0.0), 10), 0);
        assert_eq!(quality_bin(Some(100.0), 10), 100);
    }

    #[test]
    fn quality_bin_clamps_out_of_range() {
        assert_eq!(quality_bin(Some(-5.0), 10), 0);
        assert_eq!(quality_bin(Some(-0.1), 10), 0);
        assert_eq!(quality_bin(Some(137.2), 10), 100);
        assert_eq!(quality_bin(Some(1e300), 10), 100);
    }

    #[test]
    fn quality_bin_other_width() {
        assert_eq!(quality_bin(Some(49.0), 25), 25);
        assert_eq!(quality_bin(Some(99.0), 25), 75);
    }

    #[test]
    fn title_len_bin_boundaries() {
        assert_eq!(title_len_bin(Some(19), 20), 0);
        assert_eq!(title_len_bin(Some(20), 20), 20);
        assert_eq!(title_len_bin(Some(0), 20), 0);
        assert_eq!(title_len_bin(None, 20), -1);
    }

    #[test]
    fn title_len_bin_has_no_upper_clamp() {
        assert_eq!(title_len_bin(Some(255), 20), 240);
    }

    #[test]
    fn high_quality_flag() {
        assert!(is_high_quality(Some(80.0), 80.0));
        assert!(!is_high_quality(Some(79.9999), 80.0));
        assert!(!is_high_quality(None, 80.0));
    }

    #[test]
    fn clean_title_replaces_control_whitespace() {
        assert_eq!(clean_title(Some("a\tb\r\nc")), "a b  c");
        assert_eq!(clean_title(Some("  \tPadded\n ")), "Padded");
        assert_eq!(clean_title(None), "");
    }

    #[test]
    fn parse_quality_values() {
        assert_eq!(parse_quality(Some("85")), Some(85.0));
        assert_eq!(parse_quality(Some(" 12.5 ")), Some(12.5));
        assert_eq!(parse_quality(Some("abc")), None);
        assert_eq!(parse_quality(Some("NaN")), None);
        assert_eq!(parse_quality(Some("inf")), None);
        assert_eq!(parse_quality(None), None);
    }

    #[test]
    fn parse_quality_normalizes_negative_zero() {
        let q = parse_quality(Some("-0.0")).unwrap();
        assert!(q.is_sign_positive());
    }

    #[test]
    fn parse_page_id_values() {
        assert_eq!(parse_page_id(Some("42")), Some(42));
        assert_eq!(parse_page_id(Some("12.0")), Some(12));
        assert_eq!(parse_page_id(Some("12.5")), None);
        assert_eq!(parse_page_id(Some("x12")), None);
        assert_eq!(parse_page_id(Some("1e30")), None);
        assert_eq!(parse_page_id(None), None);
    }

    #[test]
    fn normalize_full_row() {
        let n = Normalizer::default();
        let rec = n.normalize(RawRow::new(
            Some("en"),
            Some(" Cat\tVideos "),
            Some("7"),
            Some("85.5"),
        ));
        assert_eq!(rec.language.as_deref(), Some("en"));
        assert_eq!(rec.title, "Cat Videos");
        assert_eq!(rec.title_len, 10);
        assert_eq!(rec.page_id, Some(7));
        assert_eq!(rec.quality, Some(85.5));
        assert_eq!(rec.quality_bin, 80);
        assert!(rec.is_high_quality);
        assert_eq!(rec.title_len_bin, 0);
    }

    #[test]
    fn normalize_degrades_bad_fields() {
        let n = Normalizer::default();
        let rec = n.normalize(RawRow::new(Some(""), None, Some("n/a"), Some("??")));
        assert_eq!(rec.language, None);
        assert_eq!(rec.title, "");
        assert_eq!(rec.title_len, 0);
        assert_eq!(rec.page_id, None);
        assert_eq!(rec.quality, None);
        assert_eq!(rec.quality_bin, MISSING_BIN);
        assert!(!rec.is_high_quality);
        assert_eq!(rec.title_len_bin, 0);
    }

    #[test]
    fn title_len_counts_chars_not_bytes() {
        let n = Normalizer::default();
        let rec = n.normalize(RawRow::new(Some("ja"), Some("東京都"), Some("1"), Some("1")));
        assert_eq!(rec.title_len, 3);
    }

    #[test]
    fn record_json_shape() {
        let n = Normalizer::default();
        let rec = n.normalize(RawRow::new(Some("fr"), Some("Chat"), Some("3"), None));
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(
            json,
            r#"{"lang":"fr","title":"Chat","page_id":3,"quality":null,"title_len":4,"quality_bin":-1,"is_high_quality":0,"title_len_bin":0}"#
        );
        let back: NormalizedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn high_quality_flag_rejects_other_integers() {
        let json = r#"{"lang":"fr","title":"","page_id":null,"quality":null,"title_len":0,"quality_bin":-1,"is_high_quality":2,"title_len_bin":0}"#;
        assert!(serde_json::from_str::<NormalizedRecord>(json).is_err());
    }
}
