use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]").unwrap();
    static ref NON_ALNUM_RUN: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// 常见别名 → 规范名称 (键为去掉非字母数字后的小写形式)
const CANONICAL_NAMES: &[(&str, &str)] = &[
    ("amazonwebservices", "amazon web services"),
    ("aws", "amazon web services"),
    ("amazonaws", "amazon web services"),
    ("amazon", "amazon"),
    ("microsoftazure", "microsoft azure"),
    ("azure", "microsoft azure"),
    ("googlecloudplatform", "google cloud platform"),
    ("gcp", "google cloud platform"),
    ("googlecloud", "google cloud platform"),
];

/// 供应商名称规范化, 用于按名称归并同一供应商
///
/// "AWS" 与 "Amazon Web Services" 得到相同结果; 空名称返回 `None`。
pub fn normalize_vendor_name(raw: &str) -> Option<String> {
    let cleaned = raw.trim().to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    let compact = NON_ALNUM.replace_all(&cleaned, "");
    if let Some((_, canonical)) = CANONICAL_NAMES.iter().find(|(alias, _)| *alias == compact) {
        return Some(canonical.to_string());
    }

    let normalized = NON_ALNUM_RUN.replace_all(&cleaned, " ").trim().to_string();
    (!normalized.is_empty()).then_some(normalized)
}
