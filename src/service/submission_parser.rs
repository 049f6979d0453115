use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::{IngestError, Result};
use super::text_rules::{parse_decimal, MAX_DECIMAL_SCALE};
use crate::models::{InvoiceMetadata, Submission, UploadedFile};

pub const METADATA_PART: &str = "metadata";
pub const FILE_PART: &str = "file";

/// 纯 JSON 请求中不允许出现的键: 文件只能通过 multipart 上传
const JSON_FORBIDDEN_KEYS: &[&str] = &["file"];

/// 请求体形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionShape {
    Json,
    Multipart,
}

impl SubmissionShape {
    /// 根据 Content-Type 判断请求体形态
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self> {
        let Some(raw) = content_type else {
            return Err(IngestError::UnsupportedContentType("<missing>".to_string()));
        };
        let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            Ok(Self::Json)
        } else if essence == "multipart/form-data" {
            Ok(Self::Multipart)
        } else {
            Err(IngestError::UnsupportedContentType(raw.to_string()))
        }
    }
}

/// multipart 中的一个 part (已完整读入内存)
#[derive(Debug, Clone, Default)]
pub struct RawPart {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RawPart {
    /// 浏览器在未选择文件时会提交文件名为空、内容为空的 part
    fn is_empty_file_input(&self) -> bool {
        self.data.is_empty() && self.file_name.as_deref().map_or(true, str::is_empty)
    }
}

/// 解析纯 JSON 请求体: 顶层即 metadata 对象
pub fn parse_json_body(body: &[u8]) -> Result<Submission> {
    let value = parse_json(body)?;
    if let Value::Object(map) = &value {
        if let Some(key) = JSON_FORBIDDEN_KEYS.iter().find(|k| map.contains_key(**k)) {
            return Err(IngestError::UnsupportedSubmissionShape(format!(
                "`{}` is not accepted in a JSON body; upload files with multipart/form-data",
                key
            )));
        }
    }
    Ok(Submission::metadata_only(metadata_from_value(value)?))
}

/// 解析 multipart 请求: `metadata` (JSON 字符串) + 可选 `file`
pub fn parse_multipart(parts: Vec<RawPart>) -> Result<Submission> {
    let mut metadata_raw: Option<Vec<u8>> = None;
    let mut file: Option<UploadedFile> = None;

    for part in parts {
        match part.name.as_deref() {
            Some(METADATA_PART) => {
                if metadata_raw.is_some() {
                    return Err(IngestError::malformed(METADATA_PART, "duplicate metadata part"));
                }
                metadata_raw = Some(part.data);
            }
            Some(FILE_PART) => {
                if part.is_empty_file_input() {
                    tracing::debug!("Ignoring empty file part");
                    continue;
                }
                if file.is_some() {
                    return Err(IngestError::UnsupportedSubmissionShape(
                        "only one `file` part is accepted".to_string(),
                    ));
                }
                file = Some(UploadedFile::new(part.file_name, part.content_type, part.data));
            }
            other => {
                tracing::debug!("Ignoring unrecognized multipart part {:?}", other);
            }
        }
    }

    match (metadata_raw, file) {
        (None, None) => Err(IngestError::UnsupportedSubmissionShape(
            "multipart body must contain a `metadata` or `file` part".to_string(),
        )),
        (Some(raw), file) => Ok(Submission {
            metadata: parse_metadata(&raw)?,
            file,
        }),
        (None, Some(file)) => Ok(Submission::with_file(InvoiceMetadata::default(), file)),
    }
}

/// 解析 metadata JSON 文本
pub fn parse_metadata(raw: &[u8]) -> Result<InvoiceMetadata> {
    metadata_from_value(parse_json(raw)?)
}

fn parse_json(raw: &[u8]) -> Result<Value> {
    serde_json::from_slice(raw).map_err(|e| IngestError::malformed(METADATA_PART, e.to_string()))
}

fn metadata_from_value(value: Value) -> Result<InvoiceMetadata> {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(IngestError::malformed(
                METADATA_PART,
                format!("expected a JSON object, found {}", json_kind(&other)),
            ))
        }
    };

    Ok(InvoiceMetadata {
        vendor_name: vendor_field(&mut map)?,
        invoice_date: date_field(&mut map)?,
        total_amount: amount_field(&mut map)?,
        currency: currency_field(&mut map)?,
    })
}

fn vendor_field(map: &mut Map<String, Value>) -> Result<Option<String>> {
    match map.remove("vendor_name") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(IngestError::malformed(
            "vendor_name",
            format!("expected a string, found {}", json_kind(&other)),
        )),
    }
}

fn date_field(map: &mut Map<String, Value>) -> Result<Option<NaiveDate>> {
    match map.remove("invoice_date") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                IngestError::malformed(
                    "invoice_date",
                    format!("expected an ISO-8601 date (YYYY-MM-DD), got {:?}", s),
                )
            }),
        Some(other) => Err(IngestError::malformed(
            "invoice_date",
            format!("expected a date string, found {}", json_kind(&other)),
        )),
    }
}

fn amount_field(map: &mut Map<String, Value>) -> Result<Option<BigDecimal>> {
    let raw = match map.remove("total_amount") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(IngestError::malformed(
                "total_amount",
                format!("expected a number or numeric string, found {}", json_kind(&other)),
            ))
        }
    };

    parse_decimal(&raw).map(Some).ok_or_else(|| {
        IngestError::malformed(
            "total_amount",
            format!(
                "{:?} is not a decimal number with exponent and scale within {}",
                raw, MAX_DECIMAL_SCALE
            ),
        )
    })
}

/// ISO 4217 三字母代码, 统一为大写
fn currency_field(map: &mut Map<String, Value>) -> Result<Option<String>> {
    match map.remove("currency") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => {
            let code = s.trim();
            if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
                Ok(Some(code.to_ascii_uppercase()))
            } else {
                Err(IngestError::malformed(
                    "currency",
                    format!("expected a three-letter currency code, got {:?}", s),
                ))
            }
        }
        Some(other) => Err(IngestError::malformed(
            "currency",
            format!("expected a string, found {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn part(name: &str, data: &[u8]) -> RawPart {
        RawPart {
            name: Some(name.to_string()),
            data: data.to_vec(),
            ..Default::default()
        }
    }

    fn file_part(file_name: &str, data: &[u8]) -> RawPart {
        RawPart {
            name: Some(FILE_PART.to_string()),
            file_name: Some(file_name.to_string()),
            content_type: Some("text/plain".to_string()),
            data: data.to_vec(),
        }
    }

    fn malformed_field(err: IngestError) -> String {
        match err {
            IngestError::MalformedMetadata { field, .. } => field,
            other => panic!("expected MalformedMetadata, got {:?}", other),
        }
    }

    #[test]
    fn content_type_detection() {
        assert_eq!(
            SubmissionShape::from_content_type(Some("application/json; charset=utf-8")).unwrap(),
            SubmissionShape::Json
        );
        assert_eq!(
            SubmissionShape::from_content_type(Some("multipart/form-data; boundary=xyz")).unwrap(),
            SubmissionShape::Multipart
        );
        assert!(matches!(
            SubmissionShape::from_content_type(Some("text/plain")),
            Err(IngestError::UnsupportedContentType(_))
        ));
        assert!(matches!(
            SubmissionShape::from_content_type(None),
            Err(IngestError::UnsupportedContentType(_))
        ));
    }

    #[test]
    fn json_body_with_all_fields() {
        let body = br#"{"vendor_name": " Acme ", "invoice_date": "2024-03-01", "total_amount": "99.99"}"#;
        let submission = parse_json_body(body).unwrap();

        assert_eq!(submission.metadata.vendor_name.as_deref(), Some("Acme"));
        assert_eq!(
            submission.metadata.invoice_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            submission.metadata.total_amount,
            Some(BigDecimal::from_str("99.99").unwrap())
        );
        assert!(submission.file.is_none());
    }

    #[test]
    fn numeric_total_and_null_fields() {
        let submission =
            parse_json_body(br#"{"vendor_name": null, "total_amount": 42.5, "currency": "usd"}"#)
                .unwrap();
        assert_eq!(submission.metadata.vendor_name, None);
        assert_eq!(submission.metadata.invoice_date, None);
        assert_eq!(
            submission.metadata.total_amount,
            Some(BigDecimal::from_str("42.50").unwrap())
        );
        assert_eq!(submission.metadata.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn currency_must_be_a_three_letter_code() {
        let submission = parse_json_body(br#"{"currency": " eur "}"#).unwrap();
        assert_eq!(submission.metadata.currency.as_deref(), Some("EUR"));

        let submission = parse_json_body(br#"{"currency": ""}"#).unwrap();
        assert_eq!(submission.metadata.currency, None);

        for body in [
            br#"{"currency": "US"}"#.as_slice(),
            br#"{"currency": "USDT"}"#.as_slice(),
            br#"{"currency": "U$D"}"#.as_slice(),
            r#"{"currency": "éur"}"#.as_bytes(),
            br#"{"currency": 840}"#.as_slice(),
        ] {
            let err = parse_json_body(body).unwrap_err();
            assert_eq!(malformed_field(err), "currency");
        }
    }

    #[test]
    fn blank_strings_are_null() {
        let submission =
            parse_json_body(br#"{"vendor_name": "   ", "invoice_date": "", "total_amount": ""}"#)
                .unwrap();
        assert_eq!(submission.metadata, InvoiceMetadata::default());
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_json_body(b"{invalid json").unwrap_err();
        assert_eq!(malformed_field(err), "metadata");
    }

    #[test]
    fn non_object_is_malformed() {
        let err = parse_json_body(b"[null, null, null]").unwrap_err();
        assert_eq!(malformed_field(err), "metadata");
    }

    #[test]
    fn bad_field_types_identify_the_field() {
        let err = parse_json_body(br#"{"vendor_name": 12}"#).unwrap_err();
        assert_eq!(malformed_field(err), "vendor_name");

        let err = parse_json_body(br#"{"invoice_date": "03/01/2024"}"#).unwrap_err();
        assert_eq!(malformed_field(err), "invoice_date");

        let err = parse_json_body(br#"{"total_amount": "twelve"}"#).unwrap_err();
        assert_eq!(malformed_field(err), "total_amount");

        let err = parse_json_body(br#"{"total_amount": [1]}"#).unwrap_err();
        assert_eq!(malformed_field(err), "total_amount");
    }

    #[test]
    fn oversized_amount_exponent_is_malformed() {
        for body in [
            br#"{"total_amount": "1e-9223372036854775808"}"#.as_slice(),
            br#"{"total_amount": "1e-200000000"}"#.as_slice(),
            br#"{"total_amount": "5E100"}"#.as_slice(),
        ] {
            let err = parse_json_body(body).unwrap_err();
            assert_eq!(malformed_field(err), "total_amount");
        }

        let parts = vec![part(METADATA_PART, br#"{"total_amount": "1e-100000000000"}"#)];
        let err = parse_multipart(parts).unwrap_err();
        assert_eq!(malformed_field(err), "total_amount");

        let submission = parse_json_body(br#"{"total_amount": "1.25e2"}"#).unwrap();
        assert_eq!(
            submission.metadata.total_amount,
            Some(BigDecimal::from_str("125").unwrap())
        );
    }

    #[test]
    fn json_body_cannot_carry_a_file() {
        let err = parse_json_body(br#"{"vendor_name": "Acme", "file": "invoice.pdf"}"#).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedSubmissionShape(_)));
    }

    #[test]
    fn multipart_metadata_and_file() {
        let parts = vec![
            part(METADATA_PART, br#"{"vendor_name": "Acme"}"#),
            file_part("invoice.txt", b"Total: 10.00"),
        ];
        let submission = parse_multipart(parts).unwrap();

        assert_eq!(submission.metadata.vendor_name.as_deref(), Some("Acme"));
        let file = submission.file.unwrap();
        assert_eq!(file.file_name.as_deref(), Some("invoice.txt"));
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert_eq!(file.data, b"Total: 10.00");
    }

    #[test]
    fn multipart_file_without_metadata_defaults_to_null_metadata() {
        let submission = parse_multipart(vec![file_part("invoice.txt", b"hello")]).unwrap();
        assert_eq!(submission.metadata, InvoiceMetadata::default());
        assert!(submission.file.is_some());
    }

    #[test]
    fn multipart_without_known_parts_is_unsupported() {
        let err = parse_multipart(vec![part("note", b"hi")]).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedSubmissionShape(_)));

        let err = parse_multipart(Vec::new()).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedSubmissionShape(_)));
    }

    #[test]
    fn multipart_empty_file_input_is_ignored() {
        let parts = vec![part(METADATA_PART, b"{}"), file_part("", b"")];
        let submission = parse_multipart(parts).unwrap();
        assert!(submission.file.is_none());
    }

    #[test]
    fn multipart_invalid_metadata_is_malformed_even_with_file() {
        let parts = vec![
            part(METADATA_PART, b"{invalid json"),
            file_part("invoice.txt", b"Vendor: Acme"),
        ];
        let err = parse_multipart(parts).unwrap_err();
        assert_eq!(malformed_field(err), "metadata");
    }

    #[test]
    fn multipart_duplicates_are_rejected() {
        let err = parse_multipart(vec![part(METADATA_PART, b"{}"), part(METADATA_PART, b"{}")])
            .unwrap_err();
        assert_eq!(malformed_field(err), "metadata");

        let err = parse_multipart(vec![file_part("a.txt", b"a"), file_part("b.txt", b"b")])
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedSubmissionShape(_)));
    }
}
