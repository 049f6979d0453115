use crate::models::{ExtractionResult, FieldSource, FieldSources, InvoiceMetadata, NormalizedInvoice};

/// 单字段优先级: 显式 metadata > 抽取值 > 未知
pub fn pick<T>(explicit: Option<T>, extracted: Option<T>) -> (Option<T>, FieldSource) {
    match (explicit, extracted) {
        (Some(value), _) => (Some(value), FieldSource::Metadata),
        (None, Some(value)) => (Some(value), FieldSource::Extracted),
        (None, None) => (None, FieldSource::Unknown),
    }
}

/// 合并 metadata 与抽取结果, 得到最终发票
pub fn reconcile(
    metadata: InvoiceMetadata,
    extracted: ExtractionResult,
    source_file_reference: Option<String>,
) -> (NormalizedInvoice, FieldSources) {
    let (vendor_name, vendor_source) = pick(metadata.vendor_name, extracted.vendor_name);
    let (invoice_date, date_source) = pick(metadata.invoice_date, extracted.invoice_date);
    let (total_amount, total_source) = pick(metadata.total_amount, extracted.total_amount);

    let invoice = NormalizedInvoice {
        vendor_name,
        invoice_date,
        total_amount,
        currency: metadata.currency,
        source_file_reference,
    };
    let sources = FieldSources {
        vendor_name: vendor_source,
        invoice_date: date_source,
        total_amount: total_source,
    };
    (invoice, sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn pick_precedence() {
        assert_eq!(pick(Some(1), Some(2)), (Some(1), FieldSource::Metadata));
        assert_eq!(pick(None, Some(2)), (Some(2), FieldSource::Extracted));
        assert_eq!(pick::<i32>(None, None), (None, FieldSource::Unknown));
    }

    #[test]
    fn metadata_wins_field_by_field() {
        let metadata = InvoiceMetadata {
            vendor_name: Some("Explicit Vendor".to_string()),
            invoice_date: None,
            total_amount: Some(BigDecimal::from_str("10.00").unwrap()),
            currency: Some("EUR".to_string()),
        };
        let extracted = ExtractionResult {
            vendor_name: Some("Extracted Vendor".to_string()),
            invoice_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            total_amount: Some(BigDecimal::from_str("99.99").unwrap()),
        };

        let (invoice, sources) = reconcile(metadata, extracted, Some("ref.txt".to_string()));

        assert_eq!(
            invoice,
            NormalizedInvoice {
                vendor_name: Some("Explicit Vendor".to_string()),
                invoice_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                total_amount: Some(BigDecimal::from_str("10.00").unwrap()),
                currency: Some("EUR".to_string()),
                source_file_reference: Some("ref.txt".to_string()),
            }
        );
        assert_eq!(
            sources,
            FieldSources {
                vendor_name: FieldSource::Metadata,
                invoice_date: FieldSource::Extracted,
                total_amount: FieldSource::Metadata,
            }
        );
    }

    #[test]
    fn nothing_known_stays_unknown() {
        let (invoice, sources) =
            reconcile(InvoiceMetadata::default(), ExtractionResult::empty(), None);
        assert_eq!(invoice, NormalizedInvoice::default());
        assert_eq!(sources, FieldSources::default());
    }
}
