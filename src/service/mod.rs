pub mod extractor;
pub mod ingest;
pub mod reconcile;
pub mod submission_parser;
pub mod text_rules;
pub mod vendor;

pub use extractor::{ExtractionStrategy, InvoiceExtractor, JsonStrategy, MediaHint};
pub use ingest::IngestService;
pub use reconcile::reconcile;
pub use submission_parser::{RawPart, SubmissionShape};
pub use text_rules::TextStrategy;
pub use vendor::normalize_vendor_name;
