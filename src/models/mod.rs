pub mod invoice;
pub mod result;
pub mod submission;

pub use invoice::{ExtractionResult, NormalizedInvoice, StoredInvoice};
pub use result::{ExtractionStatus, FieldSource, FieldSources, IngestOutcome, StrategyKind};
pub use submission::{InvoiceMetadata, Submission, UploadedFile};
