use thiserror::Error;

/// 发票录入流水线错误
#[derive(Error, Debug)]
pub enum IngestError {
    /// metadata 不是合法 JSON 对象, 或某个已识别字段类型错误
    #[error("malformed metadata field `{field}`: {reason}")]
    MalformedMetadata { field: String, reason: String },

    /// 请求体既不是 JSON, 也不是至少含一个 part 的 multipart
    #[error("unsupported submission shape: {0}")]
    UnsupportedSubmissionShape(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("repository failure: {0}")]
    Repository(#[from] RepositoryError),
}

impl IngestError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 上传文件存储错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid storage reference: {0}")]
    InvalidReference(String),

    #[error("stored file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 持久化协作方错误
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database operation timed out")]
    Timeout,
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("date pattern `{0}` must define groups `y`, `d` and one of `m`/`mon`")]
    DatePatternGroups(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
