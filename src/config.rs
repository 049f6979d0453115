use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 单个请求体上限 (字节)
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 未配置时使用内存仓储
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub invoice_dir: String,
}

/// 文本抽取规则配置
///
/// 日期正则需要命名分组 `y`、`d`, 以及 `m` (数字月份) 或 `mon` (英文月份名)。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub vendor_labels: Vec<String>,
    pub date_labels: Vec<String>,
    pub total_labels: Vec<String>,
    pub date_patterns: Vec<String>,
    /// 没有供应商标签时, 是否取第一条非空行作为供应商
    pub vendor_first_line_fallback: bool,
    /// 文本抽取扫描的最大字节数
    pub max_text_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            vendor_labels: to_strings(&["vendor", "from", "supplier", "seller", "bill from"]),
            date_labels: to_strings(&["invoice date", "date of issue", "issue date", "date"]),
            total_labels: to_strings(&[
                "grand total",
                "total amount",
                "amount due",
                "total due",
                "total",
            ]),
            date_patterns: to_strings(&[
                r"\b(?P<y>\d{4})-(?P<m>\d{1,2})-(?P<d>\d{1,2})\b",
                r"\b(?P<y>\d{4})/(?P<m>\d{1,2})/(?P<d>\d{1,2})\b",
                r"\b(?P<d>\d{1,2})\.(?P<m>\d{1,2})\.(?P<y>\d{4})\b",
                r"\b(?P<m>\d{1,2})/(?P<d>\d{1,2})/(?P<y>\d{4})\b",
                r"\b(?P<d>\d{1,2})\s+(?P<mon>[A-Za-z]{3,9})\.?,?\s+(?P<y>\d{4})\b",
                r"\b(?P<mon>[A-Za-z]{3,9})\.?\s+(?P<d>\d{1,2}),?\s+(?P<y>\d{4})\b",
            ]),
            vendor_first_line_fallback: false,
            max_text_bytes: 1024 * 1024,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_upload_bytes: 10 * 1024 * 1024,
            },
            database: DatabaseConfig::default(),
            storage: StorageConfig {
                invoice_dir: "storage/invoices".to_string(),
            },
            extraction: ExtractionConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 → config/invoice-ingest.* → INGEST__* 环境变量 → DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = config::Config::try_from(&AppConfig::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config/invoice-ingest").required(false))
            .add_source(
                config::Environment::with_prefix("INGEST")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("extraction.vendor_labels")
                    .with_list_parse_key("extraction.date_labels")
                    .with_list_parse_key("extraction.total_labels")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
