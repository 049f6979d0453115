//! 纯文本发票的字段抽取规则 (标签行、日期、合计金额)

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::extractor::ExtractionStrategy;
use crate::config::ExtractionConfig;
use crate::error::ConfigError;
use crate::models::{ExtractionResult, StrategyKind};

lazy_static! {
    // 1,234.56 / 1.234,56 / 1 234,56 / 1234.56 / 1234 / .50
    static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"\d{1,3}(?:[,.'\u{00a0} ]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?|[.,]\d{1,2}\b"
    ).unwrap();
}

/// 金额允许的最大指数绝对值与小数位数
pub const MAX_DECIMAL_SCALE: u64 = 64;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₽', '₩', '₺'];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// 一组可配置的日期正则, 取文本中最早出现且合法的日期
#[derive(Debug, Clone)]
pub struct DatePatterns {
    patterns: Vec<Regex>,
}

impl DatePatterns {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                let regex = compile_pattern(p)?;
                let names: Vec<&str> = regex.capture_names().flatten().collect();
                let has = |n: &str| names.contains(&n);
                if !(has("y") && has("d") && (has("m") || has("mon"))) {
                    return Err(ConfigError::DatePatternGroups(p.to_string()));
                }
                Ok(regex)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// 文本中最早出现的合法日期; 同一位置以先配置的规则为准
    pub fn find(&self, text: &str) -> Option<NaiveDate> {
        self.patterns
            .iter()
            .flat_map(|regex| {
                regex.captures_iter(text).filter_map(|caps| {
                    let start = caps.get(0)?.start();
                    date_from_captures(&caps).map(|date| (start, date))
                })
            })
            .min_by_key(|(start, _)| *start)
            .map(|(_, date)| date)
    }
}

fn date_from_captures(caps: &Captures<'_>) -> Option<NaiveDate> {
    let year: i32 = caps.name("y")?.as_str().parse().ok()?;
    let day: u32 = caps.name("d")?.as_str().parse().ok()?;
    let month = match caps.name("m") {
        Some(m) => m.as_str().parse().ok()?,
        None => month_from_name(caps.name("mon")?.as_str())?,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// 英文月份名或至少三个字母的前缀 ("Mar", "Sept")
fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|full| full.starts_with(&lower))
        .map(|idx| idx as u32 + 1)
}

/// 解析十进制数; 指数或小数位超过 `MAX_DECIMAL_SCALE` 的一律拒绝
///
/// 指数在交给 `BigDecimal` 之前先检查, 超大指数会让它溢出或在格式化时占满内存。
pub fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let raw = raw.trim();
    if let Some(pos) = raw.find(['e', 'E']) {
        let exponent: i64 = raw[pos + 1..].parse().ok()?;
        if exponent.unsigned_abs() > MAX_DECIMAL_SCALE {
            return None;
        }
    }
    let value = BigDecimal::from_str(raw).ok()?;
    let (_, scale) = value.as_bigint_and_exponent();
    (scale.unsigned_abs() <= MAX_DECIMAL_SCALE).then_some(value)
}

/// 从一段文本中解析金额: 去掉货币符号与千分位, 末尾 1~2 位小数的分隔符视为小数点
///
/// 负号必须紧贴数字或货币符号 (`-15`, `-$15`, `$-15`), 括号包住的金额 (`(15.00)`) 同样视为负数。
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let token = AMOUNT_TOKEN.find(raw)?;

    let digits: String = token
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = match digits.rfind([',', '.']) {
        Some(pos) if matches!(digits.len() - pos - 1, 1 | 2) => {
            let integer = digits[..pos].replace([',', '.'], "");
            format!(
                "{}.{}",
                if integer.is_empty() { "0" } else { integer.as_str() },
                &digits[pos + 1..]
            )
        }
        _ => digits.replace([',', '.'], ""),
    };

    let before = raw[..token.start()].trim_end_matches(CURRENCY_SYMBOLS);
    let after = raw[token.end()..].trim_start_matches(CURRENCY_SYMBOLS);
    let negative = before.ends_with('-') || (before.ends_with('(') && after.starts_with(')'));

    let amount = parse_decimal(&normalized)?;
    Some(if negative { -amount } else { amount })
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// 标签 → 正则片段: 转义后内部空白允许任意个空白字符
fn label_alternation(labels: &[String]) -> Option<String> {
    let parts: Vec<String> = labels
        .iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .map(|label| {
            regex::escape(label)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("|"))
}

/// `Label: value` 形式的整行
fn labeled_line(labels: &[String]) -> Result<Option<Regex>, ConfigError> {
    label_alternation(labels)
        .map(|alt| {
            compile_pattern(&format!(
                r"(?im)^[ \t]*(?:{})[ \t]*:[ \t]*(?P<value>[^\r\n]*?)[ \t]*\r?$",
                alt
            ))
        })
        .transpose()
}

/// 合计标签后同一行的剩余内容; `\b` 保证 "Subtotal" 不会命中
fn total_label(labels: &[String]) -> Result<Option<Regex>, ConfigError> {
    label_alternation(labels)
        .map(|alt| compile_pattern(&format!(r"(?i)\b(?:{})\b(?P<value>[^\r\n]*)", alt)))
        .transpose()
}

/// 纯文本抽取策略
#[derive(Debug, Clone)]
pub struct TextStrategy {
    vendor_label: Option<Regex>,
    date_label: Option<Regex>,
    total_label: Option<Regex>,
    dates: DatePatterns,
    vendor_first_line_fallback: bool,
    max_text_bytes: usize,
}

impl TextStrategy {
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            vendor_label: labeled_line(&config.vendor_labels)?,
            date_label: labeled_line(&config.date_labels)?,
            total_label: total_label(&config.total_labels)?,
            dates: DatePatterns::compile(&config.date_patterns)?,
            vendor_first_line_fallback: config.vendor_first_line_fallback,
            max_text_bytes: config.max_text_bytes,
        })
    }

    pub fn date_patterns(&self) -> &DatePatterns {
        &self.dates
    }

    /// 在文本上执行三条规则
    pub fn extract_text(&self, text: &str) -> ExtractionResult {
        ExtractionResult {
            vendor_name: self.vendor(text),
            invoice_date: self.date(text),
            total_amount: self.total(text),
        }
    }

    fn vendor(&self, text: &str) -> Option<String> {
        let labeled = self.vendor_label.as_ref().and_then(|regex| {
            regex
                .captures_iter(text)
                .filter_map(|caps| caps.name("value"))
                .map(|m| m.as_str().trim())
                .find(|value| !value.is_empty())
                .map(str::to_string)
        });
        if labeled.is_some() || !self.vendor_first_line_fallback {
            return labeled;
        }

        text.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .filter(|line| {
                !line.contains(':') && line.len() <= 120 && line.chars().any(char::is_alphabetic)
            })
            .map(str::to_string)
    }

    fn date(&self, text: &str) -> Option<NaiveDate> {
        let labeled = self.date_label.as_ref().and_then(|regex| {
            regex
                .captures_iter(text)
                .filter_map(|caps| caps.name("value"))
                .find_map(|m| self.dates.find(m.as_str()))
        });
        labeled.or_else(|| self.dates.find(text))
    }

    fn total(&self, text: &str) -> Option<BigDecimal> {
        self.total_label.as_ref().and_then(|regex| {
            regex
                .captures_iter(text)
                .filter_map(|caps| caps.name("value"))
                .find_map(|m| parse_amount(m.as_str()))
        })
    }
}

impl ExtractionStrategy for TextStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Text
    }

    fn extract(&self, content: &[u8]) -> Option<ExtractionResult> {
        let window = &content[..content.len().min(self.max_text_bytes)];
        let text = match std::str::from_utf8(window) {
            Ok(text) => text,
            // 截断位置落在多字节字符中间
            Err(e) if e.error_len().is_none() => std::str::from_utf8(&window[..e.valid_up_to()]).ok()?,
            Err(_) => return None,
        };
        if text.contains('\0') {
            return None;
        }
        Some(self.extract_text(text.trim_start_matches('\u{feff}')))
    }
}
