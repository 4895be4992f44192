use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::Level;

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap());

/// 去掉空白和重复项，保留第一次出现的顺序。
pub fn dedup_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for name in names {
        let name = collapse_whitespace(&name);
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.clone()) {
            result.push(name);
        }
    }
    result
}

/// 把连续空白（包括 HTML 里的换行缩进）压缩成单个空格。
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 从文本中取出第一个数字，允许小数逗号，例如 "Pisteraja: 42,5" -> 42.5
pub fn first_number(s: &str) -> Option<f64> {
    NUMBER
        .find(s)
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

/// 表头名称标准化：去空白并转小写
pub fn normalize_header(s: &str) -> String {
    s.trim().to_lowercase()
}

// 把字符串转换成 Level，忽略大小写，不识别时返回 None
pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" | "WARNING" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}
