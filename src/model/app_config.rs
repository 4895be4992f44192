use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub static APP_CONFIG: Lazy<AppConfig> =
    Lazy::new(|| AppConfig::load().expect("Failed to load configuration"));

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub scrape: ScrapeConfig,
    pub server: ServerConfig,
    pub log: LoggingConfig,
}

/// 内置院校表格的位置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    pub spreadsheet: String,
    /// 工作表名称，缺省时读取第一张表
    #[serde(default)]
    pub sheet: Option<String>,
    /// 启动时立即加载数据，而不是等第一次请求
    #[serde(default)]
    pub preload: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrapeConfig {
    pub base_url: String,
    /// 相对 `base_url` 的页面路径，为空时只抓取 `base_url` 本身
    #[serde(default)]
    pub pages: Vec<String>,
    /// 单次请求超时（秒）
    pub timeout: u64,
    pub user_agent: String,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// 解析录取要求页面所用的 CSS 选择器。
///
/// 每个 `field` 块对应一个专业方向，块内依次查找名称、院校列表和分数线。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub field: String,
    pub field_name: String,
    pub university: String,
    pub points: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            field: "section.field".to_string(),
            field_name: "h2".to_string(),
            university: "li.university".to_string(),
            points: ".points".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub dir: String,
    pub console_levels: Vec<String>,
    pub file_level: String,
}

impl AppConfig {
    fn load() -> anyhow::Result<Self> {
        Self::load_from("Config")
    }

    /// 读取指定配置文件（可省略扩展名），并允许 `STUDYMAP__` 前缀的环境变量覆盖。
    pub fn load_from(name: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(name))
            .add_source(config::Environment::with_prefix("STUDYMAP").separator("__"))
            .build()?;
        let config = config.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> AppConfig {
        AppConfig::load_from(concat!(env!("CARGO_MANIFEST_DIR"), "/Config")).unwrap()
    }

    #[test]
    fn test_config() {
        let config = bundled();
        assert_eq!(config.data.spreadsheet, "data/universities.xlsx");
        assert!(config.data.sheet.is_none());
        assert_eq!(config.scrape.pages, vec!["/fields".to_string()]);
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173".to_string()]);
    }

    #[test]
    fn test_selector_defaults() {
        let config = bundled();
        let defaults = SelectorConfig::default();
        assert_eq!(config.scrape.selectors.field, defaults.field);
        assert_eq!(config.scrape.selectors.university, defaults.university);
    }

    #[test]
    fn test_missing_config_file() {
        assert!(AppConfig::load_from("does/not/exist/Config").is_err());
    }
}
