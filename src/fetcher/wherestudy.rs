use crate::common::error::FetchError;
use crate::common::utils::{collapse_whitespace, dedup_names, first_number};
use crate::fetcher::RequirementsFetcher;
use crate::model::{ScrapeConfig, SelectorConfig, UniversityTopField};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

/// 预编译的页面选择器。
#[derive(Debug, Clone)]
pub struct Selectors {
    field: Selector,
    field_name: Selector,
    university: Selector,
    points: Selector,
}

impl Selectors {
    pub fn compile(config: &SelectorConfig) -> Result<Self, FetchError> {
        Ok(Self {
            field: compile(&config.field)?,
            field_name: compile(&config.field_name)?,
            university: compile(&config.university)?,
            points: compile(&config.points)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|e| FetchError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// 从录取要求网站抓取各专业方向的开设院校与分数线。
///
/// 配置中的每个页面并发请求，结果按配置顺序拼接。
/// 每个页面的结构示例：
///
/// ```html
/// <section class="field">
///   <h2>Medicine</h2>
///   <span class="points">Pisteraja 142,5</span>
///   <ul>
///     <li class="university">University of Helsinki</li>
///     <li class="university">University of Oulu</li>
///   </ul>
/// </section>
/// ```
#[derive(Debug, Clone)]
pub struct WhereStudyFetcher {
    client: Client,
    base_url: String,
    pages: Vec<String>,
    selectors: Selectors,
}

impl WhereStudyFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            pages: config.pages.clone(),
            selectors: Selectors::compile(&config.selectors)?,
        })
    }

    fn page_urls(&self) -> Vec<String> {
        if self.pages.is_empty() {
            return vec![self.base_url.clone()];
        }
        self.pages
            .iter()
            .map(|page| {
                if page.starts_with("http://") || page.starts_with("https://") {
                    page.clone()
                } else {
                    format!(
                        "{}/{}",
                        self.base_url.trim_end_matches('/'),
                        page.trim_start_matches('/')
                    )
                }
            })
            .collect()
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        debug!("请求录取要求页面：{}", url);
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }
}

#[async_trait]
impl RequirementsFetcher for WhereStudyFetcher {
    async fn fetch_requirements(&self) -> Result<Vec<UniversityTopField>, FetchError> {
        let urls = self.page_urls();
        info!("🛰️ 开始抓取录取要求，共 {} 个页面", urls.len());

        let pages = try_join_all(urls.iter().map(|url| self.fetch_page(url))).await?;

        let mut fields = Vec::new();
        for (url, html) in urls.iter().zip(pages) {
            let parsed = parse_requirements(&html, &self.selectors)?;
            info!("{} - 解析到 {} 个专业方向", url, parsed.len());
            fields.extend(parsed);
        }
        Ok(fields)
    }
}

/// 解析单个页面。页面中没有任何专业块，或某个块没有名称，都视为页面结构异常。
pub fn parse_requirements(
    html: &str,
    selectors: &Selectors,
) -> Result<Vec<UniversityTopField>, FetchError> {
    let document = Html::parse_document(html);

    let fields = document
        .select(&selectors.field)
        .enumerate()
        .map(|(i, block)| parse_field(i, block, selectors))
        .collect::<Result<Vec<_>, _>>()?;

    if fields.is_empty() {
        return Err(FetchError::Malformed("页面中没有找到任何专业".to_string()));
    }
    Ok(fields)
}

fn parse_field(
    index: usize,
    block: ElementRef<'_>,
    selectors: &Selectors,
) -> Result<UniversityTopField, FetchError> {
    let field = block
        .select(&selectors.field_name)
        .next()
        .map(element_text)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| FetchError::Malformed(format!("第 {} 个专业缺少名称", index + 1)))?;

    let universities = dedup_names(block.select(&selectors.university).map(element_text));
    let min_points = block
        .select(&selectors.points)
        .next()
        .and_then(|points| first_number(&element_text(points)));

    Ok(UniversityTopField {
        field,
        universities,
        min_points,
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}
