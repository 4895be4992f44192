//! # context 模块
//!
//! 院校数据的惰性单例缓存。
//!
//! 第一次调用 [`UniversityContext::get_instance`] 时依次调用表格解析器和录取要求抓取器，
//! 两份结果一起存入同一个 [`ParsedUniversities`] 快照；之后的调用直接返回这个快照，
//! 不再触发任何 I/O。
//!
//! - 初始化由 `tokio::sync::OnceCell` 保护，并发的首次调用只会构建一次；
//! - 任一数据源失败时不保存任何状态，错误原样返回，下一次调用重新构建；
//! - 快照构建完成后只读，进程退出前不会刷新或失效。

use crate::common::error::{ContextError, FetchError};
use crate::excel::{ExcelParser, SpreadsheetParser};
use crate::fetcher::{RequirementsFetcher, WhereStudyFetcher};
use crate::model::{AppConfig, University, UniversityGroups, UniversityTopField};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// 一次成功加载得到的数据快照。
#[derive(Debug)]
pub struct ParsedUniversities {
    universities: UniversityGroups,
    scraped_data: Vec<UniversityTopField>,
    loaded_at: NaiveDateTime,
}

impl ParsedUniversities {
    pub fn universities(&self) -> &UniversityGroups {
        &self.universities
    }

    pub fn scraped_data(&self) -> &[UniversityTopField] {
        &self.scraped_data
    }

    /// 某个分组下的院校，分组不存在时返回 `None`
    pub fn group(&self, key: i32) -> Option<&[University]> {
        self.universities.get(&key).map(Vec::as_slice)
    }

    pub fn loaded_at(&self) -> NaiveDateTime {
        self.loaded_at
    }
}

pub struct UniversityContext {
    parser: Arc<dyn SpreadsheetParser>,
    fetcher: Arc<dyn RequirementsFetcher>,
    parsed: OnceCell<Arc<ParsedUniversities>>,
}

impl UniversityContext {
    pub fn new(parser: Arc<dyn SpreadsheetParser>, fetcher: Arc<dyn RequirementsFetcher>) -> Self {
        Self {
            parser,
            fetcher,
            parsed: OnceCell::new(),
        }
    }

    /// 使用配置中的表格路径和抓取参数创建上下文，此时不会读取任何数据。
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        let parser = ExcelParser::from_config(&config.data);
        let fetcher = WhereStudyFetcher::new(&config.scrape)?;
        Ok(Self::new(Arc::new(parser), Arc::new(fetcher)))
    }

    /// 返回共享的数据快照，必要时先加载。
    ///
    /// 成功后每次返回同一个 `Arc`。加载失败不会被缓存。
    pub async fn get_instance(&self) -> Result<Arc<ParsedUniversities>, ContextError> {
        let parsed = self.parsed.get_or_try_init(|| self.load()).await?;
        Ok(Arc::clone(parsed))
    }

    /// 已加载时返回快照，不会触发加载
    pub fn snapshot(&self) -> Option<Arc<ParsedUniversities>> {
        self.parsed.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.parsed.initialized()
    }

    async fn load(&self) -> Result<Arc<ParsedUniversities>, ContextError> {
        info!("========== [院校数据加载] ==========");
        let start = Instant::now();

        // calamine 读文件是同步 I/O，放到阻塞线程池里执行
        let parser = Arc::clone(&self.parser);
        let universities = tokio::task::spawn_blocking(move || parser.parse())
            .await?
            .inspect_err(|e| {
                error!("❌ 院校表格解析失败：{}", e);
            })?;
        let scraped_data = self.fetcher.fetch_requirements().await.inspect_err(|e| {
            error!("❌ 录取要求抓取失败：{}", e);
        })?;

        info!(
            "✅ 院校数据加载完成：{} 个分组，{} 个专业方向，耗时 {}ms",
            universities.len(),
            scraped_data.len(),
            start.elapsed().as_millis()
        );

        Ok(Arc::new(ParsedUniversities {
            universities,
            scraped_data,
            loaded_at: Local::now().naive_local(),
        }))
    }
}

mod global {
    use super::{ParsedUniversities, UniversityContext};
    use crate::common::error::ContextError;
    use once_cell::sync::OnceCell;
    use std::sync::Arc;

    /// 进程内唯一的院校数据上下文，由程序入口注册
    static GLOBAL_CONTEXT: OnceCell<Arc<UniversityContext>> = OnceCell::new();

    /// 注册全局上下文，只能调用一次
    pub fn install(context: Arc<UniversityContext>) -> anyhow::Result<()> {
        GLOBAL_CONTEXT
            .set(context)
            .map_err(|_| anyhow::anyhow!("University context already installed"))
    }

    pub async fn get_instance() -> Result<Arc<ParsedUniversities>, ContextError> {
        let context = GLOBAL_CONTEXT.get().ok_or(ContextError::NotInstalled)?;
        context.get_instance().await
    }
}

pub use global::{get_instance, install};

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::error::ParseError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 计数的表格解析器，前 `failures` 次调用返回错误
    pub(crate) struct FakeParser {
        pub calls: AtomicUsize,
        failures: usize,
    }

    impl FakeParser {
        pub fn new(failures: usize) -> Self {
            Self { calls: AtomicUsize::new(0), failures }
        }
    }

    impl SpreadsheetParser for FakeParser {
        fn parse(&self) -> Result<UniversityGroups, ParseError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ParseError::EmptySheet);
            }
            Ok(UniversityGroups::from([
                (1, vec![University::new("UniversityA"), University::new("UniversityB")]),
                (2, vec![University::new("UniversityC")]),
            ]))
        }
    }

    /// 计数的抓取器，可设置延迟以制造并发首次访问
    pub(crate) struct FakeFetcher {
        pub calls: AtomicUsize,
        failures: usize,
        delay: Duration,
    }

    impl FakeFetcher {
        pub fn new(failures: usize) -> Self {
            Self { calls: AtomicUsize::new(0), failures, delay: Duration::ZERO }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl RequirementsFetcher for FakeFetcher {
        async fn fetch_requirements(&self) -> Result<Vec<UniversityTopField>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.failures {
                return Err(FetchError::Malformed("temporarily unavailable".to_string()));
            }
            Ok(vec![
                UniversityTopField::new("ReqX", vec!["UniversityA".to_string()]),
                UniversityTopField::new("ReqY", vec!["UniversityC".to_string()]),
            ])
        }
    }

    fn context(parser: &Arc<FakeParser>, fetcher: &Arc<FakeFetcher>) -> UniversityContext {
        UniversityContext::new(parser.clone(), fetcher.clone())
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let parser = Arc::new(FakeParser::new(0));
        let fetcher = Arc::new(FakeFetcher::new(0));
        let ctx = context(&parser, &fetcher);

        for _ in 0..5 {
            let parsed = ctx.get_instance().await.unwrap();

            let groups = parsed.universities();
            assert_eq!(groups.len(), 2);
            let first: Vec<&str> = groups[&1].iter().map(|u| u.name.as_str()).collect();
            assert_eq!(first, vec!["UniversityA", "UniversityB"]);
            assert_eq!(groups[&2][0].name, "UniversityC");

            let fields: Vec<&str> = parsed.scraped_data().iter().map(|f| f.field.as_str()).collect();
            assert_eq!(fields, vec!["ReqX", "ReqY"]);
        }

        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_singleton_identity() {
        let ctx = context(&Arc::new(FakeParser::new(0)), &Arc::new(FakeFetcher::new(0)));

        let first = ctx.get_instance().await.unwrap();
        for _ in 0..10 {
            assert!(Arc::ptr_eq(&first, &ctx.get_instance().await.unwrap()));
        }
        assert!(Arc::ptr_eq(&first, &ctx.snapshot().unwrap()));
    }

    #[tokio::test]
    async fn test_snapshot_does_not_load() {
        let parser = Arc::new(FakeParser::new(0));
        let fetcher = Arc::new(FakeFetcher::new(0));
        let ctx = context(&parser, &fetcher);

        assert!(ctx.snapshot().is_none());
        assert!(!ctx.is_ready());
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);

        ctx.get_instance().await.unwrap();
        assert!(ctx.is_ready());
    }

    #[tokio::test]
    async fn test_parse_failure_is_retried() {
        let parser = Arc::new(FakeParser::new(1));
        let fetcher = Arc::new(FakeFetcher::new(0));
        let ctx = context(&parser, &fetcher);

        let err = ctx.get_instance().await.unwrap_err();
        assert!(matches!(err, ContextError::Parse(ParseError::EmptySheet)));
        assert!(!ctx.is_ready());
        // 解析失败时不会继续抓取
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        let parsed = ctx.get_instance().await.unwrap();
        assert_eq!(parsed.universities().len(), 2);
        assert_eq!(parser.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_retried_from_scratch() {
        let parser = Arc::new(FakeParser::new(0));
        let fetcher = Arc::new(FakeFetcher::new(2));
        let ctx = context(&parser, &fetcher);

        for _ in 0..2 {
            let err = ctx.get_instance().await.unwrap_err();
            assert!(matches!(err, ContextError::Fetch(FetchError::Malformed(_))));
            assert!(ctx.snapshot().is_none());
        }

        let parsed = ctx.get_instance().await.unwrap();
        assert_eq!(parsed.scraped_data().len(), 2);
        // 每次重试都重新解析表格，不保留上一次的部分结果
        assert_eq!(parser.calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access() {
        let parser = Arc::new(FakeParser::new(0));
        let fetcher = Arc::new(FakeFetcher::new(0).with_delay(Duration::from_millis(50)));
        let ctx = Arc::new(context(&parser, &fetcher));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move { ctx.get_instance().await.unwrap() })
            })
            .collect();

        let results: Vec<_> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert!(results.iter().all(|p| Arc::ptr_eq(p, &results[0])));
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    /// 解析时阻塞当前线程的表格解析器
    struct SlowParser(Duration);

    impl SpreadsheetParser for SlowParser {
        fn parse(&self) -> Result<UniversityGroups, ParseError> {
            std::thread::sleep(self.0);
            Ok(UniversityGroups::new())
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_parse_does_not_block_runtime() {
        let ctx = Arc::new(UniversityContext::new(
            Arc::new(SlowParser(Duration::from_millis(500))),
            Arc::new(FakeFetcher::new(0)),
        ));

        // 先启动的计时任务在加载期间应当照常被调度
        let ticker = tokio::spawn(async {
            let start = Instant::now();
            tokio::time::sleep(Duration::from_millis(10)).await;
            start.elapsed()
        });
        let loading = tokio::spawn({
            let ctx = Arc::clone(&ctx);
            async move { ctx.get_instance().await.map(|_| ()) }
        });

        let waited = ticker.await.unwrap();
        loading.await.unwrap().unwrap();
        assert!(waited < Duration::from_millis(200), "ticker waited {waited:?}");
        assert!(ctx.is_ready());
    }

    #[tokio::test]
    async fn test_from_config_is_lazy() {
        let mut config = crate::model::AppConfig::load_from(concat!(env!("CARGO_MANIFEST_DIR"), "/Config")).unwrap();
        config.data.spreadsheet = "data/does-not-exist.xlsx".to_string();

        // 构建上下文本身不读取表格
        let ctx = UniversityContext::from_config(&config).unwrap();
        assert!(!ctx.is_ready());

        let err = ctx.get_instance().await.unwrap_err();
        assert!(matches!(err, ContextError::Parse(ParseError::Open { .. })));
    }

    // 全局上下文只能注册一次，这必须是唯一调用 install 的测试
    #[tokio::test]
    async fn test_global_instance() {
        assert!(matches!(get_instance().await, Err(ContextError::NotInstalled)));

        let ctx = Arc::new(context(&Arc::new(FakeParser::new(0)), &Arc::new(FakeFetcher::new(0))));
        install(Arc::clone(&ctx)).unwrap();
        assert!(install(Arc::clone(&ctx)).is_err());

        let a = get_instance().await.unwrap();
        let b = get_instance().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &ctx.snapshot().unwrap()));
    }
}
