use std::path::PathBuf;
use thiserror::Error;

/// 院校表格无法解析。
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("无法打开表格 {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("无法读取工作表 {sheet}: {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    #[error("表格中没有任何工作表")]
    NoWorksheet,
    #[error("工作表为空")]
    EmptySheet,
    #[error("表头缺少必需的列：{0}")]
    MissingColumn(&'static str),
    #[error("第 {row} 行无效：{reason}")]
    InvalidRow { row: usize, reason: String },
}

/// 录取要求页面无法抓取或解析。
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("无效的选择器 `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
    #[error("页面结构异常：{0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("表格解析任务异常退出：{0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("院校数据上下文尚未注册")]
    NotInstalled,
}
