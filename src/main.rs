mod common;
mod context;
mod excel;
mod fetcher;
mod model;
mod web;

use crate::common::log::init_logging;
use crate::context::UniversityContext;
use crate::model::APP_CONFIG;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 必须是程序第一个调用！
    init_logging(&APP_CONFIG.log)?;

    let context = Arc::new(UniversityContext::from_config(&APP_CONFIG)?);
    context::install(Arc::clone(&context))?;

    if APP_CONFIG.data.preload {
        info!("========== [启动预加载] ==========");
        // 预加载失败不影响启动，第一次请求时会重新加载
        if let Err(e) = context::get_instance().await {
            warn!("预加载失败：{}", e);
        }
    }

    web::serve(&APP_CONFIG.server, context).await;
    Ok(())
}
