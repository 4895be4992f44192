mod api;
mod hoops;

use crate::context::UniversityContext;
use crate::model::ServerConfig;
use salvo::prelude::*;
use std::sync::Arc;
use tracing::info;

pub fn router(context: Arc<UniversityContext>, cors_origins: &[String]) -> Router {
    Router::new().push(api::university_router(context, cors_origins))
}

pub async fn serve(config: &ServerConfig, context: Arc<UniversityContext>) {
    let acceptor = TcpListener::new(config.listen.clone()).bind().await;
    info!("🚀 HTTP 服务已启动：{}", config.listen);
    Server::new(acceptor)
        .serve(router(context, &config.cors_origins))
        .await;
}
