use crate::context::{ParsedUniversities, UniversityContext};
use salvo::prelude::*;
use std::sync::Arc;
use tracing::warn;

/// 在数据接口之前取得院校数据快照并放入 `Depot`。
///
/// 首次请求会触发加载；加载失败时返回 503 并终止后续处理，下一次请求重新加载。
pub struct CacheUniversities {
    context: Arc<UniversityContext>,
}

impl CacheUniversities {
    pub fn new(context: Arc<UniversityContext>) -> Self {
        Self { context }
    }
}

#[handler]
impl CacheUniversities {
    async fn handle(&self, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        match self.context.get_instance().await {
            Ok(parsed) => {
                depot.inject(parsed);
            }
            Err(e) => {
                warn!("院校数据暂不可用：{}", e);
                res.status_code(StatusCode::SERVICE_UNAVAILABLE);
                res.render(Text::Plain(e.to_string()));
                ctrl.skip_rest();
            }
        }
    }
}

/// 取出 [`CacheUniversities`] 放入的快照
pub fn obtain_parsed(depot: &Depot) -> Option<Arc<ParsedUniversities>> {
    depot.obtain::<Arc<ParsedUniversities>>().ok().cloned()
}
