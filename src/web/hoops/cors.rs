use salvo::cors::{AllowOrigin, Cors, CorsHandler};
use salvo::http::{HeaderValue, Method};
use tracing::warn;

/// 按配置放行前端来源，`"*"` 表示任意来源；列表为空时不返回任何 CORS 头。
pub fn cors(origins: &[String]) -> CorsHandler {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| warn!("忽略无效的跨域来源：{}", origin))
                .ok()
        }))
    };

    Cors::new()
        .allow_origin(allow_origin)
        .allow_methods(vec![Method::GET, Method::OPTIONS])
        .into_handler()
}
