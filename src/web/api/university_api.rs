use crate::context::UniversityContext;
use crate::web::hoops::cache::{obtain_parsed, CacheUniversities};
use crate::web::hoops::cors::cors;
use salvo::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// 加载状态，不会触发加载
struct ContextStatus {
    context: Arc<UniversityContext>,
}

#[handler]
impl ContextStatus {
    async fn handle(&self, res: &mut Response) {
        let snapshot = self.context.snapshot();
        res.render(Json(json!({
            "ready": self.context.is_ready(),
            "loadedAt": snapshot.map(|p| p.loaded_at()),
        })));
    }
}

#[handler]
async fn list_universities(depot: &mut Depot, res: &mut Response) {
    let Some(parsed) = obtain_parsed(depot) else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };
    res.render(Json(parsed.universities()));
}

#[handler]
async fn universities_by_key(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(parsed) = obtain_parsed(depot) else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };
    let Some(key) = req.param::<String>("key").and_then(|k| k.parse::<i32>().ok()) else {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Text::Plain("分组键必须是整数"));
        return;
    };
    match parsed.group(key) {
        Some(group) => res.render(Json(group)),
        None => {
            res.status_code(StatusCode::NOT_FOUND);
        }
    }
}

#[handler]
async fn list_scraped_data(depot: &mut Depot, res: &mut Response) {
    let Some(parsed) = obtain_parsed(depot) else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };
    res.render(Json(parsed.scraped_data()));
}

pub fn university_router(context: Arc<UniversityContext>, cors_origins: &[String]) -> Router {
    Router::with_path("api")
        .hoop(cors(cors_origins))
        .push(Router::with_path("status").get(ContextStatus {
            context: Arc::clone(&context),
        }))
        .push(
            Router::new()
                .hoop(CacheUniversities::new(context))
                .push(
                    Router::with_path("universities")
                        .get(list_universities)
                        .push(Router::with_path("{key}").get(universities_by_key)),
                )
                .push(Router::with_path("wherestudy").get(list_scraped_data)),
        )
}
