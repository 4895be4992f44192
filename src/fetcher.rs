mod wherestudy;

use crate::common::error::FetchError;
use crate::model::UniversityTopField;
use async_trait::async_trait;

pub use wherestudy::WhereStudyFetcher;

/// 录取要求数据源：返回各专业方向及开设院校。
#[async_trait]
pub trait RequirementsFetcher: Send + Sync {
    async fn fetch_requirements(&self) -> Result<Vec<UniversityTopField>, FetchError>;
}
