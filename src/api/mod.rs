// ==========================================
// 门店补货决策引擎 - API 层
// ==========================================
// 职责: 对外服务门面（配置读取 + 引擎调用 + 导入）
// ==========================================

pub mod error;
pub mod replenishment_api;

pub use error::{ApiError, ApiResult};
pub use replenishment_api::{ComparisonRun, ImportedBatch, ReplenishmentApi};
