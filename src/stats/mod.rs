// ==========================================
// 门店补货决策引擎 - 波动统计层
// ==========================================
// 职责: 外部统计服务客户端 + 本地近似 + 有界并发批量拉取
// 红线: 降级必须显式（VariabilitySource / degraded 标记）
// ==========================================

pub mod batch_fetcher;
pub mod error;
pub mod http_client;
pub mod local;
pub mod variability_provider_trait;

pub use batch_fetcher::{FetchFailure, FetchOutcome, VariabilityBatchFetcher, DEFAULT_CONCURRENCY_LIMIT};
pub use error::StatsError;
pub use http_client::HttpVariabilityProvider;
pub use local::LocalVariabilityApproximator;
pub use variability_provider_trait::VariabilityProvider;
