// ==========================================
// 门店补货决策引擎 - 领域模型层
// ==========================================
// 职责: 定义快照、参数表、补货记录、对比报告
// 红线: 不含引擎逻辑，不含配置/文件访问
// ==========================================

pub mod analysis;
pub mod params;
pub mod record;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use analysis::{
    ComparisonFailure, ComparisonReport, ComparisonRow, ComparisonSummary, SeasonalityAnalysis,
    TrendAnalysis, VariabilityMetrics,
};
pub use params::{ClassMultipliers, ParameterTable, ParameterViolation, LEAD_TIME_DAYS};
pub use record::{
    BatchResult, Classification, CriticalityScore, OrderSuggestion, PlannerOverride,
    ProductReplenishmentRecord, RecordError, RecordFilter, StockThresholds, ThresholdLevel,
    CRITICALITY_SENTINEL,
};
pub use snapshot::VelocitySnapshot;
pub use types::{
    AbcClass, ComparisonVerdict, OrderDecision, RationaleFactor, SeasonalityPattern,
    TrendDirection, UrgencyTier, VariabilitySource, XyzClass,
};
