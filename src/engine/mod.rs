// ==========================================
// 门店补货决策引擎 - 引擎层
// ==========================================
// 主流程: 分类 → 库存参数 → 订货量 → 紧急度排序
// 旁路:   基线 vs 波动感知 方法对比（只读）
// ==========================================
// 职责: 纯计算，不做 IO
// 红线: 所有判定必须输出 reason，降级必须显式标记
// ==========================================

pub mod classifier;
pub mod comparative;
pub mod criticality;
pub mod error;
pub mod order_resolver;
pub mod pipeline;
pub mod progress;
pub mod stock_params;
pub mod validator;

// 重导出核心引擎
pub use classifier::ClassifierEngine;
pub use comparative::ComparativeAnalyzer;
pub use criticality::CriticalityRanker;
pub use error::EngineError;
pub use order_resolver::OrderQuantityResolver;
pub use pipeline::ReplenishmentPipeline;
pub use progress::{
    CancellationFlag, NoOpProgressReporter, OptionalProgressReporter, ProgressEvent,
    ProgressReporter, ProgressStage,
};
pub use stock_params::{StockParameterCalculator, ThresholdMethod};
pub use validator::validate_snapshot;
