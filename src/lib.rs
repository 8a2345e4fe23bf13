// ==========================================
// 门店补货决策引擎 - 核心库
// ==========================================
// 主流程: 快照 → ABC/XYZ 分类 → 库存阈值 → 建议订货量 → 紧急度排序
// 旁路:   基线 vs 波动感知 方法对比
// 定位:   决策支持（计划员保留最终覆写权）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 快照、参数表、记录
pub mod domain;

// 引擎层 - 纯计算
pub mod engine;

// 统计层 - 外部波动指标
pub mod stats;

// 导入层 - 快照文件
pub mod importer;

// 配置层 - config_kv
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 服务门面
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    AbcClass, BatchResult, ComparisonReport, ParameterTable, ProductReplenishmentRecord,
    RecordFilter, UrgencyTier, VelocitySnapshot, XyzClass,
};

pub use engine::{
    CancellationFlag, ClassifierEngine, ComparativeAnalyzer, CriticalityRanker, EngineError,
    OrderQuantityResolver, ReplenishmentPipeline, StockParameterCalculator,
};

pub use api::{ApiError, ReplenishmentApi};

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
