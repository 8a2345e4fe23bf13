// ==========================================
// 门店补货决策引擎 - 配置层
// ==========================================
// 职责: 参数表与统计服务设置，支持 门店 → global → 内置默认 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config_trait::EngineConfigReader;
