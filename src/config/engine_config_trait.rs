// ==========================================
// 门店补货决策引擎 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义引擎/服务层所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::params::ParameterTable;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 用途: 服务层读取门店参数表与统计服务设置
// 实现者: ConfigManager（从 config_kv 表读取）；测试中为内存 Mock
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    // ===== 参数表 =====

    /// 获取门店参数表
    ///
    /// # 参数
    /// - destination_code: 门店代码
    ///
    /// # 返回
    /// - 每个等级按 门店 → global → 内置默认 的顺序取值
    /// - Err: 存储的 JSON 非法（配置错误，调用方应中止该门店批次）
    async fn get_parameter_table(
        &self,
        destination_code: &str,
    ) -> Result<ParameterTable, Box<dyn Error + Send + Sync>>;

    // ===== 外部统计服务 =====

    /// 最大并发请求数
    ///
    /// # 默认值
    /// - 10
    async fn get_stats_concurrency_limit(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 单次请求超时（毫秒）
    ///
    /// # 默认值
    /// - 5000
    async fn get_stats_timeout_ms(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;

    /// 统计服务地址（未配置时对比分析直接使用本地近似）
    async fn get_stats_service_url(&self) -> Result<Option<String>, Box<dyn Error + Send + Sync>>;

    // ===== 对比分析 =====

    /// 收敛容差（箱）
    ///
    /// # 默认值
    /// - 2
    async fn get_comparison_tolerance_cases(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;
}
