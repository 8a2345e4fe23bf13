// ==========================================
// 门店补货决策引擎 - 波动指标提供者 Trait
// ==========================================
// 职责: 定义单商品波动指标获取接口（不包含实现）
// 实现者: HttpVariabilityProvider（外部统计服务）
//         LocalVariabilityApproximator（本地 5日/20日 近似）
// ==========================================

use crate::domain::analysis::VariabilityMetrics;
use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::VariabilitySource;
use crate::stats::error::StatsError;
use async_trait::async_trait;

// ==========================================
// VariabilityProvider Trait
// ==========================================
#[async_trait]
pub trait VariabilityProvider: Send + Sync {
    /// 数据来源标识
    fn source(&self) -> VariabilitySource;

    /// 服务可用性探测（批次开始前调用一次）
    ///
    /// # 返回
    /// - Ok(()): 可用
    /// - Err(Unavailable): 整批回退本地近似
    async fn probe(&self) -> Result<(), StatsError> {
        Ok(())
    }

    /// 获取单商品波动指标
    ///
    /// # 参数
    /// - snapshot: 商品快照（提供商品、门店、日期与销量窗口）
    async fn fetch(&self, snapshot: &VelocitySnapshot) -> Result<VariabilityMetrics, StatsError>;
}
