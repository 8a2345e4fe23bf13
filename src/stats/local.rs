// ==========================================
// 门店补货决策引擎 - 本地波动近似
// ==========================================
// 职责: 外部统计服务不可用时的降级来源
// 近似: σ ≈ |v5 - v20|，CV ≈ σ / v20，趋势与季节性取自分类引擎
// ==========================================

use crate::domain::analysis::VariabilityMetrics;
use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::VariabilitySource;
use crate::engine::classifier::ClassifierEngine;
use crate::stats::error::StatsError;
use crate::stats::variability_provider_trait::VariabilityProvider;
use async_trait::async_trait;

#[derive(Default)]
pub struct LocalVariabilityApproximator {
    classifier: ClassifierEngine,
}

impl LocalVariabilityApproximator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同步计算（不会失败）
    pub fn approximate(&self, snapshot: &VelocitySnapshot) -> VariabilityMetrics {
        self.classifier.local_metrics(snapshot)
    }
}

#[async_trait]
impl VariabilityProvider for LocalVariabilityApproximator {
    fn source(&self) -> VariabilitySource {
        VariabilitySource::LocalApproximation
    }

    async fn fetch(&self, snapshot: &VelocitySnapshot) -> Result<VariabilityMetrics, StatsError> {
        Ok(self.approximate(snapshot))
    }
}
