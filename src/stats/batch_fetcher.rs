// ==========================================
// 门店补货决策引擎 - 波动指标批量拉取
// ==========================================
// 职责: 有界并发调用 VariabilityProvider，逐条上报进度
// 并发: futures::stream::buffer_unordered(limit)，默认 10
// 红线: 单商品失败只记录并跳过（由调用方回退本地近似）；
//       服务不可达时整批标记，不发起逐条请求
// ==========================================

use crate::domain::analysis::VariabilityMetrics;
use crate::domain::snapshot::VelocitySnapshot;
use crate::engine::progress::{
    CancellationFlag, OptionalProgressReporter, ProgressEvent, ProgressReporter, ProgressStage,
};
use crate::perf::PerfGuard;
use crate::stats::error::StatsError;
use crate::stats::variability_provider_trait::VariabilityProvider;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 默认并发上限
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;

/// 单商品拉取失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub product_code: String,
    pub message: String,
}

/// 批量拉取结果
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// 成功拉取的指标（按商品代码）
    pub metrics: HashMap<String, VariabilityMetrics>,
    pub failures: Vec<FetchFailure>,
    /// 已完成（成功 + 失败）条数
    pub completed: usize,
    pub total: usize,
    pub cancelled: bool,
    /// 探测失败，整批未发起请求
    pub service_unreachable: bool,
}

impl FetchOutcome {
    /// 是否需要回退（任一商品未拿到外部指标）
    pub fn is_partial(&self) -> bool {
        self.metrics.len() < self.total
    }
}

// ==========================================
// VariabilityBatchFetcher
// ==========================================
pub struct VariabilityBatchFetcher {
    provider: Arc<dyn VariabilityProvider>,
    concurrency_limit: usize,
    progress: OptionalProgressReporter,
}

impl VariabilityBatchFetcher {
    /// # 参数
    /// - concurrency_limit: 同时在途请求上限（0 视为 1）
    pub fn new(provider: Arc<dyn VariabilityProvider>, concurrency_limit: usize) -> Self {
        Self {
            provider,
            concurrency_limit: concurrency_limit.max(1),
            progress: OptionalProgressReporter::none(),
        }
    }

    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = OptionalProgressReporter::with_reporter(reporter);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// 批量拉取
    ///
    /// 流程:
    /// 1) probe 失败 → service_unreachable，直接返回
    /// 2) 有界并发逐条 fetch；取消后未开始的请求不再发出
    /// 3) 每完成一条上报一次进度
    #[instrument(skip_all, fields(count = snapshots.len(), limit = self.concurrency_limit))]
    pub async fn fetch_all(
        &self,
        snapshots: &[VelocitySnapshot],
        cancel: &CancellationFlag,
    ) -> FetchOutcome {
        let total = snapshots.len();
        let mut outcome = FetchOutcome {
            total,
            ..Default::default()
        };
        if total == 0 {
            return outcome;
        }

        if let Err(e) = self.provider.probe().await {
            warn!(error = %e, "统计服务不可达，整批回退本地近似");
            outcome.service_unreachable = true;
            outcome.failures = snapshots
                .iter()
                .map(|s| FetchFailure {
                    product_code: s.product_code.clone(),
                    message: e.to_string(),
                })
                .collect();
            return outcome;
        }

        let mut perf = PerfGuard::new("variability_fetch_all");
        let completed = AtomicUsize::new(0);
        let provider = &self.provider;
        let progress = &self.progress;
        let completed_ref = &completed;

        let results: Vec<(String, Result<VariabilityMetrics, StatsError>)> =
            stream::iter(snapshots.iter())
                .map(|snapshot| async move {
                    let code = snapshot.product_code.clone();
                    if cancel.is_cancelled() {
                        return (code.clone(), Err(StatsError::Cancelled { product_code: code }));
                    }

                    let result = provider.fetch(snapshot).await;
                    let done = completed_ref.fetch_add(1, Ordering::SeqCst) + 1;
                    progress.report(
                        ProgressEvent::new(ProgressStage::VariabilityFetch, done, total)
                            .with_product(code.clone()),
                    );
                    (code, result)
                })
                .buffer_unordered(self.concurrency_limit)
                .collect()
                .await;

        for (code, result) in results {
            match result {
                Ok(metrics) => {
                    outcome.metrics.insert(code, metrics);
                }
                Err(StatsError::Cancelled { .. }) => {
                    outcome.cancelled = true;
                }
                Err(e) => {
                    warn!(product_code = %code, error = %e, "波动指标拉取失败，该商品回退本地近似");
                    outcome.failures.push(FetchFailure {
                        product_code: code,
                        message: e.to_string(),
                    });
                }
            }
        }

        outcome.completed = completed.load(Ordering::SeqCst);
        perf.set_items(outcome.completed);

        info!(
            total,
            fetched = outcome.metrics.len(),
            failed = outcome.failures.len(),
            cancelled = outcome.cancelled,
            "波动指标批量拉取完成"
        );
        outcome
    }
}
