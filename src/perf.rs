// ==========================================
// 门店补货决策引擎 - 性能统计
// ==========================================
// 职责: 批次级操作耗时 + 处理条数日志（target = "perf"）
// 开关: REPLENISH_ENGINE_SLOW_OP_MS 配置慢操作阈值（毫秒）
// ==========================================

use std::sync::OnceLock;
use std::time::Instant;

/// 慢操作阈值缓存（0 表示不告警）
static SLOW_OP_THRESHOLD_MS: OnceLock<u64> = OnceLock::new();

fn slow_op_threshold_ms() -> u64 {
    *SLOW_OP_THRESHOLD_MS.get_or_init(|| {
        std::env::var("REPLENISH_ENGINE_SLOW_OP_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if cfg!(debug_assertions) { 500 } else { 2_000 })
    })
}

/// 性能统计 Guard：drop 时记录 elapsed_ms + items
///
/// 使用方式：
/// ```ignore
/// let mut perf = replenish_engine::perf::PerfGuard::new("run_batch");
/// // do work...
/// perf.set_items(records.len());
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    items: usize,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            items: 0,
        }
    }

    /// 记录本次处理条数
    pub fn set_items(&mut self, items: usize) {
        self.items = items;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        let threshold = slow_op_threshold_ms();

        if threshold > 0 && elapsed_ms >= threshold {
            tracing::warn!(
                target: "perf",
                op = self.op,
                elapsed_ms,
                items = self.items,
                threshold_ms = threshold,
                "slow op"
            );
        } else {
            tracing::info!(
                target: "perf",
                op = self.op,
                elapsed_ms,
                items = self.items,
                "done"
            );
        }
    }
}
