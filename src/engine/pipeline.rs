// ==========================================
// 门店补货决策引擎 - 主流程编排
// ==========================================
// 用途: 协调 分类 → 阈值 → 订货量 → 紧急度 的执行顺序
// 输入: 一个门店的快照批次 + 门店参数表
// 输出: BatchResult（按紧急度排序的记录 + 单条错误）
// 红线: 参数表非法整批中止；单条非法记录隔离，不影响其他商品
// ==========================================

use crate::domain::analysis::VariabilityMetrics;
use crate::domain::params::ParameterTable;
use crate::domain::record::{BatchResult, ProductReplenishmentRecord, RecordError};
use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::UrgencyTier;
use crate::engine::classifier::ClassifierEngine;
use crate::engine::criticality::CriticalityRanker;
use crate::engine::error::EngineError;
use crate::engine::order_resolver::OrderQuantityResolver;
use crate::engine::progress::{
    CancellationFlag, OptionalProgressReporter, ProgressEvent, ProgressReporter, ProgressStage,
};
use crate::engine::stock_params::StockParameterCalculator;
use crate::engine::validator::validate_snapshot;
use crate::perf::PerfGuard;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ReplenishmentPipeline - 主流程编排器
// ==========================================
pub struct ReplenishmentPipeline {
    classifier: ClassifierEngine,
    calculator: StockParameterCalculator,
    resolver: OrderQuantityResolver,
    ranker: CriticalityRanker,
    progress: OptionalProgressReporter,
}

impl ReplenishmentPipeline {
    pub fn new() -> Self {
        Self {
            classifier: ClassifierEngine::new(),
            calculator: StockParameterCalculator::new(),
            resolver: OrderQuantityResolver::new(),
            ranker: CriticalityRanker::new(),
            progress: OptionalProgressReporter::none(),
        }
    }

    /// 挂载进度上报者
    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = OptionalProgressReporter::with_reporter(reporter);
        self
    }

    // ==========================================
    // 批次计算
    // ==========================================

    /// 计算一个门店的补货批次
    ///
    /// # 参数
    /// - destination_code: 门店代码（快照门店不一致的记录被拒绝）
    /// - snapshots: 当日快照
    /// - table: 门店参数表
    /// - metrics: 可选外部波动指标（仅影响 XYZ 分类）
    /// - cancel: 取消标志，在逐商品处理之间检查
    ///
    /// # 返回
    /// - Ok(BatchResult): 记录按紧急度升序稳定排序
    /// - Err(Configuration): 参数表非法
    /// - Err(Cancelled): 批次被取消
    #[instrument(skip_all, fields(destination = %destination_code, count = snapshots.len()))]
    pub fn run_batch(
        &self,
        destination_code: &str,
        snapshots: &[VelocitySnapshot],
        table: &ParameterTable,
        metrics: &HashMap<String, VariabilityMetrics>,
        cancel: &CancellationFlag,
    ) -> Result<BatchResult, EngineError> {
        Self::check_table(destination_code, table)?;

        let mut perf = PerfGuard::new("run_batch");
        let total = snapshots.len();
        let mut records = Vec::with_capacity(total);
        let mut errors = Vec::new();
        let mut seen: HashSet<&str> = HashSet::with_capacity(total);

        info!(
            destination = %destination_code,
            total,
            scope = %table.scope,
            "开始计算补货批次"
        );

        for (idx, snapshot) in snapshots.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(destination = %destination_code, completed = idx, total, "补货批次已取消");
                return Err(EngineError::Cancelled {
                    completed: idx,
                    total,
                });
            }

            let result = if snapshot.destination_code != destination_code {
                Err(EngineError::invalid_input(
                    &snapshot.product_code,
                    "destination_code",
                    format!(
                        "快照门店 {} 与批次门店 {} 不一致",
                        snapshot.destination_code, destination_code
                    ),
                ))
            } else if seen.contains(snapshot.product_code.as_str()) {
                Err(EngineError::invalid_input(
                    &snapshot.product_code,
                    "product_code",
                    "批次内商品代码重复",
                ))
            } else {
                self.process_one(snapshot, table, metrics.get(&snapshot.product_code))
            };

            // 仅成功计算的记录占用商品代码
            match result {
                Ok(record) => {
                    seen.insert(snapshot.product_code.as_str());
                    records.push(record);
                }
                Err(e) => {
                    warn!(product_code = %snapshot.product_code, error = %e, "记录被拒绝");
                    errors.push(RecordError {
                        product_code: snapshot.product_code.clone(),
                        destination_code: destination_code.to_string(),
                        message: e.to_string(),
                    });
                }
            }

            self.progress.report(
                ProgressEvent::new(ProgressStage::Replenishment, idx + 1, total)
                    .with_product(snapshot.product_code.clone()),
            );
        }

        self.ranker.rank(&mut records);
        perf.set_items(records.len());

        let result = BatchResult {
            batch_id: Uuid::new_v4().to_string(),
            destination_code: destination_code.to_string(),
            computed_at: Utc::now(),
            records,
            errors,
        };

        let tiers = self.ranker.tier_counts(&result.records);
        let tier_count = |tier: UrgencyTier| tiers.get(&tier).copied().unwrap_or(0);
        info!(
            batch_id = %result.batch_id,
            records = result.records.len(),
            errors = result.errors.len(),
            orders = result.order_count(),
            clamped = result.clamped_count(),
            total_cases = result.total_suggested_cases(),
            critical = tier_count(UrgencyTier::Critical),
            urgent = tier_count(UrgencyTier::Urgent),
            optimal = tier_count(UrgencyTier::Optimal),
            excess = tier_count(UrgencyTier::Excess),
            "补货批次计算完成"
        );

        Ok(result)
    }

    /// 处理单条快照
    ///
    /// 顺序: 校验 → 分类 → 基线阈值 → 订货量 → 紧急度
    pub fn process_one(
        &self,
        snapshot: &VelocitySnapshot,
        table: &ParameterTable,
        metrics: Option<&VariabilityMetrics>,
    ) -> Result<ProductReplenishmentRecord, EngineError> {
        validate_snapshot(snapshot)?;

        let classification = self.classifier.classify(snapshot, metrics);
        let thresholds = self.calculator.baseline(&classification, table);
        let suggestion = self.resolver.resolve(snapshot, &classification, &thresholds);
        let criticality = self.ranker.score(&classification, &thresholds, &suggestion);

        debug!(
            product_code = %snapshot.product_code,
            class = %classification.combined(),
            decision = %suggestion.decision,
            cases = suggestion.suggested_cases,
            criticality = criticality.score,
            "记录计算完成"
        );

        Ok(ProductReplenishmentRecord {
            snapshot: snapshot.clone(),
            classification,
            thresholds,
            suggestion,
            criticality,
            overrides: Default::default(),
        })
    }

    // ==========================================
    // 刷新（保留计划员覆写）
    // ==========================================

    /// 用新快照重算单条记录，覆写字段原样保留
    pub fn refresh_record(
        &self,
        previous: &ProductReplenishmentRecord,
        snapshot: &VelocitySnapshot,
        table: &ParameterTable,
        metrics: Option<&VariabilityMetrics>,
    ) -> Result<ProductReplenishmentRecord, EngineError> {
        if snapshot.product_code != previous.snapshot.product_code {
            return Err(EngineError::invalid_input(
                &snapshot.product_code,
                "product_code",
                format!("刷新快照与原记录 {} 不一致", previous.snapshot.product_code),
            ));
        }

        let mut record = self.process_one(snapshot, table, metrics)?;
        record.overrides = previous.overrides.clone();
        Ok(record)
    }

    /// 整批刷新: 按商品代码回填上一批次的覆写
    #[instrument(skip_all, fields(destination = %previous.destination_code, count = snapshots.len()))]
    pub fn refresh_batch(
        &self,
        previous: &BatchResult,
        snapshots: &[VelocitySnapshot],
        table: &ParameterTable,
        metrics: &HashMap<String, VariabilityMetrics>,
        cancel: &CancellationFlag,
    ) -> Result<BatchResult, EngineError> {
        let mut result =
            self.run_batch(&previous.destination_code, snapshots, table, metrics, cancel)?;

        let overrides: HashMap<&str, _> = previous
            .records
            .iter()
            .map(|r| (r.product_code(), &r.overrides))
            .collect();

        let mut carried = 0usize;
        for record in result.records.iter_mut() {
            if let Some(o) = overrides.get(record.snapshot.product_code.as_str()) {
                record.overrides = (*o).clone();
                carried += 1;
            }
        }

        info!(
            previous_batch = %previous.batch_id,
            batch_id = %result.batch_id,
            carried,
            "刷新完成，已保留计划员覆写"
        );
        Ok(result)
    }

    fn check_table(destination_code: &str, table: &ParameterTable) -> Result<(), EngineError> {
        let violations = table.validate();
        if violations.is_empty() {
            return Ok(());
        }
        tracing::error!(
            destination = %destination_code,
            scope = %table.scope,
            violations = violations.len(),
            "参数表非法，批次中止"
        );
        Err(EngineError::Configuration {
            destination_code: destination_code.to_string(),
            violations,
        })
    }
}

impl Default for ReplenishmentPipeline {
    fn default() -> Self {
        Self::new()
    }
}
