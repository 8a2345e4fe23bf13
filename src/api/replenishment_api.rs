// ==========================================
// 门店补货决策引擎 - 补货 API
// ==========================================
// 职责: 读取门店配置 → 调用引擎 → 返回批次/对比报告
// 操作: 计算、导入并计算、方法对比、解释、筛选、刷新、计划员覆写
// 红线: 配置错误中止该门店批次；降级模式必须显式返回
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::EngineConfigReader;
use crate::domain::analysis::ComparisonReport;
use crate::domain::record::{BatchResult, ProductReplenishmentRecord, RecordFilter};
use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::UrgencyTier;
use crate::engine::comparative::ComparativeAnalyzer;
use crate::engine::error::EngineError;
use crate::engine::pipeline::ReplenishmentPipeline;
use crate::engine::progress::{CancellationFlag, ProgressReporter};
use crate::engine::stock_params::{StockParameterCalculator, ThresholdMethod};
use crate::i18n::t;
use crate::importer::snapshot_importer::{ImportDefaults, RowError, SnapshotImporter};
use crate::stats::batch_fetcher::{FetchFailure, VariabilityBatchFetcher};
use crate::stats::http_client::HttpVariabilityProvider;
use crate::stats::variability_provider_trait::VariabilityProvider;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// 返回结构
// ==========================================

/// 导入并计算的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedBatch {
    pub batch: BatchResult,
    /// 文件行级错误（未进入引擎）
    pub import_errors: Vec<RowError>,
    pub total_rows: usize,
}

/// 方法对比结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRun {
    pub report: ComparisonReport,
    /// 是否配置了外部统计服务
    pub external_configured: bool,
    /// 外部服务探测失败，整批使用本地近似
    pub service_unreachable: bool,
    pub fetch_failures: Vec<FetchFailure>,
}

// ==========================================
// ReplenishmentApi - 补货 API
// ==========================================
pub struct ReplenishmentApi<C: EngineConfigReader> {
    config: Arc<C>,
    progress: Option<Arc<dyn ProgressReporter>>,
    /// 显式指定的波动指标来源（优先于配置的服务地址）
    provider: Option<Arc<dyn VariabilityProvider>>,
}

impl<C: EngineConfigReader> ReplenishmentApi<C> {
    pub fn new(config: Arc<C>) -> Self {
        Self {
            config,
            progress: None,
            provider: None,
        }
    }

    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(reporter);
        self
    }

    pub fn with_variability_provider(mut self, provider: Arc<dyn VariabilityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    fn pipeline(&self) -> ReplenishmentPipeline {
        match &self.progress {
            Some(reporter) => ReplenishmentPipeline::new().with_progress(reporter.clone()),
            None => ReplenishmentPipeline::new(),
        }
    }

    // ==========================================
    // 主流程
    // ==========================================

    /// 计算一个门店的补货批次
    ///
    /// # 返回
    /// - Ok(BatchResult): 记录按紧急度排序，单条错误在 errors 中
    /// - Err(Config / Engine::Configuration): 参数表读取失败或非法
    /// - Err(Engine::Cancelled): 批次被取消
    #[instrument(skip(self, snapshots, cancel), fields(count = snapshots.len()))]
    pub async fn compute_destination(
        &self,
        destination_code: &str,
        snapshots: &[VelocitySnapshot],
        cancel: &CancellationFlag,
    ) -> ApiResult<BatchResult> {
        if destination_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("门店代码不能为空".to_string()));
        }

        let table = self.config.get_parameter_table(destination_code).await?;
        let batch =
            self.pipeline()
                .run_batch(destination_code, snapshots, &table, &HashMap::new(), cancel)?;

        info!(
            destination = %destination_code,
            batch_id = %batch.batch_id,
            records = batch.records.len(),
            errors = batch.errors.len(),
            orders = batch.order_count(),
            "门店补货批次计算完成"
        );
        Ok(batch)
    }

    /// 导入快照文件并计算
    ///
    /// # 参数
    /// - destination_code: 门店代码，同时作为文件缺少门店列时的默认值
    /// - snapshot_date: 文件缺少日期列时的默认值
    #[instrument(skip(self, file_path, cancel), fields(path = %file_path.as_ref().display()))]
    pub async fn import_and_compute<P: AsRef<Path>>(
        &self,
        file_path: P,
        destination_code: &str,
        snapshot_date: Option<NaiveDate>,
        cancel: &CancellationFlag,
    ) -> ApiResult<ImportedBatch> {
        let path = file_path.as_ref().to_path_buf();
        let defaults = ImportDefaults {
            destination_code: Some(destination_code.to_string()),
            snapshot_date,
        };

        // 文件解析为阻塞 IO
        let imported = tokio::task::spawn_blocking(move || {
            SnapshotImporter::with_defaults(defaults).import_file(&path)
        })
        .await
        .map_err(|e| ApiError::Other(anyhow::anyhow!("导入任务异常终止: {}", e)))??;

        if !imported.errors.is_empty() {
            warn!(
                errors = imported.errors.len(),
                total_rows = imported.total_rows,
                "部分快照行导入失败"
            );
        }

        let batch = self
            .compute_destination(destination_code, &imported.snapshots, cancel)
            .await?;

        Ok(ImportedBatch {
            batch,
            import_errors: imported.errors,
            total_rows: imported.total_rows,
        })
    }

    /// 刷新批次（新快照重算，保留计划员覆写）
    #[instrument(skip_all, fields(batch_id = %previous.batch_id, count = snapshots.len()))]
    pub async fn refresh(
        &self,
        previous: &BatchResult,
        snapshots: &[VelocitySnapshot],
        cancel: &CancellationFlag,
    ) -> ApiResult<BatchResult> {
        let table = self
            .config
            .get_parameter_table(&previous.destination_code)
            .await?;
        Ok(self
            .pipeline()
            .refresh_batch(previous, snapshots, &table, &HashMap::new(), cancel)?)
    }

    // ==========================================
    // 方法对比
    // ==========================================

    /// 基线 vs 波动感知 对比
    ///
    /// 流程:
    /// 1) 读取参数表与收敛容差
    /// 2) 有外部服务时有界并发拉取指标，失败部分回退本地近似
    /// 3) 生成只读对比报告（degraded 标记是否存在近似）
    #[instrument(skip(self, snapshots, cancel), fields(count = snapshots.len()))]
    pub async fn run_comparison(
        &self,
        destination_code: &str,
        snapshots: &[VelocitySnapshot],
        cancel: &CancellationFlag,
    ) -> ApiResult<ComparisonRun> {
        let table = self.config.get_parameter_table(destination_code).await?;
        let tolerance = self.config.get_comparison_tolerance_cases().await?;

        let mut run_external = HashMap::new();
        let mut service_unreachable = false;
        let mut fetch_failures = Vec::new();

        let provider = self.resolve_provider().await?;
        let external_configured = provider.is_some();

        if let Some(provider) = provider {
            let limit = self.config.get_stats_concurrency_limit().await?;
            let mut fetcher = VariabilityBatchFetcher::new(provider, limit);
            if let Some(reporter) = &self.progress {
                fetcher = fetcher.with_progress(reporter.clone());
            }

            let outcome = fetcher.fetch_all(snapshots, cancel).await;
            if outcome.cancelled {
                return Err(EngineError::Cancelled {
                    completed: outcome.completed,
                    total: outcome.total,
                }
                .into());
            }
            service_unreachable = outcome.service_unreachable;
            fetch_failures = outcome.failures;
            run_external = outcome.metrics;
        } else {
            warn!(destination = %destination_code, "未配置统计服务，对比分析使用本地近似");
        }

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled {
                completed: 0,
                total: snapshots.len(),
            }
            .into());
        }

        let report = ComparativeAnalyzer::with_tolerance(tolerance).analyze(
            destination_code,
            snapshots,
            &table,
            &run_external,
        )?;

        Ok(ComparisonRun {
            report,
            external_configured,
            service_unreachable,
            fetch_failures,
        })
    }

    async fn resolve_provider(&self) -> ApiResult<Option<Arc<dyn VariabilityProvider>>> {
        if let Some(provider) = &self.provider {
            return Ok(Some(provider.clone()));
        }

        match self.config.get_stats_service_url().await? {
            Some(url) => {
                let timeout_ms = self.config.get_stats_timeout_ms().await?;
                let client = HttpVariabilityProvider::new(&url, timeout_ms)?;
                Ok(Some(Arc::new(client)))
            }
            None => Ok(None),
        }
    }

    // ==========================================
    // 查询与覆写
    // ==========================================

    /// 解释单条记录的所有数字（JSON）
    ///
    /// 组成: 订货判定原因 + 阈值推导 + 紧急度 + 计划员覆写
    pub fn explain(&self, record: &ProductReplenishmentRecord) -> String {
        let decision = serde_json::from_str::<Value>(&record.suggestion.reason)
            .unwrap_or_else(|_| Value::String(record.suggestion.reason.clone()));
        let thresholds = StockParameterCalculator::new().explain_thresholds(
            &record.classification,
            &record.thresholds,
            ThresholdMethod::Baseline,
            record.snapshot.units_per_case,
        );
        let thresholds = serde_json::from_str::<Value>(&thresholds).unwrap_or(Value::Null);

        json!({
            "product_code": record.snapshot.product_code,
            "destination_code": record.snapshot.destination_code,
            "combined_class": record.classification.combined(),
            "decision": decision,
            "thresholds": thresholds,
            "criticality": {
                "tier": record.criticality.tier,
                "tier_label": record.criticality.tier.map(tier_label),
                "abc_weight": record.criticality.abc_weight,
                "score": record.criticality.score,
            },
            "suggested_cases": record.suggestion.suggested_cases,
            "effective_order_cases": record.effective_order_cases(),
            "overridden": record.is_overridden(),
            "overrides": record.overrides,
        })
        .to_string()
    }

    /// 按条件筛选（保持紧急度顺序）
    pub fn filter<'a>(
        &self,
        batch: &'a BatchResult,
        filter: &RecordFilter,
    ) -> Vec<&'a ProductReplenishmentRecord> {
        filter.apply(&batch.records)
    }

    /// 计划员覆写订货量（None 恢复建议值）
    pub fn override_quantity(
        &self,
        batch: &mut BatchResult,
        product_code: &str,
        cases: Option<u32>,
    ) -> ApiResult<()> {
        self.record_mut(batch, product_code)?
            .set_override_quantity(cases);
        Ok(())
    }

    /// 计划员设置是否纳入订单
    pub fn set_included(
        &self,
        batch: &mut BatchResult,
        product_code: &str,
        included: bool,
    ) -> ApiResult<()> {
        self.record_mut(batch, product_code)?.set_included(included);
        Ok(())
    }

    /// 计划员备注
    pub fn set_note(
        &self,
        batch: &mut BatchResult,
        product_code: &str,
        note: Option<String>,
    ) -> ApiResult<()> {
        self.record_mut(batch, product_code)?.set_note(note);
        Ok(())
    }

    fn record_mut<'a>(
        &self,
        batch: &'a mut BatchResult,
        product_code: &str,
    ) -> ApiResult<&'a mut ProductReplenishmentRecord> {
        let batch_id = batch.batch_id.clone();
        batch.find_mut(product_code).ok_or_else(|| {
            ApiError::NotFound(format!("商品 {} 不在批次 {} 中", product_code, batch_id))
        })
    }
}

fn tier_label(tier: UrgencyTier) -> String {
    match tier {
        UrgencyTier::Critical => t("replenishment.tier.critical"),
        UrgencyTier::Urgent => t("replenishment.tier.urgent"),
        UrgencyTier::Optimal => t("replenishment.tier.optimal"),
        UrgencyTier::Excess => t("replenishment.tier.excess"),
    }
}
