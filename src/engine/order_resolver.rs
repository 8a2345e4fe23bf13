// ==========================================
// 门店补货决策引擎 - 订货量决策器
// ==========================================
// 职责: HOLD / ORDER 判定 + 补到最大库存 + 上游可用量截断
// 输入: 快照 + 分类 + 阈值（基线或波动感知）
// 输出: OrderSuggestion（含 reason JSON）
// 红线: 建议量 ≥ 0 且不超过上游可用量；无销量永不自动订货
// ==========================================

use crate::domain::record::{Classification, OrderSuggestion, StockThresholds};
use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::OrderDecision;
use serde_json::json;

// ==========================================
// OrderQuantityResolver - 订货量决策器
// ==========================================
pub struct OrderQuantityResolver {
    // 无状态引擎,不需要注入依赖
}

impl OrderQuantityResolver {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 判定订货建议
    ///
    /// 状态机:
    /// 1) 分类为 "-" 或阈值销量为 0 → HOLD，数量 0
    /// 2) stock_days = (门店 + 在途) / 日销量
    /// 3) stock_days ≤ reorder_days → ORDER，否则 HOLD
    ///
    /// ORDER 时:
    /// - target_units = maximum_units - (门店 + 在途)
    /// - final_units  = clamp(target_units, 0, upstream)
    /// - cases        = round(final_units / units_per_case)，且不超过上游整箱数
    /// - 目标量或取整后箱数超过上游 → clamped_by_upstream
    pub fn resolve(
        &self,
        snapshot: &VelocitySnapshot,
        classification: &Classification,
        thresholds: &StockThresholds,
    ) -> OrderSuggestion {
        let upc = snapshot.units_per_case;
        let on_hand = snapshot.stock_on_hand();

        // 规则1: 无销量 → 永不自动订货
        let Some(stock_days) = self.stock_days(snapshot, classification, thresholds) else {
            let reason = json!({
                "decision": OrderDecision::Hold,
                "primary_reason": "NO_VELOCITY",
                "details": {
                    "abc_class": classification.abc_class,
                    "stock_on_hand_units": on_hand,
                }
            });
            return Self::hold(None, reason.to_string());
        };

        // 规则2: 高于订货点 → HOLD
        let reorder_days = thresholds.reorder.days;
        if stock_days > reorder_days {
            let reason = json!({
                "decision": OrderDecision::Hold,
                "primary_reason": "ABOVE_REORDER_POINT",
                "details": {
                    "stock_days": stock_days,
                    "reorder_days": reorder_days,
                }
            });
            return Self::hold(Some(stock_days), reason.to_string());
        }

        // 规则3: ORDER
        let maximum_units = thresholds.maximum.units(upc);
        let upstream_units = snapshot.stock_upstream.max(0.0);
        let target_units = maximum_units - on_hand;
        let final_units = target_units.max(0.0).min(upstream_units);

        // 四舍五入后超过上游整箱数时同样视为上游截断
        let rounded = (final_units / upc).round();
        let upstream_cases = (upstream_units / upc).floor();
        let suggested_cases = rounded.min(upstream_cases).max(0.0) as u32;
        let clamped_by_upstream = target_units > upstream_units || rounded > upstream_cases;

        let primary_reason = if clamped_by_upstream {
            "UPSTREAM_SHORTAGE"
        } else {
            "BELOW_REORDER_POINT"
        };

        if clamped_by_upstream {
            tracing::debug!(
                product_code = %snapshot.product_code,
                target_units,
                upstream_units,
                suggested_cases,
                "上游可用量不足，建议量已截断"
            );
        }

        let reason = json!({
            "decision": OrderDecision::Order,
            "primary_reason": primary_reason,
            "details": {
                "stock_days": stock_days,
                "reorder_days": reorder_days,
                "maximum_units": maximum_units,
                "stock_on_hand_units": on_hand,
                "target_units": target_units,
                "upstream_units": upstream_units,
                "final_units": final_units,
                "units_per_case": upc,
                "suggested_cases": suggested_cases,
            }
        });

        OrderSuggestion {
            decision: OrderDecision::Order,
            stock_days: Some(stock_days),
            target_units,
            final_units,
            suggested_cases,
            clamped_by_upstream,
            reason: reason.to_string(),
        }
    }

    /// 门店覆盖天数
    ///
    /// # 返回
    /// - None: 无销量（视为 +∞）
    /// - Some(days): (门店 + 在途) / 件数日销量
    pub fn stock_days(
        &self,
        snapshot: &VelocitySnapshot,
        classification: &Classification,
        thresholds: &StockThresholds,
    ) -> Option<f64> {
        if classification.is_skipped() {
            return None;
        }

        let velocity_units = thresholds.velocity_cases * snapshot.units_per_case;
        if !(velocity_units > 0.0) || !velocity_units.is_finite() {
            return None;
        }

        Some(snapshot.stock_on_hand() / velocity_units)
    }

    fn hold(stock_days: Option<f64>, reason: String) -> OrderSuggestion {
        OrderSuggestion {
            decision: OrderDecision::Hold,
            stock_days,
            target_units: 0.0,
            final_units: 0.0,
            suggested_cases: 0,
            clamped_by_upstream: false,
            reason,
        }
    }
}

impl Default for OrderQuantityResolver {
    fn default() -> Self {
        Self::new()
    }
}
