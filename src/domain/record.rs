// ==========================================
// 门店补货决策引擎 - 补货记录
// ==========================================
// 职责: 引擎输出的核心实体 ProductReplenishmentRecord
// 组成: 快照 + 分类 + 阈值 + 订货建议 + 紧急度 + 计划员覆写
// 红线: 派生字段只能由引擎重算，计划员只能改覆写字段
// ==========================================

use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::{AbcClass, OrderDecision, UrgencyTier, XyzClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 无销量商品的紧急度哨兵值（排在最后）
pub const CRITICALITY_SENTINEL: u32 = 999;

// ==========================================
// 分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub abc_class: AbcClass,
    pub xyz_class: XyzClass,
    /// 箱当量日均销量
    pub case_velocity: f64,
    /// 变异系数
    pub cv: f64,
}

impl Classification {
    /// 组合等级，如 "ABY"、"-X"
    pub fn combined(&self) -> String {
        format!("{}{}", self.abc_class, self.xyz_class)
    }

    /// 是否跳过后续订货计算
    pub fn is_skipped(&self) -> bool {
        !self.abc_class.is_ranked() || self.case_velocity <= 0.0
    }
}

// ==========================================
// 库存阈值
// ==========================================

/// 单个阈值：天数 + 箱数
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdLevel {
    pub days: f64,
    pub cases: f64,
}

impl ThresholdLevel {
    pub fn from_days(days: f64, case_velocity: f64) -> Self {
        Self {
            days,
            cases: case_velocity * days,
        }
    }

    /// 换算为件数
    pub fn units(&self, units_per_case: f64) -> f64 {
        self.cases * units_per_case
    }
}

/// 最小/安全/订货点/最大 四个阈值
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StockThresholds {
    /// 计算阈值所用的箱当量日均销量（替代方法中为调整后销量）
    pub velocity_cases: f64,
    pub minimum: ThresholdLevel,
    pub safety: ThresholdLevel,
    pub reorder: ThresholdLevel,
    pub maximum: ThresholdLevel,
}

impl StockThresholds {
    /// 全零阈值（"-" 或无销量）
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

// ==========================================
// 订货建议
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSuggestion {
    pub decision: OrderDecision,
    /// 门店覆盖天数（None 表示无销量，即 +∞）
    pub stock_days: Option<f64>,
    /// 补到最大库存所需件数（可为负）
    pub target_units: f64,
    /// 截断后件数 ∈ [0, upstream]
    pub final_units: f64,
    /// 建议订货箱数
    pub suggested_cases: u32,
    /// 目标量或取整后箱数超过上游可用量
    pub clamped_by_upstream: bool,
    /// 判定原因（JSON）
    pub reason: String,
}

impl OrderSuggestion {
    pub fn should_order(&self) -> bool {
        self.decision == OrderDecision::Order
    }
}

// ==========================================
// 紧急度
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalityScore {
    /// 紧急层级（无销量时为 None）
    pub tier: Option<UrgencyTier>,
    pub abc_weight: u32,
    /// tier × 10 + abc_weight，越小越紧急
    pub score: u32,
}

impl CriticalityScore {
    pub fn sentinel(abc_weight: u32) -> Self {
        Self {
            tier: None,
            abc_weight,
            score: CRITICALITY_SENTINEL,
        }
    }
}

// ==========================================
// 计划员覆写（终端字段）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerOverride {
    /// 是否纳入订单
    pub included: bool,
    /// 手工修改的订货箱数
    #[serde(default)]
    pub order_cases: Option<u32>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for PlannerOverride {
    fn default() -> Self {
        Self {
            included: true,
            order_cases: None,
            note: None,
            updated_at: None,
        }
    }
}

// ==========================================
// ProductReplenishmentRecord
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReplenishmentRecord {
    pub snapshot: VelocitySnapshot,
    pub classification: Classification,
    pub thresholds: StockThresholds,
    pub suggestion: OrderSuggestion,
    pub criticality: CriticalityScore,
    #[serde(default)]
    pub overrides: PlannerOverride,
}

impl ProductReplenishmentRecord {
    pub fn product_code(&self) -> &str {
        &self.snapshot.product_code
    }

    /// 最终采用的订货箱数：未纳入为 0，否则覆写优先
    pub fn effective_order_cases(&self) -> u32 {
        if !self.overrides.included {
            return 0;
        }
        self.overrides
            .order_cases
            .unwrap_or(self.suggestion.suggested_cases)
    }

    /// 计划员是否修改过建议量
    pub fn is_overridden(&self) -> bool {
        !self.overrides.included
            || self
                .overrides
                .order_cases
                .map(|c| c != self.suggestion.suggested_cases)
                .unwrap_or(false)
    }

    /// 覆写订货量
    pub fn set_override_quantity(&mut self, cases: Option<u32>) {
        self.overrides.order_cases = cases;
        self.overrides.updated_at = Some(Utc::now());
    }

    pub fn set_included(&mut self, included: bool) {
        self.overrides.included = included;
        self.overrides.updated_at = Some(Utc::now());
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.overrides.note = note.filter(|n| !n.trim().is_empty());
        self.overrides.updated_at = Some(Utc::now());
    }
}

// ==========================================
// 批次结果
// ==========================================

/// 单条记录错误（隔离，不影响批次内其他商品）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    pub product_code: String,
    pub destination_code: String,
    pub message: String,
}

/// 一个门店的批次计算结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub destination_code: String,
    pub computed_at: DateTime<Utc>,
    /// 按紧急度升序排列
    pub records: Vec<ProductReplenishmentRecord>,
    pub errors: Vec<RecordError>,
}

impl BatchResult {
    pub fn order_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.suggestion.should_order())
            .count()
    }

    pub fn clamped_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.suggestion.clamped_by_upstream)
            .count()
    }

    pub fn total_suggested_cases(&self) -> u64 {
        self.records
            .iter()
            .map(|r| r.suggestion.suggested_cases as u64)
            .sum()
    }

    pub fn find(&self, product_code: &str) -> Option<&ProductReplenishmentRecord> {
        self.records.iter().find(|r| r.product_code() == product_code)
    }

    pub fn find_mut(&mut self, product_code: &str) -> Option<&mut ProductReplenishmentRecord> {
        self.records
            .iter_mut()
            .find(|r| r.snapshot.product_code == product_code)
    }
}

// ==========================================
// 列表筛选
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default)]
    pub abc_classes: Vec<AbcClass>,
    #[serde(default)]
    pub tiers: Vec<UrgencyTier>,
    #[serde(default)]
    pub only_should_order: bool,
    #[serde(default)]
    pub only_clamped: bool,
    /// 商品代码/描述模糊匹配（忽略大小写）
    #[serde(default)]
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ProductReplenishmentRecord) -> bool {
        if !self.abc_classes.is_empty()
            && !self.abc_classes.contains(&record.classification.abc_class)
        {
            return false;
        }

        if !self.tiers.is_empty() {
            match record.criticality.tier {
                Some(tier) if self.tiers.contains(&tier) => {}
                _ => return false,
            }
        }

        if self.only_should_order && !record.suggestion.should_order() {
            return false;
        }

        if self.only_clamped && !record.suggestion.clamped_by_upstream {
            return false;
        }

        if let Some(term) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let term = term.to_lowercase();
            let code_hit = record.snapshot.product_code.to_lowercase().contains(&term);
            let desc_hit = record
                .snapshot
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&term))
                .unwrap_or(false);
            if !code_hit && !desc_hit {
                return false;
            }
        }

        true
    }

    /// 保持原有顺序筛选
    pub fn apply<'a>(
        &self,
        records: &'a [ProductReplenishmentRecord],
    ) -> Vec<&'a ProductReplenishmentRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(code: &str, abc: AbcClass, tier: Option<UrgencyTier>, cases: u32) -> ProductReplenishmentRecord {
        let mut snapshot = VelocitySnapshot::new(
            code,
            "S001",
            NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
            12.0,
        );
        snapshot.description = Some(format!("{} Yogurt", code));
        ProductReplenishmentRecord {
            snapshot,
            classification: Classification {
                abc_class: abc,
                xyz_class: XyzClass::X,
                case_velocity: 1.0,
                cv: 0.1,
            },
            thresholds: StockThresholds::zero(),
            suggestion: OrderSuggestion {
                decision: if cases > 0 {
                    OrderDecision::Order
                } else {
                    OrderDecision::Hold
                },
                stock_days: Some(1.0),
                target_units: cases as f64 * 12.0,
                final_units: cases as f64 * 12.0,
                suggested_cases: cases,
                clamped_by_upstream: false,
                reason: "{}".to_string(),
            },
            criticality: CriticalityScore {
                tier,
                abc_weight: abc.weight(),
                score: tier.map(|t| t.rank() * 10 + abc.weight()).unwrap_or(CRITICALITY_SENTINEL),
            },
            overrides: PlannerOverride::default(),
        }
    }

    #[test]
    fn test_effective_order_cases() {
        let mut r = record("P001", AbcClass::A, Some(UrgencyTier::Critical), 8);
        assert_eq!(r.effective_order_cases(), 8);
        assert!(!r.is_overridden());

        r.set_override_quantity(Some(3));
        assert_eq!(r.effective_order_cases(), 3);
        assert!(r.is_overridden());
        assert!(r.overrides.updated_at.is_some());

        r.set_included(false);
        assert_eq!(r.effective_order_cases(), 0);

        r.set_note(Some("   ".to_string()));
        assert_eq!(r.overrides.note, None);
    }

    #[test]
    fn test_filter_by_class_tier_and_search() {
        let records = vec![
            record("P001", AbcClass::A, Some(UrgencyTier::Critical), 8),
            record("P002", AbcClass::C, Some(UrgencyTier::Excess), 0),
            record("X003", AbcClass::A, None, 0),
        ];

        let by_class = RecordFilter {
            abc_classes: vec![AbcClass::A],
            ..Default::default()
        };
        assert_eq!(by_class.apply(&records).len(), 2);

        let by_tier = RecordFilter {
            tiers: vec![UrgencyTier::Critical, UrgencyTier::Excess],
            ..Default::default()
        };
        assert_eq!(by_tier.apply(&records).len(), 2);

        let ordering = RecordFilter {
            only_should_order: true,
            ..Default::default()
        };
        assert_eq!(ordering.apply(&records)[0].product_code(), "P001");

        let search = RecordFilter {
            search: Some("x003 yog".to_string()),
            ..Default::default()
        };
        assert_eq!(search.apply(&records).len(), 1);
    }
}
