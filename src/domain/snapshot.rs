// ==========================================
// 门店补货决策引擎 - 销量/库存快照
// ==========================================
// 职责: 定义引擎输入（商品 × 目的门店）
// 来源: 外部预测/库存服务，每日批量下发
// 红线: 快照在一次计算中不可变
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 销量与库存快照（一条 = 一个商品在一个目的门店）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocitySnapshot {
    // ===== 商品标识 =====
    pub product_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,

    /// 目的门店代码（参数表按门店配置）
    pub destination_code: String,

    /// 快照日期（用于星期/月中季节性判断）
    pub snapshot_date: NaiveDate,

    // ===== 包装 =====
    /// 每箱件数（必须 > 0）
    pub units_per_case: f64,

    // ===== 销量（件/天） =====
    #[serde(default)]
    pub daily_units: f64,
    pub velocity_5d: f64,
    pub velocity_20d: f64,
    #[serde(default)]
    pub velocity_same_weekday: f64,
    /// 各星期 P75 销量，下标 0 = 周一
    #[serde(default)]
    pub velocity_p75_per_weekday: [f64; 7],

    // ===== 库存（件） =====
    pub stock_destination: f64,
    #[serde(default)]
    pub stock_in_transit: f64,
    pub stock_upstream: f64,

    /// 单件成本（可选，仅用于对比分析的金额差异）
    #[serde(default)]
    pub unit_cost: Option<f64>,
}

impl VelocitySnapshot {
    /// 创建最小快照（其余字段取默认值）
    pub fn new(
        product_code: impl Into<String>,
        destination_code: impl Into<String>,
        snapshot_date: NaiveDate,
        units_per_case: f64,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            description: None,
            category: None,
            brand: None,
            destination_code: destination_code.into(),
            snapshot_date,
            units_per_case,
            daily_units: 0.0,
            velocity_5d: 0.0,
            velocity_20d: 0.0,
            velocity_same_weekday: 0.0,
            velocity_p75_per_weekday: [0.0; 7],
            stock_destination: 0.0,
            stock_in_transit: 0.0,
            stock_upstream: 0.0,
            unit_cost: None,
        }
    }

    /// 门店可用库存 = 门店 + 在途（件）
    pub fn stock_on_hand(&self) -> f64 {
        self.stock_destination + self.stock_in_transit
    }

    /// 箱当量日均销量（基于 20 日均值）
    ///
    /// 包装非法时返回 0，由分类器判为 "-"
    pub fn case_velocity(&self) -> f64 {
        if self.units_per_case > 0.0 && self.velocity_20d.is_finite() {
            (self.velocity_20d / self.units_per_case).max(0.0)
        } else {
            0.0
        }
    }
}
