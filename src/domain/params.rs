// ==========================================
// 门店补货决策引擎 - 分类参数表
// ==========================================
// 职责: 每个 ABC 等级的最小/安全/最大库存天数倍数
// 存储: config_kv（scope = 门店代码），缺省回退到内置默认表
// 红线: minimum ≤ reorder ≤ maximum，违反即配置错误
// ==========================================

use crate::domain::types::AbcClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 补货提前期缓冲（天）
pub const LEAD_TIME_DAYS: f64 = 1.25;

/// 单个等级的天数倍数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMultipliers {
    pub min_mult: f64,
    pub safety_mult: f64,
    pub max_mult: f64,
}

impl ClassMultipliers {
    pub fn new(min_mult: f64, safety_mult: f64, max_mult: f64) -> Self {
        Self {
            min_mult,
            safety_mult,
            max_mult,
        }
    }

    /// 订货点天数 = 最小 + 安全 + 提前期
    pub fn reorder_days(&self) -> f64 {
        self.min_mult + self.safety_mult + LEAD_TIME_DAYS
    }
}

/// 参数表校验违规项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterViolation {
    pub abc_class: AbcClass,
    pub message: String,
}

/// 分类参数表（按 ABC 等级索引）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    /// 参数表所属门店（global 表示全局默认）
    pub scope: String,
    pub classes: BTreeMap<AbcClass, ClassMultipliers>,
}

impl ParameterTable {
    /// 内置默认表（仅作为回退）
    pub fn fallback() -> Self {
        let mut classes = BTreeMap::new();
        classes.insert(AbcClass::A, ClassMultipliers::new(1.0, 0.5, 4.0));
        classes.insert(AbcClass::AB, ClassMultipliers::new(2.0, 0.5, 7.0));
        classes.insert(AbcClass::B, ClassMultipliers::new(3.0, 1.0, 10.0));
        classes.insert(AbcClass::BC, ClassMultipliers::new(4.0, 1.5, 14.0));
        classes.insert(AbcClass::C, ClassMultipliers::new(5.0, 2.0, 21.0));
        Self {
            scope: "global".to_string(),
            classes,
        }
    }

    /// 以默认表为底，覆写指定等级
    pub fn with_class(mut self, class: AbcClass, multipliers: ClassMultipliers) -> Self {
        if class.is_ranked() {
            self.classes.insert(class, multipliers);
        }
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// 查询等级倍数（"-" 永远返回 None）
    pub fn get(&self, class: AbcClass) -> Option<&ClassMultipliers> {
        if !class.is_ranked() {
            return None;
        }
        self.classes.get(&class)
    }

    /// 校验参数表
    ///
    /// 规则:
    /// 1) 五个有效等级必须齐全
    /// 2) 所有倍数必须有限且 ≥ 0
    /// 3) min ≤ reorder ≤ max
    pub fn validate(&self) -> Vec<ParameterViolation> {
        let mut violations = Vec::new();

        for class in AbcClass::RANKED {
            let Some(m) = self.classes.get(&class) else {
                violations.push(ParameterViolation {
                    abc_class: class,
                    message: "missing multipliers".to_string(),
                });
                continue;
            };

            let values = [m.min_mult, m.safety_mult, m.max_mult];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                violations.push(ParameterViolation {
                    abc_class: class,
                    message: format!(
                        "multipliers must be finite and non-negative: min={}, safety={}, max={}",
                        m.min_mult, m.safety_mult, m.max_mult
                    ),
                });
                continue;
            }

            let reorder = m.reorder_days();
            if reorder > m.max_mult {
                violations.push(ParameterViolation {
                    abc_class: class,
                    message: format!(
                        "reorder_days={:.2} exceeds max_mult={:.2} (min={}, safety={}, lead_time={})",
                        reorder, m.max_mult, m.min_mult, m.safety_mult, LEAD_TIME_DAYS
                    ),
                });
            }
        }

        violations
    }
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_table_is_valid() {
        assert!(ParameterTable::fallback().validate().is_empty());
    }

    #[test]
    fn test_reorder_days_includes_lead_time() {
        let m = ClassMultipliers::new(2.0, 0.5, 7.0);
        assert!((m.reorder_days() - 3.75).abs() < 1e-9);
    }

    #[test]
    fn test_reorder_above_max_is_violation() {
        let table =
            ParameterTable::fallback().with_class(AbcClass::B, ClassMultipliers::new(5.0, 3.0, 8.0));
        let violations = table.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].abc_class, AbcClass::B);
    }

    #[test]
    fn test_negative_and_missing_multipliers() {
        let mut table = ParameterTable::fallback()
            .with_class(AbcClass::A, ClassMultipliers::new(-1.0, 0.5, 4.0));
        table.classes.remove(&AbcClass::C);
        let violations = table.validate();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_unclassified_has_no_multipliers() {
        let table = ParameterTable::fallback();
        assert!(table.get(AbcClass::Unclassified).is_none());
        let same = table.clone().with_class(AbcClass::Unclassified, ClassMultipliers::new(1.0, 1.0, 9.0));
        assert_eq!(same, table);
    }
}
