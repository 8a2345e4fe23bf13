// ==========================================
// 门店补货决策引擎 - 输入校验
// ==========================================
// 职责: 进入分类前拒绝非法快照（包装、库存、销量、代码）
// 红线: 校验失败只影响本条记录，不中断批次
// ==========================================

use crate::domain::snapshot::VelocitySnapshot;
use crate::engine::error::EngineError;

/// 校验单条快照
///
/// 规则:
/// 1) 商品代码非空
/// 2) units_per_case 有限且 > 0
/// 3) 库存与销量字段有限且 ≥ 0
/// 4) unit_cost 如提供则有限且 ≥ 0
pub fn validate_snapshot(snapshot: &VelocitySnapshot) -> Result<(), EngineError> {
    let code = snapshot.product_code.trim();
    if code.is_empty() {
        return Err(EngineError::invalid_input(
            "<empty>",
            "product_code",
            "商品代码为空",
        ));
    }

    let upc = snapshot.units_per_case;
    if !upc.is_finite() || upc <= 0.0 {
        return Err(EngineError::invalid_input(
            code,
            "units_per_case",
            format!("每箱件数必须大于 0，实际为 {}", upc),
        ));
    }

    let fields = [
        ("stock_destination", snapshot.stock_destination),
        ("stock_in_transit", snapshot.stock_in_transit),
        ("stock_upstream", snapshot.stock_upstream),
        ("daily_units", snapshot.daily_units),
        ("velocity_5d", snapshot.velocity_5d),
        ("velocity_20d", snapshot.velocity_20d),
        ("velocity_same_weekday", snapshot.velocity_same_weekday),
    ];
    for (field, value) in fields {
        check_non_negative(code, field, value)?;
    }

    for (idx, value) in snapshot.velocity_p75_per_weekday.iter().enumerate() {
        check_non_negative(code, &format!("velocity_p75_per_weekday[{}]", idx), *value)?;
    }

    if let Some(cost) = snapshot.unit_cost {
        check_non_negative(code, "unit_cost", cost)?;
    }

    Ok(())
}

fn check_non_negative(code: &str, field: &str, value: f64) -> Result<(), EngineError> {
    if !value.is_finite() {
        return Err(EngineError::invalid_input(
            code,
            field,
            format!("数值非有限: {}", value),
        ));
    }
    if value < 0.0 {
        return Err(EngineError::invalid_input(
            code,
            field,
            format!("数值不能为负: {}", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot() -> VelocitySnapshot {
        let mut s = VelocitySnapshot::new(
            "P001",
            "S001",
            NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
            12.0,
        );
        s.velocity_20d = 24.0;
        s.stock_destination = 10.0;
        s
    }

    #[test]
    fn test_valid_snapshot_passes() {
        assert!(validate_snapshot(&snapshot()).is_ok());
    }

    #[test]
    fn test_rejects_zero_units_per_case() {
        let mut s = snapshot();
        s.units_per_case = 0.0;
        match validate_snapshot(&s) {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "units_per_case"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_negative_stock_and_nan_velocity() {
        let mut s = snapshot();
        s.stock_in_transit = -1.0;
        let err = validate_snapshot(&s).unwrap_err();
        assert!(err.to_string().contains("stock_in_transit"));

        let mut s = snapshot();
        s.velocity_5d = f64::NAN;
        let err = validate_snapshot(&s).unwrap_err();
        assert!(err.to_string().contains("velocity_5d"));
    }

    #[test]
    fn test_rejects_empty_code() {
        let mut s = snapshot();
        s.product_code = "  ".to_string();
        assert!(validate_snapshot(&s).is_err());
    }
}
