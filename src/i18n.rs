// ==========================================
// 门店补货决策引擎 - 国际化 (i18n)
// ==========================================
// 使用 rust-i18n，支持中文（默认）和英文
// 覆盖: 对比分析理由、季节性名称、紧急度说明
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use replenish_engine::i18n::t;
/// let msg = t("comparison.rationale.stable");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，占位符格式 %{name}）
///
/// # 示例
/// ```no_run
/// use replenish_engine::i18n::t_with_args;
/// let msg = t_with_args("comparison.rationale.trend", &[("direction", "上升"), ("pct", "35.0")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
