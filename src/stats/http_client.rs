// ==========================================
// 门店补货决策引擎 - 外部统计服务客户端
// ==========================================
// 职责: 调用统计服务获取 σ / CV / 趋势 / 季节性因子
// 协议: POST {base_url}/v1/variability（JSON），GET {base_url}/health
// 红线: 超时可配置；响应非法视为单商品失败，不静默修正
// ==========================================

use crate::domain::analysis::{SeasonalityAnalysis, TrendAnalysis, VariabilityMetrics};
use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::{SeasonalityPattern, TrendDirection, VariabilitySource};
use crate::engine::classifier::{SEASONALITY_CAP, TREND_THRESHOLD};
use crate::stats::error::StatsError;
use crate::stats::variability_provider_trait::VariabilityProvider;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认请求超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

// ==========================================
// 请求/响应报文
// ==========================================

#[derive(Debug, Clone, Serialize)]
pub struct VariabilityRequest<'a> {
    pub product_code: &'a str,
    pub destination_code: &'a str,
    pub snapshot_date: NaiveDate,
    pub velocity_5d: f64,
    pub velocity_20d: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariabilityResponse {
    /// 日需求标准差（件/天）
    pub stddev: f64,
    pub cv: f64,
    /// 趋势百分比（正为增长）
    #[serde(default)]
    pub trend_pct: f64,
    #[serde(default = "default_factor")]
    pub seasonality_factor: f64,
    #[serde(default)]
    pub seasonality_pattern: Option<SeasonalityPattern>,
}

fn default_factor() -> f64 {
    1.0
}

impl VariabilityResponse {
    /// 转换为领域对象
    ///
    /// 规则:
    /// 1) stddev / cv 必须有限且 ≥ 0
    /// 2) 趋势方向按 ±20% 判定，置信度 = min(|r|, 1)
    /// 3) 季节性因子下限 1.0、上限 2.0；因子 > 1 但未给出模式时记为 WEEKDAY
    pub fn into_metrics(self, product_code: &str) -> Result<VariabilityMetrics, StatsError> {
        let invalid = |message: String| StatsError::InvalidResponse {
            product_code: product_code.to_string(),
            message,
        };

        if !self.stddev.is_finite() || self.stddev < 0.0 {
            return Err(invalid(format!("stddev 非法: {}", self.stddev)));
        }
        if !self.cv.is_finite() || self.cv < 0.0 {
            return Err(invalid(format!("cv 非法: {}", self.cv)));
        }
        if !self.trend_pct.is_finite() {
            return Err(invalid(format!("trend_pct 非法: {}", self.trend_pct)));
        }
        if !self.seasonality_factor.is_finite() {
            return Err(invalid(format!(
                "seasonality_factor 非法: {}",
                self.seasonality_factor
            )));
        }

        let relative = self.trend_pct / 100.0;
        let direction = if relative > TREND_THRESHOLD {
            TrendDirection::Growing
        } else if relative < -TREND_THRESHOLD {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        let factor = self.seasonality_factor.clamp(1.0, SEASONALITY_CAP);
        let pattern = match self.seasonality_pattern {
            _ if factor <= 1.0 => SeasonalityPattern::None,
            Some(SeasonalityPattern::None) | None => SeasonalityPattern::Weekday,
            Some(p) => p,
        };

        Ok(VariabilityMetrics {
            product_code: product_code.to_string(),
            stddev_units: self.stddev,
            cv: self.cv,
            trend: TrendAnalysis {
                direction,
                change_pct: self.trend_pct,
                confidence: relative.abs().min(1.0),
            },
            seasonality: SeasonalityAnalysis { pattern, factor },
            source: VariabilitySource::External,
        })
    }
}

// ==========================================
// HttpVariabilityProvider - 外部统计服务客户端
// ==========================================
pub struct HttpVariabilityProvider {
    base_url: String,
    timeout_ms: u64,
    client: reqwest::Client,
}

impl HttpVariabilityProvider {
    /// 创建客户端
    ///
    /// # 参数
    /// - base_url: 服务地址（末尾斜杠会被去除）
    /// - timeout_ms: 单次请求超时
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, StatsError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StatsError::Client("统计服务地址为空".to_string()));
        }

        let timeout_ms = if timeout_ms == 0 {
            DEFAULT_TIMEOUT_MS
        } else {
            timeout_ms
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| StatsError::Client(e.to_string()))?;

        Ok(Self {
            base_url,
            timeout_ms,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    fn map_send_error(&self, product_code: &str, e: reqwest::Error) -> StatsError {
        if e.is_timeout() {
            StatsError::Timeout {
                product_code: product_code.to_string(),
                timeout_ms: self.timeout_ms,
            }
        } else if e.is_connect() {
            StatsError::Unavailable {
                url: self.base_url.clone(),
                message: e.to_string(),
            }
        } else {
            StatsError::Request {
                product_code: product_code.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl VariabilityProvider for HttpVariabilityProvider {
    fn source(&self) -> VariabilitySource {
        VariabilitySource::External
    }

    async fn probe(&self) -> Result<(), StatsError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StatsError::Unavailable {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StatsError::Unavailable {
                url,
                message: format!("HTTP {}", response.status()),
            })
        }
    }

    async fn fetch(&self, snapshot: &VelocitySnapshot) -> Result<VariabilityMetrics, StatsError> {
        let code = snapshot.product_code.as_str();
        let url = format!("{}/v1/variability", self.base_url);
        let body = VariabilityRequest {
            product_code: code,
            destination_code: &snapshot.destination_code,
            snapshot_date: snapshot.snapshot_date,
            velocity_5d: snapshot.velocity_5d,
            velocity_20d: snapshot.velocity_20d,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(code, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StatsError::HttpStatus {
                product_code: code.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: VariabilityResponse =
            response
                .json()
                .await
                .map_err(|e| StatsError::InvalidResponse {
                    product_code: code.to_string(),
                    message: e.to_string(),
                })?;

        payload.into_metrics(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> VariabilityResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_response_conversion() {
        let m = response(
            r#"{"stddev": 12.5, "cv": 0.7, "trend_pct": 35.0, "seasonality_factor": 1.25, "seasonality_pattern": "WEEKEND"}"#,
        )
        .into_metrics("P001")
        .unwrap();
        assert_eq!(m.stddev_units, 12.5);
        assert_eq!(m.trend.direction, TrendDirection::Growing);
        assert!((m.trend.confidence - 0.35).abs() < 1e-9);
        assert_eq!(m.seasonality.pattern, SeasonalityPattern::Weekend);
        assert_eq!(m.source, VariabilitySource::External);
    }

    #[test]
    fn test_response_defaults_and_clamps() {
        let m = response(r#"{"stddev": 1.0, "cv": 0.1}"#)
            .into_metrics("P001")
            .unwrap();
        assert_eq!(m.seasonality.factor, 1.0);
        assert_eq!(m.seasonality.pattern, SeasonalityPattern::None);
        assert_eq!(m.trend.direction, TrendDirection::Stable);

        let m = response(r#"{"stddev": 1.0, "cv": 0.1, "seasonality_factor": 3.0}"#)
            .into_metrics("P001")
            .unwrap();
        assert_eq!(m.seasonality.factor, SEASONALITY_CAP);
        assert_eq!(m.seasonality.pattern, SeasonalityPattern::Weekday);
    }

    #[test]
    fn test_response_rejects_negative_cv() {
        let err = response(r#"{"stddev": 1.0, "cv": -0.1}"#)
            .into_metrics("P001")
            .unwrap_err();
        assert!(matches!(err, StatsError::InvalidResponse { .. }));
    }

    #[test]
    fn test_client_rejects_empty_url_and_trims_slash() {
        assert!(HttpVariabilityProvider::new("  ", 1000).is_err());
        let client = HttpVariabilityProvider::new("http://stats.local/", 0).unwrap();
        assert_eq!(client.base_url(), "http://stats.local");
        assert_eq!(client.timeout_ms(), DEFAULT_TIMEOUT_MS);
    }

    #[tokio::test]
    async fn test_unreachable_service_probe_fails() {
        // 保留端口，连接必然失败
        let client = HttpVariabilityProvider::new("http://127.0.0.1:9", 500).unwrap();
        let err = client.probe().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
