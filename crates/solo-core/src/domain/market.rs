//! 시장 컨텍스트.
//!
//! 엔진 외부(지표 계산기)에서 계산되어 매 사이클 공급되는 시장 상태입니다.
//! 이 엔진은 ATR/변동성을 직접 계산하지 않고 소비만 합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 외부에서 계산된 시장 컨텍스트.
///
/// 모든 필드는 선택적입니다. 값이 없으면 엔진은 해당 입력이 필요한 계산을
/// 다음으로 안전한 모드(고정 손절, 트리거 없음)로 폴백합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketContext {
    /// 현재 변동성 (비율, 예: 0.03 = 3%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    /// Average True Range (가격 단위)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr: Option<Decimal>,
    /// 가격 대비 ATR 비율
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr_pct: Option<f64>,
    /// 마지막 갱신 타임스탬프
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MarketContext {
    /// 빈 컨텍스트 (모든 입력 없음).
    pub fn empty() -> Self {
        Self::default()
    }

    /// 변동성만 있는 컨텍스트를 생성합니다.
    pub fn with_volatility(volatility: f64) -> Self {
        Self {
            volatility: Some(volatility),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// ATR을 설정합니다.
    pub fn with_atr(mut self, atr: Decimal) -> Self {
        self.atr = Some(atr);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_context_has_no_inputs() {
        let ctx = MarketContext::empty();
        assert!(ctx.volatility.is_none());
        assert!(ctx.atr.is_none());
    }

    #[test]
    fn test_builder() {
        let ctx = MarketContext::with_volatility(0.03).with_atr(dec!(1200));
        assert_eq!(ctx.volatility, Some(0.03));
        assert_eq!(ctx.atr, Some(dec!(1200)));
    }
}
