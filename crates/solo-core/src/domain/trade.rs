//! 청산된 거래 기록.
//!
//! 통계 추적기의 입력 단위이며, 시작 시 영속화된 거래 이력에서
//! 카운터를 복원(rehydrate)할 때도 사용됩니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 청산된 거래 한 건의 기록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    /// 실현 손익 (양수 = 이익, 음수 = 손실)
    pub pnl: Decimal,
    /// 청산 타임스탬프
    pub closed_at: DateTime<Utc>,
    /// 이 거래를 낸 전략
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl TradeRecord {
    /// 새 거래 기록을 생성합니다.
    pub fn new(pnl: Decimal) -> Self {
        Self {
            pnl,
            closed_at: Utc::now(),
            strategy: None,
        }
    }

    /// 특정 타임스탬프로 기록을 생성합니다 (이력 복원용).
    pub fn with_timestamp(pnl: Decimal, closed_at: DateTime<Utc>) -> Self {
        Self {
            pnl,
            closed_at,
            strategy: None,
        }
    }

    /// 전략 이름을 설정합니다.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// 손실인지 확인합니다.
    pub fn is_loss(&self) -> bool {
        self.pnl < Decimal::ZERO
    }

    /// 이익인지 확인합니다.
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}
