//! 트레일링 손절 계산.
//!
//! 포지션이 기록한 극값(롱은 최고가, 숏은 최저가)에서 설정 거리만큼
//! 떨어진 후보 가격을 계산합니다. 후보가 진입가보다 유리할 때만
//! 활성화되므로, 트레일링 손절은 손실 방향으로는 절대 작동하지
//! 않습니다.

use solo_core::types::apply_pct;
use solo_core::{Position, Price, Side};

use crate::config::RiskConfig;

/// 트레일링 손절 엔진.
///
/// 상태를 갖지 않습니다. 극값은 `Position`이 추적하고 이 엔진은
/// 매 호출 순수하게 후보 가격만 계산합니다.
#[derive(Debug, Clone)]
pub struct TrailingStopEngine {
    config: RiskConfig,
}

impl TrailingStopEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// 현재 극값 기준 트레일링 손절 가격을 계산합니다.
    ///
    /// 비활성화 상태이거나 후보가 아직 진입가를 넘지 못했으면
    /// `None`을 반환합니다.
    pub fn calculate(&self, position: &Position) -> Option<Price> {
        if !self.config.trailing_stop_enabled {
            return None;
        }

        let trail_pct = self.config.trailing_stop_pct;
        match position.side {
            Side::Long => {
                let candidate = apply_pct(position.highest_price, -trail_pct);
                (candidate > position.entry_price).then_some(candidate)
            }
            Side::Short => {
                let candidate = apply_pct(position.lowest_price, trail_pct);
                (candidate < position.entry_price).then_some(candidate)
            }
        }
    }

    /// 트레일링 손절이 체결됐는지 확인합니다.
    pub fn is_triggered(&self, position: &Position, current_price: Price) -> bool {
        match self.calculate(position) {
            Some(stop) => match position.side {
                Side::Long => current_price <= stop,
                Side::Short => current_price >= stop,
            },
            None => false,
        }
    }
}
