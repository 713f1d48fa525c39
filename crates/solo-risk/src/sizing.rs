//! 포지션 사이징.
//!
//! 잔고 대비 기본 비율에서 시작해 Kelly 기준, 변동성, 신호 강도,
//! 연속 손실, 드로다운 순서로 조정 배수를 적용한 뒤, 명목 가치를
//! 주문 한도로 클램프하고 수량으로 환산합니다.

use rust_decimal::Decimal;
use solo_core::types::ratio_to_decimal;
use solo_core::{MarketContext, Price, Quantity};
use tracing::debug;

use crate::config::RiskConfig;
use crate::statistics::TradeStatisticsTracker;

/// 포지션 사이징 계산기.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: RiskConfig,
}

impl PositionSizer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// 주문 수량(기초 자산 단위)을 계산합니다.
    ///
    /// # Arguments
    /// * `balance` - 가용 잔고 (호가 통화)
    /// * `price` - 현재 가격
    /// * `signal_strength` - 신호 강도 (0.0 ~ 1.0)
    /// * `stats` - 거래 통계 (Kelly, 연속 손실)
    /// * `market` - 시장 컨텍스트 (변동성)
    /// * `total_drawdown` - 현재 전체 드로다운 (비율)
    ///
    /// 잔고나 가격이 0 이하이거나 최소 주문 금액조차 낼 수 없으면
    /// 0을 반환합니다.
    pub fn calculate_amount(
        &self,
        balance: Decimal,
        price: Price,
        signal_strength: f64,
        stats: &TradeStatisticsTracker,
        market: &MarketContext,
        total_drawdown: f64,
    ) -> Quantity {
        if balance <= Decimal::ZERO || price <= Decimal::ZERO {
            return Quantity::ZERO;
        }

        let ratio = self.effective_ratio(signal_strength, stats, market, total_drawdown);
        if ratio <= 0.0 {
            return Quantity::ZERO;
        }

        let notional = balance * ratio_to_decimal(ratio);
        let clamped = match self.clamp_notional(notional, balance) {
            Some(n) => n,
            None => return Quantity::ZERO,
        };

        debug!(
            ratio = ratio,
            notional = %clamped,
            "Position size calculated"
        );
        clamped / price
    }

    /// 조정 배수를 모두 반영한 최종 잔고 비율을 계산합니다.
    fn effective_ratio(
        &self,
        signal_strength: f64,
        stats: &TradeStatisticsTracker,
        market: &MarketContext,
        total_drawdown: f64,
    ) -> f64 {
        let mut ratio = self.config.position_ratio;

        // Kelly는 기본 비율을 키우지 않고 줄이기만 한다
        if self.config.kelly_enabled && stats.total_trades >= self.config.kelly_min_trades {
            let kelly = stats
                .kelly_fraction(self.config.fractional_kelly, self.config.kelly_min_trades);
            ratio = ratio.min(kelly);
        }

        if let Some(volatility) = market.volatility {
            if volatility >= self.config.high_volatility_threshold {
                ratio *= self.config.high_volatility_damp;
            } else if volatility <= self.config.low_volatility_threshold {
                ratio *= self.config.low_volatility_boost;
            }
        }

        ratio *= signal_strength.clamp(0.0, 1.0);

        // 연속 손실 3회부터 10%씩 축소, 바닥은 절반
        let losses = stats.consecutive_losses;
        if losses >= 3 {
            ratio *= (1.0 - losses as f64 * 0.1).max(0.5);
        }

        // 드로다운 10% 초과 시 비례 축소, 바닥은 절반
        if total_drawdown > 0.10 {
            ratio *= (1.0 - total_drawdown).max(0.5);
        }

        ratio
    }

    /// 명목 가치를 주문 한도로 클램프합니다.
    ///
    /// 상한은 설정된 최대 주문 금액과 잔고의 절반 중 작은 쪽입니다.
    /// 상한이 최소 주문 금액보다 작으면 주문 불가 (`None`).
    fn clamp_notional(&self, notional: Decimal, balance: Decimal) -> Option<Decimal> {
        let cap = self
            .config
            .max_order_notional
            .min(balance / Decimal::from(2));
        if cap < self.config.min_order_notional {
            return None;
        }
        Some(notional.clamp(self.config.min_order_notional, cap))
    }
}
