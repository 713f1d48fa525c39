//! 동적 트레일링 익절.
//!
//! 수수료를 차감한 순수익이 최소 임계값을 한 번이라도 넘으면 수익 잠금
//! 모드로 들어갑니다. 이후 최근 가격 윈도우의 평균 대비 설정 비율만큼
//! 되돌리면 청산 신호를 냅니다.
//!
//! 임계값 도달 플래그는 끈적(sticky)합니다: 순수익이 다시 임계값 아래로
//! 내려가도 포지션이 닫힐 때까지 유지됩니다. 얕은 되돌림에서 이미 확보한
//! 수익을 지키는 것이 목적입니다.

use solo_core::types::{apply_pct, ratio_to_decimal};
use solo_core::{Position, Price, Side};
use tracing::debug;

use crate::config::RiskConfig;

/// 동적 트레일링 익절 엔진.
#[derive(Debug, Clone)]
pub struct DynamicTakeProfitEngine {
    config: RiskConfig,
}

impl DynamicTakeProfitEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// 새 가격을 반영하고 청산 신호 여부를 평가합니다.
    ///
    /// 청산해야 하면 `Some(current_price)`를 반환합니다.
    ///
    /// 평가 순서:
    /// 1. 가격을 윈도우에 추가 (평균 계산에 현재 가격 포함)
    /// 2. 순수익이 임계값 이상이면 수익 잠금 플래그 설정 (sticky)
    /// 3. 플래그가 꺼져 있거나 윈도우가 덜 찼으면 신호 없음
    /// 4. 윈도우 평균에서 `fallback_pct`만큼 되돌렸으면 청산 신호
    pub fn evaluate(&self, position: &mut Position, current_price: Price) -> Option<Price> {
        position.push_recent_price(current_price);

        let net = position.net_profit(current_price, ratio_to_decimal(self.config.fee_rate));
        if net > position.max_profit {
            position.max_profit = net;
        }
        if !position.profit_threshold_reached && net >= self.config.min_profit_threshold {
            debug!(
                net_profit = %net,
                threshold = %self.config.min_profit_threshold,
                "Profit lock armed"
            );
            position.profit_threshold_reached = true;
        }

        if !position.profit_threshold_reached {
            return None;
        }

        // 표본이 부족한 평균은 신뢰하지 않는다
        if !position.price_window_full() {
            return None;
        }

        let average = position.recent_price_average()?;
        let triggered = match position.side {
            Side::Long => current_price <= apply_pct(average, -self.config.fallback_pct),
            Side::Short => current_price >= apply_pct(average, self.config.fallback_pct),
        };

        if triggered {
            debug!(
                current = %current_price,
                window_avg = %average,
                "Dynamic take-profit triggered"
            );
            Some(current_price)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn engine() -> DynamicTakeProfitEngine {
        DynamicTakeProfitEngine::new(RiskConfig::default())
    }

    fn long_position() -> Position {
        // 진입가 100000, 수량 0.001, 진입 수수료 0.04
        Position::open(Side::Long, dec!(0.001), dec!(100000), dec!(0.04), 5)
    }

    #[test]
    fn test_no_signal_before_threshold() {
        let engine = engine();
        let mut position = long_position();

        // 100080: gross 0.08 - 진입 수수료 0.04 - 청산 수수료 0.040032 < 임계값
        for _ in 0..5 {
            assert!(engine.evaluate(&mut position, dec!(100080)).is_none());
        }
        assert!(!position.profit_threshold_reached);
    }

    #[test]
    fn test_threshold_flag_is_sticky() {
        let engine = engine();
        let mut position = long_position();

        // 충분한 수익으로 플래그 설정
        engine.evaluate(&mut position, dec!(100500));
        assert!(position.profit_threshold_reached);

        // 수익이 임계값 아래로 내려가도 플래그 유지
        engine.evaluate(&mut position, dec!(100050));
        assert!(position.profit_threshold_reached);
    }

    #[test]
    fn test_requires_full_window() {
        let engine = engine();
        let mut position = long_position();

        // 플래그는 켜졌지만 윈도우(5)가 안 찼으면 큰 하락에도 신호 없음
        engine.evaluate(&mut position, dec!(100500));
        assert!(engine.evaluate(&mut position, dec!(99000)).is_none());
    }

    #[test]
    fn test_fallback_from_window_average_triggers() {
        let engine = engine();
        let mut position = long_position();

        // 수익 구간에서 윈도우를 채운다
        for _ in 0..4 {
            assert!(engine.evaluate(&mut position, dec!(100500)).is_none());
        }
        assert!(position.profit_threshold_reached);

        // 5번째 가격 99000 포함 평균 = (100500*4 + 99000) / 5 = 100200
        // 트리거 = 100200 × 0.995 = 99699 → 99000 ≤ 99699 → 청산
        let signal = engine.evaluate(&mut position, dec!(99000));
        assert_eq!(signal, Some(dec!(99000)));
    }

    #[test]
    fn test_shallow_pullback_does_not_trigger() {
        let engine = engine();
        let mut position = long_position();

        for _ in 0..5 {
            engine.evaluate(&mut position, dec!(100500));
        }

        // 평균 근처의 얕은 되돌림은 신호가 아니다
        assert!(engine.evaluate(&mut position, dec!(100400)).is_none());
    }

    #[test]
    fn test_max_profit_tracks_peak() {
        let engine = engine();
        let mut position = long_position();

        engine.evaluate(&mut position, dec!(100500));
        let peak = position.max_profit;
        assert!(peak > Decimal::ZERO);

        engine.evaluate(&mut position, dec!(100200));
        assert_eq!(position.max_profit, peak);
    }

    #[test]
    fn test_short_side_fallback_above_average() {
        let engine = engine();
        let mut position = Position::open(Side::Short, dec!(0.001), dec!(100000), dec!(0.04), 5);

        for _ in 0..4 {
            assert!(engine.evaluate(&mut position, dec!(99500)).is_none());
        }
        assert!(position.profit_threshold_reached);

        // 평균 = (99500*4 + 100600) / 5 = 99720, 트리거 = 99720 × 1.005 = 100218.6
        let signal = engine.evaluate(&mut position, dec!(100600));
        assert_eq!(signal, Some(dec!(100600)));
    }
}
