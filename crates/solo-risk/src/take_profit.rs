//! 익절 목표 가격 계산.
//!
//! 손익비 기반 목표(손절 거리 × 보상 배수)와 고정 비율 목표를 모두
//! 계산한 뒤, 트레이더에게 더 유리한 쪽(롱이면 더 높은 가격)을
//! 선택합니다.

use serde::{Deserialize, Serialize};
use solo_core::types::{apply_pct, ratio_to_decimal};
use solo_core::{Price, Side};

use crate::config::RiskConfig;

/// 익절 계산 근거.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeProfitBasis {
    /// 손익비 기반 목표가 선택됨
    RiskReward,
    /// 고정 비율 목표가 선택됨
    FixedPct,
}

/// 익절 가격 계산기.
#[derive(Debug, Clone)]
pub struct TakeProfitCalculator {
    config: RiskConfig,
}

impl TakeProfitCalculator {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// 익절 가격을 계산합니다.
    ///
    /// 손익비 목표는 `entry ± risk × reward_ratio` (risk = 진입가와
    /// 손절가의 거리)이고, 고정 목표는 `entry × (1 ± take_profit_pct)`
    /// 입니다. 둘 중 진입 방향으로 더 먼 쪽을 반환합니다.
    pub fn calculate(
        &self,
        entry: Price,
        stop_loss: Price,
        side: Side,
        strategy: Option<&str>,
    ) -> Price {
        let (target, _) = self.calculate_with_basis(entry, stop_loss, side, strategy);
        target
    }

    /// 익절 가격과 선택 근거를 함께 반환합니다.
    pub fn calculate_with_basis(
        &self,
        entry: Price,
        stop_loss: Price,
        side: Side,
        strategy: Option<&str>,
    ) -> (Price, TakeProfitBasis) {
        let risk = (entry - stop_loss).abs();
        let reward = risk * ratio_to_decimal(self.config.reward_ratio);
        let fixed_pct = self.config.get_take_profit_pct(strategy);

        match side {
            Side::Long => {
                let rr_target = entry + reward;
                let fixed_target = apply_pct(entry, fixed_pct);
                if rr_target >= fixed_target {
                    (rr_target, TakeProfitBasis::RiskReward)
                } else {
                    (fixed_target, TakeProfitBasis::FixedPct)
                }
            }
            Side::Short => {
                let rr_target = entry - reward;
                let fixed_target = apply_pct(entry, -fixed_pct);
                if rr_target <= fixed_target {
                    (rr_target, TakeProfitBasis::RiskReward)
                } else {
                    (fixed_target, TakeProfitBasis::FixedPct)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn calculator() -> TakeProfitCalculator {
        TakeProfitCalculator::new(RiskConfig::default())
    }

    #[test]
    fn test_fixed_target_wins_when_risk_is_small() {
        let calc = calculator();
        // 손절 거리 500 × 2.0 = 1000 (1%), 고정 목표 3% → 고정이 더 멀다
        let (target, basis) =
            calc.calculate_with_basis(dec!(100000), dec!(99500), Side::Long, None);
        assert_eq!(target, dec!(103000));
        assert_eq!(basis, TakeProfitBasis::FixedPct);
    }

    #[test]
    fn test_risk_reward_target_wins_when_risk_is_wide() {
        let calc = calculator();
        // 손절 거리 2000 × 2.0 = 4000 (4%) > 고정 3%
        let (target, basis) =
            calc.calculate_with_basis(dec!(100000), dec!(98000), Side::Long, None);
        assert_eq!(target, dec!(104000));
        assert_eq!(basis, TakeProfitBasis::RiskReward);
    }

    #[test]
    fn test_short_side_targets_below_entry() {
        let calc = calculator();
        let target = calc.calculate(dec!(100000), dec!(100500), Side::Short, None);

        // 손익비 목표 99000, 고정 목표 97000 → 숏은 더 낮은 쪽
        assert_eq!(target, dec!(97000));
        assert!(target < dec!(100000));
    }

    #[test]
    fn test_take_profit_is_beyond_entry() {
        let calc = calculator();
        let long = calc.calculate(dec!(50000), dec!(49750), Side::Long, None);
        assert!(long > dec!(50000));

        let short = calc.calculate(dec!(50000), dec!(50250), Side::Short, None);
        assert!(short < dec!(50000));
    }

    #[test]
    fn test_strategy_override_changes_fixed_target() {
        let mut config = RiskConfig::default();
        config.set_strategy_override(
            "scalper",
            crate::config::StrategyRiskConfig {
                take_profit_pct: Some(1.0),
                ..Default::default()
            },
        );
        let calc = TakeProfitCalculator::new(config);

        // 고정 목표 1%로 축소 → 손익비 목표 1%와 동률, rr 우선
        let (target, _) = calc.calculate_with_basis(dec!(100000), dec!(99500), Side::Long, Some("scalper"));
        assert_eq!(target, dec!(101000));
    }
}
