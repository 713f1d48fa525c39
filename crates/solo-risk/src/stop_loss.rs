//! 손절 가격 계산.
//!
//! 고정 손절은 레버리지를 반영해 증거금 기준 손실 비율을 가격 거리로
//! 환산합니다. ATR 손절은 변동성에 적응하되, 고정 손절보다 넓어지지
//! 않도록 제한됩니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solo_core::types::{apply_pct, ratio_to_decimal};
use solo_core::{MarketContext, Price, Side};
use tracing::debug;

use crate::config::RiskConfig;

/// 청산 트리거 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    /// 고정 손절
    StopLoss,
    /// ATR 기반 손절
    AtrStop,
    /// 익절 목표 도달
    TakeProfit,
    /// 트레일링 손절
    TrailingStop,
}

impl std::fmt::Display for StopType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopType::StopLoss => write!(f, "stop_loss"),
            StopType::AtrStop => write!(f, "atr_stop"),
            StopType::TakeProfit => write!(f, "take_profit"),
            StopType::TrailingStop => write!(f, "trailing_stop"),
        }
    }
}

/// 손절 가격 계산기.
#[derive(Debug, Clone)]
pub struct StopLossCalculator {
    config: RiskConfig,
}

impl StopLossCalculator {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// 고정 손절 가격을 계산합니다.
    ///
    /// 가격 거리는 `stop_loss_pct / leverage`입니다. 증거금의
    /// `stop_loss_pct`%를 잃는 지점에서 청산합니다.
    pub fn fixed_stop(&self, entry: Price, side: Side, strategy: Option<&str>) -> Price {
        let pct = self.config.get_stop_loss_pct(strategy) / self.config.leverage as f64;
        match side {
            Side::Long => apply_pct(entry, -pct),
            Side::Short => apply_pct(entry, pct),
        }
    }

    /// ATR 기반 손절 가격을 계산합니다.
    ///
    /// ATR이 없거나 0 이하이면 조용히 고정 손절로 폴백합니다.
    /// ATR 손절은 고정 손절보다 넓어질 수 없습니다 (롱이면 둘 중 높은 값).
    pub fn atr_stop(
        &self,
        entry: Price,
        side: Side,
        atr: Option<Decimal>,
        strategy: Option<&str>,
    ) -> Price {
        let fixed = self.fixed_stop(entry, side, strategy);

        let atr = match atr {
            Some(v) if v > Decimal::ZERO => v,
            _ => {
                debug!("ATR unavailable, falling back to fixed stop");
                return fixed;
            }
        };

        let distance = atr * ratio_to_decimal(self.config.get_atr_multiplier(strategy));
        match side {
            Side::Long => (entry - distance).max(fixed),
            Side::Short => (entry + distance).min(fixed),
        }
    }

    /// 설정과 시장 컨텍스트에 따라 손절 가격을 계산합니다.
    pub fn calculate(
        &self,
        entry: Price,
        side: Side,
        market: &MarketContext,
        strategy: Option<&str>,
    ) -> Price {
        if self.config.atr_stop_enabled {
            self.atr_stop(entry, side, market.atr, strategy)
        } else {
            self.fixed_stop(entry, side, strategy)
        }
    }
}
