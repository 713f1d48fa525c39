//! 리스크 관리 설정.
//!
//! 포지션 사이징, 보호 가격(손절/익절/트레일링), 진입 게이트,
//! 드로다운 잠금을 위한 설정 구조체를 정의합니다.
//!
//! 모든 필드는 컴파일 타임에 타입이 확정되고 기본값이 명시됩니다.
//! 동적 속성 조회는 사용하지 않으며, 검증은 생성 직후 `validate()`로
//! 한 번만 수행합니다.
//!
//! 단위 규약:
//! - `*_pct` 필드는 백분율 숫자입니다 (2.0 = 2%)
//! - `*_ratio`, 드로다운, Kelly 관련 필드는 소수 비율입니다 (0.1 = 10%)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 전역 리스크 관리 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    // ==================== Position Sizing ====================
    /// 잔고 대비 기본 목표 포지션 비율 (기본값: 10%)
    #[serde(default = "default_position_ratio")]
    pub position_ratio: f64,

    /// Kelly 기준 사이징 사용 여부 (기본값: true)
    #[serde(default = "default_true")]
    pub kelly_enabled: bool,

    /// Kelly 적용에 필요한 최소 거래 표본 수 (기본값: 10)
    #[serde(default = "default_kelly_min_trades")]
    pub kelly_min_trades: usize,

    /// 안전을 위한 fractional Kelly 배수 (기본값: 0.5 = half-Kelly)
    #[serde(default = "default_fractional_kelly")]
    pub fractional_kelly: f64,

    /// 고변동성 임계값 (비율, 기본값: 5%)
    #[serde(default = "default_high_volatility_threshold")]
    pub high_volatility_threshold: f64,

    /// 저변동성 임계값 (비율, 기본값: 1%)
    #[serde(default = "default_low_volatility_threshold")]
    pub low_volatility_threshold: f64,

    /// 고변동성 시 축소 배수 (기본값: 0.6)
    #[serde(default = "default_high_volatility_damp")]
    pub high_volatility_damp: f64,

    /// 저변동성 시 확대 배수 (최대 1.2, 기본값: 1.2)
    #[serde(default = "default_low_volatility_boost")]
    pub low_volatility_boost: f64,

    /// 호가 통화 기준 최소 주문 명목 가치 (기본값: 10.0)
    #[serde(default = "default_min_order_notional")]
    pub min_order_notional: Decimal,

    /// 호가 통화 기준 최대 주문 명목 가치 (기본값: 5000.0)
    #[serde(default = "default_max_order_notional")]
    pub max_order_notional: Decimal,

    // ==================== Protective Levels ====================
    /// 레버리지 배수 (기본값: 10)
    #[serde(default = "default_leverage")]
    pub leverage: u32,

    /// 증거금 기준 손절 비율 (기본값: 5%)
    /// 가격 거리로는 `stop_loss_pct / leverage`가 적용됩니다
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,

    /// ATR 기반 손절 사용 여부 (기본값: true)
    #[serde(default = "default_true")]
    pub atr_stop_enabled: bool,

    /// ATR 손절 승수 (기본값: 2.0)
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: f64,

    /// 진입가 대비 고정 익절 비율 (기본값: 3%)
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,

    /// 손익비 기반 익절의 보상 배수 (기본값: 2.0)
    #[serde(default = "default_reward_ratio")]
    pub reward_ratio: f64,

    /// 트레일링 손절 사용 여부 (기본값: true)
    #[serde(default = "default_true")]
    pub trailing_stop_enabled: bool,

    /// 트레일링 손절 거리 비율 (기본값: 1.5%)
    #[serde(default = "default_trailing_stop_pct")]
    pub trailing_stop_pct: f64,

    // ==================== Dynamic Trailing Take-Profit ====================
    /// 체결 수수료율 (비율, 기본값: 0.0004 = 0.04%)
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,

    /// 수익 잠금 활성화를 위한 최소 순수익 (USDT, 기본값: 0.012)
    #[serde(default = "default_min_profit_threshold")]
    pub min_profit_threshold: Decimal,

    /// 최근 가격 윈도우 길이 (기본값: 5)
    #[serde(default = "default_price_window")]
    pub price_window: usize,

    /// 윈도우 평균 대비 되돌림 비율 (기본값: 0.5%)
    #[serde(default = "default_fallback_pct")]
    pub fallback_pct: f64,

    // ==================== Entry Gates ====================
    /// 진입 간 최소 대기 시간 (초, 기본값: 300)
    #[serde(default = "default_trade_cooldown_secs")]
    pub trade_cooldown_secs: i64,

    /// 손실 후 재진입 대기 시간 (초, 기본값: 1800)
    #[serde(default = "default_loss_cooldown_secs")]
    pub loss_cooldown_secs: i64,

    /// 일일 최대 거래 횟수 (기본값: 20)
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: usize,

    /// 당일 시작 자본 대비 최대 일일 손실 비율 (백분율, 기본값: 3%)
    #[serde(default = "default_max_daily_loss_pct")]
    pub max_daily_loss_pct: f64,

    /// 진입을 차단하는 연속 손실 횟수 (기본값: 5)
    #[serde(default = "default_max_consecutive_losses")]
    pub max_consecutive_losses: usize,

    /// 포지션당 최대 추가 진입 횟수 (기본값: 2)
    #[serde(default = "default_max_adds")]
    pub max_adds: u8,

    // ==================== Drawdown Lock ====================
    /// 일일 피크 대비 최대 드로다운 (비율, 기본값: 5%)
    #[serde(default = "default_max_daily_drawdown")]
    pub max_daily_drawdown: f64,

    /// 전체 피크 대비 최대 드로다운 (비율, 기본값: 20%)
    #[serde(default = "default_max_total_drawdown")]
    pub max_total_drawdown: f64,

    /// 잠금 해제에 필요한 드로다운 회복 비율 (기본값: 0.5)
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: f64,

    /// 잠금 후 최소 유지 시간 (시간, 기본값: 4)
    #[serde(default = "default_min_lock_hours")]
    pub min_lock_hours: i64,

    // ==================== Strategy Overrides ====================
    /// 전략별 리스크 설정 (전역 설정을 재정의함)
    #[serde(default)]
    pub strategy_overrides: HashMap<String, StrategyRiskConfig>,
}

/// 전략별 리스크 설정.
/// 여기의 값들은 특정 전략에 대해 전역 RiskConfig를 재정의합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyRiskConfig {
    /// 이 전략의 손절 비율 (전역 설정 재정의)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_pct: Option<f64>,

    /// 이 전략의 ATR 승수 (전역 설정 재정의)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr_multiplier: Option<f64>,

    /// 이 전략의 고정 익절 비율 (전역 설정 재정의)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_pct: Option<f64>,
}

// 기본값 함수들
fn default_position_ratio() -> f64 {
    0.10
}

fn default_kelly_min_trades() -> usize {
    10
}

fn default_fractional_kelly() -> f64 {
    0.5
}

fn default_high_volatility_threshold() -> f64 {
    0.05
}

fn default_low_volatility_threshold() -> f64 {
    0.01
}

fn default_high_volatility_damp() -> f64 {
    0.6
}

fn default_low_volatility_boost() -> f64 {
    1.2
}

fn default_min_order_notional() -> Decimal {
    Decimal::from(10)
}

fn default_max_order_notional() -> Decimal {
    Decimal::from(5000)
}

fn default_leverage() -> u32 {
    10
}

fn default_stop_loss_pct() -> f64 {
    5.0
}

fn default_atr_multiplier() -> f64 {
    2.0
}

fn default_take_profit_pct() -> f64 {
    3.0
}

fn default_reward_ratio() -> f64 {
    2.0
}

fn default_trailing_stop_pct() -> f64 {
    1.5
}

fn default_fee_rate() -> f64 {
    0.0004
}

fn default_min_profit_threshold() -> Decimal {
    Decimal::new(12, 3) // 0.012
}

fn default_price_window() -> usize {
    5
}

fn default_fallback_pct() -> f64 {
    0.5
}

fn default_trade_cooldown_secs() -> i64 {
    300
}

fn default_loss_cooldown_secs() -> i64 {
    1800
}

fn default_max_daily_trades() -> usize {
    20
}

fn default_max_daily_loss_pct() -> f64 {
    3.0
}

fn default_max_consecutive_losses() -> usize {
    5
}

fn default_max_adds() -> u8 {
    2
}

fn default_max_daily_drawdown() -> f64 {
    0.05
}

fn default_max_total_drawdown() -> f64 {
    0.20
}

fn default_recovery_threshold() -> f64 {
    0.5
}

fn default_min_lock_hours() -> i64 {
    4
}

fn default_true() -> bool {
    true
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            position_ratio: default_position_ratio(),
            kelly_enabled: true,
            kelly_min_trades: default_kelly_min_trades(),
            fractional_kelly: default_fractional_kelly(),
            high_volatility_threshold: default_high_volatility_threshold(),
            low_volatility_threshold: default_low_volatility_threshold(),
            high_volatility_damp: default_high_volatility_damp(),
            low_volatility_boost: default_low_volatility_boost(),
            min_order_notional: default_min_order_notional(),
            max_order_notional: default_max_order_notional(),
            leverage: default_leverage(),
            stop_loss_pct: default_stop_loss_pct(),
            atr_stop_enabled: true,
            atr_multiplier: default_atr_multiplier(),
            take_profit_pct: default_take_profit_pct(),
            reward_ratio: default_reward_ratio(),
            trailing_stop_enabled: true,
            trailing_stop_pct: default_trailing_stop_pct(),
            fee_rate: default_fee_rate(),
            min_profit_threshold: default_min_profit_threshold(),
            price_window: default_price_window(),
            fallback_pct: default_fallback_pct(),
            trade_cooldown_secs: default_trade_cooldown_secs(),
            loss_cooldown_secs: default_loss_cooldown_secs(),
            max_daily_trades: default_max_daily_trades(),
            max_daily_loss_pct: default_max_daily_loss_pct(),
            max_consecutive_losses: default_max_consecutive_losses(),
            max_adds: default_max_adds(),
            max_daily_drawdown: default_max_daily_drawdown(),
            max_total_drawdown: default_max_total_drawdown(),
            recovery_threshold: default_recovery_threshold(),
            min_lock_hours: default_min_lock_hours(),
            strategy_overrides: HashMap::new(),
        }
    }
}

impl RiskConfig {
    /// 기본값으로 새 RiskConfig를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 보수적인 리스크 설정을 생성합니다 (낮은 한도).
    pub fn conservative() -> Self {
        Self {
            position_ratio: 0.05,
            leverage: 5,
            stop_loss_pct: 3.0,
            take_profit_pct: 2.0,
            trailing_stop_pct: 1.0,
            max_daily_trades: 10,
            max_consecutive_losses: 3,
            max_daily_drawdown: 0.03,
            max_total_drawdown: 0.10,
            ..Self::default()
        }
    }

    /// 공격적인 리스크 설정을 생성합니다 (높은 한도).
    pub fn aggressive() -> Self {
        Self {
            position_ratio: 0.20,
            leverage: 20,
            stop_loss_pct: 8.0,
            take_profit_pct: 5.0,
            trailing_stop_pct: 2.0,
            max_daily_trades: 40,
            max_consecutive_losses: 8,
            max_daily_drawdown: 0.08,
            max_total_drawdown: 0.30,
            ..Self::default()
        }
    }

    /// 전략에 대한 유효 손절 비율을 가져옵니다.
    /// 전략별 값이 설정되어 있으면 해당 값을 반환하고, 그렇지 않으면 전역 기본값을 반환합니다.
    pub fn get_stop_loss_pct(&self, strategy: Option<&str>) -> f64 {
        strategy
            .and_then(|s| self.strategy_overrides.get(s))
            .and_then(|c| c.stop_loss_pct)
            .unwrap_or(self.stop_loss_pct)
    }

    /// 전략에 대한 유효 ATR 승수를 가져옵니다.
    pub fn get_atr_multiplier(&self, strategy: Option<&str>) -> f64 {
        strategy
            .and_then(|s| self.strategy_overrides.get(s))
            .and_then(|c| c.atr_multiplier)
            .unwrap_or(self.atr_multiplier)
    }

    /// 전략에 대한 유효 고정 익절 비율을 가져옵니다.
    pub fn get_take_profit_pct(&self, strategy: Option<&str>) -> f64 {
        strategy
            .and_then(|s| self.strategy_overrides.get(s))
            .and_then(|c| c.take_profit_pct)
            .unwrap_or(self.take_profit_pct)
    }

    /// 전략별 설정을 추가하거나 업데이트합니다.
    pub fn set_strategy_override(
        &mut self,
        strategy: impl Into<String>,
        config: StrategyRiskConfig,
    ) {
        self.strategy_overrides.insert(strategy.into(), config);
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.position_ratio <= 0.0 || self.position_ratio > 0.5 {
            return Err(ConfigValidationError::InvalidValue(
                "position_ratio must be between 0 and 0.5".into(),
            ));
        }

        if self.leverage == 0 || self.leverage > 125 {
            return Err(ConfigValidationError::InvalidValue(
                "leverage must be between 1 and 125".into(),
            ));
        }

        if self.stop_loss_pct <= 0.0 || self.stop_loss_pct > 50.0 {
            return Err(ConfigValidationError::InvalidValue(
                "stop_loss_pct must be between 0 and 50".into(),
            ));
        }

        if self.take_profit_pct <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "take_profit_pct must be greater than 0".into(),
            ));
        }

        if self.reward_ratio <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "reward_ratio must be greater than 0".into(),
            ));
        }

        if self.fractional_kelly <= 0.0 || self.fractional_kelly > 1.0 {
            return Err(ConfigValidationError::InvalidValue(
                "fractional_kelly must be in (0, 1]".into(),
            ));
        }

        if self.low_volatility_boost < 1.0 || self.low_volatility_boost > 1.2 {
            return Err(ConfigValidationError::InvalidValue(
                "low_volatility_boost must be in [1.0, 1.2]".into(),
            ));
        }

        if self.high_volatility_damp <= 0.0 || self.high_volatility_damp >= 1.0 {
            return Err(ConfigValidationError::InvalidValue(
                "high_volatility_damp must be in (0, 1)".into(),
            ));
        }

        if self.low_volatility_threshold >= self.high_volatility_threshold {
            return Err(ConfigValidationError::InvalidValue(
                "low_volatility_threshold must be below high_volatility_threshold".into(),
            ));
        }

        if self.min_order_notional <= Decimal::ZERO
            || self.max_order_notional < self.min_order_notional
        {
            return Err(ConfigValidationError::InvalidValue(
                "order notional bounds must satisfy 0 < min <= max".into(),
            ));
        }

        if self.price_window == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "price_window must be at least 1".into(),
            ));
        }

        if self.fallback_pct <= 0.0 || self.fallback_pct >= 100.0 {
            return Err(ConfigValidationError::InvalidValue(
                "fallback_pct must be in (0, 100)".into(),
            ));
        }

        if self.max_daily_drawdown <= 0.0 || self.max_daily_drawdown >= 1.0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_daily_drawdown must be in (0, 1)".into(),
            ));
        }

        if self.max_total_drawdown <= 0.0 || self.max_total_drawdown >= 1.0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_total_drawdown must be in (0, 1)".into(),
            ));
        }

        if self.recovery_threshold <= 0.0 || self.recovery_threshold > 1.0 {
            return Err(ConfigValidationError::InvalidValue(
                "recovery_threshold must be in (0, 1]".into(),
            ));
        }

        if self.min_lock_hours < 0 {
            return Err(ConfigValidationError::InvalidValue(
                "min_lock_hours must not be negative".into(),
            ));
        }

        Ok(())
    }
}

/// 설정 검증 오류.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RiskConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.position_ratio, 0.10);
        assert_eq!(config.leverage, 10);
        assert_eq!(config.max_consecutive_losses, 5);
        assert_eq!(config.max_adds, 2);
        assert_eq!(config.price_window, 5);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(RiskConfig::conservative().validate().is_ok());
        assert!(RiskConfig::aggressive().validate().is_ok());

        let conservative = RiskConfig::conservative();
        assert!(conservative.position_ratio < RiskConfig::default().position_ratio);
    }

    #[test]
    fn test_strategy_override_lookup() {
        let mut config = RiskConfig::default();
        config.set_strategy_override(
            "scalper",
            StrategyRiskConfig {
                stop_loss_pct: Some(2.0),
                atr_multiplier: Some(1.5),
                take_profit_pct: None,
            },
        );

        // 전략별 값
        assert_eq!(config.get_stop_loss_pct(Some("scalper")), 2.0);
        assert_eq!(config.get_atr_multiplier(Some("scalper")), 1.5);

        // 설정되지 않은 값은 전역 설정으로 폴백
        assert_eq!(config.get_take_profit_pct(Some("scalper")), 3.0);

        // 알려지지 않은 전략은 전역 기본값 사용
        assert_eq!(config.get_stop_loss_pct(Some("swing")), 5.0);
        assert_eq!(config.get_stop_loss_pct(None), 5.0);
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let mut invalid = RiskConfig::default();
        invalid.position_ratio = 0.9;
        assert!(invalid.validate().is_err());

        let mut invalid = RiskConfig::default();
        invalid.leverage = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = RiskConfig::default();
        invalid.low_volatility_boost = 1.5;
        assert!(invalid.validate().is_err());

        let mut invalid = RiskConfig::default();
        invalid.price_window = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = RiskConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: RiskConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.position_ratio, deserialized.position_ratio);
        assert_eq!(config.min_profit_threshold, deserialized.min_profit_threshold);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RiskConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.leverage, 10);
        assert_eq!(config.fee_rate, 0.0004);
        assert!(config.kelly_enabled);
    }
}
