//! # Solo Risk
//!
//! 단일 자산 레버리지 트레이딩 봇의 리스크 및 포지션 관리 엔진.
//!
//! 주요 구성 요소:
//! - `RiskManager` - 진입 게이트, 포지션 라이프사이클, 청산 트리거를 묶는 오케스트레이터
//! - `PositionSizer` - Kelly/변동성/드로다운 조정이 반영된 포지션 사이징
//! - `StopLossCalculator` / `TakeProfitCalculator` - 보호 가격 계산
//! - `TrailingStopEngine` - 극값 기반 트레일링 손절
//! - `DynamicTakeProfitEngine` - 수수료 인식 동적 트레일링 익절
//! - `TradeStatisticsTracker` - 거래 통계 및 Kelly 비율
//! - `DrawdownController` - 드로다운 감시 및 거래 잠금
//!
//! ## 사용 예시
//!
//! ```rust
//! use rust_decimal_macros::dec;
//! use solo_core::{MarketContext, Side};
//! use solo_risk::{RiskConfig, RiskManager};
//!
//! let mut manager = RiskManager::new(RiskConfig::default(), dec!(10000)).unwrap();
//!
//! if manager.can_open_position().allowed {
//!     let market = MarketContext::empty();
//!     let amount = manager.calculate_position_size(dec!(10000), dec!(100000), 0.8, &market);
//!     manager
//!         .open_position(Side::Long, amount, dec!(100000), &market, None)
//!         .unwrap();
//! }
//! ```

pub mod config;
pub mod drawdown;
pub mod dynamic_take_profit;
pub mod manager;
pub mod sizing;
pub mod statistics;
pub mod stop_loss;
pub mod take_profit;
pub mod trailing_stop;

pub use config::{ConfigValidationError, RiskConfig, StrategyRiskConfig};
pub use drawdown::{DrawdownController, DrawdownLock};
pub use dynamic_take_profit::DynamicTakeProfitEngine;
pub use manager::{EntryDecision, RiskManager, RiskReport, StopTrigger};
pub use sizing::PositionSizer;
pub use statistics::{RiskMetrics, TradeStatisticsTracker};
pub use stop_loss::{StopLossCalculator, StopType};
pub use take_profit::{TakeProfitBasis, TakeProfitCalculator};
pub use trailing_stop::TrailingStopEngine;
