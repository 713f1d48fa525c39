//! 리스크 관리 오케스트레이터.
//!
//! 포지션 상태 머신, 사이징, 보호 가격 계산기, 통계, 드로다운
//! 컨트롤러를 하나로 묶어 트레이딩 루프에 단일 진입점을 제공합니다.
//!
//! 모든 상태는 `RiskManager`가 소유합니다. 전역 상태나 싱글톤은 없으며,
//! 호출자가 인스턴스를 만들어 주입합니다. 시간 의존 게이트는 전부
//! `*_at(now)` 변형으로도 노출됩니다.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use solo_core::types::ratio_to_decimal;
use solo_core::{
    EngineError, EngineResult, MarketContext, Position, PositionState, Price, Quantity, Side,
    TradeRecord,
};

use crate::config::RiskConfig;
use crate::drawdown::DrawdownController;
use crate::dynamic_take_profit::DynamicTakeProfitEngine;
use crate::sizing::PositionSizer;
use crate::statistics::{RiskMetrics, TradeStatisticsTracker};
use crate::stop_loss::{StopLossCalculator, StopType};
use crate::take_profit::TakeProfitCalculator;
use crate::trailing_stop::TrailingStopEngine;

// ==================== Entry Decision ====================

/// 진입 가능 여부 판정 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDecision {
    /// 진입 허용 여부
    pub allowed: bool,
    /// 거부 사유 (허용 시 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EntryDecision {
    /// 진입 허용.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// 진입 거부.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

// ==================== Daily Counters ====================

/// UTC 자정 기준으로 리셋되는 일일 카운터.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounters {
    date: NaiveDate,
    trades: usize,
    realized_pnl: Decimal,
    start_equity: Decimal,
}

impl DailyCounters {
    fn new(date: NaiveDate, equity: Decimal) -> Self {
        Self {
            date,
            trades: 0,
            realized_pnl: Decimal::ZERO,
            start_equity: equity,
        }
    }

    /// 당일 시작 자본 대비 손실 비율 (백분율, 손실일 때만 양수).
    fn loss_pct(&self) -> f64 {
        if self.realized_pnl >= Decimal::ZERO || self.start_equity <= Decimal::ZERO {
            return 0.0;
        }
        ((-self.realized_pnl / self.start_equity) * Decimal::from(100))
            .to_f64()
            .unwrap_or(0.0)
    }
}

// ==================== Stop Trigger ====================

/// 청산 트리거 검사 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTrigger {
    /// 걸린 트리거 종류
    pub stop_type: StopType,
    /// 트리거 기준 가격
    pub stop_price: Price,
    /// 트리거 설명
    pub reason: String,
}

// ==================== Risk Report ====================

/// 직렬화 가능한 리스크 상태 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    /// 생성 시각
    pub timestamp: DateTime<Utc>,
    /// 포지션 보유 여부
    pub has_position: bool,
    /// 보유 중인 포지션 (있으면)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// 거래 통계 지표
    pub metrics: RiskMetrics,
    /// 당일 거래 횟수
    pub daily_trades: usize,
    /// 당일 실현 손익
    pub daily_realized_pnl: Decimal,
    /// 현재 일일 드로다운 (비율)
    pub daily_drawdown: f64,
    /// 현재 전체 드로다운 (비율)
    pub total_drawdown: f64,
    /// 관측된 최대 전체 드로다운 (비율)
    pub max_drawdown: f64,
    /// 전체 자본 피크
    pub peak_equity: Decimal,
    /// 드로다운 잠금 여부
    pub drawdown_locked: bool,
}

// ==================== Risk Manager ====================

/// 리스크 관리 엔진.
#[derive(Debug)]
pub struct RiskManager {
    config: RiskConfig,
    state: PositionState,
    stats: TradeStatisticsTracker,
    drawdown: DrawdownController,
    sizer: PositionSizer,
    stop_loss: StopLossCalculator,
    take_profit: TakeProfitCalculator,
    trailing: TrailingStopEngine,
    dynamic_tp: DynamicTakeProfitEngine,
    daily: DailyCounters,
    last_entry_at: Option<DateTime<Utc>>,
}

impl RiskManager {
    /// 설정을 검증하고 새 리스크 매니저를 생성합니다.
    pub fn new(config: RiskConfig, initial_equity: Decimal) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        Ok(Self {
            state: PositionState::NoPosition,
            stats: TradeStatisticsTracker::new(),
            drawdown: DrawdownController::new(&config, initial_equity),
            sizer: PositionSizer::new(config.clone()),
            stop_loss: StopLossCalculator::new(config.clone()),
            take_profit: TakeProfitCalculator::new(config.clone()),
            trailing: TrailingStopEngine::new(config.clone()),
            dynamic_tp: DynamicTakeProfitEngine::new(config.clone()),
            daily: DailyCounters::new(Utc::now().date_naive(), initial_equity),
            last_entry_at: None,
            config,
        })
    }

    /// 영속화된 거래 이력으로 통계를 복원합니다.
    pub fn with_history(mut self, history: &[TradeRecord]) -> Self {
        self.stats = TradeStatisticsTracker::from_history(history);
        self
    }

    // ==================== Entry Gates ====================

    /// 신규 진입이 허용되는지 판정합니다.
    pub fn can_open_position(&mut self) -> EntryDecision {
        self.can_open_position_at(Utc::now())
    }

    /// 명시적 시각으로 진입 게이트를 평가합니다 (테스트용 진입점).
    ///
    /// 게이트는 순서대로 평가되며 첫 번째 위반 사유를 반환합니다.
    pub fn can_open_position_at(&mut self, now: DateTime<Utc>) -> EntryDecision {
        self.rollover_daily_if_needed(now);

        if self.state.has_position() {
            return EntryDecision::deny("Position already open");
        }

        if !self.drawdown.can_trade() {
            return EntryDecision::deny("Trading locked by drawdown controller");
        }

        if self.daily.trades >= self.config.max_daily_trades {
            return EntryDecision::deny(format!(
                "Daily trade limit reached ({}/{})",
                self.daily.trades, self.config.max_daily_trades
            ));
        }

        if self.daily.loss_pct() >= self.config.max_daily_loss_pct {
            return EntryDecision::deny(format!(
                "Daily loss limit reached ({:.2}% >= {:.2}%)",
                self.daily.loss_pct(),
                self.config.max_daily_loss_pct
            ));
        }

        if self.stats.consecutive_losses >= self.config.max_consecutive_losses {
            return EntryDecision::deny(format!(
                "Too many consecutive losses ({})",
                self.stats.consecutive_losses
            ));
        }

        if let Some(last_entry) = self.last_entry_at {
            let elapsed = now - last_entry;
            if elapsed < Duration::seconds(self.config.trade_cooldown_secs) {
                return EntryDecision::deny(format!(
                    "Trade cooldown active ({}s remaining)",
                    self.config.trade_cooldown_secs - elapsed.num_seconds()
                ));
            }
        }

        if let Some(last_loss) = self.stats.last_loss_at {
            let elapsed = now - last_loss;
            if elapsed < Duration::seconds(self.config.loss_cooldown_secs) {
                return EntryDecision::deny(format!(
                    "Post-loss cooldown active ({}s remaining)",
                    self.config.loss_cooldown_secs - elapsed.num_seconds()
                ));
            }
        }

        EntryDecision::allow()
    }

    // ==================== Position Sizing ====================

    /// 현재 통계와 드로다운을 반영한 주문 수량을 계산합니다.
    pub fn calculate_position_size(
        &self,
        balance: Decimal,
        price: Price,
        signal_strength: f64,
        market: &MarketContext,
    ) -> Quantity {
        self.sizer.calculate_amount(
            balance,
            price,
            signal_strength,
            &self.stats,
            market,
            self.drawdown.total_drawdown(),
        )
    }

    // ==================== Position Lifecycle ====================

    /// 포지션을 열고 보호 가격을 계산합니다.
    pub fn open_position(
        &mut self,
        side: Side,
        amount: Quantity,
        price: Price,
        market: &MarketContext,
        strategy: Option<&str>,
    ) -> EngineResult<()> {
        self.open_position_at(side, amount, price, market, strategy, Utc::now())
    }

    /// 명시적 시각으로 포지션을 엽니다 (테스트용 진입점).
    pub fn open_position_at(
        &mut self,
        side: Side,
        amount: Quantity,
        price: Price,
        market: &MarketContext,
        strategy: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        if amount <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "open requires positive amount and price, got amount={} price={}",
                amount, price
            )));
        }

        let entry_fee = price * amount * ratio_to_decimal(self.config.fee_rate);
        let mut position = Position::open(side, amount, price, entry_fee, self.config.price_window);
        if let Some(s) = strategy {
            position = position.with_strategy(s);
        }

        apply_protective_levels(&self.stop_loss, &self.take_profit, &mut position, market);
        info!(
            side = %side,
            amount = %amount,
            entry = %price,
            notional = %position.notional_value(),
            stop_loss = ?position.stop_loss_price,
            take_profit = ?position.take_profit_price,
            "Position opened"
        );

        self.state.open(position)?;
        self.last_entry_at = Some(now);
        self.daily.trades += 1;
        Ok(())
    }

    /// 포지션에 추가 진입하고 보호 가격을 재계산합니다.
    pub fn add_position(
        &mut self,
        amount: Quantity,
        price: Price,
        market: &MarketContext,
    ) -> EngineResult<()> {
        let max_adds = self.config.max_adds;
        let position = self
            .state
            .position_mut()
            .ok_or_else(|| EngineError::Position("cannot add: no open position".to_string()))?;

        position.add(amount, price, max_adds)?;

        // 가중평균 진입가가 바뀌었으므로 보호 가격도 다시 계산한다
        apply_protective_levels(&self.stop_loss, &self.take_profit, position, market);
        info!(
            new_entry = %position.entry_price,
            add_count = position.add_count,
            "Position increased"
        );
        Ok(())
    }

    /// 현재 가격을 반영하고 트레일링 스톱을 갱신합니다.
    pub fn update_price(&mut self, price: Price) -> EngineResult<()> {
        let position = self.state.position_mut().ok_or_else(|| {
            EngineError::Position("cannot update price: no open position".to_string())
        })?;

        position.update_price(price);
        position.trailing_stop_price = self.trailing.calculate(position);
        Ok(())
    }

    /// 포지션을 부분 청산하고 실현 손익을 반환합니다.
    pub fn partial_close(&mut self, ratio: Decimal, price: Price) -> EngineResult<Decimal> {
        let pnl = self.state.partial_close(ratio, price)?;
        self.daily.realized_pnl += pnl;
        info!(ratio = %ratio, pnl = %pnl, "Position partially closed");
        Ok(pnl)
    }

    /// 포지션을 전량 청산하고 거래를 기록합니다.
    ///
    /// 반환되는 손익은 부분 청산 누계를 포함한 전체 실현 손익입니다.
    pub fn close_position(&mut self, price: Price) -> EngineResult<(Position, Decimal)> {
        self.close_position_at(price, Utc::now())
    }

    /// 명시적 시각으로 포지션을 청산합니다 (테스트용 진입점).
    pub fn close_position_at(
        &mut self,
        price: Price,
        now: DateTime<Utc>,
    ) -> EngineResult<(Position, Decimal)> {
        let (position, close_pnl) = self.state.close(price)?;
        let total_pnl = close_pnl + position.realized_pnl;

        let mut record = TradeRecord::with_timestamp(total_pnl, now);
        if let Some(s) = &position.strategy {
            record = record.with_strategy(s.clone());
        }
        self.record_trade_result(&record);

        if total_pnl < Decimal::ZERO {
            warn!(pnl = %total_pnl, exit = %price, "Position closed at a loss");
        } else {
            info!(pnl = %total_pnl, exit = %price, "Position closed");
        }
        Ok((position, total_pnl))
    }

    /// 청산 거래 결과를 통계와 일일 카운터에 반영합니다.
    pub fn record_trade_result(&mut self, record: &TradeRecord) {
        self.stats.record_trade_result(record);
        self.daily.realized_pnl += record.pnl;
    }

    // ==================== Exit Checks ====================

    /// 청산 트리거를 우선순위대로 검사합니다.
    ///
    /// 순서: 고정 손절 → ATR 손절 → 익절 → 트레일링 손절.
    /// 첫 번째로 걸린 트리거를 반환하고 이후 검사는 건너뜁니다.
    pub fn check_stop_loss(
        &self,
        current_price: Price,
        market: &MarketContext,
    ) -> Option<StopTrigger> {
        let position = self.state.position()?;
        let strategy = position.strategy.as_deref();

        // 1. 고정 손절
        if let Some(stop) = position.stop_loss_price {
            if crossed_against(position.side, current_price, stop) {
                return Some(StopTrigger {
                    stop_type: StopType::StopLoss,
                    stop_price: stop,
                    reason: format!("Price {} crossed stop loss {}", current_price, stop),
                });
            }
        }

        // 2. ATR 손절 (검사 시점의 시장 컨텍스트 기준)
        if self.config.atr_stop_enabled && market.atr.is_some() {
            let atr_stop =
                self.stop_loss
                    .atr_stop(position.entry_price, position.side, market.atr, strategy);
            if crossed_against(position.side, current_price, atr_stop) {
                return Some(StopTrigger {
                    stop_type: StopType::AtrStop,
                    stop_price: atr_stop,
                    reason: format!("Price {} crossed ATR stop {}", current_price, atr_stop),
                });
            }
        }

        // 3. 익절
        if let Some(target) = position.take_profit_price {
            if crossed_in_favor(position.side, current_price, target) {
                return Some(StopTrigger {
                    stop_type: StopType::TakeProfit,
                    stop_price: target,
                    reason: format!("Price {} reached take profit {}", current_price, target),
                });
            }
        }

        // 4. 트레일링 손절
        if self.trailing.is_triggered(position, current_price) {
            let stop = self.trailing.calculate(position).unwrap_or(current_price);
            return Some(StopTrigger {
                stop_type: StopType::TrailingStop,
                stop_price: stop,
                reason: format!("Price {} crossed trailing stop {}", current_price, stop),
            });
        }

        None
    }

    /// 동적 트레일링 익절 신호를 평가합니다.
    ///
    /// 청산해야 하면 `Some(청산 가격)`을 반환합니다.
    pub fn calculate_trailing_take_profit(&mut self, current_price: Price) -> Option<Price> {
        let position = self.state.position_mut()?;
        self.dynamic_tp.evaluate(position, current_price)
    }

    // ==================== Equity & Reporting ====================

    /// 자본을 갱신하고 드로다운 잠금을 재평가합니다.
    pub fn update_equity(&mut self, equity: Decimal) {
        self.update_equity_at(equity, Utc::now());
    }

    /// 명시적 시각으로 자본을 갱신합니다 (테스트용 진입점).
    pub fn update_equity_at(&mut self, equity: Decimal, now: DateTime<Utc>) {
        self.rollover_daily_if_needed(now);
        self.drawdown.update_at(equity, now);
    }

    /// UTC 날짜가 바뀌었으면 일일 카운터를 리셋합니다.
    fn rollover_daily_if_needed(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.daily.date {
            let next_equity = self.daily.start_equity + self.daily.realized_pnl;
            info!(date = %today, "Daily counters reset");
            self.daily = DailyCounters::new(today, next_equity);
            self.drawdown.reset_daily();
        }
    }

    /// 현재 리스크 상태 스냅샷을 생성합니다.
    pub fn get_risk_report(&self) -> RiskReport {
        RiskReport {
            timestamp: Utc::now(),
            has_position: self.state.has_position(),
            position: self.state.position().cloned(),
            metrics: self
                .stats
                .metrics(self.config.fractional_kelly, self.config.kelly_min_trades),
            daily_trades: self.daily.trades,
            daily_realized_pnl: self.daily.realized_pnl,
            daily_drawdown: self.drawdown.daily_drawdown(),
            total_drawdown: self.drawdown.total_drawdown(),
            max_drawdown: self.drawdown.max_drawdown(),
            peak_equity: self.drawdown.peak_equity(),
            drawdown_locked: !self.drawdown.can_trade(),
        }
    }

    /// 현재 포지션 참조.
    pub fn position(&self) -> Option<&Position> {
        self.state.position()
    }

    /// 거래 통계 참조.
    pub fn statistics(&self) -> &TradeStatisticsTracker {
        &self.stats
    }

    /// 설정 참조.
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}

/// 진입가 기준으로 손절/익절 가격을 다시 계산해 포지션에 기록합니다.
fn apply_protective_levels(
    stop_loss: &StopLossCalculator,
    take_profit: &TakeProfitCalculator,
    position: &mut Position,
    market: &MarketContext,
) {
    let strategy = position.strategy.clone();
    let strategy = strategy.as_deref();
    let stop = stop_loss.calculate(position.entry_price, position.side, market, strategy);
    let target = take_profit.calculate(position.entry_price, stop, position.side, strategy);

    position.stop_loss_price = Some(stop);
    position.take_profit_price = Some(target);
    position.trailing_stop_price = None;
}

/// 손실 방향으로 레벨을 넘었는지 (손절 판정).
fn crossed_against(side: Side, price: Price, level: Price) -> bool {
    match side {
        Side::Long => price <= level,
        Side::Short => price >= level,
    }
}

/// 이익 방향으로 레벨을 넘었는지 (익절 판정).
fn crossed_in_favor(side: Side, price: Price, level: Price) -> bool {
    match side {
        Side::Long => price >= level,
        Side::Short => price <= level,
    }
}
