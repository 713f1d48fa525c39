//! 포지션 추적 및 관리.
//!
//! 이 모듈은 단일 자산 레버리지 포지션 관련 타입을 정의합니다:
//! - `Position` - 포지션 엔티티 (극값 추적, 수수료, 가격 윈도우 포함)
//! - `PositionState` - 명시적 상태 머신 (NoPosition / Open / PartiallyClosed)
//!
//! 포지션은 이름 있는 전이(`open`, `add`, `partial_close`, `close`)를 통해서만
//! 변경됩니다. 암묵적 변경 순서에 의존하지 않습니다.

use crate::domain::Side;
use crate::error::{EngineError, EngineResult};
use crate::types::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// 단일 자산 레버리지 포지션.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 내부 포지션 ID
    pub id: Uuid,
    /// 포지션 방향
    pub side: Side,
    /// 현재 보유 수량 (기초 자산 단위)
    pub amount: Quantity,
    /// 평균 진입 가격 (추가 진입 시 가중평균으로 갱신)
    pub entry_price: Price,
    /// 포지션 오픈 타임스탬프
    pub entry_time: DateTime<Utc>,
    /// 현재 시장 가격
    pub current_price: Price,
    /// 보유 중 관측된 최고가 (단조 증가)
    pub highest_price: Price,
    /// 보유 중 관측된 최저가 (단조 감소)
    pub lowest_price: Price,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 미실현 손익률 (백분율)
    pub unrealized_pnl_pct: Decimal,
    /// 추가 진입 횟수
    pub add_count: u8,
    /// 부분 청산 횟수
    pub partial_close_count: u8,
    /// 손절 가격 (진입/추가 시 재계산)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_price: Option<Price>,
    /// 익절 가격 (진입/추가 시 재계산)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_price: Option<Price>,
    /// 트레일링 스톱 가격 (활성화 전에는 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_stop_price: Option<Price>,
    /// 진입 수수료 (오픈 시점에 확정)
    pub entry_fee: Decimal,
    /// 최근 가격 윈도우 (고정 용량, 가장 오래된 값부터 제거)
    pub recent_prices: VecDeque<Price>,
    /// 가격 윈도우 용량
    pub price_window: usize,
    /// 최소 수익 임계값 도달 여부 (한번 true면 포지션 종료까지 유지)
    pub profit_threshold_reached: bool,
    /// 관측된 순수익의 최대값
    pub max_profit: Decimal,
    /// 부분 청산으로 실현된 손익 누계
    pub realized_pnl: Decimal,
    /// 이 포지션을 연 전략
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl Position {
    /// 새 포지션을 엽니다.
    ///
    /// 극값과 현재가는 진입가로 초기화됩니다.
    pub fn open(
        side: Side,
        amount: Quantity,
        entry_price: Price,
        entry_fee: Decimal,
        price_window: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            side,
            amount,
            entry_price,
            entry_time: Utc::now(),
            current_price: entry_price,
            highest_price: entry_price,
            lowest_price: entry_price,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            add_count: 0,
            partial_close_count: 0,
            stop_loss_price: None,
            take_profit_price: None,
            trailing_stop_price: None,
            entry_fee,
            recent_prices: VecDeque::with_capacity(price_window),
            price_window,
            profit_threshold_reached: false,
            max_profit: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            strategy: None,
        }
    }

    /// 전략 이름을 설정합니다.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// 현재 가격을 갱신하고 극값과 손익을 재계산합니다.
    ///
    /// 극값은 단조로만 확장됩니다: 최고가는 내려가지 않고 최저가는 올라가지 않습니다.
    pub fn update_price(&mut self, current_price: Price) {
        self.current_price = current_price;
        self.highest_price = self.highest_price.max(current_price);
        self.lowest_price = self.lowest_price.min(current_price);
        self.calculate_unrealized_pnl();
    }

    /// 현재 가격을 기반으로 미실현 손익을 계산합니다.
    fn calculate_unrealized_pnl(&mut self) {
        self.unrealized_pnl = self.gross_pnl(self.current_price);
        let entry_notional = self.entry_price * self.amount;
        self.unrealized_pnl_pct = if entry_notional > Decimal::ZERO {
            (self.unrealized_pnl / entry_notional) * Decimal::from(100)
        } else {
            Decimal::ZERO
        };
    }

    /// 주어진 가격에 전량 청산할 때의 총손익 (수수료 제외).
    pub fn gross_pnl(&self, price: Price) -> Decimal {
        let price_diff = match self.side {
            Side::Long => price - self.entry_price,
            Side::Short => self.entry_price - price,
        };
        price_diff * self.amount
    }

    /// 수수료를 반영한 순수익.
    ///
    /// 청산 수수료는 호출 시점의 가격으로 매번 다시 계산합니다.
    pub fn net_profit(&self, price: Price, fee_rate: Decimal) -> Decimal {
        let close_fee = price * self.amount * fee_rate;
        self.gross_pnl(price) - self.entry_fee - close_fee
    }

    /// 포지션의 명목 가치를 반환합니다.
    pub fn notional_value(&self) -> Decimal {
        self.current_price * self.amount
    }

    /// 최근 가격 윈도우에 가격을 추가합니다 (가득 차면 가장 오래된 값 제거).
    pub fn push_recent_price(&mut self, price: Price) {
        if self.price_window == 0 {
            return;
        }
        if self.recent_prices.len() == self.price_window {
            self.recent_prices.pop_front();
        }
        self.recent_prices.push_back(price);
    }

    /// 가격 윈도우가 가득 찼는지 확인합니다.
    pub fn price_window_full(&self) -> bool {
        self.price_window > 0 && self.recent_prices.len() == self.price_window
    }

    /// 가격 윈도우 평균.
    pub fn recent_price_average(&self) -> Option<Price> {
        if self.recent_prices.is_empty() {
            return None;
        }
        let sum: Decimal = self.recent_prices.iter().sum();
        Some(sum / Decimal::from(self.recent_prices.len()))
    }

    /// 포지션에 추가 진입합니다 (가중평균 진입가 재계산).
    ///
    /// # Arguments
    /// * `amount` - 추가 수량
    /// * `price` - 추가 진입 가격
    /// * `max_adds` - 허용되는 최대 추가 진입 횟수
    pub fn add(&mut self, amount: Quantity, price: Price, max_adds: u8) -> EngineResult<()> {
        if amount <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "add requires positive amount and price, got amount={} price={}",
                amount, price
            )));
        }
        if self.add_count >= max_adds {
            return Err(EngineError::Position(format!(
                "add limit reached ({}/{})",
                self.add_count, max_adds
            )));
        }

        let total_cost = (self.entry_price * self.amount) + (price * amount);
        self.amount += amount;
        self.entry_price = total_cost / self.amount;
        self.add_count += 1;

        // 새 진입가 기준으로 극값과 손익을 다시 맞춘다
        self.update_price(price);
        Ok(())
    }

    /// 포지션을 부분 청산하고 실현 손익을 반환합니다.
    ///
    /// # Arguments
    /// * `ratio` - 청산 비율 (0 초과 1 미만)
    /// * `price` - 청산 가격
    pub fn partial_close(&mut self, ratio: Decimal, price: Price) -> EngineResult<Decimal> {
        if ratio <= Decimal::ZERO || ratio >= Decimal::ONE {
            return Err(EngineError::InvalidInput(format!(
                "partial close ratio must be in (0, 1), got {}",
                ratio
            )));
        }

        let close_amount = self.amount * ratio;
        let pnl = match self.side {
            Side::Long => (price - self.entry_price) * close_amount,
            Side::Short => (self.entry_price - price) * close_amount,
        };

        self.amount -= close_amount;
        self.partial_close_count += 1;
        self.realized_pnl += pnl;
        self.update_price(price);
        Ok(pnl)
    }

    /// 전량 청산 시의 실현 손익을 계산합니다 (상태는 바꾸지 않음).
    ///
    /// 상태 전이는 `PositionState::close`가 담당합니다.
    pub fn close_pnl(&self, price: Price) -> Decimal {
        self.gross_pnl(price)
    }
}

/// 포지션 라이프사이클 상태 머신.
///
/// RiskManager가 단독으로 소유하며, 전이는 이름 있는 작업으로만 일어납니다:
/// `open` → Open, `partial_close` → PartiallyClosed, `close` → NoPosition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PositionState {
    /// 포지션 없음
    NoPosition,
    /// 오픈 상태
    Open(Position),
    /// 부분 청산됨 (잔여 수량 보유 중)
    PartiallyClosed(Position),
}

impl PositionState {
    /// 포지션이 존재하는지 확인합니다.
    pub fn has_position(&self) -> bool {
        !matches!(self, PositionState::NoPosition)
    }

    /// 보유 중인 포지션 참조.
    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionState::NoPosition => None,
            PositionState::Open(p) | PositionState::PartiallyClosed(p) => Some(p),
        }
    }

    /// 보유 중인 포지션 가변 참조.
    pub fn position_mut(&mut self) -> Option<&mut Position> {
        match self {
            PositionState::NoPosition => None,
            PositionState::Open(p) | PositionState::PartiallyClosed(p) => Some(p),
        }
    }

    /// 새 포지션을 엽니다.
    ///
    /// 이미 포지션이 있으면 상태 불일치 에러를 반환합니다.
    pub fn open(&mut self, position: Position) -> EngineResult<()> {
        if self.has_position() {
            return Err(EngineError::Position(
                "cannot open: position already exists".to_string(),
            ));
        }
        *self = PositionState::Open(position);
        Ok(())
    }

    /// 부분 청산 전이를 수행하고 실현 손익을 반환합니다.
    pub fn partial_close(&mut self, ratio: Decimal, price: Price) -> EngineResult<Decimal> {
        let position = self.position_mut().ok_or_else(|| {
            EngineError::Position("cannot partial close: no open position".to_string())
        })?;
        let pnl = position.partial_close(ratio, price)?;

        // Open → PartiallyClosed 전이 (이미 PartiallyClosed면 유지)
        if let PositionState::Open(p) = self {
            *self = PositionState::PartiallyClosed(p.clone());
        }
        Ok(pnl)
    }

    /// 포지션을 전량 청산하고 (청산된 포지션, 실현 손익)을 반환합니다.
    pub fn close(&mut self, price: Price) -> EngineResult<(Position, Decimal)> {
        match std::mem::replace(self, PositionState::NoPosition) {
            PositionState::NoPosition => Err(EngineError::Position(
                "cannot close: no open position".to_string(),
            )),
            PositionState::Open(p) | PositionState::PartiallyClosed(p) => {
                let pnl = p.close_pnl(price);
                Ok((p, pnl))
            }
        }
    }
}

impl Default for PositionState {
    fn default() -> Self {
        PositionState::NoPosition
    }
}
