//! 거래 통계 추적.
//!
//! 청산된 거래의 승/패 카운터, 연속/최대 연승·연패, 손익 합계를 누적하고,
//! Kelly 기준 사이징에 필요한 지표(승률, 평균 손익, 기대값, Kelly 비율)를
//! 파생합니다.
//!
//! 추적기는 시계를 직접 읽지 않습니다. 모든 기록은 `TradeRecord`의
//! 타임스탬프를 사용하므로 재현 가능한 테스트가 가능합니다.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solo_core::TradeRecord;
use tracing::debug;

/// Kelly 비율의 상한. 추정 오차를 감안해 풀 Kelly의 25%에서 자릅니다.
const KELLY_CAP: f64 = 0.25;

/// 청산 거래 누적 통계.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeStatisticsTracker {
    /// 총 거래 수
    pub total_trades: usize,
    /// 이익 거래 수 (손익 > 0)
    pub winning_trades: usize,
    /// 손실 거래 수 (손익 < 0)
    pub losing_trades: usize,
    /// 이익 거래의 손익 합계
    pub gross_profit: Decimal,
    /// 손실 거래의 손실 합계 (양수로 저장)
    pub gross_loss: Decimal,
    /// 현재 연속 손실 횟수
    pub consecutive_losses: usize,
    /// 현재 연속 이익 횟수
    pub consecutive_wins: usize,
    /// 관측된 최대 연속 이익 횟수
    pub max_consecutive_wins: usize,
    /// 관측된 최대 연속 손실 횟수
    pub max_consecutive_losses: usize,
    /// 마지막 손실 거래 시각
    pub last_loss_at: Option<DateTime<Utc>>,
    /// 마지막 거래 청산 시각
    pub last_trade_at: Option<DateTime<Utc>>,
}

/// 통계에서 파생된 리스크 지표.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// 총 거래 수
    pub total_trades: usize,
    /// 승률 (비율, 0.0 ~ 1.0)
    pub win_rate: f64,
    /// 평균 이익 (이익 거래 기준, 0 이상)
    pub avg_win: Decimal,
    /// 평균 손실 (손실 거래 기준, 부호 포함 0 이하)
    pub avg_loss: Decimal,
    /// 총 실현 손익
    pub total_pnl: Decimal,
    /// 거래당 기대 손익
    pub expectancy: Decimal,
    /// 손익 팩터 (총이익 / 총손실)
    pub profit_factor: f64,
    /// Fractional Kelly 비율
    pub kelly_fraction: f64,
    /// 현재 연속 이익 횟수
    pub consecutive_wins: usize,
    /// 현재 연속 손실 횟수
    pub consecutive_losses: usize,
    /// 관측된 최대 연속 이익 횟수
    pub max_consecutive_wins: usize,
    /// 관측된 최대 연속 손실 횟수
    pub max_consecutive_losses: usize,
}

impl TradeStatisticsTracker {
    /// 빈 추적기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 영속화된 거래 이력에서 카운터를 복원합니다.
    ///
    /// 기록 순서대로 재생하므로 연속/최대 연승·연패 카운터도 정확히
    /// 복원됩니다.
    pub fn from_history(history: &[TradeRecord]) -> Self {
        let mut tracker = Self::new();
        for record in history {
            tracker.record_trade_result(record);
        }
        debug!(
            total = tracker.total_trades,
            wins = tracker.winning_trades,
            losses = tracker.losing_trades,
            "Trade statistics rehydrated from history"
        );
        tracker
    }

    /// 청산된 거래 한 건을 기록합니다.
    ///
    /// 손익이 정확히 0인 거래는 총 거래 수에만 반영되고
    /// 승/패 어느 쪽에도 집계되지 않으며 연속 카운터를 건드리지 않습니다.
    pub fn record_trade_result(&mut self, record: &TradeRecord) {
        self.total_trades += 1;
        self.last_trade_at = Some(record.closed_at);

        if record.is_win() {
            self.winning_trades += 1;
            self.gross_profit += record.pnl;
            self.consecutive_wins += 1;
            self.consecutive_losses = 0;
            self.max_consecutive_wins = self.max_consecutive_wins.max(self.consecutive_wins);
        } else if record.is_loss() {
            self.losing_trades += 1;
            self.gross_loss += -record.pnl;
            self.consecutive_losses += 1;
            self.consecutive_wins = 0;
            self.max_consecutive_losses = self.max_consecutive_losses.max(self.consecutive_losses);
            self.last_loss_at = Some(record.closed_at);
        }
    }

    /// 승률을 계산합니다 (0.0 ~ 1.0).
    pub fn win_rate(&self) -> f64 {
        let classified = self.winning_trades + self.losing_trades;
        if classified == 0 {
            return 0.0;
        }
        self.winning_trades as f64 / classified as f64
    }

    /// 평균 이익을 계산합니다.
    pub fn avg_win(&self) -> Decimal {
        if self.winning_trades == 0 {
            return Decimal::ZERO;
        }
        self.gross_profit / Decimal::from(self.winning_trades)
    }

    /// 평균 손실의 크기를 계산합니다 (양수).
    ///
    /// Kelly 손익비 계산에 쓰는 내부 형태입니다. 지표 스냅샷의
    /// `avg_loss`는 부호를 포함한 값(0 이하)으로 노출됩니다.
    pub fn avg_loss(&self) -> Decimal {
        if self.losing_trades == 0 {
            return Decimal::ZERO;
        }
        self.gross_loss / Decimal::from(self.losing_trades)
    }

    /// 총 실현 손익을 계산합니다.
    pub fn total_pnl(&self) -> Decimal {
        self.gross_profit - self.gross_loss
    }

    /// 거래당 기대 손익을 계산합니다.
    ///
    /// `win_rate × avg_win − (1 − win_rate) × |avg_loss|`와 동치인
    /// `total_pnl / 분류된 거래 수`로 계산합니다 (0 손익 거래 제외).
    pub fn expectancy(&self) -> Decimal {
        let classified = self.winning_trades + self.losing_trades;
        if classified == 0 {
            return Decimal::ZERO;
        }
        self.total_pnl() / Decimal::from(classified)
    }

    /// 손익 팩터를 계산합니다.
    ///
    /// 손실이 전혀 없으면 비교 대상이 없으므로 0을 반환합니다.
    pub fn profit_factor(&self) -> f64 {
        if self.gross_loss.is_zero() {
            return 0.0;
        }
        (self.gross_profit / self.gross_loss)
            .to_f64()
            .unwrap_or(0.0)
    }

    /// Fractional Kelly 비율을 계산합니다.
    ///
    /// `f = w - (1 - w) / R` (w = 승률, R = 평균이익/평균손실)을
    /// `[0, 0.25]`로 클램프한 뒤 `fractional_kelly`를 곱합니다.
    ///
    /// 표본이 `min_trades` 미만이거나 평균 손실이 0이면 0을 반환합니다.
    pub fn kelly_fraction(&self, fractional_kelly: f64, min_trades: usize) -> f64 {
        if self.total_trades < min_trades {
            return 0.0;
        }

        let avg_loss = self.avg_loss();
        if avg_loss.is_zero() {
            return 0.0;
        }

        let win_rate = self.win_rate();
        let payoff_ratio = (self.avg_win() / avg_loss).to_f64().unwrap_or(0.0);
        if payoff_ratio <= 0.0 {
            return 0.0;
        }

        let raw_kelly = win_rate - (1.0 - win_rate) / payoff_ratio;
        raw_kelly.clamp(0.0, KELLY_CAP) * fractional_kelly
    }

    /// 현재 지표 스냅샷을 생성합니다.
    ///
    /// Kelly 파라미터는 설정에서 내려받습니다 (추적기는 설정을 갖지 않음).
    pub fn metrics(&self, fractional_kelly: f64, kelly_min_trades: usize) -> RiskMetrics {
        RiskMetrics {
            total_trades: self.total_trades,
            win_rate: self.win_rate(),
            avg_win: self.avg_win(),
            avg_loss: -self.avg_loss(),
            total_pnl: self.total_pnl(),
            expectancy: self.expectancy(),
            profit_factor: self.profit_factor(),
            kelly_fraction: self.kelly_fraction(fractional_kelly, kelly_min_trades),
            consecutive_wins: self.consecutive_wins,
            consecutive_losses: self.consecutive_losses,
            max_consecutive_wins: self.max_consecutive_wins,
            max_consecutive_losses: self.max_consecutive_losses,
        }
    }

    /// 모든 카운터를 초기화합니다.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record_n(tracker: &mut TradeStatisticsTracker, pnl: Decimal, n: usize) {
        for _ in 0..n {
            tracker.record_trade_result(&TradeRecord::new(pnl));
        }
    }

    #[test]
    fn test_win_rate_and_averages() {
        let mut tracker = TradeStatisticsTracker::new();
        record_n(&mut tracker, dec!(50), 12);
        record_n(&mut tracker, dec!(-30), 8);

        assert_eq!(tracker.total_trades, 20);
        assert_eq!(tracker.win_rate(), 0.6);
        assert_eq!(tracker.avg_win(), dec!(50));
        assert_eq!(tracker.avg_loss(), dec!(30));
    }

    #[test]
    fn test_expectancy_and_total_pnl() {
        let mut tracker = TradeStatisticsTracker::new();
        record_n(&mut tracker, dec!(50), 12);
        record_n(&mut tracker, dec!(-30), 8);

        // 총손익 600 - 240 = 360, 거래당 360 / 20 = 18
        assert_eq!(tracker.total_pnl(), dec!(360));
        assert_eq!(tracker.expectancy(), dec!(18));

        // 빈 추적기의 기대값은 0
        assert_eq!(TradeStatisticsTracker::new().expectancy(), Decimal::ZERO);
    }

    #[test]
    fn test_kelly_fraction_with_cap_and_half_kelly() {
        // 승률 60%, 손익비 50/30 → raw Kelly 0.36 → 캡 0.25 → half 0.125
        let mut tracker = TradeStatisticsTracker::new();
        record_n(&mut tracker, dec!(50), 12);
        record_n(&mut tracker, dec!(-30), 8);

        let kelly = tracker.kelly_fraction(0.5, 10);
        assert!((kelly - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_kelly_requires_minimum_sample() {
        let mut tracker = TradeStatisticsTracker::new();
        record_n(&mut tracker, dec!(50), 5);
        record_n(&mut tracker, dec!(-30), 4);

        assert_eq!(tracker.kelly_fraction(0.5, 10), 0.0);
    }

    #[test]
    fn test_kelly_zero_when_no_losses() {
        let mut tracker = TradeStatisticsTracker::new();
        record_n(&mut tracker, dec!(50), 15);

        // 평균 손실 0이면 손익비가 정의되지 않는다
        assert_eq!(tracker.kelly_fraction(0.5, 10), 0.0);
        assert_eq!(tracker.profit_factor(), 0.0);
    }

    #[test]
    fn test_negative_expectancy_clamps_to_zero() {
        let mut tracker = TradeStatisticsTracker::new();
        record_n(&mut tracker, dec!(10), 3);
        record_n(&mut tracker, dec!(-50), 9);

        assert_eq!(tracker.kelly_fraction(0.5, 10), 0.0);
    }

    #[test]
    fn test_streak_counters_track_current_and_max() {
        let mut tracker = TradeStatisticsTracker::new();

        // 패, 패, 승, 승, 승, 패
        record_n(&mut tracker, dec!(-10), 2);
        record_n(&mut tracker, dec!(20), 3);
        record_n(&mut tracker, dec!(-10), 1);

        assert_eq!(tracker.consecutive_losses, 1);
        assert_eq!(tracker.consecutive_wins, 0);
        assert_eq!(tracker.max_consecutive_wins, 3);
        assert_eq!(tracker.max_consecutive_losses, 2);
    }

    #[test]
    fn test_zero_pnl_trade_is_neutral() {
        let mut tracker = TradeStatisticsTracker::new();
        record_n(&mut tracker, dec!(-10), 2);
        tracker.record_trade_result(&TradeRecord::new(Decimal::ZERO));

        assert_eq!(tracker.total_trades, 3);
        assert_eq!(tracker.winning_trades, 0);
        assert_eq!(tracker.losing_trades, 2);
        // 무승부는 연속 손실을 끊지 않는다
        assert_eq!(tracker.consecutive_losses, 2);
    }

    #[test]
    fn test_metrics_snapshot_exposes_full_set() {
        let mut tracker = TradeStatisticsTracker::new();
        record_n(&mut tracker, dec!(50), 12);
        record_n(&mut tracker, dec!(-30), 8);

        let metrics = tracker.metrics(0.5, 10);
        assert_eq!(metrics.win_rate, 0.6);
        // 스냅샷의 평균 손실은 부호를 포함한다
        assert_eq!(metrics.avg_loss, dec!(-30));
        assert_eq!(metrics.total_pnl, dec!(360));
        assert_eq!(metrics.expectancy, dec!(18));
        assert!((metrics.kelly_fraction - 0.125).abs() < 1e-9);
        assert_eq!(metrics.max_consecutive_wins, 12);
        assert_eq!(metrics.max_consecutive_losses, 8);
    }

    #[test]
    fn test_from_history_replays_in_order() {
        let history = vec![
            TradeRecord::new(dec!(40)),
            TradeRecord::new(dec!(-20)),
            TradeRecord::new(dec!(-15)),
        ];
        let tracker = TradeStatisticsTracker::from_history(&history);

        assert_eq!(tracker.total_trades, 3);
        assert_eq!(tracker.consecutive_losses, 2);
        assert_eq!(tracker.max_consecutive_losses, 2);
        assert!(tracker.last_loss_at.is_some());
    }
}
