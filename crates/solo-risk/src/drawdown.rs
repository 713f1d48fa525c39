//! 드로다운 기반 거래 잠금.
//!
//! 자본 곡선의 일일/전체 피크를 추적하고, 드로다운이 설정된 한도를
//! 넘으면 신규 진입을 잠급니다. 잠금 해제는 히스테리시스를 따릅니다:
//! 드로다운이 충분히 회복되고 최소 잠금 시간이 지나야 풀립니다.
//!
//! 시간 의존 로직은 모두 `*_at(now)` 변형으로 노출되어
//! 시계 주입 없이 테스트할 수 있습니다.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RiskConfig;

/// 활성 드로다운 잠금 상태.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownLock {
    /// 잠금 시각
    pub locked_at: DateTime<Utc>,
    /// 잠금 시점의 전체 드로다운 (비율)
    pub drawdown_at_lock: f64,
    /// 잠금 사유
    pub reason: String,
}

/// 자본 드로다운 감시 및 잠금 컨트롤러.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownController {
    /// 당일 자본 피크
    daily_peak: Decimal,
    /// 전체 자본 피크
    total_peak: Decimal,
    /// 마지막으로 관측한 자본
    last_equity: Decimal,
    /// 관측된 최대 전체 드로다운 (비율)
    max_drawdown: f64,
    /// 현재 잠금 (없으면 거래 허용)
    lock: Option<DrawdownLock>,
    /// 일일 한도 (비율)
    max_daily_drawdown: f64,
    /// 전체 한도 (비율)
    max_total_drawdown: f64,
    /// 해제에 필요한 회복 비율
    recovery_threshold: f64,
    /// 최소 잠금 유지 시간
    min_lock_hours: i64,
}

impl DrawdownController {
    /// 초기 자본으로 컨트롤러를 생성합니다.
    pub fn new(config: &RiskConfig, initial_equity: Decimal) -> Self {
        Self {
            daily_peak: initial_equity,
            total_peak: initial_equity,
            last_equity: initial_equity,
            max_drawdown: 0.0,
            lock: None,
            max_daily_drawdown: config.max_daily_drawdown,
            max_total_drawdown: config.max_total_drawdown,
            recovery_threshold: config.recovery_threshold,
            min_lock_hours: config.min_lock_hours,
        }
    }

    /// 자본을 갱신하고 잠금 상태를 재평가합니다.
    pub fn update(&mut self, equity: Decimal) {
        self.update_at(equity, Utc::now());
    }

    /// 명시적 시각으로 자본을 갱신합니다 (테스트용 진입점).
    pub fn update_at(&mut self, equity: Decimal, now: DateTime<Utc>) {
        self.last_equity = equity;

        if equity > self.daily_peak {
            self.daily_peak = equity;
        }
        if equity > self.total_peak {
            self.total_peak = equity;
        }

        let daily_dd = self.daily_drawdown();
        let total_dd = self.total_drawdown();
        if total_dd > self.max_drawdown {
            self.max_drawdown = total_dd;
        }

        match &self.lock {
            None => {
                if daily_dd > self.max_daily_drawdown {
                    self.engage_lock(
                        now,
                        total_dd,
                        format!(
                            "Daily drawdown {:.2}% exceeded limit {:.2}%",
                            daily_dd * 100.0,
                            self.max_daily_drawdown * 100.0
                        ),
                    );
                } else if total_dd > self.max_total_drawdown {
                    self.engage_lock(
                        now,
                        total_dd,
                        format!(
                            "Total drawdown {:.2}% exceeded limit {:.2}%",
                            total_dd * 100.0,
                            self.max_total_drawdown * 100.0
                        ),
                    );
                }
            }
            Some(lock) => {
                let elapsed = now - lock.locked_at;
                let recovered =
                    total_dd <= lock.drawdown_at_lock * (1.0 - self.recovery_threshold);

                if recovered && elapsed >= Duration::hours(self.min_lock_hours) {
                    info!(
                        drawdown_pct = total_dd * 100.0,
                        locked_hours = elapsed.num_hours(),
                        "Drawdown lock released"
                    );
                    self.lock = None;
                }
            }
        }
    }

    fn engage_lock(&mut self, now: DateTime<Utc>, total_dd: f64, reason: String) {
        warn!(reason = %reason, "Trading locked by drawdown controller");
        self.lock = Some(DrawdownLock {
            locked_at: now,
            drawdown_at_lock: total_dd,
            reason,
        });
    }

    /// 신규 진입이 허용되는지 확인합니다.
    pub fn can_trade(&self) -> bool {
        self.lock.is_none()
    }

    /// 현재 잠금 상태를 반환합니다.
    pub fn current_lock(&self) -> Option<&DrawdownLock> {
        self.lock.as_ref()
    }

    /// 현재 일일 드로다운 (비율, 0.0 이상).
    pub fn daily_drawdown(&self) -> f64 {
        Self::drawdown_ratio(self.daily_peak, self.last_equity)
    }

    /// 현재 전체 드로다운 (비율, 0.0 이상).
    pub fn total_drawdown(&self) -> f64 {
        Self::drawdown_ratio(self.total_peak, self.last_equity)
    }

    /// 관측된 최대 전체 드로다운 (비율).
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// 전체 자본 피크.
    pub fn peak_equity(&self) -> Decimal {
        self.total_peak
    }

    fn drawdown_ratio(peak: Decimal, equity: Decimal) -> f64 {
        if peak <= Decimal::ZERO || equity >= peak {
            return 0.0;
        }
        ((peak - equity) / peak).to_f64().unwrap_or(0.0)
    }

    /// 일일 카운터를 리셋합니다 (UTC 자정 롤오버 시 호출).
    ///
    /// 일일 피크만 현재 자본으로 재설정하며 전체 피크와 잠금 상태는
    /// 유지됩니다.
    pub fn reset_daily(&mut self) {
        self.daily_peak = self.last_equity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn controller() -> DrawdownController {
        DrawdownController::new(&RiskConfig::default(), dec!(10000))
    }

    #[test]
    fn test_no_lock_within_limits() {
        let mut ctrl = controller();
        ctrl.update_at(dec!(9700), t0()); // -3%, 일일 한도 5% 이내
        assert!(ctrl.can_trade());
    }

    #[test]
    fn test_daily_drawdown_locks() {
        let mut ctrl = controller();
        ctrl.update_at(dec!(9400), t0()); // -6% > 일일 한도 5%

        assert!(!ctrl.can_trade());
        let lock = ctrl.current_lock().unwrap();
        assert!(lock.reason.contains("Daily drawdown"));
    }

    #[test]
    fn test_total_drawdown_locks() {
        let mut ctrl = controller();
        // 매일 리셋하면서 천천히 하락: 일일 한도는 안 걸리고 전체 한도만 걸린다
        ctrl.update_at(dec!(9700), t0());
        ctrl.reset_daily();
        ctrl.update_at(dec!(9400), t0() + Duration::days(1));
        ctrl.reset_daily();
        ctrl.update_at(dec!(9100), t0() + Duration::days(2));
        ctrl.reset_daily();
        assert!(ctrl.can_trade());

        // 전체 피크 10000 대비 -21%
        ctrl.update_at(dec!(7900), t0() + Duration::days(3));
        assert!(!ctrl.can_trade());
        assert!(ctrl
            .current_lock()
            .unwrap()
            .reason
            .contains("Total drawdown"));
    }

    #[test]
    fn test_unlock_requires_recovery_and_min_duration() {
        let mut ctrl = controller();
        ctrl.update_at(dec!(9400), t0());
        assert!(!ctrl.can_trade());

        // 회복은 됐지만 최소 잠금 시간(4시간) 전
        ctrl.update_at(dec!(9900), t0() + Duration::hours(1));
        assert!(!ctrl.can_trade());

        // 시간은 지났지만 회복 부족 (드로다운이 절반 이하로 줄지 않음)
        ctrl.update_at(dec!(9450), t0() + Duration::hours(5));
        assert!(!ctrl.can_trade());

        // 회복 + 시간 경과 → 해제
        ctrl.update_at(dec!(9900), t0() + Duration::hours(6));
        assert!(ctrl.can_trade());
    }

    #[test]
    fn test_reset_daily_keeps_total_peak() {
        let mut ctrl = controller();
        ctrl.update_at(dec!(9800), t0());
        ctrl.reset_daily();

        // 일일 피크는 9800으로 재설정, 전체 피크는 10000 유지
        ctrl.update_at(dec!(9800), t0() + Duration::days(1));
        assert_eq!(ctrl.daily_drawdown(), 0.0);
        assert!(ctrl.total_drawdown() > 0.0);
    }

    #[test]
    fn test_new_peak_clears_drawdown() {
        let mut ctrl = controller();
        ctrl.update_at(dec!(10500), t0());
        assert_eq!(ctrl.total_drawdown(), 0.0);

        ctrl.update_at(dec!(10200), t0() + Duration::hours(1));
        assert!((ctrl.total_drawdown() - 300.0 / 10500.0).abs() < 1e-9);
        assert_eq!(ctrl.peak_equity(), dec!(10500));
    }

    #[test]
    fn test_max_drawdown_is_sticky() {
        let mut ctrl = controller();
        ctrl.update_at(dec!(9700), t0());
        assert!((ctrl.max_drawdown() - 0.03).abs() < 1e-9);

        // 자본이 회복되어도 최대 드로다운은 유지된다
        ctrl.update_at(dec!(10000), t0() + Duration::hours(1));
        assert_eq!(ctrl.total_drawdown(), 0.0);
        assert!((ctrl.max_drawdown() - 0.03).abs() < 1e-9);
    }
}
