//! 정밀한 금융 계산을 위한 Decimal 유틸리티.
//!
//! 가격/수량 타입 별칭과, f64 비율을 정밀도 손실 없이 Decimal 연산에
//! 섞기 위한 정수 스케일링 헬퍼를 제공합니다.

use rust_decimal::Decimal;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 주문 수량을 위한 타입.
pub type Quantity = Decimal;

/// 정밀도를 위해 정수 연산을 사용하여 가격에 백분율 조정을 적용합니다.
///
/// 예시: `apply_pct(50000, -2.0)` = 49000 (2% 감소)
/// 예시: `apply_pct(50000, 5.0)` = 52500 (5% 증가)
pub fn apply_pct(price: Decimal, pct: f64) -> Decimal {
    // 백분율을 정수로 스케일링 (백분율에서 소수점 4자리까지 지원)
    // 공식: price * (1 + pct/100) = price * (100 + pct) / 100
    let scaled_factor = ((100.0 + pct) * 10000.0).round() as i64;
    (price * Decimal::from(scaled_factor)) / Decimal::from(1_000_000)
}

/// f64 비율(0.0004 = 0.04%)을 Decimal로 변환합니다.
///
/// 수수료율처럼 소수 형태로 주어지는 값에 사용하며,
/// 소수점 8자리까지 지원합니다.
pub fn ratio_to_decimal(ratio: f64) -> Decimal {
    Decimal::from((ratio * 100_000_000.0).round() as i64) / Decimal::from(100_000_000_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_pct() {
        assert_eq!(apply_pct(dec!(50000), -2.0), dec!(49000));
        assert_eq!(apply_pct(dec!(50000), 5.0), dec!(52500));
        assert_eq!(apply_pct(dec!(100), 0.0), dec!(100));
    }

    #[test]
    fn test_ratio_to_decimal() {
        assert_eq!(ratio_to_decimal(0.0004), dec!(0.0004));
        assert_eq!(ratio_to_decimal(0.5), dec!(0.5));
    }
}
