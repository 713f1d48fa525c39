//! # Solo Core
//!
//! 단일 자산 트레이딩 봇의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 리스크/포지션 관리 엔진 전반에서 사용되는 기본 타입을 제공합니다:
//! - 포지션 상태 머신 및 극값 추적
//! - 청산 거래 기록
//! - 외부 공급 시장 컨텍스트 (ATR/변동성)
//! - 에러 타입
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
