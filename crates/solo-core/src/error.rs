//! 트레이딩 엔진의 에러 타입.
//!
//! 이 모듈은 리스크/포지션 관리 엔진 전반에서 사용되는 에러 타입을 정의합니다.
//!
//! 에러 분류:
//! - 잘못된 입력(음수 잔고 등)은 에러가 아닌 0/센티널 결과로 처리됩니다
//! - 데이터 부족(ATR 미제공 등)은 안전한 모드로 폴백합니다
//! - 상태 불일치(포지션 없는데 청산 요청 등)만 이 에러로 표면화됩니다

use thiserror::Error;

/// 핵심 엔진 에러.
#[derive(Debug, Error)]
pub enum EngineError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 포지션 상태 에러
    #[error("포지션 에러: {0}")]
    Position(String),

    /// 리스크 관리 에러
    #[error("리스크 에러: {0}")]
    Risk(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 엔진 작업을 위한 Result 타입.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// 상태 불일치 에러인지 확인합니다.
    ///
    /// 상태 불일치는 호출자가 로그 후 해당 사이클을 건너뛰어야 하는 에러입니다.
    /// 엔진 내부에서는 절대 재시도하지 않습니다.
    pub fn is_state_inconsistency(&self) -> bool {
        matches!(self, EngineError::Position(_))
    }

    /// 치명적인 에러인지 확인합니다.
    pub fn is_critical(&self) -> bool {
        matches!(self, EngineError::Config(_) | EngineError::Internal(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
