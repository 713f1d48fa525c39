//! 포지션 방향.

use serde::{Deserialize, Serialize};

/// 레버리지 포지션의 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// 롱 (가격 상승에 베팅)
    Long,
    /// 숏 (가격 하락에 베팅)
    Short,
}

impl Side {
    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}
