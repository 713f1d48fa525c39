//! 트레이딩 운영을 위한 도메인 모델.

mod market;
mod position;
mod side;
mod trade;

pub use market::*;
pub use position::*;
pub use side::*;
pub use trade::*;
