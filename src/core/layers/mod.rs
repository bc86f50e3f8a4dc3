//! # 구조 제약 선형 사상
//!
//! 입력 → 상태, 상태 → 상태, 상태 → 출력 세 사상

pub mod constrained_linear;


pub use constrained_linear::{ConstrainedLinear, MaskKind};
