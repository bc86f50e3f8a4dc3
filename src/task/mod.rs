//! # 과제 데이터
//!
//! 학습/분석에 쓰이는 합성 맥락 의존 결정 과제

pub mod context_task;


pub use context_task::{Context, TaskConfig, TaskDataset, TrialCondition};
