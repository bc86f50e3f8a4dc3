//! # 분석
//!
//! 학습된 망의 순전파 출력을 소비하는 정신측정 곡선 분석. 그림은 그리지 않는다.

pub mod psychometric;


pub use psychometric::{
    fit_psychometric, group_by_coherence, linspace, prob_right, psychometric, trial_choices,
    CoherenceAxis, PsychometricCurve, PsychometricFit, PsychometricReport, CURVE_POINTS,
};
