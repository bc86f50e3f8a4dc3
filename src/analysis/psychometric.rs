//! 정신측정 곡선 분석
//!
//! 학습된 망의 순전파와 출력 사상만 사용한다. 시행마다 마지막 시점의
//! 출력 차이로 선택을 정하고, 맥락과 응집도별로 오른쪽 선택 확률을 모은 뒤
//! 2-파라미터 시그모이드를 레벤버그-마쿼트로 적합한다.

use crate::core::error::{LatentError, LatentResult};
use crate::core::network::LatentNet;
use crate::task::{Context, TrialCondition};
use nalgebra::{Matrix2, Vector2};
use ndarray::{s, ArrayView3};
use serde::{Deserialize, Serialize};

/// 곡선 샘플링 지점 수 ([-1, 1] 구간)
pub const CURVE_POINTS: usize = 15;

const MAX_ITERATIONS: usize = 200;
const STEP_TOLERANCE: f64 = 1e-10;

/// 1 / (1 + exp(−(x − α)/β))
pub fn psychometric(x: f32, alpha: f32, beta: f32) -> f32 {
    1.0 / (1.0 + libm::expf(-(x - alpha) / beta))
}

/// 양수 선택의 비율
pub fn prob_right(choices: &[f32]) -> f32 {
    if choices.is_empty() {
        return 0.0;
    }
    choices.iter().filter(|&&c| c > 0.0).count() as f32 / choices.len() as f32
}

pub fn linspace(start: f32, end: f32, points: usize) -> Vec<f32> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (points - 1) as f32;
            (0..points).map(|i| start + step * i as f32).collect()
        }
    }
}

/// 시행별 선택값: relu(out[last, 0] − out[last, 1])
pub fn trial_choices(net: &mut LatentNet, u: &ArrayView3<f32>) -> LatentResult<Vec<f32>> {
    if net.config().output_size < 2 {
        return Err(LatentError::Analysis(format!(
            "binary choice needs two outputs, network has {}",
            net.config().output_size
        )));
    }
    let x = net.forward(u)?;
    let output = net.output(&x.view())?;
    let last = output.dim().1 - 1;
    let readout = output.slice(s![.., last, ..]);
    Ok(readout
        .outer_iter()
        .map(|o| (o[0] - o[1]).max(0.0))
        .collect())
}

/// 응집도 축
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoherenceAxis {
    Motion,
    Color,
}

impl CoherenceAxis {
    pub fn of(&self, condition: &TrialCondition) -> f32 {
        match self {
            CoherenceAxis::Motion => condition.motion_coh,
            CoherenceAxis::Color => condition.color_coh,
        }
    }
}

/// 한 맥락 안에서 응집도별 오른쪽 선택 확률. 응집도 오름차순
pub fn group_by_coherence(
    conditions: &[TrialCondition],
    choices: &[f32],
    context: Context,
    axis: CoherenceAxis,
) -> LatentResult<Vec<(f32, f32)>> {
    if conditions.len() != choices.len() {
        return Err(LatentError::shape("trial choices", conditions.len(), choices.len()));
    }
    let mut samples: Vec<(f32, f32)> = conditions
        .iter()
        .zip(choices)
        .filter(|(c, _)| c.context == context)
        .map(|(c, &choice)| (axis.of(c), choice))
        .collect();
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut grouped = Vec::new();
    let mut start = 0;
    while start < samples.len() {
        let level = samples[start].0;
        let end = samples[start..]
            .iter()
            .position(|s| s.0 != level)
            .map_or(samples.len(), |offset| start + offset);
        let group: Vec<f32> = samples[start..end].iter().map(|s| s.1).collect();
        grouped.push((level, prob_right(&group)));
        start = end;
    }
    Ok(grouped)
}

/// 적합 결과
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsychometricFit {
    /// 편향 (50% 지점)
    pub alpha: f32,
    /// 기울기 척도
    pub beta: f32,
    /// 잔차 제곱합
    pub sse: f32,
    pub iterations: usize,
}

impl PsychometricFit {
    pub fn evaluate(&self, x: f32) -> f32 {
        psychometric(x, self.alpha, self.beta)
    }

    /// 주어진 지점에서의 곡선 (x, p)
    pub fn sample(&self, xs: &[f32]) -> Vec<(f32, f32)> {
        xs.iter().map(|&x| (x, self.evaluate(x))).collect()
    }
}

fn sum_squared_error(points: &[(f64, f64)], alpha: f64, beta: f64) -> f64 {
    points
        .iter()
        .map(|&(x, p)| {
            let f = 1.0 / (1.0 + (-(x - alpha) / beta).exp());
            (f - p).powi(2)
        })
        .sum()
}

/// 최소제곱 시그모이드 적합 (레벤버그-마쿼트)
pub fn fit_psychometric(points: &[(f32, f32)], initial: (f32, f32)) -> LatentResult<PsychometricFit> {
    if points.len() < 2 {
        return Err(LatentError::Analysis(format!(
            "need at least two points to fit two parameters, got {}",
            points.len()
        )));
    }
    if initial.1 == 0.0 {
        return Err(LatentError::Analysis("initial slope scale must be non-zero".into()));
    }
    let data: Vec<(f64, f64)> = points.iter().map(|&(x, p)| (x as f64, p as f64)).collect();

    let mut params = Vector2::new(initial.0 as f64, initial.1 as f64);
    let mut sse = sum_squared_error(&data, params[0], params[1]);
    let mut lambda = 1e-3;
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;
        let (alpha, beta) = (params[0], params[1]);

        let mut jtj = Matrix2::<f64>::zeros();
        let mut jtr = Vector2::<f64>::zeros();
        for &(x, p) in &data {
            let f = 1.0 / (1.0 + (-(x - alpha) / beta).exp());
            let slope = f * (1.0 - f);
            let jacobian = Vector2::new(-slope / beta, -slope * (x - alpha) / (beta * beta));
            jtj += jacobian * jacobian.transpose();
            jtr += jacobian * (f - p);
        }

        let mut damped = jtj;
        for i in 0..2 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
        }
        let delta = match damped.try_inverse() {
            Some(inverse) => -(inverse * jtr),
            None => break,
        };

        let candidate = params + delta;
        let candidate_sse = if candidate[1].abs() > 1e-9 {
            sum_squared_error(&data, candidate[0], candidate[1])
        } else {
            f64::INFINITY
        };

        if candidate_sse.is_finite() && candidate_sse <= sse {
            params = candidate;
            sse = candidate_sse;
            lambda = (lambda / 10.0).max(1e-12);
            if delta.norm() < STEP_TOLERANCE {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    if !params.iter().all(|v| v.is_finite()) || !sse.is_finite() {
        return Err(LatentError::Analysis("sigmoid fit diverged".into()));
    }
    Ok(PsychometricFit {
        alpha: params[0] as f32,
        beta: params[1] as f32,
        sse: sse as f32,
        iterations,
    })
}

/// 한 (맥락, 축) 조합의 관측점과 적합 곡선
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsychometricCurve {
    pub context: Context,
    pub axis: CoherenceAxis,
    /// (응집도, 오른쪽 선택 확률)
    pub observed: Vec<(f32, f32)>,
    pub fit: PsychometricFit,
    /// [-1, 1] 구간 샘플
    pub curve: Vec<(f32, f32)>,
}

/// 움직임/색 축 × 움직임/색 맥락 네 곡선
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsychometricReport {
    pub curves: Vec<PsychometricCurve>,
}

impl PsychometricReport {
    pub fn from_choices(conditions: &[TrialCondition], choices: &[f32]) -> LatentResult<Self> {
        let contrasts = linspace(-1.0, 1.0, CURVE_POINTS);
        let mut curves = Vec::with_capacity(4);
        for axis in [CoherenceAxis::Motion, CoherenceAxis::Color] {
            for context in Context::ALL {
                let observed = group_by_coherence(conditions, choices, context, axis)?;
                let fit = fit_psychometric(&observed, (0.0, 1.0))?;
                curves.push(PsychometricCurve {
                    context,
                    axis,
                    curve: fit.sample(&contrasts),
                    observed,
                    fit,
                });
            }
        }
        Ok(Self { curves })
    }

    /// 순전파 → 출력 사상 → 선택 → 곡선 적합
    pub fn from_network(
        net: &mut LatentNet,
        u: &ArrayView3<f32>,
        conditions: &[TrialCondition],
    ) -> LatentResult<Self> {
        let choices = trial_choices(net, u)?;
        Self::from_choices(conditions, &choices)
    }

    pub fn curve(&self, context: Context, axis: CoherenceAxis) -> Option<&PsychometricCurve> {
        self.curves
            .iter()
            .find(|c| c.context == context && c.axis == axis)
    }
}
