//! 맥락 의존 결정 과제
//!
//! 각 시행은 맥락(움직임/색)과 두 응집도를 가진다. 맥락이 가리키는 응집도의
//! 부호가 정답 방향이고, 다른 쪽 응집도는 방해 자극이다.
//!
//! 입력 채널 (6): 움직임 +/−, 색 +/−, 맥락 단서(움직임, 색)
//! 출력 채널 (2): 오른쪽, 왼쪽

use crate::core::error::{LatentError, LatentResult};
use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

const INPUT_CHANNELS: usize = 6;
const OUTPUT_CHANNELS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    Motion,
    Color,
}

impl Context {
    pub const ALL: [Context; 2] = [Context::Motion, Context::Color];

    pub fn name(&self) -> &'static str {
        match self {
            Context::Motion => "motion",
            Context::Color => "color",
        }
    }
}

/// 시행 조건 기록
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialCondition {
    pub context: Context,
    pub motion_coh: f32,
    pub color_coh: f32,
}

impl TrialCondition {
    /// 현재 맥락에서 판단에 쓰이는 응집도
    pub fn relevant_coherence(&self) -> f32 {
        match self.context {
            Context::Motion => self.motion_coh,
            Context::Color => self.color_coh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// 시행당 시점 수
    pub steps: usize,
    /// 자극 시작 시점 (그 전은 맥락 단서만)
    pub stimulus_onset: usize,
    /// 응집도 수준 (움직임, 색 공통)
    pub coherences: Vec<f32>,
    /// 조건당 반복 수
    pub repeats: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            steps: 30,
            stimulus_onset: 5,
            coherences: vec![-0.5, -0.25, -0.1, 0.0, 0.1, 0.25, 0.5],
            repeats: 1,
        }
    }
}

impl TaskConfig {
    pub fn input_channels(&self) -> usize {
        INPUT_CHANNELS
    }

    pub fn output_channels(&self) -> usize {
        OUTPUT_CHANNELS
    }

    /// 시행 수 = 맥락 2 × 응집도² × 반복
    pub fn trial_count(&self) -> usize {
        Context::ALL.len() * self.coherences.len() * self.coherences.len() * self.repeats
    }

    pub fn validate(&self) -> LatentResult<()> {
        if self.steps == 0 {
            return Err(LatentError::InvalidConfig("task steps must be positive".into()));
        }
        if self.stimulus_onset >= self.steps {
            return Err(LatentError::InvalidConfig(format!(
                "stimulus onset {} must precede the end of the trial ({} steps)",
                self.stimulus_onset, self.steps
            )));
        }
        if self.coherences.is_empty() || self.repeats == 0 {
            return Err(LatentError::InvalidConfig(
                "task needs at least one coherence level and one repeat".into(),
            ));
        }
        if let Some(bad) = self.coherences.iter().find(|c| !c.is_finite() || c.abs() > 1.0) {
            return Err(LatentError::InvalidConfig(format!(
                "coherence {} outside [-1, 1]",
                bad
            )));
        }
        Ok(())
    }
}

/// 생성된 과제 데이터
#[derive(Debug, Clone)]
pub struct TaskDataset {
    /// (trials, steps, 6)
    pub inputs: Array3<f32>,
    /// (trials, steps, 2)
    pub targets: Array3<f32>,
    /// 시행 순서대로의 조건
    pub conditions: Vec<TrialCondition>,
}

impl TaskDataset {
    /// 모든 (맥락, 움직임 응집도, 색 응집도) 조합을 `repeats`번씩 생성
    pub fn generate(config: &TaskConfig) -> LatentResult<Self> {
        let mut conditions = Vec::with_capacity(config.trial_count());
        for &context in Context::ALL.iter() {
            for &motion_coh in &config.coherences {
                for &color_coh in &config.coherences {
                    for _ in 0..config.repeats {
                        conditions.push(TrialCondition {
                            context,
                            motion_coh,
                            color_coh,
                        });
                    }
                }
            }
        }
        Self::from_conditions(config, conditions)
    }

    /// 주어진 조건 목록으로 입력/목표 생성
    pub fn from_conditions(
        config: &TaskConfig,
        conditions: Vec<TrialCondition>,
    ) -> LatentResult<Self> {
        config.validate()?;
        let trials = conditions.len();
        let steps = config.steps;
        let onset = config.stimulus_onset;
        let mut inputs = Array3::<f32>::zeros((trials, steps, INPUT_CHANNELS));
        let mut targets = Array3::<f32>::zeros((trials, steps, OUTPUT_CHANNELS));

        for (trial, condition) in conditions.iter().enumerate() {
            let cue = match condition.context {
                Context::Motion => 4,
                Context::Color => 5,
            };
            inputs.slice_mut(s![trial, .., cue]).fill(1.0);

            let mut stimulus = inputs.slice_mut(s![trial, onset.., ..4]);
            stimulus.column_mut(0).fill((1.0 + condition.motion_coh) / 2.0);
            stimulus.column_mut(1).fill((1.0 - condition.motion_coh) / 2.0);
            stimulus.column_mut(2).fill((1.0 + condition.color_coh) / 2.0);
            stimulus.column_mut(3).fill((1.0 - condition.color_coh) / 2.0);

            let relevant = condition.relevant_coherence();
            let (right, left) = if relevant > 0.0 {
                (1.0, 0.0)
            } else if relevant < 0.0 {
                (0.0, 1.0)
            } else {
                (0.5, 0.5)
            };
            // 자극 시작 이후 선형으로 목표값까지 상승
            let ramp = (steps - onset) as f32;
            for t in onset..steps {
                let level = (t - onset + 1) as f32 / ramp;
                targets[[trial, t, 0]] = right * level;
                targets[[trial, t, 1]] = left * level;
            }
        }

        Ok(Self {
            inputs,
            targets,
            conditions,
        })
    }

    pub fn trials(&self) -> usize {
        self.conditions.len()
    }
}
