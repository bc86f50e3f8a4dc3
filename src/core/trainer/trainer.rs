//! 미니배치 학습 루프
//!
//! 배치마다: 순전파 → 합성 손실과 그래디언트 → Adam 스텝 → 유도 값 재계산.
//! 투영 행렬과 마스크된 가중치는 자유 파라미터가 움직이는 즉시 낡으므로
//! 재계산은 반드시 스텝 직후에 이루어진다.

use crate::core::config::TrainConfig;
use crate::core::error::{LatentError, LatentResult};
use crate::core::network::LatentNet;
use crate::core::optimizers::{AdamConfig, LatentAdam};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use ndarray::{s, ArrayView3};
use std::ops::Range;
use std::time::Instant;

/// 보고 시점의 전체 데이터 평가
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub epochs: usize,
    pub mse_z: f32,
    pub nmse_y: f32,
}

impl EpochReport {
    pub fn line(&self) -> String {
        format!(
            "Epoch: {}/{}............. mse_z: {:.4} nmse_y: {:.4}",
            self.epoch, self.epochs, self.mse_z, self.nmse_y
        )
    }
}

/// 연속 배치 구간. 마지막 배치는 짧을 수 있다
pub fn batch_ranges(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    (0..total)
        .step_by(batch_size.max(1))
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

/// u, z, y의 배치/시간 축과 특징 차원 검사. 시행 수 반환
pub fn validate_dataset(
    net: &LatentNet,
    u: &ArrayView3<f32>,
    z: &ArrayView3<f32>,
    y: &ArrayView3<f32>,
) -> LatentResult<usize> {
    let config = net.config();
    let (batch, steps, features) = u.dim();
    if batch == 0 || steps == 0 {
        return Err(LatentError::EmptyDataset);
    }
    if features != config.input_size {
        return Err(LatentError::shape("inputs u", (batch, steps, config.input_size), u.dim()));
    }
    if z.dim() != (batch, steps, config.output_size) {
        return Err(LatentError::shape("target outputs z", (batch, steps, config.output_size), z.dim()));
    }
    if y.dim() != (batch, steps, config.latent_dim) {
        return Err(LatentError::shape("target latents y", (batch, steps, config.latent_dim), y.dim()));
    }
    Ok(batch)
}

#[derive(Debug, Clone)]
pub struct Trainer {
    pub config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> LatentResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(self.config.epochs as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>4}/{len:4} epochs {msg}",
        ) {
            progress.set_style(style.progress_chars("=> "));
        }
        progress
    }

    /// 전체 데이터 순전파로 mse_z, nmse_y 평가 (역전파 없음)
    pub fn evaluate(
        &self,
        net: &mut LatentNet,
        epoch: usize,
        u: &ArrayView3<f32>,
        z: &ArrayView3<f32>,
        y: &ArrayView3<f32>,
    ) -> LatentResult<EpochReport> {
        let x = net.forward(u)?;
        Ok(EpochReport {
            epoch,
            epochs: self.config.epochs,
            mse_z: net.mse_z(&x.view(), z)?,
            nmse_y: net.nmse_y(y, &x.view())?,
        })
    }

    /// 학습 실행
    ///
    /// 반환값은 보고 주기(`epoch % report_every == 0`)마다 기록한
    /// 에포크 손실(배치 손실 합 / 에포크 수)의 목록이다.
    pub fn fit(
        &self,
        net: &mut LatentNet,
        u: &ArrayView3<f32>,
        z: &ArrayView3<f32>,
        y: &ArrayView3<f32>,
    ) -> LatentResult<Vec<f32>> {
        let trials = validate_dataset(net, u, z, y)?;
        let batches = batch_ranges(trials, self.config.batch_size);
        let epochs = self.config.epochs;
        let l_y = self.config.l_y;

        let mut optimizer = LatentAdam::new(net, AdamConfig::from(&self.config));
        let progress = self.progress_bar();
        let start = Instant::now();
        info!(
            "training latent net: {} trials, {} batches/epoch, {} epochs, lr={}, l_y={}, weight_decay={}",
            trials,
            batches.len(),
            epochs,
            self.config.learning_rate,
            l_y,
            self.config.weight_decay
        );

        let mut loss_history = Vec::new();
        for epoch in 0..epochs {
            let mut epoch_loss = 0.0f32;
            for (batch_idx, range) in batches.iter().enumerate() {
                let u_batch = u.slice(s![range.clone(), .., ..]);
                let z_batch = z.slice(s![range.clone(), .., ..]);
                let y_batch = y.slice(s![range.clone(), .., ..]);

                let (loss, grads) = net.loss_and_gradients(&u_batch, &z_batch, &y_batch, l_y)?;
                if !loss.total.is_finite() {
                    return Err(LatentError::NonFinite {
                        epoch,
                        batch: batch_idx,
                        value: loss.total,
                    });
                }
                epoch_loss += loss.total / epochs as f32;
                debug!(
                    "epoch {} batch {}: loss={:.6} (mse_z={:.6}, nmse_y={:.6})",
                    epoch, batch_idx, loss.total, loss.mse_z, loss.nmse_y
                );

                optimizer.step(net, &grads);
                net.reconstrain()?;
            }

            if epoch % self.config.report_every == 0 {
                let report = self.evaluate(net, epoch, u, z, y)?;
                if self.config.show_progress {
                    progress.println(report.line());
                } else {
                    println!("{}", report.line());
                }
                if let Some(&previous) = loss_history.last() {
                    if epoch_loss > previous {
                        warn!(
                            "epoch loss increased since last report: {:.6} -> {:.6}",
                            previous, epoch_loss
                        );
                    }
                }
                loss_history.push(epoch_loss);
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "training finished: {} optimizer steps in {:.2?}",
            optimizer.steps(),
            start.elapsed()
        );
        Ok(loss_history)
    }
}
