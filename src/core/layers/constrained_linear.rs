//! 구조 마스크가 걸린 선형 사상 (편향 없음)
//!
//! 가중치는 (out, in) 방향으로 저장하며 사상은 x · Wᵀ.
//! 최적화기가 소유하는 원시 가중치(`raw`)와 순전파에 쓰이는
//! 유효 가중치(`weight` = mask ⊙ relu(raw))를 분리해 보관한다.

use crate::core::error::{LatentError, LatentResult};
use ndarray::{s, Array2, ArrayView2};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// 구조 마스크 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    /// 제약 없음 (순환 사상)
    Dense,
    /// 왼쪽 위 항등 블록 (입력 사상: 앞쪽 `input_size`개 유닛만 자극을 받음)
    LeadingIdentity(usize),
    /// 오른쪽 아래 항등 블록 (출력 사상: 뒤쪽 `output_size`개 유닛만 판독)
    TrailingIdentity(usize),
}

impl MaskKind {
    /// (rows, cols) 크기의 이진 마스크 생성. Dense는 None
    pub fn build(&self, rows: usize, cols: usize) -> LatentResult<Option<Array2<f32>>> {
        match *self {
            MaskKind::Dense => Ok(None),
            MaskKind::LeadingIdentity(size) => {
                if size > rows || size > cols {
                    return Err(LatentError::shape("leading identity mask", (size, size), (rows, cols)));
                }
                let mut mask = Array2::zeros((rows, cols));
                mask.slice_mut(s![..size, ..size]).assign(&Array2::eye(size));
                Ok(Some(mask))
            }
            MaskKind::TrailingIdentity(size) => {
                if size > rows || size > cols {
                    return Err(LatentError::shape("trailing identity mask", (size, size), (rows, cols)));
                }
                let mut mask = Array2::zeros((rows, cols));
                mask.slice_mut(s![rows - size.., cols - size..]).assign(&Array2::eye(size));
                Ok(Some(mask))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstrainedLinear {
    /// 최적화기가 갱신하는 원시 가중치 (out × in)
    pub raw: Array2<f32>,
    weight: Array2<f32>,
    mask: Option<Array2<f32>>,
}

impl ConstrainedLinear {
    pub fn new(raw: Array2<f32>, kind: MaskKind) -> LatentResult<Self> {
        let (rows, cols) = raw.dim();
        let mask = kind.build(rows, cols)?;
        let mut layer = Self {
            weight: raw.clone(),
            raw,
            mask,
        };
        layer.reconstrain();
        Ok(layer)
    }

    /// N(mean, std) 초기화
    pub fn normal<R: Rng + ?Sized>(
        rng: &mut R,
        out_features: usize,
        in_features: usize,
        mean: f32,
        std: f32,
        kind: MaskKind,
    ) -> LatentResult<Self> {
        let dist = Normal::new(mean, std)
            .map_err(|e| LatentError::InvalidConfig(format!("weight init: {}", e)))?;
        let raw = Array2::from_shape_fn((out_features, in_features), |_| dist.sample(&mut *rng));
        Self::new(raw, kind)
    }

    /// 유효 가중치 재유도: mask ⊙ relu(raw)
    ///
    /// 마스크가 없으면 raw 그대로. 원시 가중치는 건드리지 않는다.
    pub fn reconstrain(&mut self) {
        match &self.mask {
            None => self.weight.assign(&self.raw),
            Some(mask) => {
                ndarray::Zip::from(&mut self.weight)
                    .and(&self.raw)
                    .and(mask)
                    .for_each(|w, &r, &m| *w = m * r.max(0.0));
            }
        }
    }

    /// 유효 가중치 (out × in)
    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn mask(&self) -> Option<&Array2<f32>> {
        self.mask.as_ref()
    }

    pub fn in_features(&self) -> usize {
        self.raw.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.raw.nrows()
    }

    /// x (rows × in) → x · Wᵀ (rows × out)
    pub fn forward(&self, x: &ArrayView2<f32>) -> LatentResult<Array2<f32>> {
        if x.ncols() != self.in_features() {
            return Err(LatentError::shape("linear input", self.in_features(), x.ncols()));
        }
        Ok(x.dot(&self.weight.t()))
    }

    /// 유효 가중치에 대한 그래디언트를 원시 가중치용으로 변환
    ///
    /// 마스크 밖 항목은 유효 가중치에 영향을 주지 않으므로 0.
    /// 블록 안에서는 relu를 통과시켜(straight-through) 0에 걸린 항목도 회복할 수 있다.
    pub fn raw_gradient(&self, grad_weight: Array2<f32>) -> Array2<f32> {
        match &self.mask {
            None => grad_weight,
            Some(mask) => grad_weight * mask,
        }
    }
}
