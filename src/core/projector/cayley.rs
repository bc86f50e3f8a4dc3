//! 케일리 변환 기반 직교 투영
//!
//! 자유 생성 행렬 A (N×N)로부터 직교 행렬을 만든다.
//!
//! S = (A − Aᵀ)/2,  O = (I − S)(I + S)⁻¹,  Q = O[..n, ..]
//!
//! S가 반대칭이므로 고유값은 순허수이고 (I + S)는 항상 가역이다.
//! `try_inverse` 실패는 생성 행렬의 제약이 바뀌었을 때만 가능한 방어적 검사.

use crate::core::error::{LatentError, LatentResult};
use nalgebra::DMatrix;
use ndarray::{s, Array2};
use rand::Rng;

/// 반대칭 부분 (A − Aᵀ)/2
pub fn skew_symmetric(a: &Array2<f32>) -> Array2<f32> {
    (a - &a.t()) * 0.5
}

fn to_dmatrix(a: &Array2<f32>) -> DMatrix<f32> {
    let (rows, cols) = a.dim();
    DMatrix::from_fn(rows, cols, |i, j| a[[i, j]])
}

fn to_array(m: &DMatrix<f32>) -> Array2<f32> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// 케일리 변환. (O, (I + S)⁻¹) 반환
pub fn cayley_transform(a: &Array2<f32>) -> LatentResult<(Array2<f32>, Array2<f32>)> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(LatentError::shape("cayley generator", (rows, rows), (rows, cols)));
    }
    let skew = skew_symmetric(a);
    let eye = Array2::<f32>::eye(rows);

    let resolvent = to_dmatrix(&(&eye + &skew))
        .try_inverse()
        .ok_or(LatentError::SingularGenerator(rows))?;
    let resolvent = to_array(&resolvent);
    let orthogonal = (&eye - &skew).dot(&resolvent);

    Ok((orthogonal, resolvent))
}

/// 직교 투영기: 잠재 공간(N) → 순환 상태 공간(n)
///
/// 생성 행렬만 학습 대상이고 Q는 매 스텝 후 `refresh`로 다시 유도된다.
#[derive(Debug, Clone)]
pub struct OrthogonalProjector {
    /// 자유 생성 행렬 A (N×N)
    pub generator: Array2<f32>,
    rank: usize,
    orthogonal: Array2<f32>,
    resolvent: Array2<f32>,
    q: Array2<f32>,
}

impl OrthogonalProjector {
    pub fn new(generator: Array2<f32>, rank: usize) -> LatentResult<Self> {
        let latent_dim = generator.nrows();
        if rank > latent_dim {
            return Err(LatentError::InvalidConfig(format!(
                "projector rank {} exceeds latent width {}",
                rank, latent_dim
            )));
        }
        let mut projector = Self {
            generator,
            rank,
            orthogonal: Array2::zeros((latent_dim, latent_dim)),
            resolvent: Array2::zeros((latent_dim, latent_dim)),
            q: Array2::zeros((rank, latent_dim)),
        };
        projector.refresh()?;
        Ok(projector)
    }

    /// A ~ U[0, 1) 초기화
    pub fn random<R: Rng + ?Sized>(rng: &mut R, latent_dim: usize, rank: usize) -> LatentResult<Self> {
        let generator = Array2::from_shape_fn((latent_dim, latent_dim), |_| rng.gen::<f32>());
        Self::new(generator, rank)
    }

    /// 생성 행렬이 바뀐 뒤 Q 재계산
    pub fn refresh(&mut self) -> LatentResult<()> {
        let (orthogonal, resolvent) = cayley_transform(&self.generator)?;
        self.q = orthogonal.slice(s![..self.rank, ..]).to_owned();
        self.orthogonal = orthogonal;
        self.resolvent = resolvent;
        Ok(())
    }

    /// Q (n×N)
    pub fn q(&self) -> &Array2<f32> {
        &self.q
    }

    /// 전체 직교 행렬 O (N×N)
    pub fn orthogonal(&self) -> &Array2<f32> {
        &self.orthogonal
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn latent_dim(&self) -> usize {
        self.generator.nrows()
    }

    /// ∂L/∂Q → ∂L/∂A
    ///
    /// dO = −(I + O) dS (I + S)⁻¹ 이므로
    /// ∂L/∂S = −(I + O)ᵀ G_O (I + S)⁻ᵀ, ∂L/∂A = (∂L/∂S − ∂L/∂Sᵀ)/2.
    /// G_O는 G_Q 아래에 0 행을 채운 N×N 행렬.
    pub fn backward(&self, grad_q: &Array2<f32>) -> LatentResult<Array2<f32>> {
        if grad_q.dim() != self.q.dim() {
            return Err(LatentError::shape("projector gradient", self.q.dim(), grad_q.dim()));
        }
        let latent_dim = self.latent_dim();
        let mut grad_o = Array2::<f32>::zeros((latent_dim, latent_dim));
        grad_o.slice_mut(s![..self.rank, ..]).assign(grad_q);

        let eye_plus_o = &Array2::<f32>::eye(latent_dim) + &self.orthogonal;
        let grad_s = -eye_plus_o.t().dot(&grad_o).dot(&self.resolvent.t());
        Ok((&grad_s - &grad_s.t()) * 0.5)
    }
}
