pub mod cayley;


// 재수출
pub use cayley::{cayley_transform, skew_symmetric, OrthogonalProjector};
