pub mod latent_net;


pub use latent_net::{LatentNet, NetworkGradients};
