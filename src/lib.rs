//! A small digit classifier trained from scratch.
//!
//! `digit-mlp` trains a feedforward network on flattened 28x28 grayscale images:
//! an input layer, an ordered stack of fully-connected ReLU hidden layers, and a
//! fully-connected output layer feeding softmax + cross-entropy.
//!
//! # Design goals
//!
//! - Reproducible: initialization takes an explicit, seedable RNG, and training is
//!   strictly per-sample SGD over the training set in stored order.
//! - Correct gradients: `Network::backward` borrows the network immutably, so every
//!   layer's gradient is computed from the parameters as they were at the start of
//!   the step. Updates happen afterwards in `Network::sgd_step`.
//! - Clear contracts: shapes are validated and mismatches return
//!   [`Error::InvalidShape`] instead of panicking or truncating.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - Weights are [`Matrix`] values with shape `(out_dim, in_dim)`; biases and
//!   per-sample inputs/targets are column vectors.
//! - Targets are one-hot.
//!
//! # Quick start
//!
//! ```rust
//! use digit_mlp::{Dataset, FitConfig, NetworkBuilder};
//!
//! # fn main() -> digit_mlp::Result<()> {
//! let xs = vec![
//!     vec![1.0, 0.0, 0.9, 0.1],
//!     vec![0.9, 0.2, 1.0, 0.0],
//!     vec![0.0, 1.0, 0.1, 0.9],
//!     vec![0.1, 0.9, 0.0, 1.0],
//! ];
//! let train = Dataset::from_labels(&xs, &[0, 0, 1, 1], 2)?;
//!
//! let mut net = NetworkBuilder::new(4)?
//!     .hidden_layer(8)?
//!     .output_classes(2)?
//!     .learning_rate(0.1)?
//!     .build_with_seed(0)?;
//!
//! let report = net.fit(&train, &train, FitConfig { epochs: 50 })?;
//! assert_eq!(report.epochs.len(), 50);
//!
//! let probs = net.predict(&[1.0, 0.0, 1.0, 0.0])?;
//! assert_eq!(net.argmax(&probs)?, 0);
//! # Ok(())
//! # }
//! ```
//!
//! # Driving a step by hand
//!
//! ```rust
//! use digit_mlp::{Matrix, NetworkBuilder, Sgd, loss};
//!
//! # fn main() -> digit_mlp::Result<()> {
//! let mut net = NetworkBuilder::new(3)?
//!     .hidden_layer(8)?
//!     .output_classes(2)?
//!     .build_with_seed(0)?;
//!
//! let x = Matrix::column(&[0.1, 0.2, 0.3]);
//! let t = Matrix::column(&[0.0, 1.0]);
//!
//! let cache = net.forward_with_cache(&x)?;
//! let probs = Matrix::column(&loss::softmax(cache.logits().as_slice()));
//! let _loss = loss::cross_entropy(probs.as_slice(), t.as_slice())?;
//! let grads = net.backward(&probs, &t, &cache)?;
//! Sgd::for_network(&net)?.step(&mut net, &grads)?;
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod data;
pub mod error;
pub mod idx;
pub mod layer;
pub mod loss;
pub mod matrix;
pub mod metrics;
pub mod network;
pub mod optim;
pub mod serde_model;
pub mod train;

pub use activation::Activation;
pub use builder::{Architecture, MNIST_CLASSES, MNIST_INPUTS, NetworkBuilder};
pub use data::{Dataset, Sample};
pub use error::{Error, Result};
pub use layer::Layer;
pub use matrix::Matrix;
pub use network::{ForwardCache, Gradients, Network};
pub use optim::Sgd;
pub use serde_model::{SerializedLayer, SerializedNetwork};
pub use train::{EpochReport, FitConfig, FitReport, train};

/// Build a He-initialized network.
///
/// Thin wrapper around [`Network::new`].
pub fn new_network(
    input_size: usize,
    output_size: usize,
    hidden_widths: &[usize],
    learning_rate: f64,
) -> Result<Network> {
    Network::new(input_size, output_size, hidden_widths, learning_rate)
}

/// Class probabilities for one input vector.
///
/// Thin wrapper around [`Network::predict`].
pub fn predict(network: &Network, input: &[f64]) -> Result<Vec<f64>> {
    network.predict(input)
}

/// Class index of the largest probability; fails unless `probs` has one entry
/// per output class.
pub fn argmax(network: &Network, probs: &[f64]) -> Result<usize> {
    network.argmax(probs)
}
