//! Optimizer.
//!
//! Training is plain per-sample SGD: once `Network::backward` has produced a full
//! set of `Gradients`, every layer is updated with `param -= lr * d_param`.

use crate::builder::validate_learning_rate;
use crate::{Gradients, Network, Result};

#[derive(Debug, Clone, Copy)]
/// Stochastic gradient descent with a fixed learning rate.
pub struct Sgd {
    lr: f64,
}

impl Sgd {
    #[inline]
    /// Construct an SGD optimizer.
    ///
    /// Returns an error if `lr` is not finite or `lr <= 0`.
    pub fn new(lr: f64) -> Result<Self> {
        validate_learning_rate(lr)?;
        Ok(Self { lr })
    }

    /// SGD at the learning rate recorded in the network's architecture.
    #[inline]
    pub fn for_network(network: &Network) -> Result<Self> {
        Self::new(network.learning_rate())
    }

    #[inline]
    /// Returns the learning rate.
    pub fn lr(&self) -> f64 {
        self.lr
    }

    #[inline]
    /// Apply one optimizer step: `param -= lr * d_param`.
    pub fn step(&self, network: &mut Network, grads: &Gradients) -> Result<()> {
        network.sgd_step(grads, self.lr)
    }
}
