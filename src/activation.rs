//! Activation functions.
//!
//! A dense layer computes a pre-activation value `z = W x + b` and then applies an
//! activation function element-wise: `y = activation(z)`.
//!
//! Hidden layers use ReLU; the output layer uses `Identity` so it emits raw logits
//! for softmax + cross-entropy. The training pass caches the *post-activation*
//! outputs `y`, and backprop evaluates the derivative from `y` (for ReLU,
//! `y > 0` exactly when `z > 0`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Element-wise activation function.
pub enum Activation {
    ReLU,
    Identity,
}

impl Activation {
    #[inline]
    pub(crate) fn forward(self, x: f64) -> f64 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::Identity => x,
        }
    }

    /// Derivative of the activation with respect to its input, expressed in terms
    /// of the cached post-activation output `y`.
    #[inline]
    pub(crate) fn grad_from_output(self, y: f64) -> f64 {
        match self {
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Identity => 1.0,
        }
    }
}
