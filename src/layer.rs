use rand::Rng;

use crate::{Activation, Error, Matrix, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Shape `(out_dim, in_dim)`.
    weight: Matrix,
    /// Column vector, shape `(out_dim, 1)`.
    bias: Matrix,
    activation: Activation,
}

impl Layer {
    /// He-initialized layer: weights drawn from `N(0, 2 / in_dim)`, biases zero.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }

        let std_dev = (2.0 / in_dim as f64).sqrt();
        let weights = (0..in_dim * out_dim)
            .map(|_| standard_normal(rng) * std_dev)
            .collect();

        Ok(Self {
            weight: Matrix::from_vec(out_dim, in_dim, weights)?,
            bias: Matrix::zeros(out_dim, 1),
            activation,
        })
    }

    /// Assemble a layer from existing parameters.
    ///
    /// `bias` must be a single column with as many rows as `weight`.
    pub fn from_parts(weight: Matrix, bias: Matrix, activation: Activation) -> Result<Self> {
        if bias.cols() != 1 {
            return Err(Error::InvalidShape(format!(
                "bias must be a column vector, got {:?}",
                bias.shape()
            )));
        }
        if weight.rows() != bias.rows() {
            return Err(Error::InvalidShape(format!(
                "weight rows {} do not match bias rows {}",
                weight.rows(),
                bias.rows()
            )));
        }
        if weight.cols() == 0 || weight.rows() == 0 {
            return Err(Error::InvalidShape("layer weight must not be empty".to_owned()));
        }

        Ok(Self {
            weight,
            bias,
            activation,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.weight.cols()
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.weight.rows()
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn weight(&self) -> &Matrix {
        &self.weight
    }

    #[inline]
    pub fn bias(&self) -> &Matrix {
        &self.bias
    }

    /// Mutable row-major view of the weights (shape is fixed).
    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f64] {
        self.weight.as_mut_slice()
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut [f64] {
        self.bias.as_mut_slice()
    }

    /// Forward pass for a single sample.
    ///
    /// Computes:
    /// - `z = W * input + b`
    /// - `output = activation(z)`
    pub fn forward(&self, input: &Matrix) -> Result<Matrix> {
        let z = self.weight.matmul(input)?.add(&self.bias)?;
        Ok(match self.activation {
            Activation::Identity => z,
            act => z.map(|v| act.forward(v)),
        })
    }

    /// In-place `W -= lr * d_weight`, `b -= lr * d_bias`.
    pub(crate) fn sgd_step(&mut self, d_weight: &Matrix, d_bias: &Matrix, lr: f64) -> Result<()> {
        self.weight.sub_scaled_assign(lr, d_weight)?;
        self.bias.sub_scaled_assign(lr, d_bias)
    }
}

/// One draw from `N(0, 1)` via the Box–Muller transform.
///
/// `u1` feeds the logarithm, so an exact zero draw is resampled.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u1: f64 = rng.gen_range(0.0..1.0);
    while u1 == 0.0 {
        u1 = rng.gen_range(0.0..1.0);
    }
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
