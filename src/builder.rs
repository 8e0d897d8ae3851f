//! Architecture descriptor and model builder.
//!
//! The network shape is fixed: an input of `input_dim` values, an ordered stack
//! of ReLU hidden layers, and a linear output layer with one logit per class.
//! `Architecture` records that shape plus the SGD learning rate; it is validated
//! before any parameter buffer is allocated.
//!
//! `NetworkBuilder` is the fluent way to assemble an `Architecture`:
//!
//! ```rust
//! use digit_mlp::NetworkBuilder;
//!
//! # fn main() -> digit_mlp::Result<()> {
//! let net = NetworkBuilder::new(784)?
//!     .hidden_layer(128)?
//!     .hidden_layer(64)?
//!     .output_classes(10)?
//!     .learning_rate(0.01)?
//!     .build_with_seed(0)?;
//! assert_eq!(net.output_dim(), 10);
//! # Ok(())
//! # }
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Network, Result};

/// Input size of a flattened 28x28 image.
pub const MNIST_INPUTS: usize = 28 * 28;
/// Number of digit classes.
pub const MNIST_CLASSES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Architecture {
    pub input_dim: usize,
    pub output_dim: usize,
    /// Hidden layer widths, first to last.
    pub hidden: Vec<usize>,
    pub learning_rate: f64,
}

impl Architecture {
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        hidden: Vec<usize>,
        learning_rate: f64,
    ) -> Result<Self> {
        let arch = Self {
            input_dim,
            output_dim,
            hidden,
            learning_rate,
        };
        arch.validate()?;
        Ok(arch)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        if self.output_dim == 0 {
            return Err(Error::InvalidConfig("output_dim must be > 0".to_owned()));
        }
        if let Some(idx) = self.hidden.iter().position(|&w| w == 0) {
            return Err(Error::InvalidConfig(format!(
                "hidden layer {idx} width must be > 0"
            )));
        }
        validate_learning_rate(self.learning_rate)
    }

    /// Layer widths including input and output: `[input, hidden.., output]`.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden.len() + 2);
        sizes.push(self.input_dim);
        sizes.extend_from_slice(&self.hidden);
        sizes.push(self.output_dim);
        sizes
    }
}

pub(crate) fn validate_learning_rate(lr: f64) -> Result<()> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {lr}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
/// Builder for a `Network`.
pub struct NetworkBuilder {
    input_dim: usize,
    hidden: Vec<usize>,
    output_dim: usize,
    learning_rate: f64,
}

impl NetworkBuilder {
    /// Start building a network that accepts inputs of length `input_dim`.
    ///
    /// Defaults: 10 output classes, learning rate `0.01`, no hidden layers.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            hidden: Vec::new(),
            output_dim: MNIST_CLASSES,
            learning_rate: 0.01,
        })
    }

    /// Append a ReLU hidden layer with `width` units.
    pub fn hidden_layer(mut self, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(Error::InvalidConfig(
                "hidden layer width must be > 0".to_owned(),
            ));
        }
        self.hidden.push(width);
        Ok(self)
    }

    pub fn output_classes(mut self, classes: usize) -> Result<Self> {
        if classes == 0 {
            return Err(Error::InvalidConfig("output_dim must be > 0".to_owned()));
        }
        self.output_dim = classes;
        Ok(self)
    }

    pub fn learning_rate(mut self, lr: f64) -> Result<Self> {
        validate_learning_rate(lr)?;
        self.learning_rate = lr;
        Ok(self)
    }

    pub fn architecture(&self) -> Result<Architecture> {
        Architecture::new(
            self.input_dim,
            self.output_dim,
            self.hidden.clone(),
            self.learning_rate,
        )
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        Network::new_with_rng(self.architecture()?, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn architecture_rejects_bad_dims() {
        assert!(Architecture::new(0, 10, vec![8], 0.1).is_err());
        assert!(Architecture::new(4, 0, vec![8], 0.1).is_err());
        assert!(Architecture::new(4, 2, vec![8, 0], 0.1).is_err());
        assert!(Architecture::new(4, 2, vec![8], 0.0).is_err());
        assert!(Architecture::new(4, 2, vec![8], -1.0).is_err());
        assert!(Architecture::new(4, 2, vec![8], f64::NAN).is_err());
        assert!(Architecture::new(4, 2, vec![], 0.1).is_ok());
    }

    #[test]
    fn builder_collects_layers_in_order() {
        let arch = NetworkBuilder::new(4)
            .unwrap()
            .hidden_layer(6)
            .unwrap()
            .hidden_layer(5)
            .unwrap()
            .output_classes(3)
            .unwrap()
            .learning_rate(0.5)
            .unwrap()
            .architecture()
            .unwrap();
        assert_eq!(arch.sizes(), vec![4, 6, 5, 3]);
        assert_eq!(arch.learning_rate, 0.5);
    }

    #[test]
    fn builder_rejects_zero_width() {
        assert!(NetworkBuilder::new(0).is_err());
        assert!(NetworkBuilder::new(4).unwrap().hidden_layer(0).is_err());
        assert!(NetworkBuilder::new(4).unwrap().output_classes(0).is_err());
        assert!(NetworkBuilder::new(4).unwrap().learning_rate(0.0).is_err());
    }
}
