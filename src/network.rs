use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::builder::validate_learning_rate;
use crate::{Activation, Architecture, Error, Layer, Matrix, Result, loss};

/// A ReLU feedforward classifier: hidden layers in order, then a linear output layer.
///
/// The network exclusively owns its parameter buffers. Training changes them only
/// through [`Network::sgd_step`]; inference and `backward` borrow immutably.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    arch: Architecture,
    hidden: Vec<Layer>,
    output: Layer,
}

/// Per-layer outputs recorded by [`Network::forward_with_cache`].
///
/// `activations[0]` is the raw input and `activations[i + 1]` is the ReLU output
/// of hidden layer `i`. The pre-softmax logits are kept separately. A cache
/// belongs to one training step and is dropped after `backward`.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    activations: Vec<Matrix>,
    logits: Matrix,
}

/// Parameter gradients for every layer, hidden layers first and the output
/// layer last.
#[derive(Debug, Clone)]
pub struct Gradients {
    d_weights: Vec<Matrix>,
    d_biases: Vec<Matrix>,
}

impl Network {
    /// Build a He-initialized network from an entropy-seeded RNG.
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        hidden: &[usize],
        learning_rate: f64,
    ) -> Result<Self> {
        let arch = Architecture::new(input_dim, output_dim, hidden.to_vec(), learning_rate)?;
        let mut rng = StdRng::from_entropy();
        Self::new_with_rng(arch, &mut rng)
    }

    pub fn new_with_seed(arch: Architecture, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(arch, &mut rng)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(arch: Architecture, rng: &mut R) -> Result<Self> {
        arch.validate()?;

        let mut hidden = Vec::with_capacity(arch.hidden.len());
        let mut in_dim = arch.input_dim;
        for &width in &arch.hidden {
            hidden.push(Layer::new_with_rng(in_dim, width, Activation::ReLU, rng)?);
            in_dim = width;
        }
        let output = Layer::new_with_rng(in_dim, arch.output_dim, Activation::Identity, rng)?;

        debug!("initialized network with layer sizes {:?}", arch.sizes());
        Ok(Self {
            arch,
            hidden,
            output,
        })
    }

    /// Assemble a network from existing layers.
    ///
    /// Checks that every layer's input width matches the previous layer's output
    /// width and that hidden layers use ReLU while the output layer is linear.
    pub fn from_layers(
        input_dim: usize,
        hidden: Vec<Layer>,
        output: Layer,
        learning_rate: f64,
    ) -> Result<Self> {
        validate_learning_rate(learning_rate)?;

        let mut in_dim = input_dim;
        for (i, layer) in hidden.iter().enumerate() {
            if layer.in_dim() != in_dim {
                return Err(Error::InvalidShape(format!(
                    "hidden layer {i} in_dim {} does not match previous out_dim {in_dim}",
                    layer.in_dim()
                )));
            }
            if layer.activation() != Activation::ReLU {
                return Err(Error::InvalidConfig(format!(
                    "hidden layer {i} must use ReLU"
                )));
            }
            in_dim = layer.out_dim();
        }
        if output.in_dim() != in_dim {
            return Err(Error::InvalidShape(format!(
                "output layer in_dim {} does not match previous out_dim {in_dim}",
                output.in_dim()
            )));
        }
        if output.activation() != Activation::Identity {
            return Err(Error::InvalidConfig(
                "output layer must emit raw logits".to_owned(),
            ));
        }

        let arch = Architecture::new(
            input_dim,
            output.out_dim(),
            hidden.iter().map(Layer::out_dim).collect(),
            learning_rate,
        )?;
        Ok(Self {
            arch,
            hidden,
            output,
        })
    }

    #[inline]
    pub fn architecture(&self) -> &Architecture {
        &self.arch
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.arch.input_dim
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.arch.output_dim
    }

    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.arch.learning_rate
    }

    #[inline]
    pub fn hidden_layers(&self) -> &[Layer] {
        &self.hidden
    }

    #[inline]
    pub fn output_layer(&self) -> &Layer {
        &self.output
    }

    /// Total layer count, output layer included.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.hidden.len() + 1
    }

    /// Layer `idx`, where `idx == hidden_layers().len()` is the output layer.
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        match idx.cmp(&self.hidden.len()) {
            std::cmp::Ordering::Less => self.hidden.get(idx),
            std::cmp::Ordering::Equal => Some(&self.output),
            std::cmp::Ordering::Greater => None,
        }
    }

    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        match idx.cmp(&self.hidden.len()) {
            std::cmp::Ordering::Less => self.hidden.get_mut(idx),
            std::cmp::Ordering::Equal => Some(&mut self.output),
            std::cmp::Ordering::Greater => None,
        }
    }

    /// Forward pass for a single sample, returning the output logits.
    ///
    /// `input` must be a column vector of `input_dim()` entries.
    pub fn forward(&self, input: &Matrix) -> Result<Matrix> {
        self.check_input(input)?;

        let mut current = None;
        for layer in &self.hidden {
            let next = layer.forward(current.as_ref().unwrap_or(input))?;
            current = Some(next);
        }
        self.output.forward(current.as_ref().unwrap_or(input))
    }

    /// Forward pass that also records every hidden activation for `backward`.
    pub fn forward_with_cache(&self, input: &Matrix) -> Result<ForwardCache> {
        self.check_input(input)?;

        let mut activations = Vec::with_capacity(self.hidden.len() + 1);
        activations.push(input.clone());
        for layer in &self.hidden {
            let prev = activations.last().unwrap_or(input);
            let next = layer.forward(prev)?;
            activations.push(next);
        }
        let last = activations.last().unwrap_or(input);
        let logits = self.output.forward(last)?;

        Ok(ForwardCache {
            activations,
            logits,
        })
    }

    /// Backward pass for a single sample.
    ///
    /// `probs` is the softmax of `cache.logits()` and `target` the one-hot label,
    /// both column vectors of `output_dim()` entries. With softmax paired to
    /// cross-entropy the output error is exactly `probs - target`.
    ///
    /// The network is only borrowed here: every gradient is derived from the
    /// parameters as they were when the step began, and nothing is updated
    /// until the caller applies the returned gradients.
    pub fn backward(
        &self,
        probs: &Matrix,
        target: &Matrix,
        cache: &ForwardCache,
    ) -> Result<Gradients> {
        let n_hidden = self.hidden.len();
        if cache.activations.len() != n_hidden + 1 {
            return Err(Error::InvalidShape(format!(
                "cache holds {} activations, network needs {}",
                cache.activations.len(),
                n_hidden + 1
            )));
        }
        if probs.shape() != (self.output_dim(), 1) {
            return Err(Error::InvalidShape(format!(
                "probs shape {:?} does not match output ({}, 1)",
                probs.shape(),
                self.output_dim()
            )));
        }

        let mut d_weights = Vec::with_capacity(n_hidden + 1);
        let mut d_biases = Vec::with_capacity(n_hidden + 1);

        let mut error = probs.sub(target)?;
        d_weights.push(error.matmul_t(&cache.activations[n_hidden])?);
        d_biases.push(error.clone());

        let mut next_weight = self.output.weight();
        for idx in (0..n_hidden).rev() {
            let layer = &self.hidden[idx];
            let act = layer.activation();
            let local_grad = cache.activations[idx + 1].map(|y| act.grad_from_output(y));

            error = next_weight.t_matmul(&error)?.hadamard(&local_grad)?;
            d_weights.push(error.matmul_t(&cache.activations[idx])?);
            d_biases.push(error.clone());

            next_weight = layer.weight();
        }

        d_weights.reverse();
        d_biases.reverse();
        Ok(Gradients {
            d_weights,
            d_biases,
        })
    }

    /// Applies `param -= lr * d_param` to every layer.
    ///
    /// All shapes are checked before any parameter is touched, so a mismatched
    /// `grads` leaves the network unchanged.
    pub fn sgd_step(&mut self, grads: &Gradients, lr: f64) -> Result<()> {
        validate_learning_rate(lr)?;
        if grads.num_layers() != self.num_layers() {
            return Err(Error::InvalidShape(format!(
                "grads cover {} layers, network has {}",
                grads.num_layers(),
                self.num_layers()
            )));
        }
        for idx in 0..self.num_layers() {
            let layer = self.layer(idx).ok_or_else(|| {
                Error::InvalidShape(format!("layer {idx} out of range"))
            })?;
            if grads.d_weights[idx].shape() != layer.weight().shape()
                || grads.d_biases[idx].shape() != layer.bias().shape()
            {
                return Err(Error::InvalidShape(format!(
                    "layer {idx} gradient shapes {:?}/{:?} do not match parameters {:?}/{:?}",
                    grads.d_weights[idx].shape(),
                    grads.d_biases[idx].shape(),
                    layer.weight().shape(),
                    layer.bias().shape()
                )));
            }
        }

        for (layer, (dw, db)) in self
            .hidden
            .iter_mut()
            .chain(std::iter::once(&mut self.output))
            .zip(grads.d_weights.iter().zip(&grads.d_biases))
        {
            layer.sgd_step(dw, db, lr)?;
        }
        Ok(())
    }

    /// Class probabilities for one input vector.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        let logits = self.forward(&Matrix::column(input))?;
        Ok(loss::softmax(logits.as_slice()))
    }

    /// Decode a probability (or one-hot) vector into its class index.
    pub fn argmax(&self, probs: &[f64]) -> Result<usize> {
        loss::argmax(probs, self.output_dim())
    }

    /// Most likely class for one input vector.
    pub fn classify(&self, input: &[f64]) -> Result<usize> {
        let probs = self.predict(input)?;
        self.argmax(&probs)
    }

    fn check_input(&self, input: &Matrix) -> Result<()> {
        if input.shape() != (self.input_dim(), 1) {
            return Err(Error::InvalidShape(format!(
                "input shape {:?} does not match model input ({}, 1)",
                input.shape(),
                self.input_dim()
            )));
        }
        Ok(())
    }
}

impl ForwardCache {
    #[inline]
    pub fn logits(&self) -> &Matrix {
        &self.logits
    }

    #[inline]
    pub fn activations(&self) -> &[Matrix] {
        &self.activations
    }
}

impl Gradients {
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.d_weights.len()
    }

    #[inline]
    pub fn d_weights(&self, layer_idx: usize) -> &Matrix {
        &self.d_weights[layer_idx]
    }

    #[inline]
    pub fn d_biases(&self, layer_idx: usize) -> &Matrix {
        &self.d_biases[layer_idx]
    }
}
