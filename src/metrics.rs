//! Validation metrics.
//!
//! Metrics only read the network: they run the plain forward pass and never
//! touch parameters.

use crate::{Dataset, Network, Result, loss};

/// Fraction of samples whose predicted class matches the target class.
///
/// Each sample goes through forward, softmax and argmax; the target class is the
/// argmax of its one-hot vector.
pub fn accuracy(network: &Network, data: &Dataset) -> Result<f64> {
    network.check_dataset(data, "validation")?;

    let mut correct = 0_usize;
    for sample in data {
        let logits = network.forward(sample.input())?;
        let probs = loss::softmax(logits.as_slice());
        let predicted = network.argmax(&probs)?;
        let expected = network.argmax(sample.target().as_slice())?;
        if predicted == expected {
            correct += 1;
        }
    }

    Ok(correct as f64 / data.len() as f64)
}

/// Mean cross-entropy over a dataset, without updating the network.
pub fn mean_loss(network: &Network, data: &Dataset) -> Result<f64> {
    network.check_dataset(data, "evaluation")?;

    let mut total = 0.0_f64;
    for sample in data {
        let probs = network.predict(sample.input().as_slice())?;
        total += loss::cross_entropy(&probs, sample.target().as_slice())?;
    }
    Ok(total / data.len() as f64)
}

impl Network {
    /// See [`accuracy`].
    pub fn accuracy(&self, data: &Dataset) -> Result<f64> {
        accuracy(self, data)
    }
}
