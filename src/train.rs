use log::info;

use crate::{Dataset, Error, Matrix, Network, Result, Sample, Sgd, loss, metrics};

#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    pub epochs: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self { epochs: 5 }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Mean cross-entropy over the training set.
    pub mean_loss: f64,
    /// Validation accuracy in `[0, 1]`.
    pub accuracy: f64,
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
}

impl FitReport {
    pub fn last(&self) -> Option<&EpochReport> {
        self.epochs.last()
    }
}

impl Network {
    /// One SGD step on a single sample; returns the sample's loss.
    ///
    /// Forward pass with cache, softmax, cross-entropy, backward pass, then the
    /// parameter update. The cache lives only for the duration of this call.
    pub fn train_step(&mut self, sample: &Sample, opt: &Sgd) -> Result<f64> {
        let cache = self.forward_with_cache(sample.input())?;
        let probs = Matrix::column(&loss::softmax(cache.logits().as_slice()));
        let sample_loss = loss::cross_entropy(probs.as_slice(), sample.target().as_slice())?;

        let grads = self.backward(&probs, sample.target(), &cache)?;
        opt.step(self, &grads)?;
        Ok(sample_loss)
    }

    /// Train with per-sample SGD, validating after every epoch.
    ///
    /// Samples are visited in stored order. Any error stops the run.
    pub fn fit(
        &mut self,
        train: &Dataset,
        validation: &Dataset,
        cfg: FitConfig,
    ) -> Result<FitReport> {
        cfg.validate()?;
        self.check_dataset(train, "train")?;
        self.check_dataset(validation, "validation")?;

        let opt = Sgd::for_network(self)?;
        let mut reports = Vec::with_capacity(cfg.epochs);

        for epoch in 1..=cfg.epochs {
            let mut loss_sum = 0.0_f64;
            for sample in train {
                loss_sum += self.train_step(sample, &opt)?;
            }
            let mean_loss = loss_sum / train.len() as f64;
            info!(
                "epoch {epoch}/{} | mean training loss {mean_loss:.4}",
                cfg.epochs
            );

            let accuracy = metrics::accuracy(self, validation)?;
            info!(
                "epoch {epoch}/{} | validation accuracy {accuracy:.4}",
                cfg.epochs
            );

            reports.push(EpochReport {
                epoch,
                mean_loss,
                accuracy,
            });
        }

        Ok(FitReport { epochs: reports })
    }

    pub(crate) fn check_dataset(&self, data: &Dataset, name: &str) -> Result<()> {
        if data.input_dim() != self.input_dim() {
            return Err(Error::InvalidShape(format!(
                "{name} input_dim {} does not match model input_dim {}",
                data.input_dim(),
                self.input_dim()
            )));
        }
        if data.classes() != self.output_dim() {
            return Err(Error::InvalidShape(format!(
                "{name} has {} classes, model outputs {}",
                data.classes(),
                self.output_dim()
            )));
        }
        Ok(())
    }
}

/// Train `network` for `epochs` passes over `train`, returning
/// `(mean_loss, accuracy)` per epoch.
pub fn train(
    network: &mut Network,
    epochs: usize,
    train: &Dataset,
    validation: &Dataset,
) -> Result<Vec<(f64, f64)>> {
    let report = network.fit(train, validation, FitConfig { epochs })?;
    Ok(report
        .epochs
        .iter()
        .map(|r| (r.mean_loss, r.accuracy))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::NetworkBuilder;

    fn tiny() -> (Network, Dataset) {
        let net = NetworkBuilder::new(2)
            .unwrap()
            .hidden_layer(4)
            .unwrap()
            .output_classes(2)
            .unwrap()
            .learning_rate(0.1)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        let data = Dataset::from_labels(&[vec![1.0, 0.0], vec![0.0, 1.0]], &[0, 1], 2).unwrap();
        (net, data)
    }

    #[test]
    fn zero_epochs_is_a_config_error() {
        let (mut net, data) = tiny();
        assert!(matches!(
            net.fit(&data, &data, FitConfig { epochs: 0 }),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn dataset_dims_must_match_model() {
        let (mut net, data) = tiny();
        let wide = Dataset::from_labels(&[vec![0.0; 3]], &[0], 2).unwrap();
        assert!(matches!(
            net.fit(&wide, &data, FitConfig { epochs: 1 }),
            Err(Error::InvalidShape(_))
        ));
        let more_classes = Dataset::from_labels(&[vec![0.0; 2]], &[0], 3).unwrap();
        assert!(net.fit(&data, &more_classes, FitConfig { epochs: 1 }).is_err());
    }

    #[test]
    fn reports_one_entry_per_epoch() {
        let (mut net, data) = tiny();
        let history = train(&mut net, 3, &data, &data).unwrap();
        assert_eq!(history.len(), 3);
        for (loss, acc) in history {
            assert!(loss.is_finite() && loss >= 0.0);
            assert!((0.0..=1.0).contains(&acc));
        }
    }

    #[test]
    fn training_is_deterministic_for_a_seed() {
        let (mut a, data) = tiny();
        let (mut b, _) = tiny();
        let ra = a.fit(&data, &data, FitConfig { epochs: 4 }).unwrap();
        let rb = b.fit(&data, &data, FitConfig { epochs: 4 }).unwrap();
        assert_eq!(ra.epochs, rb.epochs);
        assert_eq!(a, b);
    }
}
