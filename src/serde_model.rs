//! Model serialization/deserialization.
//!
//! The on-disk format is a JSON document:
//!
//! ```json
//! {
//!   "inputs": 784,
//!   "output_class": 10,
//!   "hidden_layers": [{ "weight": [[...], ...], "bias": [[...], ...] }],
//!   "output_weight": [[...], ...],
//!   "output_bias": [[...], ...],
//!   "learning_rate": 0.01
//! }
//! ```
//!
//! Matrices are nested row-major sequences (outer index = row); biases are
//! single-column matrices. We do NOT serialize `Network` directly, so the file
//! format stays fixed even if the in-memory representation changes.
//!
//! Loading validates everything before a `Network` is built: no empty matrix
//! section, no zero-width or ragged rows, finite values only, and the layer
//! chain must line up with `inputs` and `output_class`. Saving refuses a network
//! holding NaN or infinite parameters, so every written file loads back.

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Layer, Matrix, Network, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNetwork {
    pub inputs: usize,
    pub output_class: usize,
    pub hidden_layers: Vec<SerializedLayer>,
    pub output_weight: Vec<Vec<f64>>,
    pub output_bias: Vec<Vec<f64>>,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayer {
    /// Row-major (out_dim, in_dim).
    pub weight: Vec<Vec<f64>>,
    /// (out_dim, 1).
    pub bias: Vec<Vec<f64>>,
}

impl SerializedNetwork {
    pub fn validate(&self) -> Result<()> {
        if self.inputs == 0 {
            return Err(Error::Persistence("inputs must be > 0".to_owned()));
        }
        if self.output_class == 0 {
            return Err(Error::Persistence("output_class must be > 0".to_owned()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::Persistence(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

fn matrix_from_section(rows: &[Vec<f64>], section: &str) -> Result<Matrix> {
    if rows.is_empty() {
        return Err(Error::Persistence(format!("{section} is empty")));
    }
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::Persistence(format!(
            "{section} must contain only finite values"
        )));
    }
    Matrix::from_rows(rows).map_err(|e| Error::Persistence(format!("{section}: {e}")))
}

fn layer_from_sections(
    weight: &[Vec<f64>],
    bias: &[Vec<f64>],
    activation: Activation,
    name: &str,
) -> Result<Layer> {
    let weight = matrix_from_section(weight, &format!("{name} weight"))?;
    let bias = matrix_from_section(bias, &format!("{name} bias"))?;
    Layer::from_parts(weight, bias, activation)
        .map_err(|e| Error::Persistence(format!("{name}: {e}")))
}

fn section_from_matrix(m: &Matrix, section: &str) -> Result<Vec<Vec<f64>>> {
    if let Some(i) = m.as_slice().iter().position(|v| !v.is_finite()) {
        return Err(Error::Persistence(format!(
            "{section} holds a non-finite value at flat index {i}"
        )));
    }
    Ok(m.to_rows())
}

impl TryFrom<&Network> for SerializedNetwork {
    type Error = Error;

    /// Fails if any parameter is NaN or infinite, since JSON cannot carry it.
    fn try_from(network: &Network) -> std::result::Result<Self, Self::Error> {
        let hidden_layers = network
            .hidden_layers()
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                Ok(SerializedLayer {
                    weight: section_from_matrix(layer.weight(), &format!("hidden layer {i} weight"))?,
                    bias: section_from_matrix(layer.bias(), &format!("hidden layer {i} bias"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let output = network.output_layer();

        Ok(Self {
            inputs: network.input_dim(),
            output_class: network.output_dim(),
            hidden_layers,
            output_weight: section_from_matrix(output.weight(), "output layer weight")?,
            output_bias: section_from_matrix(output.bias(), "output layer bias")?,
            learning_rate: network.learning_rate(),
        })
    }
}

impl TryFrom<SerializedNetwork> for Network {
    type Error = Error;

    fn try_from(value: SerializedNetwork) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let hidden = value
            .hidden_layers
            .iter()
            .enumerate()
            .map(|(i, l)| {
                layer_from_sections(
                    &l.weight,
                    &l.bias,
                    Activation::ReLU,
                    &format!("hidden layer {i}"),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let output = layer_from_sections(
            &value.output_weight,
            &value.output_bias,
            Activation::Identity,
            "output layer",
        )?;

        if output.out_dim() != value.output_class {
            return Err(Error::Persistence(format!(
                "output layer has {} rows, output_class is {}",
                output.out_dim(),
                value.output_class
            )));
        }

        Network::from_layers(value.inputs, hidden, output, value.learning_rate)
            .map_err(|e| Error::Persistence(format!("layers do not chain: {e}")))
    }
}

impl Network {
    /// Serialize the model to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        let ser = SerializedNetwork::try_from(self)?;
        serde_json::to_string_pretty(&ser)
            .map_err(|e| Error::Persistence(format!("failed to serialize model: {e}")))
    }

    /// Serialize the model to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        let ser = SerializedNetwork::try_from(self)?;
        serde_json::to_string(&ser)
            .map_err(|e| Error::Persistence(format!("failed to serialize model: {e}")))
    }

    /// Parse a model from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedNetwork = serde_json::from_str(s)
            .map_err(|e| Error::Persistence(format!("failed to parse model json: {e}")))?;
        ser.try_into()
    }

    /// Save the model to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s).map_err(|e| Error::io(p, e))?;
        debug!("saved model to {}", p.display());
        Ok(())
    }

    /// Load a model from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p).map_err(|e| Error::io(p, e))?;
        let network = Self::from_json_str(&s)?;
        debug!(
            "loaded model from {} with layer sizes {:?}",
            p.display(),
            network.architecture().sizes()
        );
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Architecture, Network};

    fn tiny_doc() -> SerializedNetwork {
        SerializedNetwork {
            inputs: 2,
            output_class: 2,
            hidden_layers: vec![SerializedLayer {
                weight: vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
                bias: vec![vec![0.1], vec![0.2], vec![0.3]],
            }],
            output_weight: vec![vec![7.0, 8.0, 9.0], vec![-1.0, -2.0, -3.0]],
            output_bias: vec![vec![0.4], vec![-0.4]],
            learning_rate: 0.05,
        }
    }

    #[test]
    fn json_uses_documented_field_names() {
        let net = Network::try_from(tiny_doc()).unwrap();
        let json = net.to_json_string().unwrap();
        for field in [
            "\"inputs\":2",
            "\"output_class\":2",
            "\"hidden_layers\":[{\"weight\":[[1.0,2.0],[3.0,4.0],[5.0,6.0]]",
            "\"bias\":[[0.1],[0.2],[0.3]]",
            "\"output_weight\":[[7.0,8.0,9.0],[-1.0,-2.0,-3.0]]",
            "\"output_bias\":[[0.4],[-0.4]]",
            "\"learning_rate\":0.05",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
    }

    #[test]
    fn roundtrip_is_bit_exact() {
        let arch = Architecture::new(5, 3, vec![4, 6], 0.01).unwrap();
        let net = Network::new_with_seed(arch, 42).unwrap();
        let loaded = Network::from_json_str(&net.to_json_string_pretty().unwrap()).unwrap();
        assert_eq!(loaded, net);
    }

    #[test]
    fn rejects_empty_sections() {
        let mut doc = tiny_doc();
        doc.output_bias.clear();
        let err = Network::try_from(doc).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(format!("{err}").contains("output layer bias"), "{err}");

        let mut doc = tiny_doc();
        doc.hidden_layers[0].weight = vec![vec![]];
        assert!(Network::try_from(doc).is_err());
    }

    #[test]
    fn rejects_ragged_and_broken_chain() {
        let mut doc = tiny_doc();
        doc.hidden_layers[0].weight[1].pop();
        assert!(Network::try_from(doc).is_err());

        let mut doc = tiny_doc();
        doc.inputs = 3;
        assert!(Network::try_from(doc).is_err());

        let mut doc = tiny_doc();
        doc.output_class = 3;
        assert!(Network::try_from(doc).is_err());

        let mut doc = tiny_doc();
        doc.hidden_layers[0].bias = vec![vec![0.1, 0.1], vec![0.2, 0.2], vec![0.3, 0.3]];
        assert!(Network::try_from(doc).is_err());
    }

    #[test]
    fn refuses_to_save_non_finite_parameters() {
        let mut net = Network::try_from(tiny_doc()).unwrap();
        net.layer_mut(0).unwrap().weights_mut()[2] = f64::NAN;
        let err = net.to_json_string().unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(format!("{err}").contains("hidden layer 0 weight"), "{err}");

        let mut net = Network::try_from(tiny_doc()).unwrap();
        net.layer_mut(1).unwrap().biases_mut()[0] = f64::INFINITY;
        let err = net.to_json_string_pretty().unwrap_err();
        assert!(format!("{err}").contains("output layer bias"), "{err}");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        assert!(net.save_json(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn rejects_bad_learning_rate_and_malformed_json() {
        let mut doc = tiny_doc();
        doc.learning_rate = 0.0;
        assert!(Network::try_from(doc).is_err());

        let err = Network::from_json_str("{\"inputs\": 2}").unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }
}
