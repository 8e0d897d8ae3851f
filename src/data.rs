//! Samples, datasets and the CSV sample-set loader.
//!
//! A `Sample` pairs an input column vector with a one-hot target column vector.
//! A `Dataset` is a non-empty, ordered collection of samples that all share the
//! same input and class dimensions; training visits it in stored order.
//!
//! The CSV sample-set document has one record per line:
//! `label,p1,p2,...,pN` where `label` is the class index and every `p` is a raw
//! pixel intensity in `0..=255`. Pixels are normalized to `[0, 1]` on load.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};

use crate::{Error, Matrix, Result};

/// Largest raw pixel intensity in the CSV document.
pub const MAX_PIXEL: f64 = 255.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    input: Matrix,
    target: Matrix,
    label: usize,
}

impl Sample {
    /// Build a sample from an input vector and a class index.
    ///
    /// Every input must lie in `[0, 1]`; NaN and infinities are rejected.
    pub fn new(input: Vec<f64>, label: usize, classes: usize) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::InvalidData("sample input must not be empty".to_owned()));
        }
        if let Some((i, v)) = input
            .iter()
            .enumerate()
            .find(|&(_, v)| !(0.0..=1.0).contains(v))
        {
            return Err(Error::InvalidData(format!(
                "sample input {i} is {v}, expected a value in [0, 1]"
            )));
        }
        if label >= classes {
            return Err(Error::InvalidData(format!(
                "label {label} out of range for {classes} classes"
            )));
        }

        let mut target = Matrix::zeros(classes, 1);
        target.set(label, 0, 1.0);
        Ok(Self {
            input: Matrix::column(&input),
            target,
            label,
        })
    }

    /// Build a sample from an input vector and a one-hot target vector.
    ///
    /// The target must contain only `0.0`/`1.0` with exactly one `1.0`.
    pub fn from_one_hot(input: Vec<f64>, target: &[f64]) -> Result<Self> {
        let mut label = None;
        for (i, &t) in target.iter().enumerate() {
            if t == 1.0 {
                if label.is_some() {
                    return Err(Error::InvalidData(format!(
                        "target has more than one hot entry (second at {i})"
                    )));
                }
                label = Some(i);
            } else if t != 0.0 {
                return Err(Error::InvalidData(format!(
                    "target entry {i} is {t}, expected 0.0 or 1.0"
                )));
            }
        }
        let label =
            label.ok_or_else(|| Error::InvalidData("target has no hot entry".to_owned()))?;
        Self::new(input, label, target.len())
    }

    /// Input column vector, shape `(input_dim, 1)`.
    #[inline]
    pub fn input(&self) -> &Matrix {
        &self.input
    }

    /// One-hot target column vector, shape `(classes, 1)`.
    #[inline]
    pub fn target(&self) -> &Matrix {
        &self.target
    }

    #[inline]
    pub fn label(&self) -> usize {
        self.label
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input.rows()
    }

    #[inline]
    pub fn classes(&self) -> usize {
        self.target.rows()
    }
}

/// A supervised dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    samples: Vec<Sample>,
    input_dim: usize,
    classes: usize,
}

impl Dataset {
    /// Collect samples; all must agree on input and class dimensions.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        let Some(first) = samples.first() else {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        };
        let input_dim = first.input_dim();
        let classes = first.classes();

        for (i, s) in samples.iter().enumerate() {
            if s.input_dim() != input_dim {
                return Err(Error::InvalidData(format!(
                    "sample {i} has input_dim {}, expected {input_dim}",
                    s.input_dim()
                )));
            }
            if s.classes() != classes {
                return Err(Error::InvalidData(format!(
                    "sample {i} has {} classes, expected {classes}",
                    s.classes()
                )));
            }
        }

        Ok(Self {
            samples,
            input_dim,
            classes,
        })
    }

    /// Build a dataset from per-sample input rows and one-hot target rows.
    pub fn from_rows(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }
        let samples = inputs
            .iter()
            .zip(targets)
            .enumerate()
            .map(|(i, (x, t))| {
                Sample::from_one_hot(x.clone(), t)
                    .map_err(|e| Error::InvalidData(format!("sample {i}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_samples(samples)
    }

    /// Build a dataset from per-sample input rows and class indices.
    pub fn from_labels(inputs: &[Vec<f64>], labels: &[usize], classes: usize) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "inputs/labels length mismatch: {} vs {}",
                inputs.len(),
                labels.len()
            )));
        }
        let samples = inputs
            .iter()
            .zip(labels)
            .map(|(x, &label)| Sample::new(x.clone(), label, classes))
            .collect::<Result<Vec<_>>>()?;
        Self::from_samples(samples)
    }

    /// Load a CSV sample-set document.
    pub fn load_csv<P: AsRef<Path>>(path: P, input_dim: usize, classes: usize) -> Result<Self> {
        let p = path.as_ref();
        let file = File::open(p).map_err(|e| Error::io(p, e))?;
        let dataset = Self::read_csv(file, input_dim, classes)
            .map_err(|e| match e {
                Error::InvalidData(msg) => {
                    Error::InvalidData(format!("{}: {msg}", p.display()))
                }
                other => other,
            })?;
        debug!("loaded {} samples from {}", dataset.len(), p.display());
        Ok(dataset)
    }

    /// Parse CSV records from any reader. Blank lines are skipped.
    pub fn read_csv<R: Read>(reader: R, input_dim: usize, classes: usize) -> Result<Self> {
        let mut samples = Vec::new();
        for record in csv_reader(reader).records() {
            let record = record.map_err(csv_error)?;
            let line_no = record.position().map_or(0, |pos| pos.line());
            let sample = record_to_sample(&record, input_dim, classes)
                .map_err(|e| Error::InvalidData(format!("line {line_no}: {e}")))?;
            samples.push(sample);
        }

        let dataset = Self::from_samples(samples)?;
        let all_dark = dataset
            .samples
            .iter()
            .all(|s| s.input().as_slice().iter().all(|&v| v == 0.0));
        if all_dark {
            warn!("every sample in the dataset is all-zero");
        }
        Ok(dataset)
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    /// Always false: datasets are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn classes(&self) -> usize {
        self.classes
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader)
}

fn csv_error(e: csv::Error) -> Error {
    match e.position() {
        Some(pos) => Error::InvalidData(format!("line {}: malformed csv: {e}", pos.line())),
        None => Error::InvalidData(format!("malformed csv: {e}")),
    }
}

fn single_record(line: &str) -> Result<StringRecord> {
    csv_reader(line.as_bytes())
        .records()
        .next()
        .ok_or_else(|| Error::InvalidData("empty record".to_owned()))?
        .map_err(csv_error)
}

/// Parse one `label,p1,...,pN` record.
pub fn parse_record(line: &str, input_dim: usize, classes: usize) -> Result<Sample> {
    record_to_sample(&single_record(line)?, input_dim, classes)
}

/// Parse `input_dim` comma-separated raw intensities into normalized pixels.
pub fn parse_pixel_line(line: &str, input_dim: usize) -> Result<Vec<f64>> {
    parse_pixels(single_record(line)?.iter(), input_dim)
}

fn record_to_sample(record: &StringRecord, input_dim: usize, classes: usize) -> Result<Sample> {
    let mut fields = record.iter();

    let label_field = fields.next().unwrap_or_default();
    let label: usize = label_field
        .parse()
        .map_err(|_| Error::InvalidData(format!("invalid label {label_field:?}")))?;

    let pixels = parse_pixels(fields, input_dim)?;
    Sample::new(pixels, label, classes)
}

fn parse_pixels<'a>(fields: impl Iterator<Item = &'a str>, input_dim: usize) -> Result<Vec<f64>> {
    let mut pixels = Vec::with_capacity(input_dim);
    for (i, field) in fields.enumerate() {
        let raw: f64 = field
            .parse()
            .map_err(|_| Error::InvalidData(format!("pixel {i}: invalid number {field:?}")))?;
        if !(0.0..=MAX_PIXEL).contains(&raw) {
            return Err(Error::InvalidData(format!(
                "pixel {i}: {raw} outside [0, {MAX_PIXEL}]"
            )));
        }
        pixels.push(raw / MAX_PIXEL);
    }
    if pixels.len() != input_dim {
        return Err(Error::InvalidData(format!(
            "expected {input_dim} pixels, got {}",
            pixels.len()
        )));
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_target_is_one_hot() {
        let s = Sample::new(vec![0.1, 0.2], 2, 4).unwrap();
        assert_eq!(s.target().as_slice(), &[0.0, 0.0, 1.0, 0.0]);
        assert_eq!(s.target().as_slice().iter().sum::<f64>(), 1.0);
        assert!(Sample::new(vec![0.1], 4, 4).is_err());
    }

    #[test]
    fn sample_rejects_inputs_outside_unit_range() {
        for bad in [f64::NAN, f64::INFINITY, -0.1, 1.5, 1e6] {
            let err = Sample::new(vec![0.5, bad], 0, 2).unwrap_err();
            assert!(matches!(err, Error::InvalidData(_)), "{bad}: {err}");
            assert!(format!("{err}").contains("input 1"), "{err}");
        }
        assert!(Sample::new(vec![0.0, 1.0], 0, 2).is_ok());
        assert!(Sample::from_one_hot(vec![f64::NAN], &[1.0, 0.0]).is_err());
        assert!(Dataset::from_labels(&[vec![1e6, -3.0]], &[1], 2).is_err());
    }

    #[test]
    fn from_one_hot_validates_target() {
        assert!(Sample::from_one_hot(vec![0.0], &[0.0, 1.0]).is_ok());
        assert!(Sample::from_one_hot(vec![0.0], &[1.0, 1.0]).is_err());
        assert!(Sample::from_one_hot(vec![0.0], &[0.5, 0.5]).is_err());
        assert!(Sample::from_one_hot(vec![0.0], &[0.0, 0.0]).is_err());
    }

    #[test]
    fn dataset_rejects_mixed_dims_and_empty() {
        assert!(Dataset::from_samples(vec![]).is_err());
        let a = Sample::new(vec![0.0, 0.0], 0, 2).unwrap();
        let b = Sample::new(vec![0.0], 0, 2).unwrap();
        assert!(Dataset::from_samples(vec![a, b]).is_err());
    }

    #[test]
    fn read_csv_normalizes_pixels() {
        let csv = "1,0,255,51\n\n0,255,0,0\n";
        let ds = Dataset::read_csv(csv.as_bytes(), 3, 2).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.samples()[0].label(), 1);
        assert_eq!(ds.samples()[0].input().as_slice(), &[0.0, 1.0, 0.2]);
        assert_eq!(ds.samples()[1].target().as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn read_csv_reports_line_numbers() {
        let err = Dataset::read_csv("0,1,2\n3,1,2\n".as_bytes(), 2, 3).unwrap_err();
        assert!(format!("{err}").contains("line 2"), "{err}");

        let err = Dataset::read_csv("0,1\n".as_bytes(), 2, 3).unwrap_err();
        assert!(format!("{err}").contains("expected 2 pixels"), "{err}");

        let err = Dataset::read_csv("0,1,x\n".as_bytes(), 2, 3).unwrap_err();
        assert!(format!("{err}").contains("invalid number"), "{err}");

        let err = Dataset::read_csv("0,1,256\n".as_bytes(), 2, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        assert!(Dataset::read_csv("".as_bytes(), 2, 3).is_err());
    }

    #[test]
    fn read_csv_accepts_quoted_fields() {
        let ds = Dataset::read_csv("\"1\",\"0\",\"255\"\n".as_bytes(), 2, 2).unwrap();
        assert_eq!(ds.samples()[0].label(), 1);
        assert_eq!(ds.samples()[0].input().as_slice(), &[0.0, 1.0]);

        let ds = Dataset::read_csv("0, 51 ,102\r\n1,0,0\r\n".as_bytes(), 2, 2).unwrap();
        assert_eq!(ds.samples()[0].input().as_slice(), &[0.2, 0.4]);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn single_line_parsers() {
        let s = parse_record("\"3\",0,255", 2, 10).unwrap();
        assert_eq!(s.label(), 3);
        assert_eq!(parse_pixel_line("255,0", 2).unwrap(), vec![1.0, 0.0]);
        assert!(parse_pixel_line("", 2).is_err());
        assert!(parse_pixel_line("NaN,0", 2).is_err());
    }
}
