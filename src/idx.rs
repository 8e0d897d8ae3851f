//! IDX (MNIST binary) reader and CSV converter.
//!
//! Image files carry magic `2051` followed by image count, rows and columns;
//! label files carry magic `2049` followed by the label count. All header fields
//! are big-endian `u32`. Files ending in `.gz` are decompressed on the fly.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};
use csv::WriterBuilder;
use flate2::read::GzDecoder;
use log::info;

use crate::{Error, Result};

pub const LABELS_MAGIC: u32 = 2049;
pub const IMAGES_MAGIC: u32 = 2051;

#[derive(Debug, Clone)]
pub struct IdxImages {
    pub rows: usize,
    pub cols: usize,
    /// One `rows * cols` byte buffer per image.
    pub images: Vec<Vec<u8>>,
}

fn read_all(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut contents = Vec::new();
    let is_gz = path.extension().is_some_and(|ext| ext == "gz");
    let read = if is_gz {
        GzDecoder::new(file).read_to_end(&mut contents)
    } else {
        let mut file = file;
        file.read_to_end(&mut contents)
    };
    read.map_err(|e| Error::io(path, e))?;
    Ok(contents)
}

fn header_field(r: &mut Cursor<&[u8]>, what: &str) -> Result<usize> {
    r.read_u32::<BigEndian>()
        .map(|v| v as usize)
        .map_err(|_| Error::InvalidData(format!("truncated idx header: missing {what}")))
}

fn check_magic(r: &mut Cursor<&[u8]>, expected: u32) -> Result<()> {
    let magic = r
        .read_u32::<BigEndian>()
        .map_err(|_| Error::InvalidData("truncated idx header: missing magic".to_owned()))?;
    if magic != expected {
        return Err(Error::InvalidData(format!(
            "bad idx magic number {magic}, expected {expected}"
        )));
    }
    Ok(())
}

/// Parse an in-memory IDX image file.
pub fn parse_images(bytes: &[u8]) -> Result<IdxImages> {
    let mut r = Cursor::new(bytes);
    check_magic(&mut r, IMAGES_MAGIC)?;
    let count = header_field(&mut r, "image count")?;
    let rows = header_field(&mut r, "row count")?;
    let cols = header_field(&mut r, "column count")?;

    let image_len = rows.checked_mul(cols).ok_or_else(|| {
        Error::InvalidData(format!("idx image size {rows}x{cols} overflows"))
    })?;
    if image_len == 0 {
        return Err(Error::InvalidData(format!(
            "idx images must have non-zero size, got {rows}x{cols}"
        )));
    }
    let payload = &bytes[r.position() as usize..];
    let needed = count.checked_mul(image_len).unwrap_or(usize::MAX);
    if payload.len() < needed {
        return Err(Error::InvalidData(format!(
            "idx image payload has {} bytes, header declares {count} images of {rows}x{cols}",
            payload.len()
        )));
    }

    let images = payload
        .chunks_exact(image_len)
        .take(count)
        .map(<[u8]>::to_vec)
        .collect();
    Ok(IdxImages { rows, cols, images })
}

/// Parse an in-memory IDX label file.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut r = Cursor::new(bytes);
    check_magic(&mut r, LABELS_MAGIC)?;
    let count = header_field(&mut r, "label count")?;

    let payload = &bytes[r.position() as usize..];
    if payload.len() < count {
        return Err(Error::InvalidData(format!(
            "idx label payload has {} bytes, header declares {count} labels",
            payload.len()
        )));
    }
    Ok(payload[..count].to_vec())
}

pub fn read_images<P: AsRef<Path>>(path: P) -> Result<IdxImages> {
    let p = path.as_ref();
    parse_images(&read_all(p)?).map_err(|e| Error::InvalidData(format!("{}: {e}", p.display())))
}

pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let p = path.as_ref();
    parse_labels(&read_all(p)?).map_err(|e| Error::InvalidData(format!("{}: {e}", p.display())))
}

/// Write `label,p1,...,pN` records, one per image, with raw `0..=255` pixels.
pub fn write_csv<W: Write>(images: &IdxImages, labels: &[u8], out: W) -> Result<()> {
    if images.images.len() != labels.len() {
        return Err(Error::InvalidData(format!(
            "number of images ({}) doesn't match number of labels ({})",
            images.images.len(),
            labels.len()
        )));
    }

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    for (image, label) in images.images.iter().zip(labels) {
        let fields = std::iter::once(label.to_string()).chain(image.iter().map(u8::to_string));
        writer.write_record(fields)?;
    }
    writer
        .flush()
        .map_err(|e| Error::InvalidData(format!("csv flush failed: {e}")))?;
    Ok(())
}

/// Convert an IDX image/label pair into a CSV sample-set document.
///
/// Returns the number of records written.
pub fn convert_to_csv<P, Q, R>(images_path: P, labels_path: Q, output_path: R) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let images = read_images(images_path)?;
    let labels = read_labels(labels_path)?;

    let out_path = output_path.as_ref();
    let file = File::create(out_path).map_err(|e| Error::io(out_path, e))?;
    write_csv(&images, &labels, file)?;

    info!(
        "wrote {} records ({}x{} pixels) to {}",
        labels.len(),
        images.rows,
        images.cols,
        out_path.display()
    );
    Ok(labels.len())
}
