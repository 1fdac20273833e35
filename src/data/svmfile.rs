//! Sparse data files in libsvm format
//!
//! One sample per line:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//!
//! Indices are 1-based; features not listed are zero.

use crate::core::{Result, SVMError};
use ndarray::{Array1, Array2, ArrayViewMut1};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// Sequential reader producing dense samples
///
/// The whole file is scanned once on open to learn its shape (largest feature
/// index) and sample count; samples are then read one at a time.
#[derive(Debug)]
pub struct SvmFile<R = BufReader<File>> {
    reader: R,
    filename: String,
    shape: usize,
    samples: usize,
    line_num: usize,
}

impl SvmFile {
    /// Open and scan a data file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), &path.display().to_string())
    }
}

impl<R: BufRead + Seek> SvmFile<R> {
    /// Scan `reader` and position it on the first sample
    pub fn from_reader(mut reader: R, filename: &str) -> Result<Self> {
        let mut shape = 0;
        let mut samples = 0;

        let mut line = String::new();
        let mut line_num = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_num += 1;
            if let Some((_, features)) = parse_line(&line, line_num)? {
                samples += 1;
                if let Some((index, _)) = features.last() {
                    shape = shape.max(*index);
                }
            }
        }
        reader.seek(SeekFrom::Start(0))?;

        log::debug!("Scanned {filename}: {samples} samples with {shape} features");
        Ok(Self {
            reader,
            filename: filename.to_string(),
            shape,
            samples,
            line_num: 0,
        })
    }

    /// Number of features per sample
    pub fn shape(&self) -> usize {
        self.shape
    }

    /// Number of samples in the file
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Go back to the first sample
    pub fn reset(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.line_num = 0;
        Ok(())
    }

    /// Next sample as a label and a dense vector of [`Self::shape`] values
    pub fn read(&mut self) -> Result<Option<(i32, Array1<f64>)>> {
        let mut values = Array1::zeros(self.shape);
        Ok(self.read_into(values.view_mut())?.map(|label| (label, values)))
    }

    /// Next sample written into `values`, which must hold exactly
    /// [`Self::shape`] entries
    pub fn read_into(&mut self, mut values: ArrayViewMut1<f64>) -> Result<Option<i32>> {
        if values.len() != self.shape {
            return Err(SVMError::DimensionMismatch {
                what: "sample buffer",
                expected: self.shape,
                actual: values.len(),
            });
        }

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_num += 1;

            if let Some((label, features)) = parse_line(&line, self.line_num)? {
                values.fill(0.0);
                for (index, value) in features {
                    if index > self.shape {
                        return Err(SVMError::ParseError(format!(
                            "{}: line {}: feature index {} exceeds scanned shape {}",
                            self.filename, self.line_num, index, self.shape
                        )));
                    }
                    values[index - 1] = value;
                }
                return Ok(Some(label));
            }
        }
    }

    /// Every remaining sample from the start of the file
    pub fn read_all(&mut self) -> Result<(Vec<i32>, Array2<f64>)> {
        self.reset()?;
        let mut labels = Vec::with_capacity(self.samples);
        let mut data = Array2::zeros((self.samples, self.shape));

        for mut row in data.rows_mut() {
            match self.read_into(row.view_mut())? {
                Some(label) => labels.push(label),
                None => {
                    return Err(SVMError::ParseError(format!(
                        "{}: expected {} samples, found {}",
                        self.filename,
                        self.samples,
                        labels.len()
                    )))
                }
            }
        }
        Ok((labels, data))
    }
}

/// Parse one line; blank lines and `#` comments yield `None`
fn parse_line(line: &str, line_num: usize) -> Result<Option<(i32, Vec<(usize, f64)>)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let error = |message: String| SVMError::ParseError(format!("line {line_num}: {message}"));

    let mut parts = line.split_whitespace();
    let label_str = parts.next().unwrap_or_default();
    let label = label_str
        .parse::<i32>()
        .map_err(|_| error(format!("invalid label: {label_str}")))?;

    let mut features = Vec::new();
    let mut last_index = 0;
    for feature_str in parts {
        let (index, value) = feature_str
            .split_once(':')
            .ok_or_else(|| error(format!("invalid feature format: {feature_str}")))?;
        let index = index
            .parse::<usize>()
            .map_err(|_| error(format!("invalid feature index: {index}")))?;
        let value = value
            .parse::<f64>()
            .map_err(|_| error(format!("invalid feature value: {value}")))?;

        if index == 0 {
            return Err(error("feature index must be positive: 0".to_string()));
        }
        if index <= last_index {
            return Err(error(format!(
                "feature indices must increase: {index} after {last_index}"
            )));
        }
        last_index = index;
        features.push((index, value));
    }

    Ok(Some((label, features)))
}
