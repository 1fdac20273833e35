//! Structured model containers
//!
//! A [`ModelFile`] is a JSON document of named groups. Each group holds a
//! [`Record`] of datasets and attributes; an engine is stored as
//!
//! | name             | kind      | content                               |
//! |------------------|-----------|---------------------------------------|
//! | `svm_model`      | dataset   | native model bytes (see [`crate::codec`]) |
//! | `input_subtract` | dataset   | per-feature subtraction               |
//! | `input_divide`   | dataset   | per-feature division                  |
//! | `version`        | attribute | solver version that wrote the model   |
//! | `created_at`     | attribute | RFC 3339 timestamp                    |
//!
//! JSON has no literal for non-finite numbers, so `inf`, `-inf` and `NaN`
//! entries of a float dataset are stored as those strings.

use crate::codec;
use crate::core::{Result, SVMError};
use crate::machine::SupportVector;
use crate::solver::SOLVER_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const MODEL_FIELD: &str = "svm_model";
pub const SUBTRACT_FIELD: &str = "input_subtract";
pub const DIVIDE_FIELD: &str = "input_divide";
pub const VERSION_ATTRIBUTE: &str = "version";
pub const CREATED_AT_ATTRIBUTE: &str = "created_at";

/// Array payload of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Dataset {
    Bytes(Vec<u8>),
    Floats(#[serde(with = "float_values")] Vec<f64>),
}

mod float_values {
    use serde::de::Error;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum FloatRepr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for &value in values {
            if value.is_finite() {
                seq.serialize_element(&FloatRepr::Number(value))?;
            } else {
                seq.serialize_element(&FloatRepr::Text(value.to_string()))?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<FloatRepr>::deserialize(deserializer)?
            .into_iter()
            .map(|repr| match repr {
                FloatRepr::Number(value) => Ok(value),
                FloatRepr::Text(text) => match text.as_str() {
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    "NaN" => Ok(f64::NAN),
                    _ => Err(D::Error::custom(format!("invalid float value `{text}'"))),
                },
            })
            .collect()
    }
}

/// Scalar metadata of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    UInt(u64),
    Text(String),
}

/// Named datasets and attributes stored under one group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub datasets: BTreeMap<String, Dataset>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dataset(&mut self, name: &str, dataset: Dataset) {
        self.datasets.insert(name.to_string(), dataset);
    }

    pub fn set_attribute(&mut self, name: &str, attribute: Attribute) {
        self.attributes.insert(name.to_string(), attribute);
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8]> {
        match self.datasets.get(name) {
            Some(Dataset::Bytes(bytes)) => Ok(bytes),
            Some(_) => Err(SVMError::ContainerError(format!(
                "dataset `{name}' does not hold bytes"
            ))),
            None => Err(missing("dataset", name)),
        }
    }

    pub fn floats(&self, name: &str) -> Result<&[f64]> {
        match self.datasets.get(name) {
            Some(Dataset::Floats(values)) => Ok(values),
            Some(_) => Err(SVMError::ContainerError(format!(
                "dataset `{name}' does not hold floating point values"
            ))),
            None => Err(missing("dataset", name)),
        }
    }

    pub fn uint_attribute(&self, name: &str) -> Result<u64> {
        match self.attributes.get(name) {
            Some(Attribute::UInt(value)) => Ok(*value),
            Some(_) => Err(SVMError::ContainerError(format!(
                "attribute `{name}' is not an unsigned integer"
            ))),
            None => Err(missing("attribute", name)),
        }
    }

    pub fn text_attribute(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name) {
            Some(Attribute::Text(text)) => Some(text),
            _ => None,
        }
    }
}

fn missing(kind: &str, name: &str) -> SVMError {
    SVMError::ContainerError(format!("missing {kind} `{name}'"))
}

/// JSON file holding records under group paths
#[derive(Debug)]
pub struct ModelFile {
    path: PathBuf,
    groups: BTreeMap<String, Record>,
}

impl ModelFile {
    /// Start an empty container that will be written to `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = Self {
            path: path.as_ref().to_path_buf(),
            groups: BTreeMap::new(),
        };
        file.flush()?;
        Ok(file)
    }

    /// Read an existing container
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let groups = serde_json::from_reader(reader)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            groups,
        })
    }

    pub fn filename(&self) -> &Path {
        &self.path
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn group(&self, name: &str) -> Result<&Record> {
        self.groups.get(name).ok_or_else(|| missing("group", name))
    }

    /// Record stored under `name`, created empty when absent
    pub fn group_mut(&mut self, name: &str) -> &mut Record {
        self.groups.entry(name.to_string()).or_default()
    }

    /// Write all groups back to disk
    pub fn flush(&self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &self.groups)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }
}

impl SupportVector {
    /// Store the model blob, normalization and version into `record`
    pub fn write_record(&self, record: &mut Record) -> Result<()> {
        let blob = codec::encode(self.model())?;
        record.set_dataset(MODEL_FIELD, Dataset::Bytes(blob));
        record.set_dataset(
            SUBTRACT_FIELD,
            Dataset::Floats(self.input_subtraction().to_vec()),
        );
        record.set_dataset(
            DIVIDE_FIELD,
            Dataset::Floats(self.input_division().to_vec()),
        );
        record.set_attribute(VERSION_ATTRIBUTE, Attribute::UInt(SOLVER_VERSION));
        record.set_attribute(
            CREATED_AT_ATTRIBUTE,
            Attribute::Text(chrono::Utc::now().to_rfc3339()),
        );
        Ok(())
    }

    /// Rebuild an engine from a record written by [`Self::write_record`]
    ///
    /// `origin` names the record in the version-mismatch warning.
    pub fn from_record(record: &Record, origin: &str) -> Result<Self> {
        let version = record.uint_attribute(VERSION_ATTRIBUTE)?;
        codec::check_version(version, origin);

        let model = codec::decode(record.bytes(MODEL_FIELD)?)?;
        let mut machine = SupportVector::new(model);
        machine.set_input_subtraction(record.floats(SUBTRACT_FIELD)?)?;
        machine.set_input_division(record.floats(DIVIDE_FIELD)?)?;
        Ok(machine)
    }

    /// Write the engine under `group` and flush the file
    pub fn save_container(&self, file: &mut ModelFile, group: &str) -> Result<()> {
        self.write_record(file.group_mut(group))?;
        file.flush()
    }

    /// Load the engine stored under `group`
    pub fn from_container(file: &ModelFile, group: &str) -> Result<Self> {
        let origin = format!("{}:{}", file.filename().display(), group);
        Self::from_record(file.group(group)?, &origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SvmModel;
    use ndarray::array;
    use tempfile::NamedTempFile;

    const BINARY: &str = "svm_type c_svc
kernel_type linear
nr_class 2
total_sv 2
rho 0.5
label 1 -1
nr_sv 1 1
SV
1 1:1 3:0.5
-1 1:-1 2:0.5
";

    fn machine() -> SupportVector {
        SupportVector::new(SvmModel::read_from(BINARY.as_bytes()).unwrap())
    }

    #[test]
    fn test_record_round_trip() {
        let mut original = machine();
        original.set_input_subtraction(&[0.5, 0.0, -1.0]).unwrap();
        original.set_input_division(&[2.0, 1.0, 4.0]).unwrap();

        let mut record = Record::new();
        original.write_record(&mut record).unwrap();
        assert_eq!(record.uint_attribute(VERSION_ATTRIBUTE).unwrap(), SOLVER_VERSION);
        assert!(record.text_attribute(CREATED_AT_ATTRIBUTE).is_some());

        let mut restored = SupportVector::from_record(&record, "memory").unwrap();
        assert_eq!(restored.model(), original.model());
        assert_eq!(restored.input_subtraction(), original.input_subtraction());
        assert_eq!(restored.input_division(), original.input_division());

        let input = array![2.5, 0.0, 1.0];
        assert_eq!(
            restored.predict_class(input.view()).unwrap(),
            original.predict_class(input.view()).unwrap()
        );
    }

    #[test]
    fn test_missing_fields() {
        let mut record = Record::new();
        machine().write_record(&mut record).unwrap();

        let mut no_version = record.clone();
        no_version.attributes.remove(VERSION_ATTRIBUTE);
        assert!(matches!(
            SupportVector::from_record(&no_version, "memory"),
            Err(SVMError::ContainerError(_))
        ));

        let mut no_divide = record.clone();
        no_divide.datasets.remove(DIVIDE_FIELD);
        assert!(matches!(
            SupportVector::from_record(&no_divide, "memory"),
            Err(SVMError::ContainerError(_))
        ));

        let mut wrong_kind = record;
        wrong_kind.set_dataset(MODEL_FIELD, Dataset::Floats(vec![1.0]));
        assert!(SupportVector::from_record(&wrong_kind, "memory").is_err());
    }

    #[test]
    fn test_short_normalization_in_record() {
        let mut record = Record::new();
        machine().write_record(&mut record).unwrap();
        record.set_dataset(SUBTRACT_FIELD, Dataset::Floats(vec![0.0]));
        assert!(matches!(
            SupportVector::from_record(&record, "memory"),
            Err(SVMError::DimensionMismatch { expected: 3, actual: 1, .. })
        ));
    }

    #[test]
    fn test_corrupt_blob_in_record() {
        let mut record = Record::new();
        machine().write_record(&mut record).unwrap();
        record.set_dataset(MODEL_FIELD, Dataset::Bytes(b"garbage".to_vec()));
        assert!(matches!(
            SupportVector::from_record(&record, "memory"),
            Err(SVMError::CorruptModel(_))
        ));
    }

    #[test]
    fn test_old_version_still_loads() {
        let mut record = Record::new();
        machine().write_record(&mut record).unwrap();
        record.set_attribute(VERSION_ATTRIBUTE, Attribute::UInt(289));
        assert!(SupportVector::from_record(&record, "memory").is_ok());
    }

    #[test]
    fn test_container_file() {
        let temp = NamedTempFile::new().unwrap();
        let original = machine();

        let mut file = ModelFile::create(temp.path()).unwrap();
        original.save_container(&mut file, "machines/binary").unwrap();

        let reopened = ModelFile::open(temp.path()).unwrap();
        assert_eq!(reopened.groups().collect::<Vec<_>>(), ["machines/binary"]);
        let restored = SupportVector::from_container(&reopened, "machines/binary").unwrap();
        assert_eq!(restored.model(), original.model());

        assert!(matches!(
            SupportVector::from_container(&reopened, "missing"),
            Err(SVMError::ContainerError(_))
        ));
    }

    #[test]
    fn test_non_finite_normalization_survives_file() {
        let temp = NamedTempFile::new().unwrap();
        let mut original = machine();
        original
            .set_input_subtraction(&[f64::NAN, 0.25, f64::NEG_INFINITY])
            .unwrap();
        original.set_input_division(&[1.0, f64::INFINITY, 0.0]).unwrap();

        let mut file = ModelFile::create(temp.path()).unwrap();
        original.save_container(&mut file, "machine").unwrap();

        let reopened = ModelFile::open(temp.path()).unwrap();
        let restored = SupportVector::from_container(&reopened, "machine").unwrap();
        let sub = restored.input_subtraction();
        assert!(sub[0].is_nan());
        assert_eq!(&sub[1..], &[0.25, f64::NEG_INFINITY]);
        assert_eq!(restored.input_division(), &[1.0, f64::INFINITY, 0.0]);
    }

    #[test]
    fn test_float_dataset_encoding() {
        let dataset = Dataset::Floats(vec![1.5, f64::INFINITY, -2.0]);
        let json = serde_json::to_string(&dataset).unwrap();
        assert_eq!(json, r#"{"type":"floats","data":[1.5,"inf",-2.0]}"#);
        assert_eq!(serde_json::from_str::<Dataset>(&json).unwrap(), dataset);

        let bad = r#"{"type":"floats","data":[1.0,"huge"]}"#;
        assert!(serde_json::from_str::<Dataset>(bad).is_err());
    }

    #[test]
    fn test_open_rejects_non_json() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"svm_type c_svc").unwrap();
        assert!(matches!(
            ModelFile::open(temp.path()),
            Err(SVMError::SerializationError(_))
        ));
    }
}
