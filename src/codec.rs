//! Model blobs for embedding in structured files
//!
//! A blob is the exact byte content of a native model file. Encoding and
//! decoding go through a uniquely named transient file so that the solver's
//! own saver and loader define the format.

use crate::core::{Result, SVMError};
use crate::solver::{major_version, SvmModel, SOLVER_VERSION};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Serialize a model to the bytes of its native model file
pub fn encode(model: &SvmModel) -> Result<Vec<u8>> {
    let file = NamedTempFile::new()?;
    log::trace!("Encoding model through {}", file.path().display());

    model.save(file.path())?;
    let blob = fs::read(file.path())?;

    log::debug!(
        "Encoded {} model ({} support vectors) into {} bytes",
        model.machine_type(),
        model.total_sv(),
        blob.len()
    );
    Ok(blob)
}

/// Rebuild a model from bytes produced by [`encode`]
///
/// The training-set index cache is always empty on the returned model.
pub fn decode(blob: &[u8]) -> Result<SvmModel> {
    let mut file = NamedTempFile::new()?;
    log::trace!("Decoding {} bytes through {}", blob.len(), file.path().display());

    file.write_all(blob)?;
    file.flush()?;

    let mut model = SvmModel::load(file.path()).map_err(|e| match e {
        SVMError::ModelLoad { reason, .. } => SVMError::CorruptModel(reason),
        other => other,
    })?;
    model.clear_sv_indices();

    log::debug!(
        "Decoded {} model with {} support vectors",
        model.machine_type(),
        model.total_sv()
    );
    Ok(model)
}

/// Compare a stored solver version with the running one
///
/// A different major version is reported as a warning naming `origin`;
/// loading continues either way. Returns whether a warning was issued.
pub fn check_version(stored: u64, origin: &str) -> bool {
    let stored_major = major_version(stored);
    let current_major = major_version(SOLVER_VERSION);
    if stored_major == current_major {
        return false;
    }

    log::warn!(
        "SVM model in `{}' was written by solver version {} (major {}); \
         this build uses version {} (major {}); predictions may differ",
        origin,
        stored,
        stored_major,
        SOLVER_VERSION,
        current_major
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node_list;

    const ONE_CLASS: &str = "svm_type one_class
kernel_type rbf
gamma 1
nr_class 2
total_sv 2
rho 0.2
SV
0.5 1:1 2:1
0.5 1:-1 2:1
";

    #[test]
    fn test_encode_is_native_text() {
        let model = SvmModel::read_from(ONE_CLASS.as_bytes()).unwrap();
        let blob = encode(&model).unwrap();
        assert_eq!(String::from_utf8(blob).unwrap(), ONE_CLASS);
    }

    #[test]
    fn test_decode_restores_model() {
        let model = SvmModel::read_from(ONE_CLASS.as_bytes()).unwrap();
        let decoded = decode(&encode(&model).unwrap()).unwrap();
        assert_eq!(decoded, model);
        assert!(decoded.sv_indices().is_none());

        let x = node_list([(1, 0.2), (2, 0.9)]);
        assert_eq!(decoded.predict(&x), model.predict(&x));
    }

    #[test]
    fn test_decode_clears_index_cache() {
        let mut model = SvmModel::read_from(ONE_CLASS.as_bytes()).unwrap();
        model.sv_indices = Some(vec![4, 9]);
        let decoded = decode(&encode(&model).unwrap()).unwrap();
        assert!(decoded.sv_indices().is_none());
    }

    #[test]
    fn test_decode_garbage_is_corrupt() {
        for blob in [&b""[..], &b"not a model"[..], &b"svm_type c_svc\nSV\n1 1:x\n"[..]] {
            assert!(matches!(decode(blob), Err(SVMError::CorruptModel(_))));
        }
    }

    #[test]
    fn test_check_version() {
        assert!(!check_version(SOLVER_VERSION, "test"));
        assert!(!check_version(SOLVER_VERSION - 5, "test"));
        assert!(check_version(289, "test"));
        assert!(check_version(SOLVER_VERSION + 100, "test"));
    }
}
