//! Integration tests for the svm-machine library
//!
//! These tests load the fixture models under `tests/data` and exercise the
//! engine end to end: loading, prediction in all modes, normalization and
//! persistence.

use approx::assert_relative_eq;
use ndarray::{array, Array1};
use std::path::PathBuf;
use std::sync::Arc;
use svm_machine::codec;
use svm_machine::persistence::{ModelFile, Record};
use svm_machine::{
    KernelType, MachineType, SVMError, SupportVector, SvmFile, SvmModel, SOLVER_VERSION,
};
use tempfile::{NamedTempFile, TempDir};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn load(name: &str) -> SupportVector {
    SupportVector::from_file(fixture(name)).expect("fixture model should load")
}

/// Two-class linear model with input size 3 predicts known labels
#[test]
fn test_binary_linear_known_labels() {
    let mut machine = load("binary_linear.svmmodel");
    assert_eq!(machine.shape(), (3, 1));
    assert_eq!(machine.kernel_type(), KernelType::Linear);

    assert_eq!(machine.predict_class(array![1.0, 0.0, 0.0].view()).unwrap(), 1);
    assert_eq!(machine.predict_class(array![-1.0, 0.0, 0.0].view()).unwrap(), -1);

    let mut scores = Array1::zeros(1);
    machine
        .predict_class_and_scores(array![1.0, 0.0, 0.0].view(), scores.view_mut())
        .unwrap();
    assert_relative_eq!(scores[0], 1.5);
}

#[test]
fn test_multiclass_data_file() {
    let mut machine = load("multiclass_rbf_prob.svmmodel");
    let mut data = SvmFile::open(fixture("multiclass.data")).unwrap();
    assert_eq!(data.samples(), 6);
    assert_eq!(data.shape(), machine.input_size());

    let (truth, inputs) = data.read_all().unwrap();
    let predicted = machine.predict_classes(inputs.view()).unwrap();
    assert_eq!(predicted.to_vec(), truth);

    let (by_probability, probabilities) = machine
        .predict_classes_and_probabilities(inputs.view())
        .unwrap();
    assert_eq!(by_probability, predicted);
    for row in probabilities.rows() {
        assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-6);
        assert!(row.iter().all(|&p| p > 0.0 && p < 1.0));
    }
}

#[test]
fn test_one_class_model() {
    let mut machine = load("one_class.svmmodel");
    assert_eq!(machine.machine_type(), MachineType::OneClass);
    assert_eq!(machine.output_size(), 1);
    assert!(matches!(machine.class_label(0), Err(SVMError::Unsupported(_))));

    assert_eq!(machine.predict_class(array![0.0, 1.0].view()).unwrap(), 1);
    assert_eq!(machine.predict_class(array![5.0, 5.0].view()).unwrap(), -1);
}

#[test]
fn test_regression_model_rounds_to_nearest() {
    let mut machine = load("regression_poly.svmmodel");
    assert_eq!(machine.machine_type(), MachineType::EpsilonSvr);
    assert_eq!(machine.polynomial_degree(), 2);
    assert_eq!(machine.gamma(), 1.0);
    assert_eq!(machine.coefficient0(), 1.0);

    // 0.5 * 4 - 0.25 * 9 + 0.5 = 0.25
    let mut scores = Array1::zeros(1);
    let value = machine
        .predict_class_and_scores(array![1.0].view(), scores.view_mut())
        .unwrap();
    assert_eq!(value, 0);
    assert_relative_eq!(scores[0], 0.25);

    // 0.5 * 16 - 0.25 * 49 + 0.5 = -3.75
    assert_eq!(machine.predict_class(array![3.0].view()).unwrap(), -4);
}

#[test]
fn test_probability_call_without_calibration() {
    let mut machine = load("binary_linear.svmmodel");
    let mut probs = Array1::zeros(1);
    assert!(matches!(
        machine.predict_class_and_probabilities(array![1.0, 0.0, 0.0].view(), probs.view_mut()),
        Err(SVMError::Unsupported(_))
    ));
}

#[test]
fn test_missing_and_malformed_files() {
    assert!(matches!(
        SupportVector::from_file(fixture("does_not_exist.svmmodel")),
        Err(SVMError::ModelLoad { .. })
    ));
    assert!(matches!(
        SupportVector::from_file(fixture("multiclass.data")),
        Err(SVMError::ModelLoad { .. })
    ));
}

#[test]
fn test_shared_handle_between_engines() {
    let handle = Arc::new(SvmModel::load(fixture("multiclass_rbf_prob.svmmodel")).unwrap());
    let mut first = SupportVector::from(Arc::clone(&handle));
    let mut second = SupportVector::from_handle(Some(Arc::clone(&handle))).unwrap();
    assert_eq!(Arc::strong_count(&handle), 3);

    first.set_input_subtraction(&[1.0, 1.0]).unwrap();
    assert_eq!(second.input_subtraction(), &[0.0, 0.0]);

    let input = array![1.0, 0.0];
    assert_eq!(first.predict_class(input.view()).unwrap(), 3);
    assert_eq!(second.predict_class(input.view()).unwrap(), 1);

    drop(first);
    drop(second);
    assert_eq!(Arc::strong_count(&handle), 1);
}

#[test]
fn test_engines_on_threads() {
    let handle = Arc::new(SvmModel::load(fixture("multiclass_rbf_prob.svmmodel")).unwrap());
    let workers: Vec<_> = [(array![1.0, 0.0], 1), (array![0.0, 1.0], 2), (array![-1.0, -1.0], 3)]
        .into_iter()
        .map(|(input, expected)| {
            let mut machine = SupportVector::from(Arc::clone(&handle));
            std::thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(machine.predict_class(input.view()).unwrap(), expected);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_container_round_trip_keeps_predictions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("machines.json");

    let mut original = load("multiclass_rbf_prob.svmmodel");
    original.set_input_subtraction(&[0.5, -0.5]).unwrap();
    original.set_input_division(&[2.0, 0.5]).unwrap();

    let mut file = ModelFile::create(&path).unwrap();
    original.save_container(&mut file, "classifier").unwrap();

    let reopened = ModelFile::open(&path).unwrap();
    let mut restored = SupportVector::from_container(&reopened, "classifier").unwrap();
    assert_eq!(restored.input_subtraction(), original.input_subtraction());
    assert_eq!(restored.input_division(), original.input_division());

    let (_, inputs) = SvmFile::open(fixture("multiclass.data"))
        .unwrap()
        .read_all()
        .unwrap();
    let (labels_a, scores_a) = original.predict_classes_and_scores(inputs.view()).unwrap();
    let (labels_b, scores_b) = restored.predict_classes_and_scores(inputs.view()).unwrap();
    assert_eq!(labels_a, labels_b);
    assert_eq!(scores_a, scores_b);
}

#[test]
fn test_record_carries_version() {
    let machine = load("one_class.svmmodel");
    let mut record = Record::new();
    machine.write_record(&mut record).unwrap();
    assert_eq!(record.uint_attribute("version").unwrap(), SOLVER_VERSION);

    let blob = record.bytes("svm_model").unwrap();
    assert_eq!(codec::decode(blob).unwrap(), *machine.model());
}

#[test]
fn test_native_save_reload() {
    let machine = load("regression_poly.svmmodel");
    let temp = NamedTempFile::new().unwrap();
    machine.save(temp.path()).unwrap();

    let reloaded = SupportVector::from_file(temp.path()).unwrap();
    assert_eq!(reloaded.model(), machine.model());
}
