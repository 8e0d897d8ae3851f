use std::path::PathBuf;

use digit_mlp::{Architecture, Error, Network};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn saved_model_predicts_identically_after_reload() {
    let arch = Architecture::new(6, 3, vec![5, 4], 0.02).unwrap();
    let net = Network::new_with_seed(arch, 9).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    net.save_json(&path).unwrap();
    let loaded = Network::load_json(&path).unwrap();

    assert_eq!(loaded.architecture(), net.architecture());
    let probe = [0.3, 0.0, 1.0, 0.25, 0.5, 0.75];
    let a = net.predict(&probe).unwrap();
    let b = loaded.predict(&probe).unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert!((x - y).abs() < 1e-9, "{x} vs {y}");
    }
}

#[test]
fn loads_hand_written_fixture() {
    let net = Network::load_json(fixture("tiny_model.json")).unwrap();
    assert_eq!(net.input_dim(), 2);
    assert_eq!(net.output_dim(), 2);
    assert_eq!(net.hidden_layers().len(), 1);
    assert_eq!(net.learning_rate(), 0.01);

    // a1 = [2, 1], logits = [1, -1].
    let probs = net.predict(&[2.0, 1.0]).unwrap();
    let expected = 1.0 / (1.0 + (-2.0_f64).exp());
    assert!((probs[0] - expected).abs() < 1e-12);
    assert_eq!(net.argmax(&probs).unwrap(), 0);

    assert_eq!(net.classify(&[0.0, 3.0]).unwrap(), 1);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    match Network::load_json(&path) {
        Err(Error::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn corrupt_file_is_a_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(&path, "{ \"inputs\": 2, \"output_class\": ").unwrap();
    assert!(matches!(
        Network::load_json(&path),
        Err(Error::Persistence(_))
    ));
}
