use cge_core::{CgeError, SteelData};
use cge_io::{
    generate, load_dataset, reference_technology, save_dataset, DatasetReader, GeneratorConfig,
};
use std::fs;
use tempfile::TempDir;

fn generated() -> SteelData {
    generate(&reference_technology(), &GeneratorConfig::default()).unwrap()
}

fn assert_close(a: &SteelData, b: &SteelData) {
    assert_eq!(a.plants.len(), b.plants.len());
    assert!((a.dbar - b.dbar).abs() < 1e-9);
    assert_eq!(a.epsilon, b.epsilon);
    for (p, q) in a.plants.iter().zip(&b.plants) {
        assert_eq!(p.id, q.id);
        assert_eq!(p.technology, q.technology);
        assert!((p.ylim - q.ylim).abs() < 1e-12);
        assert!((p.ybar - q.ybar).abs() < 1e-12);
        for (x, y) in p.tau.0.iter().zip(q.tau.0.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }
    assert_eq!(a.abar, b.abar);
    assert_eq!(a.factors, b.factors);
}

#[test]
fn arrow_directory_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset");
    let data = generated();

    save_dataset(&data, &path, Some(42)).unwrap();
    assert!(path.join("manifest.json").exists());
    assert!(!dir.path().join("dataset.tmp").exists());

    let reader = DatasetReader::open(&path).unwrap();
    assert_eq!(reader.manifest().seed, Some(42));
    assert_eq!(reader.manifest().tables["params_tau"].row_count, 75);
    assert_eq!(reader.manifest().tables["sets_plants"].row_count, 15);

    let back = load_dataset(&path).unwrap();
    assert_eq!(back, data);
}

#[test]
fn json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset.json");
    let data = generated();

    save_dataset(&data, &path, None).unwrap();
    let back = load_dataset(&path).unwrap();
    assert_close(&back, &data);
}

#[test]
fn overwriting_replaces_previous_dataset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset");
    save_dataset(&generated(), &path, Some(42)).unwrap();

    let other = generate(
        &reference_technology(),
        &GeneratorConfig {
            seed: 9,
            ..GeneratorConfig::default()
        },
    )
    .unwrap();
    save_dataset(&other, &path, Some(9)).unwrap();
    assert_eq!(load_dataset(&path).unwrap(), other);
}

#[test]
fn tampered_table_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset");
    save_dataset(&generated(), &path, Some(42)).unwrap();

    let table = path.join("scalars.arrow");
    let mut bytes = fs::read(&table).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&table, bytes).unwrap();

    let err = DatasetReader::open(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Checksum mismatch"));
    assert!(matches!(load_dataset(&path), Err(CgeError::Parse(_))));
}

#[test]
fn row_count_disagreeing_with_manifest_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset");
    save_dataset(&generated(), &path, Some(42)).unwrap();

    let manifest_path = path.join("manifest.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    manifest["tables"]["sets_plants"]["row_count"] = serde_json::json!(14);
    fs::write(&manifest_path, manifest.to_string()).unwrap();

    let reader = DatasetReader::open(&path).unwrap();
    let err = reader.load_table("sets_plants").unwrap_err();
    assert!(err.to_string().contains("manifest records 14"));
    assert!(matches!(load_dataset(&path), Err(CgeError::Parse(_))));
}

#[test]
fn missing_manifest_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset");
    save_dataset(&generated(), &path, None).unwrap();
    fs::remove_file(path.join("manifest.json")).unwrap();

    let err = DatasetReader::open(&path).unwrap_err();
    assert!(format!("{err:#}").contains("manifest.json not found"));
}

#[test]
fn missing_dataset_is_missing_input() {
    let dir = TempDir::new().unwrap();
    let err = load_dataset(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, CgeError::MissingInput(_)));
}
