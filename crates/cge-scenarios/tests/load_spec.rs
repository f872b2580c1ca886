use cge_core::Policy;
use cge_scenarios::{load_spec_from_path, resolve_scenarios, resolve_trade_scenarios, validate};
use std::fs;
use tempfile::TempDir;

const YAML: &str = r#"
version: 1
defaults:
  tags: [climate]
scenarios:
  - scenario_id: "Cap (-30%)"
    description: Deeper cut
    policy: emissions_cap
    cap_fraction: 0.7
  - scenario_id: "Tax ($25/tCO2)"
    policy: carbon_tax
    carbon_tax: 25
    tags: [tax]
trade:
  - scenario_id: Benchmark
    replicate_only: true
  - scenario_id: Triple_TC_AB
    transport_cost_multipliers:
      - { from: A, to: B, factor: 3.0 }
"#;

#[test]
fn yaml_spec_resolves_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scenarios.yaml");
    fs::write(&path, YAML).unwrap();

    let set = load_spec_from_path(&path).unwrap();
    validate(&set).unwrap();
    let resolved = resolve_scenarios(&set).unwrap();

    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[0].config.name, "Reference");
    assert_eq!(resolved[1].config.policy, Policy::EmissionsCap { fraction: 0.7 });
    assert_eq!(resolved[1].tags, vec!["climate".to_string()]);
    assert_eq!(resolved[2].config.policy, Policy::CarbonTax { price: 25.0 });
    assert_eq!(resolved[2].tags, vec!["tax".to_string()]);

    let trade = resolve_trade_scenarios(&set).unwrap();
    assert!(trade[0].replicate_only);
    assert_eq!(trade[1].shocks[0].factor, 3.0);
}

#[test]
fn json_spec_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scenarios.json");
    fs::write(
        &path,
        r#"{"defaults": {"include_benchmark": false},
            "scenarios": [{"scenario_id": "cap", "policy": "emissions_cap", "cap_fraction": 0.8}]}"#,
    )
    .unwrap();

    let resolved = resolve_scenarios(&load_spec_from_path(&path).unwrap()).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].config.name, "cap");
}

#[test]
fn invalid_cap_fraction_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yml");
    fs::write(
        &path,
        "scenarios:\n  - scenario_id: cap\n    policy: emissions_cap\n    cap_fraction: -0.5\n",
    )
    .unwrap();

    let set = load_spec_from_path(&path).unwrap();
    let err = validate(&set).unwrap_err();
    assert!(format!("{err:#}").contains("cap fraction"));
}

#[test]
fn unreadable_spec_names_the_file() {
    let dir = TempDir::new().unwrap();
    let err = load_spec_from_path(&dir.path().join("missing.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("missing.yaml"));
}
