use cge_algo::equilibrium::COMPLEMENTARITY_TOLERANCE;
use cge_algo::mcp::{check_complementarity, finite_difference_jacobian, Complementarity};
use cge_algo::{
    build_report, calibrate, replicate_benchmark, run_sweep, solve_scenario, CalibrationError,
    Calibration, EquilibriumError, EquilibriumPoint, McpOptions, ScenarioState, SteelMcp,
    SweepOptions,
};
use cge_core::{default_sweep, Policy, ScenarioConfig, SteelData, Technology};
use cge_io::{generate, reference_technology, GeneratorConfig};

fn model() -> (SteelData, Calibration) {
    let data = generate(&reference_technology(), &GeneratorConfig::default()).unwrap();
    let calibration = calibrate(&data).unwrap();
    (data, calibration)
}

#[test]
fn calibration_meets_demand_with_merit_order() {
    let (data, cal) = model();
    assert!((cal.total_output() - data.dbar).abs() < 1e-9);

    // Cheapest technology runs at capacity, the marginal plant sets the price
    for (i, plant) in data.plants.iter().enumerate() {
        let cost = cal.unit_cost[i];
        if cost < cal.pbar - 1e-9 {
            assert!((cal.ybar[i] - plant.ylim).abs() < 1e-9, "{} not at capacity", plant.id);
            assert!((cal.rbar[i] - (cal.pbar - cost)).abs() < 1e-9);
        } else {
            assert_eq!(cal.rbar[i], 0.0);
        }
        if cost > cal.pbar + 1e-9 {
            assert_eq!(cal.ybar[i], 0.0);
        }
    }
    let marginal = cal.marginal_plant.expect("a partially loaded plant");
    assert_eq!(data.plant(marginal).unwrap().technology, Technology::Eaf);

    // hbar and ebar follow from the calibrated output
    let use_ = data.factor_use(&cal.ybar);
    assert_eq!(cal.hbar, use_);
    assert!((cal.benchmark_emissions() - data.emissions(&cal.ybar)).abs() < 1e-9);
}

#[test]
fn calibration_is_tied_to_its_dataset() {
    let (data, cal) = model();
    assert!(cal.is_consistent_with(&data));

    let other = generate(
        &reference_technology(),
        &GeneratorConfig {
            seed: 7,
            ..GeneratorConfig::default()
        },
    )
    .unwrap();
    assert!(!cal.is_consistent_with(&other));
    assert!(calibrate(&other).unwrap().is_consistent_with(&other));

    let mut dirtier = data.clone();
    dirtier.factors[cge_core::Factor::Coal].kappa *= 2.0;
    assert!(!cal.is_consistent_with(&dirtier));
}

#[test]
fn insufficient_capacity_is_infeasible() {
    let (mut data, _) = model();
    data.dbar = data.total_capacity() * 1.1;
    assert!(matches!(
        calibrate(&data),
        Err(CalibrationError::Infeasible { .. })
    ));
}

#[test]
fn benchmark_replicates_with_zero_iterations() {
    let (data, cal) = model();
    let residual = replicate_benchmark(&data, &cal, &McpOptions::default(), 1e-6).unwrap();
    assert!(residual < 1e-8);
}

#[test]
fn perturbed_calibration_fails_replication() {
    let (data, mut cal) = model();
    cal.pbar *= 1.05;
    let err = replicate_benchmark(&data, &cal, &McpOptions::default(), 1e-6).unwrap_err();
    assert!(matches!(err, EquilibriumError::Replication { .. }));
}

#[test]
fn benchmark_solve_reproduces_calibration() {
    let (data, cal) = model();
    let result = solve_scenario(
        &data,
        &cal,
        &ScenarioConfig::benchmark(),
        None,
        &McpOptions::default(),
    )
    .unwrap();

    assert!((result.production - cal.total_output()).abs() < 1e-6);
    assert!((result.production - data.dbar).abs() < 1e-6);
    assert!((result.point.steel_price - cal.pbar).abs() < 1e-6);
    assert_eq!(result.point.carbon_price, 0.0);
    assert!((result.emissions - cal.benchmark_emissions()).abs() < 1e-6);
}

#[test]
fn analytic_jacobian_matches_finite_differences() {
    let (data, cal) = model();
    let problem = SteelMcp::new(&data, &cal, Policy::EmissionsCap { fraction: 0.8 }).unwrap();
    let n = problem.dimension();
    let x: Vec<f64> = (0..n).map(|i| 1.0 + (i as f64) * 0.37).collect();

    let mut analytic = vec![0.0; n * n];
    problem.jacobian(&x, &mut analytic);
    let numeric = finite_difference_jacobian(&problem, &x, 1e-7);
    for (k, (a, f)) in analytic.iter().zip(&numeric).enumerate() {
        assert!(
            (a - f).abs() < 1e-4 * a.abs().max(1.0),
            "entry ({}, {}): analytic {a}, numeric {f}",
            k / n,
            k % n
        );
    }
}

#[test]
fn cap_raises_carbon_price_and_binds() {
    let (data, cal) = model();
    let cap = ScenarioConfig::new("Cap (-20%)", Policy::EmissionsCap { fraction: 0.8 });
    let result = solve_scenario(&data, &cal, &cap, None, &McpOptions::default()).unwrap();

    assert!(result.point.carbon_price > 0.0);
    assert!(result.emissions <= 0.8 * cal.benchmark_emissions() + 1e-6);
    assert!(result.point.steel_price > cal.pbar);
}

#[test]
fn tighter_cap_never_raises_emissions() {
    let (data, cal) = model();
    let options = McpOptions::default();
    let mut previous = cal.benchmark_emissions();
    let mut warm: Option<EquilibriumPoint> = None;
    for fraction in [0.95, 0.9, 0.8, 0.7] {
        let config = ScenarioConfig::new(
            format!("cap {fraction}"),
            Policy::EmissionsCap { fraction },
        );
        let result = solve_scenario(&data, &cal, &config, warm.as_ref(), &options).unwrap();
        assert!(
            result.emissions <= previous + 1e-6,
            "cap {fraction}: {} > {previous}",
            result.emissions
        );
        previous = result.emissions;
        warm = Some(result.point);
    }
}

#[test]
fn demand_slopes_downward() {
    let (data, cal) = model();
    let tax = ScenarioConfig::new("tax", Policy::CarbonTax { price: 50.0 });
    let result = solve_scenario(&data, &cal, &tax, None, &McpOptions::default()).unwrap();

    assert!(result.point.steel_price > cal.pbar);
    assert!(result.production < data.dbar);
    let implied = data.dbar * (1.0 + data.epsilon * (result.point.steel_price / cal.pbar - 1.0));
    assert!((result.production - implied).abs() < 1e-6);
}

#[test]
fn every_solved_scenario_is_complementary() {
    let (data, cal) = model();
    let sweep = run_sweep(&data, &cal, &default_sweep(), &SweepOptions::default()).unwrap();
    assert!(sweep.replication_residual < 1e-8);

    for result in sweep.solved() {
        let problem = SteelMcp::new(&data, &cal, result.scenario.policy).unwrap();
        let mut x = result.point.output.clone();
        x.push(result.point.steel_price);
        x.extend(result.point.factor_prices.0);
        x.extend(&result.point.rents);
        x.push(result.point.carbon_price);
        let report = check_complementarity(&problem, &x, COMPLEMENTARITY_TOLERANCE);
        assert!(report.is_valid(), "{}: {:?}", result.scenario.name, report.violations().next());
    }
}

#[test]
fn sweep_reports_default_scenarios() {
    let (data, cal) = model();
    let mut sweep = run_sweep(&data, &cal, &default_sweep(), &SweepOptions::default()).unwrap();
    let report = build_report(&data, &mut sweep);

    assert_eq!(report.summary.len(), 3);
    assert!(report.failed.is_empty());
    assert!(sweep
        .outcomes
        .iter()
        .all(|o| o.state == ScenarioState::Reported));

    let reference = &report.summary[0];
    assert_eq!(reference.scenario, "Reference");
    assert!((reference.production - data.dbar).abs() < 1e-6);
    assert_eq!(reference.carbon_price, 0.0);
    assert_eq!(reference.production_change_pct, 0.0);
    let shares = reference.bof_share + reference.eaf_share + reference.dri_share;
    assert!((shares - 1.0).abs() < 1e-9);

    let cap = &report.summary[1];
    assert!(cap.carbon_price > 0.0);
    assert!(cap.emissions_change_pct <= -20.0 + 1e-4);

    let tax = &report.summary[2];
    assert!((tax.carbon_price - 10.0).abs() < 1e-12);
    assert!(tax.emissions <= reference.emissions + 1e-6);

    assert_eq!(report.plants.len(), 3 * data.plants.len());
    assert_eq!(report.factors.len(), 3 * 5);
    assert!(report
        .plants
        .iter()
        .all(|row| row.utilisation <= 1.0 + 1e-6 && row.output >= 0.0 && row.rent >= 0.0));
}

#[test]
fn reporting_twice_yields_same_rows() {
    let (data, cal) = model();
    let mut sweep = run_sweep(&data, &cal, &default_sweep(), &SweepOptions::default()).unwrap();
    let first = build_report(&data, &mut sweep);
    let second = build_report(&data, &mut sweep);

    assert_eq!(first.summary.len(), 3);
    assert_eq!(first, second);
    assert!(sweep
        .outcomes
        .iter()
        .all(|o| o.state == ScenarioState::Reported));
}

#[test]
fn failed_scenario_is_skipped_not_fatal() {
    let (data, cal) = model();
    let scenarios = vec![
        ScenarioConfig::benchmark(),
        ScenarioConfig::new("too few iterations", Policy::EmissionsCap { fraction: 0.5 }),
        ScenarioConfig::new("tax", Policy::CarbonTax { price: 10.0 }),
    ];
    let options = SweepOptions {
        mcp: McpOptions {
            max_iterations: 1,
            ..McpOptions::default()
        },
        ..SweepOptions::default()
    };
    let mut sweep = run_sweep(&data, &cal, &scenarios, &options).unwrap();
    assert!(matches!(sweep.outcomes[1].state, ScenarioState::Failed(_)));

    let report = build_report(&data, &mut sweep);
    assert!(report
        .failed
        .iter()
        .any(|f| f.scenario == "too few iterations"));
    assert!(report.summary.iter().all(|r| r.scenario != "too few iterations"));
    assert_eq!(report.summary[0].scenario, "Reference");
}
