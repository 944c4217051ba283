//! End-to-end tests of the deficit sweep on synthetic catchment records.
//!
//! The records mimic a deficit that builds up every summer and resets each
//! winter, with low-flow extremes that are more frequent at high deficit but
//! also occur (and fail to occur) independently of it.

use chrono::{Duration, NaiveDate};
use lowflow_analysis::analysis::{label_days, run_sweep, smooth_deficit};
use lowflow_analysis::config::AnalysisConfig;
use lowflow_analysis::model::{AnalysisError, DailyRecord, FitError, InputError};
use lowflow_analysis::report::{SweepReport, save_smoothed};
use lowflow_analysis::series::DailySeries;

fn synthetic_records(days: usize) -> Vec<DailyRecord> {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    (0..days)
        .map(|d| {
            let doy = d % 365;
            let deficit = if (120..300).contains(&doy) {
                (doy - 120) as f64 * 1.5 + ((d * 31) % 7) as f64
            } else {
                ((d * 31) % 7) as f64
            };
            let hash = (d * 2654435761) % 101;
            let extreme = (deficit > 150.0 && hash < 35) || hash == 7;
            DailyRecord {
                date: start + Duration::days(d as i64),
                deficit,
                flow_ratio: if extreme { -0.3 } else { 0.4 },
            }
        })
        .collect()
}

fn config(taus: &str) -> AnalysisConfig {
    AnalysisConfig::from_toml_str(&format!("[sweep]\ntaus = {}\n", taus)).unwrap()
}

#[test]
fn test_sweep_over_three_years() {
    let series = DailySeries::new(synthetic_records(3 * 365)).unwrap();
    let config = config("[1.0, 5.0, 15.0, 30.0, 60.0, 90.0]");

    let result = run_sweep(&series, &config).unwrap();
    let taus: Vec<f64> = result.entries.iter().map(|e| e.tau).collect();
    assert_eq!(taus, vec![1.0, 5.0, 15.0, 30.0, 60.0, 90.0]);

    for (tau, rmse) in result.valid() {
        assert!(rmse.is_finite() && rmse >= 0.0, "tau {} gave rmse {}", tau, rmse);
    }
    assert_eq!(result.valid().count(), 6);

    let report = SweepReport::new(&result, &config);
    assert_eq!(report.summary.total, 6);
    assert_eq!(report.summary.observations, 3 * 365);
    assert!(report.summary.positives > 0);
}

#[test]
fn test_all_zero_labels_are_pinned_to_single_class() {
    let records: Vec<DailyRecord> = synthetic_records(400)
        .into_iter()
        .map(|r| DailyRecord { flow_ratio: 1.0, ..r })
        .collect();
    let series = DailySeries::new(records).unwrap();

    let result = run_sweep(&series, &config("[2.0, 20.0]")).unwrap();
    assert_eq!(result.len(), 2);
    for entry in &result.entries {
        assert_eq!(entry.outcome, Err(FitError::SingleClass { positives: 0, n: 400 }));
    }
}

#[test]
fn test_constant_deficit_fails_every_tau_without_aborting() {
    let records: Vec<DailyRecord> = synthetic_records(400)
        .into_iter()
        .map(|r| DailyRecord { deficit: 12.0, ..r })
        .collect();
    let series = DailySeries::new(records).unwrap();

    let result = run_sweep(&series, &config("[3.0, 30.0, 300.0]")).unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.failures().count(), 3);
    for (_, err) in result.failures() {
        assert_eq!(*err, FitError::ConstantPredictor);
    }
}

#[test]
fn test_series_shorter_than_warmup_aborts() {
    let series = DailySeries::new(synthetic_records(200)).unwrap();
    let err = run_sweep(&series, &config("[5.0]")).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::InvalidInput(InputError::TooShort { len: 200, required: 365 })
    ));
}

#[test]
fn test_labeled_days_and_smoothed_artifact() {
    let series = DailySeries::new(synthetic_records(730)).unwrap();

    let days = label_days(&series, 30.0, 365, 0.0).unwrap();
    assert_eq!(days.len(), 730);
    let smoothed = smooth_deficit(&series, 30.0, 365).unwrap();
    for (day, (date, value)) in days.iter().zip(&smoothed.points) {
        assert_eq!(day.date, *date);
        assert_eq!(day.predictor, *value);
    }

    let path = std::env::temp_dir().join(format!("lowflow_smoothed_{}.json", std::process::id()));
    save_smoothed(&smoothed, &path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["tau"], 30.0);
    assert_eq!(value["points"].as_array().unwrap().len(), 730);
    assert_eq!(value["points"][0][0], "2000-01-01");
    let _ = std::fs::remove_file(&path);
}
