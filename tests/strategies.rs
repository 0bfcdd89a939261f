//! End-to-end checks of the predefined denoising strategies against a
//! synthetic fMRIprep-style confounds file.

use std::path::{Path, PathBuf};

use ndarray::Array2;

use fmriprep_confounds::confounds::writer::write_table;
use fmriprep_confounds::{
    ConfoundError, ConfoundTable, Confounds, Model, MotionReduction, ScrubMode, Strategy,
};

const N_FRAMES: usize = 60;

fn derivative(series: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN];
    for pair in series.windows(2) {
        out.push(pair[1] - pair[0]);
    }
    out
}

fn push_expanded(columns: &mut Vec<(String, Vec<f64>)>, name: &str, series: Vec<f64>) {
    let deriv = derivative(&series);
    columns.push((name.to_string(), series.clone()));
    columns.push((
        format!("{name}_derivative1"),
        deriv.clone(),
    ));
    columns.push((
        format!("{name}_power2"),
        series.iter().map(|v| v * v).collect(),
    ));
    columns.push((
        format!("{name}_derivative1_power2"),
        deriv.iter().map(|v| v * v).collect(),
    ));
}

/// A small confounds table with every column family the strategies know.
fn fixture_table() -> ConfoundTable {
    let mut columns: Vec<(String, Vec<f64>)> = Vec::new();

    for (i, name) in ["trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z"]
        .iter()
        .enumerate()
    {
        let series: Vec<f64> = (0..N_FRAMES)
            .map(|t| (t as f64 * 0.21 + i as f64).sin() + 0.01 * i as f64 * t as f64)
            .collect();
        push_expanded(&mut columns, name, series);
    }
    for (i, name) in ["csf", "white_matter", "global_signal"].iter().enumerate() {
        let series: Vec<f64> = (0..N_FRAMES)
            .map(|t| (t as f64 * 0.13 + 2.0 * i as f64).cos())
            .collect();
        push_expanded(&mut columns, name, series);
    }
    for order in 0..8usize {
        let series: Vec<f64> = (0..N_FRAMES)
            .map(|t| {
                let angle = std::f64::consts::PI
                    * (order as f64 + 1.0)
                    * (2.0 * t as f64 + 1.0)
                    / (2.0 * N_FRAMES as f64);
                angle.cos()
            })
            .collect();
        columns.push((format!("cosine{order:02}"), series));
    }
    for i in 0..12usize {
        let series: Vec<f64> = (0..N_FRAMES).map(|t| ((t * (i + 3)) as f64 * 0.7).sin()).collect();
        columns.push((format!("a_comp_cor_{i:02}"), series));
    }
    for i in 0..7usize {
        let series: Vec<f64> = (0..N_FRAMES).map(|t| ((t * (i + 2)) as f64 * 0.9).cos()).collect();
        columns.push((format!("t_comp_cor_{i:02}"), series));
    }
    columns.push((
        "aroma_motion_02".to_string(),
        (0..N_FRAMES).map(|t| (t as f64 * 0.33).sin()).collect(),
    ));

    let mut fd = vec![f64::NAN];
    fd.extend(std::iter::repeat(0.05).take(N_FRAMES - 1));
    fd[20] = 0.9;
    fd[21] = 0.9;
    fd[45] = 0.9;
    columns.push(("framewise_displacement".to_string(), fd));

    let mut dvars = vec![f64::NAN];
    dvars.extend(std::iter::repeat(1.0).take(N_FRAMES - 1));
    dvars[45] = 5.0;
    columns.push(("std_dvars".to_string(), dvars));

    let names: Vec<String> = columns.iter().map(|(n, _)| n.clone()).collect();
    let mut cells = Vec::with_capacity(N_FRAMES * names.len());
    for t in 0..N_FRAMES {
        for (_, series) in &columns {
            cells.push(series[t]);
        }
    }
    let data = Array2::from_shape_vec((N_FRAMES, names.len()), cells).unwrap();
    ConfoundTable::new(names, data).unwrap()
}

/// Write the fixture to disk as fMRIprep would: TSV plus JSON sidecar.
fn write_fixture(dir: &Path) -> PathBuf {
    let tsv = dir.join("sub-01_task-rest_desc-confounds_timeseries.tsv");
    write_table(&tsv, &fixture_table(), None).unwrap();

    let mut sidecar = serde_json::Map::new();
    for i in 0..12usize {
        let mask = match i {
            0..=5 => "combined",
            6..=8 => "WM",
            _ => "CSF",
        };
        sidecar.insert(
            format!("a_comp_cor_{i:02}"),
            serde_json::json!({ "Method": "aCompCor", "Mask": mask, "Retained": true }),
        );
    }
    std::fs::write(
        dir.join("sub-01_task-rest_desc-confounds_timeseries.json"),
        serde_json::Value::Object(sidecar).to_string(),
    )
    .unwrap();
    tsv
}

fn assert_columns(actual: &[String], expected_present: &[&str], expected_absent: &[&str]) {
    for name in expected_present {
        assert!(
            actual.iter().any(|c| c == name),
            "expected column '{name}' in {actual:?}"
        );
    }
    for name in expected_absent {
        assert!(
            !actual.iter().any(|c| c == name),
            "unexpected column '{name}' in {actual:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

#[test]
fn params_2_selects_high_pass_and_wm_csf() {
    let out = Confounds::params_2()
        .load_table(&fixture_table(), None)
        .unwrap();
    assert_columns(
        &out.table.columns,
        &["cosine00", "cosine07", "csf", "white_matter"],
        &["trans_x", "global_signal", "csf_derivative1"],
    );
    assert_eq!(out.table.n_cols(), 10);
}

#[test]
fn params_6_selects_basic_motion() {
    let out = Confounds::params_6()
        .load_table(&fixture_table(), None)
        .unwrap();
    assert_columns(
        &out.table.columns,
        &["trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z", "cosine00"],
        &["trans_x_derivative1", "csf"],
    );
    assert_eq!(out.table.n_cols(), 14);
}

#[test]
fn params_9_adds_wm_csf_and_global() {
    let out = Confounds::params_9()
        .load_table(&fixture_table(), None)
        .unwrap();
    assert_columns(
        &out.table.columns,
        &["trans_y", "rot_z", "cosine04", "csf", "white_matter", "global_signal"],
        &["rot_z_power2", "a_comp_cor_00"],
    );
    assert_eq!(out.table.n_cols(), 17);
}

#[test]
fn params_24_expands_motion_fully() {
    let out = Confounds::params_24()
        .load_table(&fixture_table(), None)
        .unwrap();
    assert_columns(
        &out.table.columns,
        &[
            "trans_x",
            "trans_x_derivative1",
            "trans_x_power2",
            "trans_x_derivative1_power2",
            "rot_z_derivative1",
            "cosine06",
        ],
        &["csf", "global_signal"],
    );
    assert_eq!(out.table.n_cols(), 24 + 8);
}

#[test]
fn params_36_expands_every_group() {
    let out = Confounds::params_36()
        .load_table(&fixture_table(), None)
        .unwrap();
    assert_columns(
        &out.table.columns,
        &[
            "trans_z_derivative1_power2",
            "csf_derivative1_power2",
            "white_matter_power2",
            "global_signal_derivative1",
            "cosine00",
        ],
        &["a_comp_cor_00", "t_comp_cor_00"],
    );
    assert_eq!(out.table.n_cols(), 24 + 8 + 8 + 4);
}

#[test]
fn anat_compcor_keeps_combined_mask_components() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = write_fixture(dir.path());

    let out = Confounds::anat_compcor(10).load(&tsv).unwrap();
    assert_columns(
        &out.table.columns,
        &["a_comp_cor_00", "a_comp_cor_05", "trans_x_power2", "cosine07"],
        // WM- and CSF-mask components are excluded by the sidecar, and no
        // temporal components may leak in.
        &["a_comp_cor_06", "a_comp_cor_11", "t_comp_cor_00"],
    );
}

#[test]
fn anat_compcor_without_sidecar_keeps_first_n() {
    let out = Confounds::anat_compcor(4)
        .load_table(&fixture_table(), None)
        .unwrap();
    assert_columns(
        &out.table.columns,
        &["a_comp_cor_00", "a_comp_cor_03"],
        &["a_comp_cor_04", "t_comp_cor_00"],
    );
}

#[test]
fn temp_compcor_excludes_anatomical_components() {
    let out = Confounds::temp_compcor(6)
        .load_table(&fixture_table(), None)
        .unwrap();
    assert_columns(
        &out.table.columns,
        &["cosine00", "t_comp_cor_00", "t_comp_cor_05"],
        &["t_comp_cor_06", "a_comp_cor_00", "trans_x"],
    );
    assert_eq!(out.table.n_cols(), 8 + 6);
}

// ---------------------------------------------------------------------------
// Motion models and PCA reduction
// ---------------------------------------------------------------------------

#[test]
fn motion_models_control_expansion() {
    let table = fixture_table();
    let cases = [
        (Model::Basic, vec![""], vec!["_derivative1", "_power2", "_derivative1_power2"]),
        (Model::Derivatives, vec!["", "_derivative1"], vec!["_power2", "_derivative1_power2"]),
        (Model::Power2, vec!["", "_power2"], vec!["_derivative1", "_derivative1_power2"]),
        (
            Model::Full,
            vec!["", "_derivative1", "_power2", "_derivative1_power2"],
            vec![],
        ),
    ];

    for (model, present, absent) in cases {
        let mut conf = Confounds::new(vec![Strategy::Motion]);
        conf.motion = model;
        let out = conf.load_table(&table, None).unwrap();
        for param in ["trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z"] {
            for suffix in &present {
                let name = format!("{param}{suffix}");
                assert!(
                    out.table.columns.contains(&name),
                    "{model:?}: expected {name}"
                );
            }
            for suffix in &absent {
                let name = format!("{param}{suffix}");
                assert!(
                    !out.table.columns.contains(&name),
                    "{model:?}: unexpected {name}"
                );
            }
        }
    }
}

#[test]
fn n_motion_replaces_motion_block_with_components() {
    let mut conf = Confounds::new(vec![Strategy::Motion]);
    conf.motion = Model::Full;
    conf.n_motion = MotionReduction::Components(2);
    let out = conf.load_table(&fixture_table(), None).unwrap();
    assert_eq!(out.table.columns, vec!["motion_pca_1", "motion_pca_2"]);
}

#[test]
fn n_motion_variance_target_reduces_dimension() {
    let mut conf = Confounds::new(vec![Strategy::Motion]);
    conf.motion = Model::Full;
    conf.n_motion = MotionReduction::VarianceRatio(0.95);
    let out = conf.load_table(&fixture_table(), None).unwrap();
    assert!(out.table.n_cols() < 24);
    assert_eq!(out.table.columns[0], "motion_pca_1");
}

#[test]
fn n_motion_over_request_fails() {
    let mut conf = Confounds::new(vec![Strategy::Motion]);
    conf.motion = Model::Full;
    conf.n_motion = MotionReduction::Components(50);
    let err = conf.load_table(&fixture_table(), None).unwrap_err();
    assert!(matches!(
        err,
        ConfoundError::TooManyComponents {
            requested: 50,
            available: 24
        }
    ));
}

// ---------------------------------------------------------------------------
// Scrubbing
// ---------------------------------------------------------------------------

#[test]
fn scrub_appends_spike_regressors_and_mask() {
    let mut conf = Confounds::new(vec![Strategy::Motion, Strategy::Scrub]);
    conf.motion = Model::Basic;
    conf.scrub = ScrubMode::Basic;
    let out = conf.load_table(&fixture_table(), None).unwrap();

    // FD spikes at 20, 21 and 45; DVARS also flags 45.
    assert_columns(
        &out.table.columns,
        &["trans_x", "motion_outlier_0", "motion_outlier_1", "motion_outlier_2"],
        &["motion_outlier_3"],
    );
    let mask = out.sample_mask.unwrap();
    assert_eq!(mask.len(), N_FRAMES - 3);
    assert!(!mask.contains(&20) && !mask.contains(&21) && !mask.contains(&45));
}

#[test]
fn full_scrub_censors_short_segments() {
    let mut conf = Confounds::new(vec![Strategy::Scrub]);
    conf.scrub = ScrubMode::Full;
    let out = conf.load_table(&fixture_table(), None).unwrap();

    // 20 and 21 are adjacent; 45 leaves 14 clean tail frames. No segment
    // under five frames remains, so only the three outliers are censored.
    let mask = out.sample_mask.unwrap();
    assert_eq!(mask.len(), N_FRAMES - 3);
}

// ---------------------------------------------------------------------------
// Assembly behavior
// ---------------------------------------------------------------------------

#[test]
fn duplicate_strategies_are_rejected() {
    let conf = Confounds::new(vec![Strategy::WmCsf, Strategy::WmCsf]);
    let err = conf.load_table(&fixture_table(), None).unwrap_err();
    assert!(matches!(err, ConfoundError::DuplicateColumns(_)));
}

#[test]
fn output_is_demeaned_by_default() {
    let out = Confounds::params_9()
        .load_table(&fixture_table(), None)
        .unwrap();
    for j in 0..out.table.n_cols() {
        let mean = out.table.data.column(j).sum() / out.table.n_rows() as f64;
        assert!(mean.abs() < 1e-10, "column {j} mean {mean}");
    }
}

#[test]
fn demean_can_be_turned_off() {
    let mut conf = Confounds::params_2();
    conf.demean = false;
    let raw = fixture_table();
    let out = conf.load_table(&raw, None).unwrap();
    let csf_in = raw.column("csf").unwrap();
    let csf_out = out.table.column("csf").unwrap();
    assert_eq!(csf_in.to_vec(), csf_out.to_vec());
}

#[test]
fn derivative_nan_on_first_frame_is_repaired() {
    let mut conf = Confounds::new(vec![Strategy::WmCsf]);
    conf.wm_csf = Model::Derivatives;
    conf.demean = false;
    let out = conf.load_table(&fixture_table(), None).unwrap();
    let col = out.table.column("csf_derivative1").unwrap();
    assert!(!col[0].is_nan());
    assert_eq!(col[0], col[1]);
}

#[test]
fn missing_motion_parameter_is_reported() {
    let table = fixture_table();
    let keep: Vec<String> = table
        .columns
        .iter()
        .filter(|c| *c != "trans_x")
        .cloned()
        .collect();
    let truncated = table.select(&keep).unwrap();

    let mut conf = Confounds::new(vec![Strategy::Motion]);
    conf.motion = Model::Basic;
    match conf.load_table(&truncated, None).unwrap_err() {
        ConfoundError::MissingColumns(missing) => assert_eq!(missing, vec!["trans_x"]),
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// File round trip
// ---------------------------------------------------------------------------

#[test]
fn loads_from_image_path_via_discovery() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let image = dir
        .path()
        .join("sub-01_task-rest_space-MNI152NLin2009cAsym_desc-preproc_bold.nii.gz");

    let out = Confounds::params_6().load(&image).unwrap();
    assert_columns(&out.table.columns, &["trans_x", "cosine00"], &[]);
}

#[test]
fn missing_input_file_is_an_error() {
    let err = Confounds::default().load(Path::new("nowhere.tsv")).unwrap_err();
    assert!(matches!(err, ConfoundError::Read { .. }));
}

#[test]
fn reduced_table_round_trips_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = write_fixture(dir.path());

    let out = Confounds::params_36().load(&tsv).unwrap();
    let reduced = dir.path().join("reduced.tsv");
    write_table(&reduced, &out.table, None).unwrap();

    let reloaded = fmriprep_confounds::confounds::loader::load_table(&reduced).unwrap();
    assert_eq!(reloaded.columns, out.table.columns);
    assert_eq!(reloaded.n_rows(), N_FRAMES);
}
