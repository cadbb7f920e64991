//! Unit tests for manifest loading and batch execution.

use super::helpers::{output_files, placeholder_archive, stub_source, workspace, write_manifest};
use super::*;
use crate::batch::{BatchConfig, execute_batch, load_manifest, run_batch, summarise};
use camino::Utf8PathBuf;
use rstest::rstest;
use std::num::NonZeroUsize;

fn batch_args(manifest: &Utf8PathBuf, output_dir: Utf8PathBuf) -> BatchArgs {
    BatchArgs {
        manifest: Some(manifest.clone()),
        output_dir: Some(output_dir),
        jobs: NonZeroUsize::new(2),
        ..BatchArgs::default()
    }
}

#[rstest]
fn missing_manifest_argument_names_the_env_var() {
    let err = BatchConfig::try_from(BatchArgs::default()).expect_err("manifest required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_MANIFEST);
            assert_eq!(env, ENV_BATCH_MANIFEST);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn relative_archives_resolve_against_the_manifest() {
    let (_guard, root) = workspace();
    let manifest = write_manifest(
        &root,
        r#"{"layers": [
            {"name": "manzanas", "archive": "capas/manzanas.zip"},
            {"name": "tiendas", "archive": "/datos/tiendas.zip",
             "tiers": {"full": {"is_points": true}, "lite": {"is_points": true, "dedupe_grid": 0.0001}}}
        ]}"#,
    );

    let jobs = load_manifest(&manifest).expect("valid manifest");

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].archive, root.join("capas/manzanas.zip"));
    assert!(jobs[0].tiers.is_shared());
    assert_eq!(jobs[1].archive, Utf8PathBuf::from("/datos/tiendas.zip"));
    assert!(jobs[1].tiers.lite.is_points());
    assert_eq!(jobs[1].tiers.lite.dedupe_grid(), 0.0001);
}

#[rstest]
#[case(r#"{"layers": []}"#)]
#[case(r#"{"layers": [{"name": "a", "archive": "a.zip"}, {"name": "a", "archive": "b.zip"}]}"#)]
#[case(r#"{"layers": [{"name": "a"}]}"#)]
#[case(r#"{"layers": [{"name": "a", "archive": "a.zip", "tiers": {"lite": {"dedupe_grid": 0}}}]}"#)]
fn malformed_manifests_are_rejected(#[case] body: &str) {
    let (_guard, root) = workspace();
    let manifest = write_manifest(&root, body);
    let err = load_manifest(&manifest).expect_err("malformed manifest");
    assert!(
        matches!(
            err,
            CliError::EmptyManifest { .. }
                | CliError::DuplicateLayer { .. }
                | CliError::ParseManifest { .. }
        ),
        "unexpected error {err:?}"
    );
}

#[rstest]
fn duplicate_layers_are_named() {
    let (_guard, root) = workspace();
    let manifest = write_manifest(
        &root,
        r#"{"layers": [{"name": "a", "archive": "a.zip"}, {"name": "a", "archive": "b.zip"}]}"#,
    );
    match load_manifest(&manifest) {
        Err(CliError::DuplicateLayer { name, .. }) => assert_eq!(name, "a"),
        other => panic!("expected DuplicateLayer, found {other:?}"),
    }
}

#[rstest]
fn unreadable_manifests_report_the_path() {
    let (_guard, root) = workspace();
    let missing = root.join("ausente.json");
    match load_manifest(&missing) {
        Err(CliError::ReadManifest { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected ReadManifest, found {other:?}"),
    }
}

#[rstest]
fn batches_isolate_failing_layers() {
    let (_guard, root) = workspace();
    placeholder_archive(&root, "manzanas");
    let manifest = write_manifest(
        &root,
        r#"{"layers": [
            {"name": "manzanas", "archive": "manzanas.zip"},
            {"name": "vacio", "archive": "vacio.zip"}
        ]}"#,
    );
    let output_dir = root.join("build");

    let outcomes = execute_batch(batch_args(&manifest, output_dir.clone()), &stub_source())
        .expect("batch runs");

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_ok());
    assert_eq!(
        outcomes[1].as_ref().map_err(|err| err.layer.as_str()).err(),
        Some("vacio")
    );
    assert_eq!(
        output_files(&output_dir),
        vec![
            "manzanas.full.geojson",
            "manzanas.lite.geojson",
            "manzanas.lite.geojson.gz",
        ]
    );
}

#[rstest]
fn any_failed_layer_fails_the_run() {
    let (_guard, root) = workspace();
    let manifest = write_manifest(
        &root,
        r#"{"layers": [
            {"name": "manzanas", "archive": "manzanas.zip"},
            {"name": "vacio", "archive": "vacio.zip"}
        ]}"#,
    );
    let err = run_batch(batch_args(&manifest, root.join("build")), &stub_source())
        .expect_err("one layer fails");
    match err {
        CliError::LayersFailed { failed, total } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 2);
        }
        other => panic!("expected LayersFailed, found {other:?}"),
    }
}

#[rstest]
fn summaries_of_successful_runs_pass() {
    summarise(&[]).expect("nothing failed");
}

#[rstest]
fn parses_batch_flags() {
    let cli = Cli::try_parse_from(["strata", "batch", "capas.json", "--jobs", "3"])
        .expect("valid invocation");
    let Command::Batch(parsed) = cli.command else {
        panic!("expected the batch command");
    };
    assert_eq!(parsed.manifest, Some(Utf8PathBuf::from("capas.json")));
    assert_eq!(parsed.jobs, NonZeroUsize::new(3));
}

#[rstest]
fn zero_workers_are_rejected_by_the_parser() {
    assert!(Cli::try_parse_from(["strata", "batch", "capas.json", "--jobs", "0"]).is_err());
}
