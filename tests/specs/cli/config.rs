//! Specs for `--config-location` sources being resolved and projected into the
//! wrapped command's environment.

use crate::prelude::*;
use std::io::Write;

#[test]
fn json_config_source_is_projected_into_child_env() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"DB_HOST": "db.internal"}}"#).unwrap();
    let location = format!("deep=FILE:{}!JSON", file.path().display());

    cli()
        .args(&[
            "--task-name",
            "config-check",
            "--no-status-listener",
            "--config-location",
            &location,
            "--",
            "sh",
            "-c",
            "test \"$DB_HOST\" = db.internal",
        ])
        .passes();
}

#[test]
fn explicit_env_flag_takes_priority_over_config_source() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"DB_HOST": "from-config"}}"#).unwrap();
    let location = format!("deep=FILE:{}!JSON", file.path().display());

    cli()
        .args(&[
            "--task-name",
            "precedence-check",
            "--no-status-listener",
            "-e",
            "DB_HOST=from-flag",
            "--config-location",
            &location,
            "--",
            "sh",
            "-c",
            "test \"$DB_HOST\" = from-flag",
        ])
        .passes();
}
