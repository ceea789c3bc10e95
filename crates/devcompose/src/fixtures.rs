// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for unit tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::TemplateRegistry;

/// The sample definitions shipped at the repository root.
pub(crate) fn definitions_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../definitions")
}

pub(crate) fn registry() -> TemplateRegistry {
    TemplateRegistry::load(definitions_dir()).expect("sample definitions load")
}

/// Write `content` to `root/rel`, creating parent directories.
pub(crate) fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(&path, content).expect("write fixture file");
    path
}

/// An empty definitions tree with the standard layout.
pub(crate) fn definitions_tree() -> TempDir {
    let tmp = tempfile::tempdir().expect("create temp dir");
    std::fs::create_dir_all(tmp.path().join("templates")).expect("create templates dir");
    std::fs::create_dir_all(tmp.path().join("services")).expect("create services dir");
    tmp
}
