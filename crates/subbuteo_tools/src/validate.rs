//! Data validation utilities.
//!
//! Checks the RON files the match engine reads: rules configs, scenario
//! scripts and saved match snapshots. The kind of a file is detected from
//! its contents unless the caller names it.

use std::fmt;
use std::path::{Path, PathBuf};

use subbuteo_core::config::RulesConfig;
use subbuteo_core::error::GameError;
use subbuteo_core::snapshot::MatchSnapshot;
use subbuteo_headless::scenario::{Scenario, ScenarioError};
use thiserror::Error;

/// Kinds of data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FileKind {
    /// A [`RulesConfig`].
    Rules,
    /// A scenario script.
    Scenario,
    /// A saved [`MatchSnapshot`].
    Snapshot,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rules => "rules",
            Self::Scenario => "scenario",
            Self::Snapshot => "snapshot",
        })
    }
}

/// Validation failures.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// A file or directory could not be read.
    #[error("Cannot read '{path}': {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Rules or snapshot file is invalid.
    #[error("{kind} file '{path}' is invalid: {source}")]
    Data {
        /// Offending path.
        path: PathBuf,
        /// What the file was read as.
        kind: FileKind,
        /// Underlying error.
        #[source]
        source: GameError,
    },
    /// Scenario file is invalid.
    #[error("scenario file '{path}' is invalid: {source}")]
    Scenario {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: ScenarioError,
    },
    /// The contents match no known kind.
    #[error("'{0}' is not a rules, scenario or snapshot file")]
    Unrecognized(PathBuf),
    /// Some files in a directory failed.
    #[error("{failed} of {total} files failed validation")]
    Failed {
        /// Failed files.
        failed: usize,
        /// Files checked.
        total: usize,
    },
}

/// Guess the kind of a RON document.
///
/// Scenarios and snapshots have required fields; rules accept any subset of
/// their fields, so they are tried last.
#[must_use]
pub fn detect_kind(source: &str) -> Option<FileKind> {
    if ron::from_str::<Scenario>(source).is_ok() {
        Some(FileKind::Scenario)
    } else if ron::from_str::<MatchSnapshot>(source).is_ok() {
        Some(FileKind::Snapshot)
    } else if ron::from_str::<RulesConfig>(source).is_ok() {
        Some(FileKind::Rules)
    } else {
        None
    }
}

/// Validate one file, as `kind` or as whatever it looks like.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not recognised, or
/// fails the checks for its kind.
pub fn validate_file(path: &Path, kind: Option<FileKind>) -> Result<FileKind, ValidateError> {
    let source = std::fs::read_to_string(path).map_err(|source| ValidateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let kind = kind
        .or_else(|| detect_kind(&source))
        .ok_or_else(|| ValidateError::Unrecognized(path.to_path_buf()))?;
    let label = path.display().to_string();

    let data_error = |source| ValidateError::Data {
        path: path.to_path_buf(),
        kind,
        source,
    };
    match kind {
        FileKind::Rules => {
            RulesConfig::from_ron_str(&source, &label).map_err(data_error)?;
        }
        FileKind::Snapshot => {
            MatchSnapshot::from_ron(&source, &label).map_err(data_error)?;
        }
        FileKind::Scenario => {
            Scenario::from_ron_str(&source)
                .and_then(|scenario| scenario.validate())
                .map_err(|source| ValidateError::Scenario {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
    }
    tracing::debug!(path = %label, %kind, "Valid");
    Ok(kind)
}

/// Result for one file of a directory walk.
#[derive(Debug)]
pub struct FileReport {
    /// File checked.
    pub path: PathBuf,
    /// Kind on success, error otherwise.
    pub result: Result<FileKind, ValidateError>,
}

/// Validate every `.ron` file under `path` (recursively), or `path` itself
/// if it is a file.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed.
pub fn validate_path(path: &Path, kind: Option<FileKind>) -> Result<Vec<FileReport>, ValidateError> {
    let mut files = Vec::new();
    collect_ron_files(path, &mut files)?;
    files.sort();
    Ok(files
        .into_iter()
        .map(|file| FileReport {
            result: validate_file(&file, kind),
            path: file,
        })
        .collect())
}

fn collect_ron_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<(), ValidateError> {
    let io_error = |source| ValidateError::Io {
        path: path.to_path_buf(),
        source,
    };
    if path.is_file() {
        out.push(path.to_path_buf());
        return Ok(());
    }
    for entry in std::fs::read_dir(path).map_err(io_error)? {
        let entry_path = entry.map_err(io_error)?.path();
        if entry_path.is_dir() {
            collect_ron_files(&entry_path, out)?;
        } else if entry_path.extension().and_then(|e| e.to_str()) == Some("ron") {
            out.push(entry_path);
        }
    }
    Ok(())
}

/// Validate all RON data files in a directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or any file fails.
pub fn validate_data_directory(path: &Path) -> Result<(), ValidateError> {
    let reports = validate_path(path, None)?;
    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    for report in &reports {
        match &report.result {
            Ok(kind) => tracing::info!(path = %report.path.display(), %kind, "OK"),
            Err(e) => tracing::error!("{e}"),
        }
    }
    if failed > 0 {
        return Err(ValidateError::Failed {
            failed,
            total: reports.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_rules() {
        assert_eq!(detect_kind("(max_hits_per_turn: 4)"), Some(FileKind::Rules));
    }

    #[test]
    fn test_detect_scenario() {
        let source = r#"(name: "s", steps: [(at_ms: 0, command: StartPositioning)])"#;
        assert_eq!(detect_kind(source), Some(FileKind::Scenario));
    }

    #[test]
    fn test_detect_garbage() {
        assert_eq!(detect_kind("[1, 2, 3"), None);
    }

    #[test]
    fn test_inconsistent_rules_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.ron");
        std::fs::write(&path, "(max_hits_per_turn: 1)").unwrap();
        assert!(matches!(
            validate_file(&path, None),
            Err(ValidateError::Data {
                kind: FileKind::Rules,
                ..
            })
        ));
    }
}
