//! Run directories and the run manifest.
//!
//! Layout of one run:
//! ```text
//! <output_dir>/<slug>-<YYYYmmdd-HHMMSS>/
//! ├── main.py            # one file per project key
//! ├── logic.py
//! └── forge-run.json     # request, file list and healing summary
//! ```

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use forge_core::{validate_filename, GenerationRequest, ProjectFileSet};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};
use crate::healing::HealingReport;

/// Manifest file written into every run directory.
pub const MANIFEST_FILE: &str = "forge-run.json";

const MAX_SLUG_LEN: usize = 40;

/// Convert an idea into a directory-safe slug.
pub fn slugify(s: &str) -> String {
    let slug = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "game".to_string()
    } else {
        slug.to_string()
    }
}

/// Directory name for a run started at `at`.
pub fn run_dir_name(idea: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", slugify(idea), at.format("%Y%m%d-%H%M%S"))
}

/// Create a fresh run directory under `output_dir`.
///
/// A numeric suffix is appended when two runs start in the same second.
pub async fn create_run_dir(output_dir: &Path, idea: &str, at: DateTime<Utc>) -> PipelineResult<PathBuf> {
    let name = run_dir_name(idea, at);
    let mut dir = output_dir.join(&name);
    let mut suffix = 2;
    while tokio::fs::try_exists(&dir)
        .await
        .map_err(|e| PipelineError::write(&dir, e))?
    {
        dir = output_dir.join(format!("{}-{}", name, suffix));
        suffix += 1;
    }

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| PipelineError::write(&dir, e))?;
    debug!("Created run directory {}", dir.display());
    Ok(dir)
}

/// Write one project file below `dir`, creating parent directories.
///
/// Names that are absolute or climb out of `dir` are rejected, and so is
/// the manifest name.
pub async fn write_project_file(dir: &Path, filename: &str, content: &str) -> PipelineResult<PathBuf> {
    validate_filename(filename)?;
    if is_manifest_name(filename) {
        return Err(PipelineError::ReservedFileName(filename.to_string()));
    }
    let path = dir.join(filename);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::write(parent, e))?;
    }
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| PipelineError::write(&path, e))?;
    Ok(path)
}

fn is_manifest_name(filename: &str) -> bool {
    Path::new(filename)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .eq(Path::new(MANIFEST_FILE).components())
}

/// Write every file of the set, overwriting existing files.
pub async fn write_files(dir: &Path, files: &ProjectFileSet) -> PipelineResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::write(dir, e))?;
    for (filename, content) in files.iter() {
        write_project_file(dir, filename, content).await?;
    }
    Ok(())
}

/// Summary of one run, stored as [`MANIFEST_FILE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub request: GenerationRequest,
    /// `multi` or `single`
    pub mode: String,
    pub files: Vec<String>,
    pub healing: HealingReport,
}

impl RunManifest {
    pub fn new(request: GenerationRequest, mode: impl Into<String>, healing: HealingReport) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            request,
            mode: mode.into(),
            files: healing.files.filenames(),
            healing,
        }
    }

    pub async fn write(&self, dir: &Path) -> PipelineResult<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| PipelineError::write(&path, e))?;
        Ok(path)
    }

    pub async fn load(dir: &Path) -> PipelineResult<Self> {
        let path = dir.join(MANIFEST_FILE);
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| PipelineError::read(&path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("A Snake game, with walls!"), "a-snake-game-with-walls");
        assert_eq!(slugify("???"), "game");
        assert!(slugify(&"tetris ".repeat(20)).len() <= MAX_SLUG_LEN);
        assert!(!slugify(&"ab ".repeat(20)).ends_with('-'));
    }

    #[test]
    fn test_run_dir_name() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 5, 9).unwrap();
        assert_eq!(run_dir_name("Pong", at), "pong-20260301-140509");
    }

    #[tokio::test]
    async fn test_create_run_dir_is_unique() {
        let temp = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 5, 9).unwrap();

        let first = create_run_dir(temp.path(), "pong", at).await.unwrap();
        let second = create_run_dir(temp.path(), "pong", at).await.unwrap();

        assert!(first.is_dir());
        assert_ne!(first, second);
        assert!(second.ends_with("pong-20260301-140509-2"));
    }

    #[tokio::test]
    async fn test_write_project_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = write_project_file(temp.path(), "assets/sprites.py", "SPRITES = {}")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "SPRITES = {}");
    }

    #[tokio::test]
    async fn test_write_project_file_rejects_escape() {
        let temp = TempDir::new().unwrap();
        let result = write_project_file(temp.path(), "../outside.py", "x").await;
        assert!(matches!(result, Err(PipelineError::Core(_))));
        assert!(!temp.path().parent().unwrap().join("outside.py").exists());
    }

    #[tokio::test]
    async fn test_write_project_file_rejects_manifest_name() {
        let temp = TempDir::new().unwrap();

        for name in [MANIFEST_FILE, "./forge-run.json"] {
            let result = write_project_file(temp.path(), name, "{}").await;
            assert!(matches!(result, Err(PipelineError::ReservedFileName(_))));
        }
        assert!(!temp.path().join(MANIFEST_FILE).exists());

        // only the top-level name is reserved
        write_project_file(temp.path(), "data/forge-run.json", "{}").await.unwrap();
    }

    #[tokio::test]
    async fn test_manifest_round_trip() {
        let temp = TempDir::new().unwrap();
        let files: ProjectFileSet = [("main.py".to_string(), "import arcade".to_string())]
            .into_iter()
            .collect();
        let manifest = RunManifest::new(
            GenerationRequest::new("pong", forge_core::Provider::Ollama),
            "multi",
            HealingReport::new(files),
        );

        manifest.write(temp.path()).await.unwrap();
        let loaded = RunManifest::load(temp.path()).await.unwrap();

        assert_eq!(loaded.run_id, manifest.run_id);
        assert_eq!(loaded.files, vec!["main.py"]);
        assert_eq!(loaded.request.idea, "pong");
    }
}
