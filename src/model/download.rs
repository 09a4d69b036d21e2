use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::ModelLoadError;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// ggml variants published for whisper.cpp.
const KNOWN_MODELS: &[&str] = &[
    "tiny",
    "tiny.en",
    "base",
    "base.en",
    "small",
    "small.en",
    "medium",
    "medium.en",
    "large-v1",
    "large-v2",
    "large-v3",
    "large-v3-turbo",
];

/// Maps user-facing names to published ggml variant names.
fn canonical_name(name: &str) -> Option<&'static str> {
    if name == "turbo" {
        return Some("large-v3-turbo");
    }
    KNOWN_MODELS.iter().copied().find(|&known| known == name)
}

fn model_filename(variant: &str) -> String {
    format!("ggml-{variant}.bin")
}

/// Path the weights for `name` occupy under `storage_root`.
///
/// # Errors
/// Returns `UnknownModel` for names outside the published variant set.
pub fn model_path(name: &str, storage_root: &Path) -> Result<PathBuf, ModelLoadError> {
    let variant =
        canonical_name(name).ok_or_else(|| ModelLoadError::UnknownModel(name.to_owned()))?;
    Ok(storage_root.join(model_filename(variant)))
}

/// Ensure the weights for `name` exist under `storage_root`, downloading
/// them on first use. Returns the weight file path.
///
/// # Errors
/// Returns error for unknown names or failed downloads. An existing weight
/// file is trusted as-is and never re-fetched.
pub fn ensure_model(name: &str, storage_root: &Path) -> Result<PathBuf, ModelLoadError> {
    let variant =
        canonical_name(name).ok_or_else(|| ModelLoadError::UnknownModel(name.to_owned()))?;
    let path = storage_root.join(model_filename(variant));

    if path.exists() {
        tracing::info!(
            path = %path.display(),
            "model already cached, skipping download"
        );
        return Ok(path);
    }

    tracing::info!(
        model = name,
        path = %path.display(),
        "model not cached, starting download"
    );

    download_model(variant, &path).map_err(|source| ModelLoadError::Download {
        name: name.to_owned(),
        source,
    })?;

    Ok(path)
}

fn download_model(variant: &str, model_path: &Path) -> Result<()> {
    let filename = model_filename(variant);
    let url = format!("{MODEL_BASE_URL}/{filename}");

    if let Some(parent) = model_path.parent() {
        fs::create_dir_all(parent).context("failed to create model directory")?;
    }

    tracing::info!(url = %url, "downloading model");

    // Download to a temporary file first so a partial fetch never
    // masquerades as a complete weight file.
    let temp_path = model_path.with_extension("tmp");

    let response = reqwest::blocking::get(&url)
        .with_context(|| format!("failed to download model from {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("download failed with status {}: {}", response.status(), url);
    }

    let bytes = response.bytes().context("failed to read response bytes")?;

    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("failed to create temp file at {}", temp_path.display()))?;

    file.write_all(&bytes)
        .context("failed to write model to temp file")?;

    drop(file);

    fs::rename(&temp_path, model_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp_path.display(),
            model_path.display()
        )
    })?;

    tracing::info!(
        path = %model_path.display(),
        size = bytes.len(),
        "model downloaded"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_passes_published_variants_through() {
        assert_eq!(canonical_name("tiny"), Some("tiny"));
        assert_eq!(canonical_name("base.en"), Some("base.en"));
        assert_eq!(canonical_name("large-v3"), Some("large-v3"));
    }

    #[test]
    fn canonical_name_maps_turbo_alias() {
        assert_eq!(canonical_name("turbo"), Some("large-v3-turbo"));
    }

    #[test]
    fn canonical_name_rejects_unknown() {
        assert_eq!(canonical_name("gigantic"), None);
        assert_eq!(canonical_name(""), None);
        assert_eq!(canonical_name("Tiny"), None);
    }

    #[test]
    fn model_filename_uses_ggml_prefix() {
        assert_eq!(model_filename("small"), "ggml-small.bin");
        assert_eq!(model_filename("large-v3-turbo"), "ggml-large-v3-turbo.bin");
    }

    #[test]
    fn model_path_joins_storage_root() {
        let path = model_path("turbo", Path::new("/opt/models")).unwrap();
        assert_eq!(path, PathBuf::from("/opt/models/ggml-large-v3-turbo.bin"));
    }

    #[test]
    fn model_path_rejects_unknown_name() {
        let err = model_path("gigantic", Path::new("/opt/models")).unwrap_err();
        assert!(matches!(err, ModelLoadError::UnknownModel(ref name) if name == "gigantic"));
    }

    #[test]
    fn ensure_model_skips_download_for_cached_file() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("ggml-tiny.bin");
        fs::write(&cached, b"dummy model data").unwrap();

        let path = ensure_model("tiny", dir.path()).unwrap();
        assert_eq!(path, cached);
        assert_eq!(fs::read(&path).unwrap(), b"dummy model data");
    }

    #[test]
    fn ensure_model_rejects_unknown_name_before_any_network_use() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_model("gigantic", dir.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::UnknownModel(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    #[ignore = "requires network access and downloads a large file"]
    fn ensure_model_downloads_tiny_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = ensure_model("tiny", dir.path()).unwrap();
        assert!(path.exists());
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }
}
