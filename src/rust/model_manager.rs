//! Local registry of base models.
//!
//! Each model lives in its own directory under the registry root:
//! `<root>/<model-name>/model.onnx` and `<root>/<model-name>/tokenizer.json`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::classifier::loader::{MODEL_FILE, TOKENIZER_FILE};

/// Environment variable overriding the cache root.
pub const CACHE_ENV_VAR: &str = "TXN_CATEGORIZER_CACHE";

/// Hub serving base models as `<hub>/<name>/resolve/main/...`.
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Where to fetch a base model from, and the SHA-256 digests to expect.
///
/// A `None` digest accepts whatever the server returns; the digest actually
/// received is logged so it can be pinned afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub model_url: String,
    pub tokenizer_url: String,
    pub model_hash: Option<String>,
    pub tokenizer_hash: Option<String>,
}

impl ModelInfo {
    /// Locates the ONNX export and tokenizer of `name` on a model hub laid out
    /// like Hugging Face: `<hub>/<name>/resolve/main/onnx/model.onnx` and
    /// `<hub>/<name>/resolve/main/tokenizer.json`.
    ///
    /// # Example
    /// ```
    /// use txn_categorizer::{ModelInfo, DEFAULT_HUB_URL};
    ///
    /// let info = ModelInfo::from_hub(DEFAULT_HUB_URL, "distilbert-base-uncased");
    /// assert_eq!(
    ///     info.tokenizer_url,
    ///     "https://huggingface.co/distilbert-base-uncased/resolve/main/tokenizer.json"
    /// );
    /// ```
    pub fn from_hub(hub_url: &str, name: &str) -> Self {
        let repo = format!("{}/{}/resolve/main", hub_url.trim_end_matches('/'), name);
        Self {
            name: name.to_string(),
            model_url: format!("{}/onnx/{}", repo, MODEL_FILE),
            tokenizer_url: format!("{}/{}", repo, TOKENIZER_FILE),
            model_hash: None,
            tokenizer_hash: None,
        }
    }

    /// Pins the expected SHA-256 digests of the two files.
    pub fn with_hashes(mut self, model_hash: Option<String>, tokenizer_hash: Option<String>) -> Self {
        self.model_hash = model_hash.map(|h| h.to_lowercase());
        self.tokenizer_hash = tokenizer_hash.map(|h| h.to_lowercase());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        if let Ok(path) = env::var(CACHE_ENV_VAR) {
            return PathBuf::from(path).join("models");
        }
        let cache_root = dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
            .unwrap_or_else(env::temp_dir);
        cache_root.join("txn-categorizer").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn model_dir(&self, name: &str) -> PathBuf {
        self.models_dir.join(name)
    }

    pub fn get_model_path(&self, name: &str) -> PathBuf {
        self.model_dir(name).join(MODEL_FILE)
    }

    pub fn get_tokenizer_path(&self, name: &str) -> PathBuf {
        self.model_dir(name).join(TOKENIZER_FILE)
    }

    pub fn is_model_downloaded(&self, name: &str) -> bool {
        let model_path = self.get_model_path(name);
        let tokenizer_path = self.get_tokenizer_path(name);
        log::debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        log::debug!("Tokenizer path: {:?} (exists: {})", tokenizer_path, tokenizer_path.exists());
        model_path.exists() && tokenizer_path.exists()
    }

    /// Fetches both files of `info`, skipping any already present with the
    /// expected digest. On failure the partial download is removed.
    pub async fn download_model(&self, info: &ModelInfo) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;
        let model_dir = self.model_dir(&info.name);
        log::info!("Preparing model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        let result = async {
            self.fetch_if_stale(
                "model",
                &info.model_url,
                &self.get_model_path(&info.name),
                info.model_hash.as_deref(),
            )
            .await?;
            self.fetch_if_stale(
                "tokenizer",
                &info.tokenizer_url,
                &self.get_tokenizer_path(&info.name),
                info.tokenizer_hash.as_deref(),
            )
            .await
        }
        .await;

        match result {
            Ok(()) => {
                log::info!("Model '{}' ready to use", info.name);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to set up model '{}': {}", info.name, e);
                let _ = self.remove_download(&info.name);
                Err(e)
            }
        }
    }

    async fn fetch_if_stale(
        &self,
        file_type: &str,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
    ) -> Result<(), ModelError> {
        if path.exists() && Self::verify_file(path, expected_hash)? {
            log::info!("Existing {} file verified at {:?}", file_type, path);
            return Ok(());
        }

        log::info!("Downloading {} file from {}", file_type, url);
        let bytes = reqwest::get(url).await?.error_for_status()?.bytes().await?;
        let actual = sha256_hex(&bytes);
        match expected_hash {
            Some(expected) if actual != expected => {
                return Err(ModelError::HashMismatch {
                    file_type: file_type.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
            Some(_) => {}
            None => log::warn!("No pinned digest for {} file; received sha256 {}", file_type, actual),
        }

        fs::write(path, &bytes)?;
        if !Self::verify_file(path, expected_hash)? {
            return Err(ModelError::VerificationFailed);
        }
        log::info!("{} file written to {:?} ({} bytes)", file_type, path, bytes.len());
        Ok(())
    }

    fn verify_file(path: &Path, expected_hash: Option<&str>) -> Result<bool, ModelError> {
        match expected_hash {
            Some(expected) => Ok(sha256_hex(&fs::read(path)?) == expected),
            None => Ok(path.is_file()),
        }
    }

    /// Checks both files against the digests in `info`. Missing files verify
    /// as `false`; an unpinned file verifies if it is present.
    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        if !self.is_model_downloaded(&info.name) {
            return Ok(false);
        }
        let model_ok = Self::verify_file(&self.get_model_path(&info.name), info.model_hash.as_deref())?;
        let tokenizer_ok =
            Self::verify_file(&self.get_tokenizer_path(&info.name), info.tokenizer_hash.as_deref())?;
        log::info!("Verification of '{}': model={}, tokenizer={}", info.name, model_ok, tokenizer_ok);
        Ok(model_ok && tokenizer_ok)
    }

    pub fn remove_download(&self, name: &str) -> Result<(), ModelError> {
        for path in [self.get_model_path(name), self.get_tokenizer_path(name)] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Downloads the model when missing and re-downloads it when verification
    /// fails.
    pub async fn ensure_model_downloaded(&self, info: &ModelInfo) -> Result<(), ModelError> {
        if self.verify_model(info)? {
            log::info!("Model '{}' verified", info.name);
            return Ok(());
        }
        log::info!("Model '{}' missing or stale, downloading...", info.name);
        self.remove_download(&info.name)?;
        self.download_model(info).await
    }

    /// Fails with `NotDownloaded` unless both files of `name` are present.
    pub fn require_model(&self, name: &str) -> Result<PathBuf, ModelError> {
        if self.is_model_downloaded(name) {
            Ok(self.model_dir(name))
        } else {
            Err(ModelError::NotDownloaded(name.to_string()))
        }
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models_dir() {
        env::set_var(CACHE_ENV_VAR, "/tmp/txn-test-cache");
        let path = ModelManager::get_default_models_dir();
        assert_eq!(path, PathBuf::from("/tmp/txn-test-cache/models"));
        env::remove_var(CACHE_ENV_VAR);

        let path = ModelManager::get_default_models_dir();
        assert!(path.ends_with("txn-categorizer/models"));
    }

    #[test]
    fn test_from_hub_urls() {
        let info = ModelInfo::from_hub("http://mirror.local/", "distilbert-base-uncased")
            .with_hashes(Some("ABC".to_string()), None);
        assert_eq!(
            info.model_url,
            "http://mirror.local/distilbert-base-uncased/resolve/main/onnx/model.onnx"
        );
        assert_eq!(
            info.tokenizer_url,
            "http://mirror.local/distilbert-base-uncased/resolve/main/tokenizer.json"
        );
        assert_eq!(info.model_hash.as_deref(), Some("abc"));
        assert!(info.tokenizer_hash.is_none());
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
