use faceratio_core::{IdealRange, IdealTable, IdealTableError, Landmark, LandmarkScheme};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid ideal-range table: {0}")]
    Ideal(#[from] IdealTableError),
}

/// Run configuration: an optional TOML file plus `FACERATIO_*` environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub detector: DetectorConfig,
    pub render: RenderConfig,
    /// Per-key index overrides on top of the MediaPipe face-mesh scheme.
    pub landmarks: BTreeMap<Landmark, usize>,
    /// Replaces the built-in reference table when non-empty.
    pub ideal: Vec<IdealRange>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// SCRFD face detection model.
    pub face_model_file: String,
    /// Face landmark (mesh) model.
    pub model_file: String,
    /// Face box score and face presence probability below which the photo counts as faceless.
    pub min_confidence: f32,
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_dir: faceratio_core::default_model_dir(),
            face_model_file: faceratio_core::FACE_DETECTOR_MODEL_FILE.to_string(),
            model_file: faceratio_core::FACE_MESH_MODEL_FILE.to_string(),
            min_confidence: faceratio_core::detector::DEFAULT_MIN_CONFIDENCE,
            intra_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// TTF/OTF font for labels. Without one, images are drawn unlabelled.
    pub font_path: Option<PathBuf>,
    /// Head roll (degrees) above which a warning is logged.
    pub max_roll_deg: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            max_roll_deg: 5.0,
        }
    }
}

impl Config {
    /// Load from `path` (if any), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from `FACERATIO_*` variables; `lookup` reads one variable.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("FACERATIO_MODEL_DIR") {
            self.detector.model_dir = PathBuf::from(dir);
        }
        self.detector.min_confidence = env_parse(
            &lookup,
            "FACERATIO_MIN_CONFIDENCE",
            self.detector.min_confidence,
        );
        self.detector.intra_threads =
            env_parse(&lookup, "FACERATIO_THREADS", self.detector.intra_threads);
        if let Some(font) = lookup("FACERATIO_FONT") {
            self.render.font_path = Some(PathBuf::from(font));
        }
    }

    /// Path to the face landmark model.
    pub fn model_path(&self) -> PathBuf {
        self.detector.model_dir.join(&self.detector.model_file)
    }

    /// Path to the face detection model.
    pub fn face_model_path(&self) -> PathBuf {
        self.detector.model_dir.join(&self.detector.face_model_file)
    }

    pub fn scheme(&self) -> LandmarkScheme {
        LandmarkScheme::mediapipe_face_mesh().with_overrides(&self.landmarks)
    }

    pub fn ideal_table(&self) -> Result<IdealTable, ConfigError> {
        if self.ideal.is_empty() {
            return Ok(IdealTable::default());
        }
        Ok(IdealTable::new(self.ideal.clone())?)
    }
}

/// Parse `key` with `lookup`, keeping `default` when unset or malformed.
fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring malformed environment override");
            default
        }),
        None => default,
    }
}
