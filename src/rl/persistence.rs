//! Model persistence for saving and loading trained networks
//!
//! A network is stored as one JSON document holding its layer sizes, weights
//! and biases. The training driver also writes a small metadata sidecar next
//! to it:
//! - `<path>` - Network record (JSON)
//! - `<path>.meta.json` - Training metadata (JSON)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::DqnConfig;
use crate::error::ModelError;
use crate::game::GameConfig;

/// Serialized form of a [`Network`](super::Network)
///
/// `weights[l]` is a `layer_sizes[l] × layer_sizes[l + 1]` matrix and
/// `biases[l]` has `layer_sizes[l + 1]` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
    #[serde(alias = "layers")]
    pub layer_sizes: Vec<usize>,
    pub weights: Vec<Vec<Vec<f32>>>,
    pub biases: Vec<Vec<f32>>,
}

impl ModelRecord {
    /// Check that every matrix agrees with `layer_sizes`
    pub fn validate(&self) -> Result<(), ModelError> {
        let sizes = &self.layer_sizes;
        if sizes.len() < 2 {
            return Err(ModelError::InvalidRecord(format!(
                "need at least 2 layers, got {}",
                sizes.len()
            )));
        }
        if let Some(layer) = sizes.iter().position(|&s| s == 0) {
            return Err(ModelError::InvalidRecord(format!("layer {layer} has size 0")));
        }

        let transitions = sizes.len() - 1;
        if self.weights.len() != transitions || self.biases.len() != transitions {
            return Err(ModelError::InvalidRecord(format!(
                "expected {transitions} weight and bias layers, got {} and {}",
                self.weights.len(),
                self.biases.len()
            )));
        }

        for layer in 0..transitions {
            let (fan_in, fan_out) = (sizes[layer], sizes[layer + 1]);
            let weights = &self.weights[layer];

            if weights.len() != fan_in || weights.iter().any(|row| row.len() != fan_out) {
                return Err(ModelError::InvalidRecord(format!(
                    "weights of layer {layer} are not {fan_in}x{fan_out}"
                )));
            }
            if self.biases[layer].len() != fan_out {
                return Err(ModelError::InvalidRecord(format!(
                    "biases of layer {layer} have {} entries, expected {fan_out}",
                    self.biases[layer].len()
                )));
            }
        }

        Ok(())
    }
}

/// Write a record, replacing any existing file only once the new one is complete
///
/// Creates parent directories if they don't exist.
pub fn write_record(record: &ModelRecord, path: &Path) -> Result<(), ModelError> {
    let io_error = |source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let json = serde_json::to_vec(record).map_err(|e| ModelError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let staging = staging_path(path);
    fs::write(&staging, json).map_err(io_error)?;
    fs::rename(&staging, path).map_err(io_error)
}

/// Read and validate a record
pub fn read_record(path: &Path) -> Result<ModelRecord, ModelError> {
    let bytes = fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let record: ModelRecord = serde_json::from_slice(&bytes).map_err(|e| ModelError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    record.validate().map_err(|e| e.in_file(path))?;
    Ok(record)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Location of the metadata sidecar for a model file
pub fn metadata_path(model_path: &Path) -> PathBuf {
    let mut name = model_path.file_name().unwrap_or_default().to_os_string();
    name.push(".meta.json");
    model_path.with_file_name(name)
}

/// Metadata saved with the model
///
/// Contains the configuration and training progress needed to resume
/// training or to rebuild a matching environment for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// DQN configuration used during training
    pub dqn_config: DqnConfig,

    /// Game configuration used during training
    pub game_config: GameConfig,

    /// Total `train()` updates performed
    pub training_steps: u64,

    /// Number of episodes trained
    pub episodes_trained: u64,

    pub generation: u64,

    /// Exploration rate at save time
    pub epsilon: f32,

    /// Best score seen so far
    pub best_score: u32,

    /// Version identifier for compatibility checking
    pub version: String,
}

impl ModelMetadata {
    pub fn new(
        dqn_config: DqnConfig,
        game_config: GameConfig,
        training_steps: u64,
        episodes_trained: u64,
        generation: u64,
        epsilon: f32,
        best_score: u32,
    ) -> Self {
        Self {
            dqn_config,
            game_config,
            training_steps,
            episodes_trained,
            generation,
            epsilon,
            best_score,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Save as pretty JSON next to the model at `model_path`
    pub fn save(&self, model_path: &Path) -> Result<()> {
        let meta_path = metadata_path(model_path);
        let meta_json =
            serde_json::to_string_pretty(self).context("Failed to serialize metadata")?;
        fs::write(&meta_path, meta_json)
            .with_context(|| format!("Failed to write metadata to {:?}", meta_path))?;
        Ok(())
    }

    /// Load the sidecar belonging to the model at `model_path`
    pub fn load(model_path: &Path) -> Result<Self> {
        let meta_path = metadata_path(model_path);
        let meta_json = fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read metadata from {:?}", meta_path))?;
        serde_json::from_str(&meta_json).context("Failed to deserialize metadata")
    }
}
