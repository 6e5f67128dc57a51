//! Dense feed-forward Q-value network with hand-written training
//!
//! The network maps an observation vector to one value per action. Hidden
//! layers use ReLU, the output layer is linear.
//!
//! # Architecture
//!
//! ```text
//! Input: [observation_size]
//!   ↓ Dense(observation_size → 128) + ReLU
//!   ↓ Dense(128 → 128) + ReLU
//!   ↓ Dense(128 → 4)
//! Output: [num_actions] Q-values
//! ```
//!
//! Weights are stored `fan_in × fan_out` per layer transition. All parameters
//! sit behind one [`RwLock`]: any number of `forward` calls may run at once,
//! while `train_step` and `load` take the lock exclusively.
//!
//! # Example
//!
//! ```rust
//! use snake_dqn::rl::Network;
//!
//! let network = Network::new(&[14, 32, 4], 0.001);
//! let q_values = network.forward(&[0.0; 14]);
//! assert_eq!(q_values.len(), 4);
//! ```

use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::Rng;

use super::persistence::{read_record, write_record, ModelRecord};
use crate::error::ModelError;

/// Layer shapes plus the parameters that must stay consistent with them
#[derive(Debug, Clone, PartialEq)]
struct Parameters {
    layer_sizes: Vec<usize>,
    /// `weights[l][j][k]`: from unit `j` of layer `l` to unit `k` of layer `l + 1`
    weights: Vec<Vec<Vec<f32>>>,
    biases: Vec<Vec<f32>>,
}

impl Parameters {
    fn transitions(&self) -> usize {
        self.weights.len()
    }

    fn output_size(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    /// Dense layers, keeping every layer's activations (input included)
    fn activations(&self, input: &[f32]) -> Vec<Vec<f32>> {
        let mut activations = Vec::with_capacity(self.layer_sizes.len());
        activations.push(input.to_vec());

        for layer in 0..self.transitions() {
            let next = self.dense(layer, &activations[layer]);
            activations.push(next);
        }

        activations
    }

    fn dense(&self, layer: usize, input: &[f32]) -> Vec<f32> {
        let weights = &self.weights[layer];
        let is_output = layer + 1 == self.transitions();

        self.biases[layer]
            .iter()
            .enumerate()
            .map(|(k, &bias)| {
                let sum = input
                    .iter()
                    .zip(weights)
                    .fold(bias, |acc, (&x, row)| acc + x * row[k]);
                if is_output {
                    sum
                } else {
                    relu(sum)
                }
            })
            .collect()
    }
}

fn relu(x: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

fn relu_derivative(activation: f32) -> f32 {
    if activation > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Feed-forward Q-network
///
/// Shared by reference between a trainer and any number of readers; all
/// mutation goes through the internal lock.
#[derive(Debug)]
pub struct Network {
    params: RwLock<Parameters>,
    learning_rate: f32,
}

impl Network {
    /// Create a network with Xavier-uniform initial parameters
    ///
    /// # Arguments
    ///
    /// * `layer_sizes` - Units per layer, input first, output last (at least 2 entries)
    /// * `learning_rate` - Step size used by [`Network::train_step`]
    pub fn new(layer_sizes: &[usize], learning_rate: f32) -> Self {
        Self::with_rng(layer_sizes, learning_rate, &mut rand::thread_rng())
    }

    /// Create a network drawing its initial parameters from `rng`
    ///
    /// Every weight and bias of a transition is sampled independently from
    /// `U(-b, b)` with `b = sqrt(6 / (fan_in + fan_out))`.
    pub fn with_rng<R: Rng + ?Sized>(layer_sizes: &[usize], learning_rate: f32, rng: &mut R) -> Self {
        assert!(
            layer_sizes.len() >= 2,
            "a network needs at least an input and an output layer"
        );
        assert!(
            layer_sizes.iter().all(|&size| size > 0),
            "layer sizes must be positive"
        );

        let mut weights = Vec::with_capacity(layer_sizes.len() - 1);
        let mut biases = Vec::with_capacity(layer_sizes.len() - 1);

        for pair in layer_sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let bound = (6.0 / (fan_in + fan_out) as f32).sqrt();

            weights.push(
                (0..fan_in)
                    .map(|_| (0..fan_out).map(|_| rng.gen_range(-bound..=bound)).collect())
                    .collect(),
            );
            biases.push((0..fan_out).map(|_| rng.gen_range(-bound..=bound)).collect());
        }

        Self {
            params: RwLock::new(Parameters {
                layer_sizes: layer_sizes.to_vec(),
                weights,
                biases,
            }),
            learning_rate,
        }
    }

    /// Build a network from a persisted record
    pub fn from_record(record: ModelRecord, learning_rate: f32) -> Result<Self, ModelError> {
        record.validate()?;
        Ok(Self {
            params: RwLock::new(Parameters {
                layer_sizes: record.layer_sizes,
                weights: record.weights,
                biases: record.biases,
            }),
            learning_rate,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Parameters> {
        self.params.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Parameters> {
        self.params.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compute the Q-values for one observation
    ///
    /// # Panics
    ///
    /// Panics if `input.len()` differs from the input layer size.
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let params = self.read();
        assert_eq!(
            input.len(),
            params.layer_sizes[0],
            "forward: input length does not match the input layer"
        );

        let mut current = input.to_vec();
        for layer in 0..params.transitions() {
            current = params.dense(layer, &current);
        }
        current
    }

    /// One gradient step towards `target` for a single example
    ///
    /// The output delta is `target - prediction`, backpropagated through the
    /// ReLU layers and applied as `w += lr * delta * activation_in`. Returns the
    /// mean squared output error measured before the update.
    ///
    /// # Panics
    ///
    /// Panics if `input` or `target` do not match the input/output layer sizes.
    pub fn train_step(&self, input: &[f32], target: &[f32]) -> f32 {
        let mut params = self.write();
        let sizes = params.layer_sizes.clone();
        assert_eq!(
            input.len(),
            sizes[0],
            "train_step: input length does not match the input layer"
        );
        assert_eq!(
            target.len(),
            sizes[sizes.len() - 1],
            "train_step: target length does not match the output layer"
        );

        let activations = params.activations(input);
        let transitions = params.transitions();

        let output = &activations[transitions];
        let mut deltas: Vec<Vec<f32>> = vec![Vec::new(); transitions];
        deltas[transitions - 1] = target.iter().zip(output).map(|(t, o)| t - o).collect();

        for layer in (0..transitions - 1).rev() {
            let next_weights = &params.weights[layer + 1];
            let next_deltas = &deltas[layer + 1];
            let hidden: Vec<f32> = (0..sizes[layer + 1])
                .map(|j| {
                    let sum: f32 = next_deltas
                        .iter()
                        .zip(&next_weights[j])
                        .map(|(d, w)| d * w)
                        .sum();
                    sum * relu_derivative(activations[layer + 1][j])
                })
                .collect();
            deltas[layer] = hidden;
        }

        let lr = self.learning_rate;
        for layer in 0..transitions {
            let delta = &deltas[layer];
            for (j, row) in params.weights[layer].iter_mut().enumerate() {
                let a = activations[layer][j];
                for (w, d) in row.iter_mut().zip(delta) {
                    *w += lr * d * a;
                }
            }
            for (b, d) in params.biases[layer].iter_mut().zip(delta) {
                *b += lr * d;
            }
        }

        let error = &deltas[transitions - 1];
        error.iter().map(|e| e * e).sum::<f32>() / error.len() as f32
    }

    /// Snapshot of the parameters as a serializable record
    pub fn to_record(&self) -> ModelRecord {
        let params = self.read();
        ModelRecord {
            layer_sizes: params.layer_sizes.clone(),
            weights: params.weights.clone(),
            biases: params.biases.clone(),
        }
    }

    /// Save layer sizes, weights and biases to `path` as one JSON document
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        write_record(&self.to_record(), path)
    }

    /// Replace layer sizes, weights and biases with the record at `path`
    ///
    /// The record is read and validated before the lock is taken; on any
    /// error the network is left untouched.
    pub fn load(&self, path: &Path) -> Result<(), ModelError> {
        let record = read_record(path)?;

        let mut params = self.write();
        *params = Parameters {
            layer_sizes: record.layer_sizes,
            weights: record.weights,
            biases: record.biases,
        };
        Ok(())
    }

    /// Like [`Network::load`], but only accepts a record with the same input
    /// and output sizes as this network
    ///
    /// Hidden layers may differ. A mismatch is reported as
    /// [`ModelError::Format`] and leaves the network untouched.
    pub fn load_matching(&self, path: &Path) -> Result<(), ModelError> {
        let record = read_record(path)?;

        let mut params = self.write();
        let (inputs, outputs) = (params.layer_sizes[0], params.output_size());
        let (record_inputs, record_outputs) = (
            record.layer_sizes[0],
            record.layer_sizes[record.layer_sizes.len() - 1],
        );
        if record_inputs != inputs || record_outputs != outputs {
            return Err(ModelError::Format {
                path: path.to_path_buf(),
                reason: format!(
                    "model has {record_inputs} inputs and {record_outputs} outputs, \
                     expected {inputs} and {outputs}"
                ),
            });
        }

        *params = Parameters {
            layer_sizes: record.layer_sizes,
            weights: record.weights,
            biases: record.biases,
        };
        Ok(())
    }

    pub fn layer_sizes(&self) -> Vec<usize> {
        self.read().layer_sizes.clone()
    }

    pub fn input_size(&self) -> usize {
        self.read().layer_sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.read().output_size()
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Clone for Network {
    /// Deep copy; the clone shares no storage with the source
    fn clone(&self) -> Self {
        Self {
            params: RwLock::new(self.read().clone()),
            learning_rate: self.learning_rate,
        }
    }
}
