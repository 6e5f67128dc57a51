//! Reinforcement learning stack for the Snake game
//!
//! Provides:
//! - Vector observations with optional ray-cast features
//! - The reset/step/get_state environment boundary
//! - A dense Q-network with hand-written backpropagation
//! - Bounded experience replay
//! - The Double-DQN agent and its configuration
//! - JSON model persistence

pub mod agent;
pub mod buffer;
pub mod config;
pub mod environment;
pub mod network;
pub mod observation;
pub mod persistence;

pub use agent::{argmax, DqnAgent};
pub use buffer::{Experience, ReplayBuffer};
pub use config::DqnConfig;
pub use environment::SnakeEnvironment;
pub use network::Network;
pub use observation::{create_observation, observation_size};
pub use persistence::{ModelMetadata, ModelRecord};
