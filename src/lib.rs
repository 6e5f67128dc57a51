//! Snake DQN - a Double-DQN agent learning Snake on a dynamic grid
//!
//! This library provides:
//! - Core game logic: toroidal or walled grid, obstacles, grid growth (game module)
//! - Observation encoding, Q-network, replay buffer and agent (rl module)
//! - Rolling training and evaluation statistics (metrics module)
//! - Headless training and evaluation drivers (modes module)

pub mod error;
pub mod game;
pub mod metrics;
pub mod modes;
pub mod rl;
