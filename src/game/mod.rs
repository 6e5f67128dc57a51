//! Core game logic module for Snake
//!
//! This module contains all the grid-world rules without any I/O or rendering
//! dependencies: movement on an optionally toroidal grid, obstacles, food, grid
//! growth and the reward table used for training.

pub mod action;
pub mod config;
pub mod engine;
pub mod state;

// Re-export commonly used types
pub use action::Direction;
pub use config::GameConfig;
pub use engine::{GameEngine, StepInfo, StepResult};
pub use state::{CollisionType, GameState, Position, Snake};
