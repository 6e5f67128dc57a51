pub mod play;
pub mod train;

pub use play::{EpisodeOutcome, PlayConfig, PlayMode};
pub use train::{TrainConfig, TrainMode};
