//! Training statistics tracking for DQN
//!
//! Rolling windows over recent episodes and training updates, used by the
//! training driver for its periodic progress lines.

use std::collections::VecDeque;

/// Training statistics tracker with rolling averages
///
/// # Example
///
/// ```rust
/// use snake_dqn::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
/// stats.record_episode(15.5, 150, 5);
/// stats.record_loss(0.02);
///
/// assert_eq!(stats.best_score(), 5);
/// println!("{}", stats.format_summary());
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    episode_rewards: VecDeque<f32>,
    episode_lengths: VecDeque<u32>,
    /// Food eaten per episode
    episode_scores: VecDeque<u32>,
    losses: VecDeque<f32>,

    best_score: u32,
    total_episodes: u64,
    total_steps: u64,
    total_updates: u64,

    window_size: usize,
}

impl TrainingStats {
    /// Create a tracker keeping the last `window_size` values of each series
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: VecDeque::with_capacity(window_size),
            episode_lengths: VecDeque::with_capacity(window_size),
            episode_scores: VecDeque::with_capacity(window_size),
            losses: VecDeque::with_capacity(window_size),
            best_score: 0,
            total_episodes: 0,
            total_steps: 0,
            total_updates: 0,
            window_size,
        }
    }

    /// Record the completion of an episode
    ///
    /// Returns true when `score` beats every earlier episode.
    pub fn record_episode(&mut self, reward: f32, length: u32, score: u32) -> bool {
        Self::push_deque(&mut self.episode_rewards, reward, self.window_size);
        Self::push_deque(&mut self.episode_lengths, length, self.window_size);
        Self::push_deque(&mut self.episode_scores, score, self.window_size);
        self.total_episodes += 1;
        self.total_steps += u64::from(length);

        let is_best = score > self.best_score;
        if is_best {
            self.best_score = score;
        }
        is_best
    }

    /// Record the loss of one training update
    pub fn record_loss(&mut self, loss: f32) {
        Self::push_deque(&mut self.losses, loss, self.window_size);
        self.total_updates += 1;
    }

    pub fn mean_episode_reward(&self) -> f32 {
        Self::mean(self.episode_rewards.iter().copied())
    }

    pub fn mean_episode_length(&self) -> f32 {
        Self::mean(self.episode_lengths.iter().map(|&l| l as f32))
    }

    pub fn mean_episode_score(&self) -> f32 {
        Self::mean(self.episode_scores.iter().map(|&s| s as f32))
    }

    pub fn mean_loss(&self) -> f32 {
        Self::mean(self.losses.iter().copied())
    }

    /// Highest score over all recorded episodes, not just the window
    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    /// Seed the best score, e.g. when resuming from a checkpoint
    pub fn set_best_score(&mut self, score: u32) {
        self.best_score = score;
    }

    pub fn total_episodes(&self) -> u64 {
        self.total_episodes
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn total_updates(&self) -> u64 {
        self.total_updates
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// One-line summary of the rolling statistics
    pub fn format_summary(&self) -> String {
        format!(
            "Episodes: {} | Steps: {} | Reward: {:.2} | Score: {:.2} | Best: {} | Len: {:.1} | Loss: {:.4}",
            self.total_episodes,
            self.total_steps,
            self.mean_episode_reward(),
            self.mean_episode_score(),
            self.best_score,
            self.mean_episode_length(),
            self.mean_loss(),
        )
    }

    fn mean(values: impl ExactSizeIterator<Item = f32>) -> f32 {
        let count = values.len();
        if count == 0 {
            0.0
        } else {
            values.sum::<f32>() / count as f32
        }
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if deque.len() >= window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}
