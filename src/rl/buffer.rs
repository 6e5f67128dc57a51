//! Experience replay buffer for DQN training
//!
//! Fixed-capacity FIFO store of transitions. Once full, every new transition
//! evicts the oldest one. Training draws uniform random batches from it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::seq::index;
use rand::Rng;

/// One environment transition
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
}

impl Experience {
    pub fn new(state: Vec<f32>, action: usize, reward: f32, next_state: Vec<f32>, done: bool) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}

/// Bounded replay memory
///
/// All operations share one lock, so a buffer can be filled by the training
/// loop while another thread reads its size.
///
/// # Example
///
/// ```rust
/// use snake_dqn::rl::{Experience, ReplayBuffer};
///
/// let buffer = ReplayBuffer::new(2);
/// for reward in [1.0, 2.0, 3.0] {
///     buffer.add(Experience::new(vec![0.0], 0, reward, vec![0.0], false));
/// }
///
/// assert_eq!(buffer.len(), 2);
/// assert!(buffer.is_full());
/// ```
#[derive(Debug)]
pub struct ReplayBuffer {
    experiences: Mutex<VecDeque<Experience>>,
    capacity: usize,
}

impl ReplayBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        Self {
            experiences: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Experience>> {
        self.experiences.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a transition, evicting the oldest one when at capacity
    pub fn add(&self, experience: Experience) {
        let mut experiences = self.lock();
        if experiences.len() >= self.capacity {
            experiences.pop_front();
        }
        experiences.push_back(experience);
    }

    /// Draw up to `n` distinct transitions uniformly at random
    ///
    /// Returns every stored transition when fewer than `n` are held. No index
    /// is drawn twice within one call.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Experience> {
        let experiences = self.lock();
        let amount = n.min(experiences.len());

        index::sample(rng, experiences.len(), amount)
            .into_iter()
            .map(|i| experiences[i].clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove all stored transitions
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn experience(tag: usize) -> Experience {
        Experience::new(vec![tag as f32], tag % 4, tag as f32, vec![tag as f32 + 1.0], false)
    }

    fn tags(batch: &[Experience]) -> Vec<usize> {
        batch.iter().map(|e| e.state[0] as usize).collect()
    }

    #[test]
    fn test_buffer_new() {
        let buffer = ReplayBuffer::new(10);
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.capacity(), 10);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_rejected() {
        ReplayBuffer::new(0);
    }

    #[test]
    fn test_buffer_fills_to_capacity() {
        let buffer = ReplayBuffer::new(5);
        for tag in 0..5 {
            buffer.add(experience(tag));
        }
        assert_eq!(buffer.len(), 5);
        assert!(buffer.is_full());
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let buffer = ReplayBuffer::new(5);
        for tag in 0..8 {
            buffer.add(experience(tag));
        }
        assert_eq!(buffer.len(), 5);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let sampled: HashSet<usize> = tags(&buffer.sample(5, &mut rng)).into_iter().collect();
            assert_eq!(sampled, (3..8).collect());
        }
    }

    #[test]
    fn test_sample_more_than_stored() {
        let buffer = ReplayBuffer::new(100);
        for tag in 0..7 {
            buffer.add(experience(tag));
        }

        let mut rng = StdRng::seed_from_u64(11);
        let batch = buffer.sample(50, &mut rng);
        assert_eq!(batch.len(), 7);

        let unique: HashSet<usize> = tags(&batch).into_iter().collect();
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn test_sample_has_no_duplicates() {
        let buffer = ReplayBuffer::new(1000);
        for tag in 0..200 {
            buffer.add(experience(tag));
        }

        let mut rng = StdRng::seed_from_u64(5);
        let batch = buffer.sample(64, &mut rng);
        assert_eq!(batch.len(), 64);

        let unique: HashSet<usize> = tags(&batch).into_iter().collect();
        assert_eq!(unique.len(), 64);
    }

    #[test]
    fn test_sample_empty() {
        let buffer = ReplayBuffer::new(4);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(buffer.sample(4, &mut rng).is_empty());
    }

    #[test]
    fn test_buffer_clear() {
        let buffer = ReplayBuffer::new(4);
        buffer.add(experience(1));
        buffer.add(experience(2));
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_concurrent_add_and_len() {
        let buffer = ReplayBuffer::new(50);

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let buffer = &buffer;
                scope.spawn(move || {
                    for i in 0..100 {
                        buffer.add(experience(worker * 100 + i));
                        assert!(buffer.len() <= 50);
                    }
                });
            }
        });

        assert_eq!(buffer.len(), 50);
    }
}
