//! Builders shared by unit tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::trajectory::{CanonicalStep, Episode, RawEpisode, RawStep};

/// A canonical step whose action is `[index, index, ...]`.
pub(crate) fn step(index: usize, len: usize, action_dim: usize) -> CanonicalStep {
    CanonicalStep {
        index,
        observation: BTreeMap::new(),
        observation_mask: BTreeMap::new(),
        action: vec![index as f32; action_dim],
        action_mask: vec![true; action_dim],
        reward: None,
        is_first: index == 0,
        is_last: index + 1 == len,
        is_terminal: index + 1 == len,
    }
}

pub(crate) fn episode(dataset: &str, episode_id: &str, len: usize) -> Arc<Episode> {
    let steps = (0..len).map(|i| step(i, len, 2)).collect();
    Arc::new(Episode::new(Arc::from(dataset), episode_id, steps).unwrap())
}

/// Raw episode with a single `action` field `[step, episode_number]`.
pub(crate) fn raw_episode(number: usize, len: usize) -> RawEpisode {
    let steps = (0..len)
        .map(|i| RawStep::new().with_action("action", vec![i as f32, number as f32]))
        .collect();
    RawEpisode::new(format!("ep{number}"), steps)
}
