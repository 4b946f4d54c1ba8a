use crate::tensor::{Tensor, TensorData};
use crate::window::Window;

/// `B` windows split into `S` contiguous, equally sized shards in draw order.
#[derive(Debug, Clone)]
pub struct Batch {
    sequence: u64,
    windows: Vec<Window>,
    shard_count: usize,
}

impl Batch {
    pub(crate) fn new(sequence: u64, windows: Vec<Window>, shard_count: usize) -> Self {
        debug_assert!(shard_count > 0 && windows.len() % shard_count == 0);
        Self {
            sequence,
            windows,
            shard_count,
        }
    }

    /// Position of this batch in the assembler's output, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn into_windows(self) -> Vec<Window> {
        self.windows
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    pub fn shard_size(&self) -> usize {
        self.windows.len() / self.shard_count
    }

    /// Windows `[i * B/S, (i + 1) * B/S)`. Panics if `i >= shard_count()`.
    pub fn shard(&self, i: usize) -> &[Window] {
        assert!(i < self.shard_count, "shard {i} out of {}", self.shard_count);
        let size = self.shard_size();
        &self.windows[i * size..(i + 1) * size]
    }

    pub fn shards(&self) -> impl Iterator<Item = &[Window]> {
        self.windows.chunks(self.shard_size().max(1))
    }

    pub fn window_length(&self) -> usize {
        self.windows.first().map(Window::len).unwrap_or(0)
    }

    pub fn action_dim(&self) -> usize {
        self.windows
            .first()
            .map(|w| w.step(0).action.len())
            .unwrap_or(0)
    }

    pub fn dataset_ids(&self) -> Vec<&str> {
        self.windows.iter().map(|w| w.dataset_id().as_ref()).collect()
    }

    /// Actions as a row-major `(B, W, action_dim)` block.
    pub fn actions(&self) -> (Vec<f32>, [usize; 3]) {
        let data = self.windows.iter().flat_map(Window::actions).collect();
        (data, [self.len(), self.window_length(), self.action_dim()])
    }

    /// Validity masks as a row-major `(B, W)` block.
    pub fn masks(&self) -> (Vec<bool>, [usize; 2]) {
        let data = self
            .windows
            .iter()
            .flat_map(|w| w.mask().iter().copied())
            .collect();
        (data, [self.len(), self.window_length()])
    }

    /// Stacks one observation modality into a `[B, W, ...]` tensor. `None`
    /// if the modality is unknown.
    pub fn observation(&self, key: &str) -> Option<Tensor> {
        let first = self.windows.first()?.step(0).observation.get(key)?;
        let mut shape = vec![self.len(), self.window_length()];
        shape.extend_from_slice(&first.shape);

        let steps = self.windows.iter().flat_map(|w| w.steps());
        let data = match first.data {
            TensorData::U8(_) => TensorData::U8(
                steps
                    .filter_map(|s| s.observation.get(key)?.as_u8())
                    .flatten()
                    .copied()
                    .collect(),
            ),
            TensorData::F32(_) => TensorData::F32(
                steps
                    .filter_map(|s| s.observation.get(key)?.as_f32())
                    .flatten()
                    .copied()
                    .collect(),
            ),
        };
        Tensor::new(shape, data)
    }
}
