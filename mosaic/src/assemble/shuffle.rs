use rand::Rng;

/// Bounded reservoir used for local shuffling.
///
/// Until it is full, inserts only fill it. Afterwards every insert evicts a
/// uniformly random resident and takes its slot, in one step.
#[derive(Debug)]
pub struct ShuffleBuffer<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> ShuffleBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_warm(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Inserts `item`, returning the evicted element once the buffer is warm.
    pub fn insert<R: Rng + ?Sized>(&mut self, item: T, rng: &mut R) -> Option<T> {
        if self.items.len() < self.capacity {
            self.items.push(item);
            return None;
        }
        let slot = rng.gen_range(0..self.items.len());
        Some(std::mem::replace(&mut self.items[slot], item))
    }

    /// Releases everything held.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn fills_before_evicting() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut buffer = ShuffleBuffer::new(3);
        assert_eq!(buffer.insert(0, &mut rng), None);
        assert_eq!(buffer.insert(1, &mut rng), None);
        assert!(!buffer.is_warm());
        assert_eq!(buffer.insert(2, &mut rng), None);
        assert!(buffer.is_warm());

        let evicted = buffer.insert(3, &mut rng).unwrap();
        assert!(evicted < 3);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn every_item_comes_out_exactly_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut buffer = ShuffleBuffer::new(8);
        let mut out: Vec<u32> = (0..100).filter_map(|i| buffer.insert(i, &mut rng)).collect();
        assert_eq!(out.len(), 92);
        buffer.items.sort();
        out.extend(buffer.items.drain(..));
        out.sort();
        assert_eq!(out, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn output_order_is_shuffled() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut buffer = ShuffleBuffer::new(16);
        let out: Vec<u32> = (0..200).filter_map(|i| buffer.insert(i, &mut rng)).collect();
        assert!(out.windows(2).any(|w| w[0] > w[1]));
    }
}
