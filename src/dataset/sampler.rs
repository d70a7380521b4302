//! Index batching with optional seeded shuffling.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::VocmapError;

/// Splits `0..len` into batches of indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSampler {
    len: usize,
    batch_size: usize,
    shuffle: bool,
    seed: Option<u64>,
    drop_last: bool,
}

impl BatchSampler {
    /// An ordered sampler over `len` items.
    pub fn new(len: usize, batch_size: usize) -> Result<Self, VocmapError> {
        if batch_size == 0 {
            return Err(VocmapError::InvalidSampleParams {
                message: "batch size must be at least 1".to_string(),
            });
        }
        Ok(Self {
            len,
            batch_size,
            shuffle: false,
            seed: None,
            drop_last: false,
        })
    }

    /// Shuffle indices before batching. With a seed the order is reproducible.
    pub fn shuffled(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    /// Drop a trailing batch smaller than `batch_size`.
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches [`BatchSampler::batches`] yields.
    pub fn num_batches(&self) -> usize {
        if self.drop_last {
            self.len / self.batch_size
        } else {
            self.len.div_ceil(self.batch_size)
        }
    }

    pub fn batches(&self) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.len).collect();
        if self.shuffle {
            match self.seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    indices.shuffle(&mut rng);
                }
                None => {
                    let mut rng = rand::rng();
                    indices.shuffle(&mut rng);
                }
            }
        }

        indices
            .chunks(self.batch_size)
            .filter(|chunk| !self.drop_last || chunk.len() == self.batch_size)
            .map(<[usize]>::to_vec)
            .collect()
    }
}
