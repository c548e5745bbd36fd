//! Train/validation partitioning.
//!
//! The record list is shuffled with a caller-supplied random source and cut
//! at `floor(len * ratio)`. Passing a seeded RNG makes the split reproducible.

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::GroundkitError;

/// Default fraction of records assigned to the training split.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.8;

/// Split options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitOptions {
    /// Fraction of records assigned to the training split, in `(0, 1)`.
    pub ratio: f64,
    /// Seed for the shuffle; `None` draws from the thread-local RNG.
    pub seed: Option<u64>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_SPLIT_RATIO,
            seed: None,
        }
    }
}

/// Validate split options before running.
pub fn validate_split_options(opts: &SplitOptions) -> Result<(), GroundkitError> {
    if !(opts.ratio > 0.0 && opts.ratio < 1.0) {
        return Err(GroundkitError::InvalidSplitRatio { ratio: opts.ratio });
    }
    Ok(())
}

/// Records of one dataset, partitioned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
}

impl<T> DatasetSplit<T> {
    /// Total number of records across both halves.
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.validation.is_empty()
    }
}

impl<T> Default for DatasetSplit<T> {
    fn default() -> Self {
        Self {
            train: Vec::new(),
            validation: Vec::new(),
        }
    }
}

/// Number of training records for a list of `total` records.
pub fn train_count(total: usize, ratio: f64) -> usize {
    ((total as f64 * ratio).floor() as usize).min(total)
}

/// Shuffle `records` with `rng` and cut at `floor(len * ratio)`.
///
/// The ratio is not validated here; see [`validate_split_options`].
pub fn split_records<T, R: Rng + ?Sized>(
    mut records: Vec<T>,
    ratio: f64,
    rng: &mut R,
) -> DatasetSplit<T> {
    records.shuffle(rng);
    let cut = train_count(records.len(), ratio);
    let validation = records.split_off(cut);

    tracing::debug!(
        train = records.len(),
        validation = validation.len(),
        "split records"
    );

    DatasetSplit {
        train: records,
        validation,
    }
}

/// Split according to options, seeding the shuffle when a seed is given.
pub fn split_with_options<T>(
    records: Vec<T>,
    opts: &SplitOptions,
) -> Result<DatasetSplit<T>, GroundkitError> {
    validate_split_options(opts)?;

    let split = if let Some(seed) = opts.seed {
        let mut rng = StdRng::seed_from_u64(seed);
        split_records(records, opts.ratio, &mut rng)
    } else {
        let mut rng = rand::rng();
        split_records(records, opts.ratio, &mut rng)
    };

    Ok(split)
}
