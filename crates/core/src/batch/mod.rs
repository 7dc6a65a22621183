use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::{BeatSynthError, Result};

/// Cooperative cancellation flag shared between a run and whoever wants to
/// stop it. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Returns the fixed seed or draws a fresh one from the OS.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| StdRng::from_entropy().gen())
}

/// Derives one seed per item from the run seed. Items get the same seed no
/// matter which worker ends up processing them.
pub fn item_seeds(run_seed: u64, count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(run_seed);
    (0..count).map(|_| rng.gen()).collect()
}

/// Runs `task` for every index in `0..count` on `jobs` workers. The token is
/// checked before each item, and the first failure stops further items from
/// being picked up. Returns the number of items that completed.
pub fn run_indexed<F>(jobs: usize, count: usize, cancel: &CancelToken, task: F) -> Result<usize>
where
    F: Fn(usize) -> Result<()> + Send + Sync,
{
    if jobs == 0 {
        return Err(BeatSynthError::invalid_config("jobs must be positive"));
    }

    let completed = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);

    let step = |index: usize| -> Result<()> {
        if cancel.is_cancelled() {
            return Err(BeatSynthError::Cancelled {
                completed: completed.load(Ordering::SeqCst),
            });
        }
        if failed.load(Ordering::SeqCst) {
            return Ok(());
        }
        task(index).map_err(|err| {
            failed.store(true, Ordering::SeqCst);
            err
        })?;
        completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    };

    if jobs == 1 {
        (0..count).try_for_each(step)?;
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|err| BeatSynthError::msg(format!("failed to start worker pool: {err}")))?;
        pool.install(|| (0..count).into_par_iter().try_for_each(step))?;
    }

    Ok(completed.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn runs_every_index_once() {
        let seen = Mutex::new(Vec::new());
        let done = run_indexed(3, 10, &CancelToken::new(), |i| {
            seen.lock().unwrap().push(i);
            Ok(())
        })
        .unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(done, 10);
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn stops_on_first_error() {
        let err = run_indexed(1, 10, &CancelToken::new(), |i| {
            if i == 3 {
                Err(BeatSynthError::msg("boom"))
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn cancelled_token_stops_the_run() {
        let token = CancelToken::new();
        let handle = token.clone();
        let err = run_indexed(1, 5, &token, |i| {
            if i == 1 {
                handle.cancel();
            }
            Ok(())
        })
        .unwrap_err();

        assert!(matches!(err, BeatSynthError::Cancelled { completed: 2 }));
    }

    #[test]
    fn item_seeds_are_reproducible() {
        assert_eq!(item_seeds(9, 4), item_seeds(9, 4));
        assert_ne!(item_seeds(9, 4), item_seeds(10, 4));
    }
}
