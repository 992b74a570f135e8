//! OpenMP wrapper compatibility module using Rayon
//!
//! - Global thread pool with dynamic reconstruction
//! - Panic capture and re-panic after the join (deferred throw semantics:
//!   the first observed panic is preserved, remaining iterations complete)

use rayon::prelude::*;
use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref GLOBAL_POOL: Mutex<ThreadPool> = {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .build()
            .expect("Failed to build default Rayon thread pool");
        Mutex::new(pool)
    };
}

/// Equivalent to OpenMP's omp_set_num_threads: rebuild the pool with the given thread count
pub fn omp_set_num_threads(num_threads: usize) {
    let new_pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .expect("Failed to build Rayon thread pool");
    *GLOBAL_POOL.lock().unwrap() = new_pool;
}

/// Equivalent to OpenMP's omp_get_num_threads: current number of threads in the pool
pub fn omp_num_threads() -> usize {
    GLOBAL_POOL.lock().unwrap().current_num_threads()
}

/// Run `func` inside the global pool.
pub fn install<R, F>(func: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    GLOBAL_POOL.lock().unwrap().install(func)
}

struct PanicSlot(Mutex<Option<Box<dyn std::any::Any + Send + 'static>>>);

impl PanicSlot {
    fn new() -> Self {
        PanicSlot(Mutex::new(None))
    }

    fn capture(&self, payload: Box<dyn std::any::Any + Send + 'static>) {
        let mut slot = self.0.lock().unwrap();
        if slot.is_none() {
            *slot = Some(payload);
        }
    }

    fn rethrow(self) {
        if let Some(payload) = self.0.into_inner().unwrap() {
            panic::resume_unwind(payload);
        }
    }
}

/// Execute a parallel loop over `0..n`, capturing any panics and resuming
/// the first one after every iteration has joined.
pub fn parallel_for<F>(n: usize, func: F)
where
    F: Fn(usize) + Send + Sync,
{
    let slot = PanicSlot::new();
    install(|| {
        (0..n).into_par_iter().for_each(|i| {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| func(i))) {
                slot.capture(payload);
            }
        });
    });
    slot.rethrow();
}

/// Parallel loop over the items of a mutable slice with the same deferred
/// panic discipline; `func` receives each item's index and the item.
pub fn parallel_for_mut<T, F>(items: &mut [T], func: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Send + Sync,
{
    let slot = PanicSlot::new();
    install(|| {
        items.par_iter_mut().enumerate().for_each(|(i, item)| {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| func(i, item))) {
                slot.capture(payload);
            }
        });
    });
    slot.rethrow();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parallel_for_runs_all_iterations() {
        let counter = AtomicUsize::new(0);
        parallel_for(100, |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }

    #[test]
    #[should_panic(expected = "explicit panic")]
    fn test_parallel_for_rethrows_after_join() {
        parallel_for(8, |i| {
            if i == 3 {
                panic!("explicit panic");
            }
        });
    }

    #[test]
    fn test_parallel_for_zero_iterations() {
        parallel_for(0, |_| unreachable!());
    }

    #[test]
    fn test_parallel_for_mut_updates_every_item() {
        let mut items = vec![0usize; 64];
        parallel_for_mut(&mut items, |i, item| *item = i * 2);
        for (i, &v) in items.iter().enumerate() {
            assert_eq!(v, i * 2);
        }
    }

    #[test]
    #[should_panic(expected = "mut panic")]
    fn test_parallel_for_mut_rethrows_after_join() {
        let mut items = vec![0u8; 8];
        parallel_for_mut(&mut items, |i, _| {
            if i == 5 {
                panic!("mut panic");
            }
        });
    }
}
