//! Shared utilities: logging, deterministic RNG, array helpers, the
//! rayon-backed parallel loop wrapper, and fixed-width binary field I/O.

pub mod array_args;
pub mod binary_writer;
pub mod log;
pub mod openmp_wrapper;
pub mod random;

pub use array_args::ArrayArgs;
pub use binary_writer::{BinaryReader, BinaryWriter};
pub use log::{Log, LogLevel};
pub use openmp_wrapper::{omp_num_threads, omp_set_num_threads, parallel_for, parallel_for_mut};
pub use random::Random;
