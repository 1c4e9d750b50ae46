use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The buffer length is not a multiple of the row length.
    #[error("buffer of length {0} cannot be split in rows of length {1}")]
    InvalidRowLength(usize, usize),
}

/// Controls how row-parallel kernels are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool to process rows in parallel.
    #[default]
    Parallel,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    Fixed(usize),
}

impl ExecutionStrategy {
    /// Check that the strategy can be executed.
    pub fn validate(&self) -> Result<(), ParallelError> {
        match self {
            ExecutionStrategy::Fixed(0) => Err(ParallelError::InvalidThreadCount(0)),
            _ => Ok(()),
        }
    }
}

/// Apply a function to every row of a buffer with the given strategy.
///
/// The closure receives the row index and the mutable row. Rows are independent,
/// so the result does not depend on the strategy.
///
/// # Arguments
///
/// * `strategy` - The execution strategy.
/// * `data` - The buffer, `rows * row_len` elements long.
/// * `row_len` - The number of elements in one row (width * channels).
/// * `f` - The operation to run on each row.
///
/// # Errors
///
/// If the buffer is not a whole number of rows or the local pool cannot be built.
pub fn for_each_row_mut<T, F>(
    strategy: ExecutionStrategy,
    data: &mut [T],
    row_len: usize,
    f: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if row_len == 0 {
        return if data.is_empty() {
            Ok(())
        } else {
            Err(ParallelError::InvalidRowLength(data.len(), row_len))
        };
    }
    if data.len() % row_len != 0 {
        return Err(ParallelError::InvalidRowLength(data.len(), row_len));
    }

    match strategy {
        ExecutionStrategy::Serial => {
            data.chunks_exact_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| f(r, row));
        }
        ExecutionStrategy::Parallel => {
            data.par_chunks_exact_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| f(r, row));
        }
        ExecutionStrategy::Fixed(n) => {
            let pool = build_pool(n)?;
            pool.install(|| {
                data.par_chunks_exact_mut(row_len)
                    .enumerate()
                    .for_each(|(r, row)| f(r, row));
            });
        }
    }

    Ok(())
}

/// Map every row of a buffer to a value and fold the values with `reduce`.
///
/// `reduce` must be associative and commutative with `identity` as neutral element,
/// e.g. a floating point maximum.
pub fn map_reduce_rows<T, R, M, F>(
    strategy: ExecutionStrategy,
    data: &[T],
    row_len: usize,
    identity: R,
    map: M,
    reduce: F,
) -> Result<R, ParallelError>
where
    T: Sync,
    R: Copy + Send + Sync,
    M: Fn(usize, &[T]) -> R + Send + Sync,
    F: Fn(R, R) -> R + Send + Sync,
{
    if row_len == 0 || data.is_empty() {
        return Ok(identity);
    }
    if data.len() % row_len != 0 {
        return Err(ParallelError::InvalidRowLength(data.len(), row_len));
    }

    let run = || {
        data.par_chunks_exact(row_len)
            .enumerate()
            .map(|(r, row)| map(r, row))
            .reduce(|| identity, &reduce)
    };

    let result = match strategy {
        ExecutionStrategy::Serial => data
            .chunks_exact(row_len)
            .enumerate()
            .map(|(r, row)| map(r, row))
            .fold(identity, &reduce),
        ExecutionStrategy::Parallel => run(),
        ExecutionStrategy::Fixed(n) => build_pool(n)?.install(run),
    };

    Ok(result)
}

fn build_pool(n: usize) -> Result<rayon::ThreadPool, ParallelError> {
    if n == 0 {
        return Err(ParallelError::InvalidThreadCount(n));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build()
        .map_err(|e| ParallelError::BuildError(e.to_string()))
}
