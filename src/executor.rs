//! Single-statement execution
//!
//! The executor accepts a zero-argument thunk that issues exactly one
//! statement over an already-open connection. It does not retry, batch, or
//! rewrite SQL, and failures propagate unchanged; the façade decides which
//! error class they become.

use std::future::Future;
use std::time::Instant;

use tracing::debug;

/// Run one statement thunk, logging its duration.
pub async fn run_statement<T, E, Fut>(op: impl FnOnce() -> Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let result = op().await;
    match &result {
        Ok(_) => debug!("statement completed in {:?}", started.elapsed()),
        Err(e) => debug!("statement failed after {:?}: {}", started.elapsed(), e),
    }
    result
}
