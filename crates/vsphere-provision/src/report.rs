//! Process-wide sink for errors that must not fail the operation hitting them,
//! such as a scratch directory that could not be removed after its contents
//! were already consumed.

use std::error::Error as StdError;
use std::sync::{Arc, PoisonError, RwLock};

type Handler = Arc<dyn Fn(&(dyn StdError + 'static)) + Send + Sync>;

static HANDLERS: RwLock<Vec<Handler>> = RwLock::new(Vec::new());

/// Register an observer called for every reported error, after logging.
pub fn register_handler<F>(handler: F)
where
    F: Fn(&(dyn StdError + 'static)) + Send + Sync + 'static,
{
    HANDLERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Arc::new(handler));
}

/// Log `err` and hand it to every registered observer.
pub fn handle_error(err: &(dyn StdError + 'static)) {
    tracing::error!(error = %err, "unhandled error");

    let handlers = HANDLERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    for handler in &handlers {
        handler(err);
    }
}
