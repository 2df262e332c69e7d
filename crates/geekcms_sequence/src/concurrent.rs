//! Concurrent per-component resolution.
//!
//! Components share no state, so each block is resolved on its own blocking
//! task. A semaphore bounds how many run at once. Results are merged back in
//! header order, so the output matches [`Sequencer::sequence`] exactly.
//!
//! [`Sequencer::sequence`]: crate::Sequencer::sequence

use std::sync::Arc;

use geekcms_core::{PluginCatalog, PluginRef, SequenceError, SequenceResult};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::config::SequenceConfig;
use crate::lexer::lex;
use crate::output::SequenceOutput;
use crate::sequencer::sequence_component;

/// Sequence every component of a source, resolving components concurrently
///
/// # Errors
///
/// Returns error if the source cannot be split into component blocks
pub async fn resolve_concurrently<C>(
    source: &str,
    config: SequenceConfig,
    catalog: Arc<C>,
) -> SequenceResult<SequenceOutput>
where
    C: PluginCatalog + Send + Sync + 'static,
{
    let blocks = lex(source)?;
    let config = Arc::new(config);
    let permits = Arc::new(Semaphore::new(config.max_workers.max(1)));
    let mut tasks = JoinSet::new();

    for (index, block) in blocks.iter().cloned().enumerate() {
        let config = Arc::clone(&config);
        let catalog = Arc::clone(&catalog);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            // The semaphore is never closed, so acquire only fails after drop.
            let _permit = permits.acquire_owned().await.ok();
            let name = block.name.clone();
            let result = tokio::task::spawn_blocking(move || {
                sequence_component(&block, &config, catalog.as_ref())
            })
            .await
            .unwrap_or_else(|e| Err(internal(&name, &e)));
            (index, result)
        });
    }

    let mut slots: Vec<Option<SequenceResult<Vec<PluginRef>>>> = vec![None; blocks.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => tracing::error!(error = %e, "component task aborted"),
        }
    }

    let mut output = SequenceOutput::new();
    for (block, slot) in blocks.iter().zip(slots) {
        let result = slot.unwrap_or_else(|| {
            Err(SequenceError::Internal {
                component: block.name.clone(),
                reason: "component task produced no result".to_string(),
            })
        });
        output.insert(block.name.clone(), result);
    }
    output.fill_catalog_components(&config, catalog.as_ref());
    tracing::debug!(components = output.len(), "resolved concurrently");
    Ok(output)
}

fn internal(component: &str, err: &JoinError) -> SequenceError {
    tracing::error!(component, error = %err, "resolver task failed");
    SequenceError::Internal {
        component: component.to_string(),
        reason: err.to_string(),
    }
}
