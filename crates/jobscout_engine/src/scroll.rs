use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::driver::{DriverError, Page};
use crate::types::{EngineEvent, ProgressSink};

#[derive(Debug, Clone)]
pub struct ConvergenceSettings {
    pub max_items: usize,
    /// Consecutive recounts without growth before giving up.
    pub max_stall_iterations: usize,
    /// Hard ceiling on scroll passes regardless of growth.
    pub max_iterations: usize,
    pub settle: Duration,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            max_items: 200,
            max_stall_iterations: 5,
            max_iterations: 15,
            settle: Duration::from_secs(2),
        }
    }
}

/// Scroll until the number of `container` matches stops growing, reaches
/// `max_items` or the iteration ceiling is hit. Returns the final count.
///
/// Only the initial count can fail the call; a driver error mid-scroll ends
/// scrolling with whatever has loaded so far.
pub async fn scroll_to_convergence(
    page: &dyn Page,
    container: &str,
    settings: &ConvergenceSettings,
    sink: &dyn ProgressSink,
) -> Result<usize, DriverError> {
    let mut count = page.count(container).await?;
    sink.emit(EngineEvent::ListingsFound(count));

    let mut stall = 0;
    let mut iterations = 0;
    while count < settings.max_items
        && stall < settings.max_stall_iterations
        && iterations < settings.max_iterations
    {
        iterations += 1;
        if let Err(err) = page.scroll_to_bottom().await {
            engine_warn!("Scroll failed on pass {}: {}", iterations, err);
            break;
        }
        tokio::time::sleep(settings.settle).await;

        let recount = match page.count(container).await {
            Ok(recount) => recount,
            Err(err) => {
                engine_warn!("Recount failed on pass {}: {}", iterations, err);
                break;
            }
        };

        if recount > count {
            engine_debug!("Scroll pass {}: {} -> {} listings", iterations, count, recount);
            count = recount;
            stall = 0;
            sink.emit(EngineEvent::ListingsFound(count));
        } else {
            stall += 1;
            engine_debug!("Scroll pass {}: no growth ({} stalled)", iterations, stall);
            if count == 0 {
                break;
            }
        }
    }

    engine_info!(
        "Scrolling converged at {} listings after {} passes",
        count,
        iterations
    );
    Ok(count)
}
