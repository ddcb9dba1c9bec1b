// Command handlers module
pub mod browse;
pub mod events;
pub mod monitor;
pub mod plugins;

use anyhow::Result;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Re-exports for cleaner imports
pub use browse::execute as browse;
pub use events::execute as events;
pub use monitor::execute as monitor;
pub use plugins::execute as plugins;

/// Install a Ctrl+C handler that raises the returned flag.
pub fn cancel_flag() -> Result<Arc<AtomicBool>> {
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = Arc::clone(&cancel_flag);

    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "Stopping after the current cycle...".yellow().bold());
        cancel_flag_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    Ok(cancel_flag)
}

/// Sleep for `duration` in short steps; returns false if cancelled meanwhile.
pub fn wait(duration: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        let step = deadline
            .saturating_duration_since(Instant::now())
            .min(Duration::from_millis(100));
        thread::sleep(step);
    }
    !cancel.load(Ordering::Relaxed)
}
