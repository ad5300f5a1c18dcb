//! Cooperative cancellation
//!
//! Long-running scan loops poll a shared [`CancellationFlag`] between chunks.
//! Interactive runs connect the flag to process signals so Ctrl-C unwinds an
//! in-flight download or extraction instead of killing it mid-write.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared flag set once cancellation has been requested
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; visible to every clone of this flag
    pub fn cancel(&self) {
        // Release pairs with the Acquire load in is_cancelled()
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cancel `flag` on the first interrupt/terminate signal and exit with 130 on
/// the second. Must be called from within a tokio runtime.
pub fn install_signal_handlers(flag: CancellationFlag) {
    let signal_count = Arc::new(AtomicUsize::new(0));

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        for kind in [SignalKind::interrupt(), SignalKind::terminate()] {
            let flag = flag.clone();
            let sig_ctr = signal_count.clone();

            tokio::spawn(async move {
                let Ok(mut sig) = signal(kind) else {
                    log::debug!("Could not register handler for {:?}", kind);
                    return;
                };
                while sig.recv().await.is_some() {
                    on_signal(&flag, &sig_ctr);
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                on_signal(&flag, &signal_count);
            }
        });
    }
}

fn on_signal(flag: &CancellationFlag, signal_count: &AtomicUsize) {
    let previous = signal_count.fetch_add(1, Ordering::AcqRel);
    flag.cancel();
    if previous >= 1 {
        log::warn!("Second interrupt received; exiting");
        std::process::exit(130);
    }
    log::warn!("Interrupt received; cancelling scan (repeat to force exit)");
}
