//! Lifecycle flags and the signal controller.
//!
//! Signal delivery only flips an atomic flag and wakes the scheduler; the
//! scheduler decides what to do at its next check point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use iostat_core::error::{IostatError, Result};

/// Cloneable handle on the shared `terminate` / `reload` flags.
#[derive(Clone, Default)]
pub struct Lifecycle {
    inner: Arc<Flags>,
}

#[derive(Default)]
struct Flags {
    terminate: AtomicBool,
    reload: AtomicBool,
    wake: Notify,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_terminate(&self) {
        self.inner.terminate.store(true, Ordering::Release);
        self.inner.wake.notify_one();
    }

    pub fn request_reload(&self) {
        self.inner.reload.store(true, Ordering::Release);
        self.inner.wake.notify_one();
    }

    pub fn is_terminating(&self) -> bool {
        self.inner.terminate.load(Ordering::Acquire)
    }

    /// Consume a pending reload request.
    pub fn take_reload(&self) -> bool {
        self.inner.reload.swap(false, Ordering::AcqRel)
    }

    /// Resolves once a flag has been raised since the last wake-up.
    ///
    /// A request made while nobody is waiting is remembered, so the next call
    /// returns immediately.
    pub async fn woken(&self) {
        self.inner.wake.notified().await;
    }
}

/// Register SIGHUP (reload) and SIGINT/SIGTERM (terminate).
///
/// Must be called from within the runtime. Registration failure is fatal for
/// the caller.
#[cfg(unix)]
pub fn install_signal_handlers(lifecycle: Lifecycle) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let register = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| IostatError::Internal(format!("failed to register {name}: {e}")))
    };
    let mut hangup = register(SignalKind::hangup(), "SIGHUP")?;
    let mut terminate = register(SignalKind::terminate(), "SIGTERM")?;
    let mut interrupt = register(SignalKind::interrupt(), "SIGINT")?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = hangup.recv() => lifecycle.request_reload(),
                Some(()) = terminate.recv() => lifecycle.request_terminate(),
                Some(()) = interrupt.recv() => lifecycle.request_terminate(),
                else => break,
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn install_signal_handlers(lifecycle: Lifecycle) -> Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            lifecycle.request_terminate();
        }
    }))
}
