use std::sync::mpsc::Sender;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// A periodic tick source bound to a scope. Ticks are sent on `tx` every
/// `period`, starting one period after `start`. Dropping the guard cancels
/// the timer; the timer also stops on its own once the receiver is gone.
pub struct PeriodicTimer {
    handle: JoinHandle<()>,
}

impl PeriodicTimer {
    pub fn start(runtime: &Handle, period: Duration, tx: Sender<()>) -> Self {
        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(()).is_err() {
                    debug!("tick receiver dropped, stopping timer");
                    break;
                }
            }
        });
        debug!(?period, "periodic timer started");
        Self { handle }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, RecvTimeoutError};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap()
    }

    #[test]
    fn delivers_ticks_until_dropped() {
        let rt = runtime();
        let (tx, rx) = mpsc::channel();
        let timer = PeriodicTimer::start(rt.handle(), Duration::from_millis(10), tx);

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        drop(timer);
        // The aborted task drops its sender; pending ticks drain first.
        loop {
            match rx.recv_timeout(Duration::from_secs(5)) {
                Ok(()) => continue,
                Err(err) => {
                    assert_eq!(err, RecvTimeoutError::Disconnected);
                    break;
                }
            }
        }
    }

    #[test]
    fn first_tick_waits_one_period() {
        let rt = runtime();
        let (tx, rx) = mpsc::channel();
        let _timer = PeriodicTimer::start(rt.handle(), Duration::from_secs(60), tx);
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout)
        );
    }
}
