//! Operator signal for the out-of-band stats print.
//!
//! SIGUSR1 is forwarded to a channel the stats thread already listens on, so
//! the print happens on that thread and never inside a signal handler.

use std::io;
use std::thread::JoinHandle;

use crossbeam::channel::Sender;
use signal_hook::consts::SIGUSR1;
use signal_hook::iterator::{Handle, Signals};

pub struct PrintSignal {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl PrintSignal {
    /// Forward every SIGUSR1 to `trigger` until [`PrintSignal::stop`].
    pub fn forward(trigger: Sender<()>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGUSR1])?;
        let handle = signals.handle();
        let thread = std::thread::Builder::new()
            .name("fmon-signal".into())
            .spawn(move || {
                for _ in signals.forever() {
                    if trigger.send(()).is_err() {
                        break;
                    }
                }
            })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    pub fn stop(mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;
    use std::time::Duration;

    #[test]
    fn test_sigusr1_requests_print() {
        let (tx, rx) = channel::unbounded();
        let forwarder = PrintSignal::forward(tx).unwrap();

        signal_hook::low_level::raise(SIGUSR1).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());

        forwarder.stop();
    }
}
