use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::common::ClientCommand;
use crate::network::RealtimeHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(3000);

/// Trailing-edge debounce backed by a cancellable tokio timer.
///
/// The callback runs once `delay` has passed since the most recent `call()`.
/// Dropping the debouncer cancels whatever is pending.
pub struct Debouncer {
    delay: Duration,
    callback: Arc<dyn Fn() + Send + Sync>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration, callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            delay,
            callback: Arc::new(callback),
            pending: None,
        }
    }

    pub fn with_default_delay(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self::new(DEFAULT_DEBOUNCE, callback)
    }

    /// Cancels the pending timer, if any, and schedules a fresh one.
    pub fn call(&mut self) {
        self.cancel();
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        }));
    }

    /// Returns `true` if a scheduled callback was prevented from running.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                let was_pending = !pending.is_finished();
                pending.abort();
                was_pending
            }
            None => false,
        }
    }

    /// Runs a pending callback now instead of waiting for the delay.
    pub fn flush(&mut self) {
        if self.cancel() {
            (self.callback)();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Turns a burst of keystrokes into one `typing_start` and a trailing
/// `typing_stop` once the user has been idle for the debounce delay.
pub struct TypingNotifier {
    handle: RealtimeHandle,
    delay: Duration,
    active: Option<(String, Debouncer)>,
}

impl TypingNotifier {
    pub fn new(handle: RealtimeHandle, delay: Duration) -> Self {
        Self {
            handle,
            delay,
            active: None,
        }
    }

    pub async fn keystroke(&mut self, conversation_id: &str) {
        let still_typing = matches!(
            &self.active,
            Some((current, debouncer)) if current == conversation_id && debouncer.is_pending()
        );
        if still_typing {
            if let Some((_, debouncer)) = self.active.as_mut() {
                debouncer.call();
            }
            return;
        }

        self.finish();
        self.handle.start_typing(conversation_id).await;

        let handle = self.handle.clone();
        let stopped = conversation_id.to_string();
        let mut debouncer = Debouncer::new(self.delay, move || {
            handle.try_command(ClientCommand::TypingStop(stopped.clone()));
        });
        debouncer.call();
        self.active = Some((conversation_id.to_string(), debouncer));
    }

    /// Ends the current typing run immediately, e.g. after sending.
    pub fn finish(&mut self) {
        if let Some((_, mut debouncer)) = self.active.take() {
            debouncer.flush();
        }
    }

    pub fn is_typing(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|(_, debouncer)| debouncer.is_pending())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::sleep;

    use super::*;

    fn counting() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        (count, move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_quiet_period() {
        let (count, callback) = counting();
        let mut debouncer = Debouncer::with_default_delay(callback);

        debouncer.call();
        sleep(Duration::from_millis(2000)).await;
        debouncer.call();
        sleep(Duration::from_millis(2000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_callback() {
        let (count, callback) = counting();
        let mut debouncer = Debouncer::new(Duration::from_millis(100), callback);

        debouncer.call();
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());
        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_runs_pending_callback_immediately() {
        let (count, callback) = counting();
        let mut debouncer = Debouncer::new(Duration::from_millis(100), callback);

        debouncer.flush();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        debouncer.call();
        debouncer.flush();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_timer() {
        let (count, callback) = counting();
        let mut debouncer = Debouncer::new(Duration::from_millis(100), callback);
        debouncer.call();
        drop(debouncer);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
