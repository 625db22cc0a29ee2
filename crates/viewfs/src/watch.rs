//! Change tokens.
//!
//! A [`WatchToken`] reports a change to the resource it was created for. Tokens fire at most
//! once; after firing, callers re-query the file state and ask the provider for a fresh token.
//!
//! Polling tokens own a dedicated thread that compares [`FileStamp`]s every interval. Dropping
//! the token disconnects the thread's stop channel, which ends the polling for that token only.
//! Callbacks may run on that thread, so they should be short and treat the signal as a hint.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as channel;
use parking_lot::Mutex;

use crate::store::{BackingStore, FileStamp};

/// Interval used by physical file polling unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

type Callback = Box<dyn FnOnce() + Send>;

/// Change notification handle returned by [`crate::FileProvider::watch`].
pub enum WatchToken {
    /// Never signals. Returned for unmapped or absent filters.
    Inert,
    Polling(PollingChangeToken),
    /// Fires when any of the inner tokens fires.
    Composite(CompositeChangeToken),
}

impl WatchToken {
    /// Combines `tokens` into one token that fires when any of them does.
    pub fn composite(tokens: Vec<WatchToken>) -> Self {
        WatchToken::Composite(CompositeChangeToken {
            tokens,
            fired: OnceLock::new(),
        })
    }

    pub fn has_changed(&self) -> bool {
        match self {
            WatchToken::Inert => false,
            WatchToken::Polling(token) => token.has_changed(),
            WatchToken::Composite(token) => token.has_changed(),
        }
    }

    /// Whether this token can ever signal (i.e. it is backed by an active poll).
    pub fn is_active(&self) -> bool {
        match self {
            WatchToken::Inert => false,
            WatchToken::Polling(_) => true,
            WatchToken::Composite(token) => token.tokens.iter().any(WatchToken::is_active),
        }
    }

    /// Runs `callback` once, when the token fires (immediately if it already has).
    ///
    /// For inert tokens the callback is dropped without running.
    pub fn register_callback<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.register_boxed(Box::new(callback));
    }

    fn register_boxed(&self, callback: Callback) {
        match self {
            WatchToken::Inert => {}
            WatchToken::Polling(token) => token.register_boxed(callback),
            WatchToken::Composite(token) => token.register_boxed(callback),
        }
    }

    /// Blocks until the token fires or `timeout` elapses. Returns whether it fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self {
            WatchToken::Inert => false,
            WatchToken::Polling(token) => token.wait_timeout(timeout),
            WatchToken::Composite(token) => token.wait_timeout(timeout),
        }
    }
}

impl fmt::Debug for WatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchToken::Inert => f.write_str("Inert"),
            WatchToken::Polling(token) => f.debug_tuple("Polling").field(token).finish(),
            WatchToken::Composite(token) => f.debug_tuple("Composite").field(token).finish(),
        }
    }
}

/// Token over several inner tokens. Build one with [`WatchToken::composite`].
pub struct CompositeChangeToken {
    tokens: Vec<WatchToken>,
    // Registered on the first wait. The sender lives in the inner tokens' callbacks and is
    // dropped when the first of them fires, which disconnects every waiter at once.
    fired: OnceLock<channel::Receiver<()>>,
}

impl CompositeChangeToken {
    pub fn tokens(&self) -> &[WatchToken] {
        &self.tokens
    }

    pub fn has_changed(&self) -> bool {
        self.tokens.iter().any(WatchToken::has_changed)
    }

    fn register_boxed(&self, callback: Callback) {
        let shared = Arc::new(Mutex::new(Some(callback)));
        for token in &self.tokens {
            let shared = Arc::clone(&shared);
            token.register_boxed(Box::new(move || {
                let callback = shared.lock().take();
                if let Some(callback) = callback {
                    callback();
                }
            }));
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.has_changed() {
            return true;
        }
        let fired = self.fired.get_or_init(|| {
            let (tx, rx) = channel::bounded::<()>(0);
            self.register_boxed(Box::new(move || drop(tx)));
            rx
        });
        // A firing inner token flags itself before running callbacks, so the flag is already
        // set when the channel disconnects. Inert-only composites disconnect without firing.
        let _ = fired.recv_timeout(timeout);
        self.has_changed()
    }
}

impl fmt::Debug for CompositeChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.tokens).finish()
    }
}

struct TokenState {
    path: PathBuf,
    changed: AtomicBool,
    callbacks: Mutex<Vec<Callback>>,
}

impl TokenState {
    fn fire(&self) {
        let callbacks = {
            let mut callbacks = self.callbacks.lock();
            self.changed.store(true, Ordering::Release);
            std::mem::take(&mut *callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }
}

/// Token bound to polling one file for modification.
pub struct PollingChangeToken {
    state: Arc<TokenState>,
    fired: channel::Receiver<()>,
    // Dropping the sender disconnects the poll thread's stop channel.
    stop: Option<channel::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollingChangeToken {
    /// Starts polling `path` through `store`.
    ///
    /// The baseline stamp is captured before this returns, so a change made right after the
    /// call is still observed. If that first poll fails, the first successful poll on the
    /// thread becomes the baseline instead.
    pub fn spawn(store: Arc<dyn BackingStore>, path: PathBuf, interval: Duration) -> Self {
        let baseline = poll_stamp(store.as_ref(), &path);
        let state = Arc::new(TokenState {
            path,
            changed: AtomicBool::new(false),
            callbacks: Mutex::new(Vec::new()),
        });
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let (fired_tx, fired_rx) = channel::bounded::<()>(1);

        let thread_state = Arc::clone(&state);
        let spawned = std::thread::Builder::new()
            .name("viewfs-poll".to_owned())
            .spawn(move || {
                run_poll_loop(
                    store.as_ref(),
                    &thread_state,
                    baseline,
                    interval,
                    &stop_rx,
                    &fired_tx,
                )
            });
        let thread = match spawned {
            Ok(thread) => Some(thread),
            Err(err) => {
                tracing::error!(
                    target = "viewfs.watch",
                    path = %state.path.display(),
                    error = %err,
                    "failed to spawn poll thread; token will never fire"
                );
                None
            }
        };

        Self {
            state,
            fired: fired_rx,
            stop: Some(stop_tx),
            thread,
        }
    }

    pub fn path(&self) -> &Path {
        &self.state.path
    }

    pub fn has_changed(&self) -> bool {
        self.state.changed.load(Ordering::Acquire)
    }

    pub fn register_callback<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.register_boxed(Box::new(callback));
    }

    fn register_boxed(&self, callback: Callback) {
        {
            let mut callbacks = self.state.callbacks.lock();
            if !self.state.changed.load(Ordering::Acquire) {
                callbacks.push(callback);
                return;
            }
        }
        callback();
    }

    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.has_changed() {
            return true;
        }
        self.fired.recv_timeout(timeout).is_ok() || self.has_changed()
    }
}

impl fmt::Debug for PollingChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingChangeToken")
            .field("path", &self.state.path)
            .field("has_changed", &self.has_changed())
            .finish()
    }
}

impl Drop for PollingChangeToken {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            // A callback may drop its own token from the poll thread.
            if thread.thread().id() != std::thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

fn poll_stamp(store: &dyn BackingStore, path: &Path) -> Option<FileStamp> {
    match store.poll_file(path) {
        Ok(stamp) => Some(stamp),
        Err(err) => {
            tracing::warn!(
                target = "viewfs.watch",
                path = %path.display(),
                error = %err,
                "failed to poll file"
            );
            None
        }
    }
}

fn run_poll_loop(
    store: &dyn BackingStore,
    state: &TokenState,
    mut baseline: Option<FileStamp>,
    interval: Duration,
    stop: &channel::Receiver<()>,
    fired: &channel::Sender<()>,
) {
    loop {
        match stop.recv_timeout(interval) {
            Err(channel::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(channel::RecvTimeoutError::Disconnected) => return,
        }

        let Some(stamp) = poll_stamp(store, &state.path) else {
            continue;
        };
        let Some(previous) = baseline else {
            baseline = Some(stamp);
            continue;
        };
        if stamp != previous {
            tracing::debug!(
                target = "viewfs.watch",
                path = %state.path.display(),
                "file change detected"
            );
            state.fire();
            let _ = fired.try_send(());
            return;
        }
    }
}
