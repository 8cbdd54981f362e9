//! Foreground execution context
//!
//! The worker never talks to the user or touches the working tree directly.
//! It posts [`Notice`]s and tasks to a FIFO queue that the foreground thread
//! drains with [`ForegroundQueue::run`]. Requests are handled strictly in the
//! order they were posted.

use crossbeam_channel::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// A one-way message to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub title: String,
    pub body: String,
}

/// Where notices end up (terminal, log, test recorder).
pub trait Notifier {
    fn notify(&self, notice: &Notice);
}

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Request {
    Notify(Notice),
    Run(Task),
}

/// Posting side, held by the worker and by tasks. Cheap to clone.
#[derive(Clone)]
pub struct ForegroundHandle {
    tx: Sender<Request>,
}

impl ForegroundHandle {
    pub fn info(&self, title: impl Into<String>, body: impl Into<String>) {
        self.notify(Level::Info, title.into(), body.into());
    }

    pub fn error(&self, title: impl Into<String>, body: impl Into<String>) {
        self.notify(Level::Error, title.into(), body.into());
    }

    fn notify(&self, level: Level, title: String, body: String) {
        let notice = Notice { level, title, body };
        if let Err(e) = self.tx.send(Request::Notify(notice)) {
            if let Request::Notify(n) = e.into_inner() {
                tracing::warn!(title = %n.title, body = %n.body, "Foreground gone, notice dropped");
            }
        }
    }

    /// Schedule `task` on the foreground thread. Returns `false` if the
    /// foreground queue is no longer running.
    pub fn invoke_later(&self, task: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Request::Run(Box::new(task))).is_ok()
    }
}

/// Receiving side, owned by the foreground thread.
pub struct ForegroundQueue {
    rx: Receiver<Request>,
}

impl ForegroundQueue {
    /// Handle requests until every [`ForegroundHandle`] has been dropped.
    /// Returns the number of requests handled.
    pub fn run(self, notifier: &dyn Notifier) -> usize {
        let _span = tracing::debug_span!("foreground").entered();
        let mut handled = 0;
        for request in self.rx.iter() {
            handle(request, notifier);
            handled += 1;
        }
        handled
    }

    /// Handle whatever is queued right now without blocking.
    pub fn drain(&self, notifier: &dyn Notifier) -> usize {
        let mut handled = 0;
        while let Ok(request) = self.rx.try_recv() {
            handle(request, notifier);
            handled += 1;
        }
        handled
    }
}

fn handle(request: Request, notifier: &dyn Notifier) {
    match request {
        Request::Notify(notice) => notifier.notify(&notice),
        Request::Run(task) => task(),
    }
}

/// Create a connected handle/queue pair.
pub fn foreground() -> (ForegroundHandle, ForegroundQueue) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ForegroundHandle { tx }, ForegroundQueue { rx })
}
