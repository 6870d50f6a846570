use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One tracked typing activity is identified by who is typing and where.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    FirstTyping,
    FirstPause,
    Resumed,
    OtherPause,
}

/// Ordered mutation command for a session's sink worker.
#[derive(Debug, Clone)]
pub enum SinkOp {
    Send { channel_id: String, text: String },
    Edit { text: String },
    Delete,
}

/// Status message content: immutable history lines plus one rewritable
/// annotation that can be struck through. Rendering joins all lines with
/// newlines and wraps the annotation in `~~` while struck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    history: Vec<String>,
    annotation: String,
    struck: bool,
}

impl StatusText {
    pub fn new(first_line: String) -> Self {
        Self {
            history: Vec::new(),
            annotation: first_line,
            struck: false,
        }
    }

    /// Freeze the current annotation into history and start a new one.
    pub fn append(&mut self, line: String) {
        let frozen = std::mem::replace(&mut self.annotation, line);
        self.history.push(frozen);
        self.struck = false;
    }

    pub fn strike(&mut self) {
        self.struck = true;
    }

    pub fn unstrike(&mut self) {
        self.struck = false;
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn is_struck(&self) -> bool {
        self.struck
    }

    pub fn render(&self) -> String {
        let last = if self.struck {
            format!("~~{}~~", self.annotation)
        } else {
            self.annotation.clone()
        };

        if self.history.is_empty() {
            last
        } else {
            let mut out = self.history.join("\n");
            out.push('\n');
            out.push_str(&last);
            out
        }
    }
}

/// One user's tracked typing activity in one channel.
pub struct Session {
    pub state: SessionState,
    pub status: StatusText,
    /// Validity token for pending timers; bumped on every re-arm so a
    /// canceled timer's event is ignored even if it was already queued.
    pub generation: u64,
    pub stop_timer: Option<JoinHandle<()>>,
    pub stale_timer: Option<JoinHandle<()>>,
    /// Per-session sink worker queue; ops execute strictly in order.
    pub ops: mpsc::UnboundedSender<SinkOp>,
}

impl Session {
    pub fn new(status: StatusText, ops: mpsc::UnboundedSender<SinkOp>) -> Self {
        Self {
            state: SessionState::FirstTyping,
            status,
            generation: 0,
            stop_timer: None,
            stale_timer: None,
            ops,
        }
    }

    /// Abort both pending timers. Safe to call when none are armed or when
    /// a timer has already fired.
    pub fn cancel_timers(&mut self) {
        if let Some(handle) = self.stop_timer.take() {
            handle.abort();
        }
        if let Some(handle) = self.stale_timer.take() {
            handle.abort();
        }
    }
}
