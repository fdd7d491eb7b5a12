use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::error::{PainterError, Result};

/// Fire-and-forget alert raised when a human has to step in.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Rings the terminal bell and logs the message.
pub struct TerminalBell;

impl Notifier for TerminalBell {
    fn notify(&self, message: &str) {
        tracing::warn!("{}", message);
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

/// Create the channel an operator uses to signal that a CAPTCHA was solved.
/// Every bump of the counter releases one blocked placement driver.
pub fn resume_channel() -> (watch::Sender<u64>, watch::Receiver<u64>) {
    watch::channel(0)
}

/// Bump the resume counter for every line typed on stdin. After stdin
/// closes the sender is held until every receiver is gone, so a blocked
/// driver keeps waiting instead of failing.
pub async fn forward_stdin(resume: watch::Sender<u64>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(_)) = lines.next_line().await {
        resume.send_modify(|n| *n += 1);
        tracing::info!("Operator resumed placement");
    }
    resume.closed().await;
}

/// The human side of a CAPTCHA: alert once, then wait for the go-ahead.
pub struct Operator {
    notifier: Arc<dyn Notifier>,
    resume: watch::Receiver<u64>,
}

impl Operator {
    pub fn new(notifier: Arc<dyn Notifier>, resume: watch::Receiver<u64>) -> Self {
        Self { notifier, resume }
    }

    pub async fn solve_captcha(&mut self) -> Result<()> {
        // Signals sent before the CAPTCHA appeared do not count.
        self.resume.borrow_and_update();
        self.notifier.notify(
            "CAPTCHA required: place a pixel manually in the browser, solve it, then press Enter",
        );
        self.resume
            .changed()
            .await
            .map_err(|_| PainterError::OperatorGone)
    }
}
