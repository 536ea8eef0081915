use std::sync::Mutex;

use crate::usecases::contracts::Notifier;

/// Notification sink for terminals: rings the bell and writes one line to
/// stderr. Permission is whatever the config allows.
#[derive(Debug)]
pub struct TerminalNotifier {
    allowed: bool,
    granted: bool,
    sent: Mutex<usize>,
}

impl TerminalNotifier {
    pub fn new(allowed: bool) -> Self {
        Self {
            allowed,
            granted: false,
            sent: Mutex::new(0),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|sent| *sent).unwrap_or_default()
    }
}

impl Notifier for TerminalNotifier {
    fn request_permission(&mut self) -> bool {
        self.granted = self.allowed;
        if !self.granted {
            tracing::info!("notifications disabled by config");
        }
        self.granted
    }

    fn notify(&self, title: &str, body: &str) {
        if !self.granted {
            return;
        }
        eprintln!("\x07[{title}] {body}");
        if let Ok(mut sent) = self.sent.lock() {
            *sent += 1;
        }
    }
}
