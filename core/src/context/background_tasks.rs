use tokio::task::JoinHandle;

/// Long-running engine tasks, aborted on shutdown
#[derive(Default)]
pub struct BackgroundTasks {
    pub variable_sweeper: Option<JoinHandle<()>>,
    pub cooldown_sweeper: Option<JoinHandle<()>>,
    /// Consumers attached by the host (chat/speech printers, bridges)
    pub attached: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn is_running(&self) -> bool {
        self.variable_sweeper.is_some()
    }

    pub fn abort_all(&mut self) {
        if let Some(handle) = self.variable_sweeper.take() {
            handle.abort();
        }
        if let Some(handle) = self.cooldown_sweeper.take() {
            handle.abort();
        }
        for handle in self.attached.drain(..) {
            handle.abort();
        }
    }
}
