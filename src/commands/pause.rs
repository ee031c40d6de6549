//! Suspend/resume word shared with a paused engine

use tokio::sync::Notify;
use tracing::debug;

/// Wakeup the engine parks on while the simulation is paused.
///
/// The engine side awaits [`PauseGate::parked`] inside its pause
/// handler; the controller side calls [`PauseGate::resume`] to let the
/// cycle continue (a stop command resumes too, so the engine can
/// observe the stop on its next drain).
#[derive(Debug, Default)]
pub struct PauseGate {
    resume: Notify,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine side: suspend until the controller resumes.
    pub async fn parked(&self) {
        self.resume.notified().await;
    }

    /// Controller side: wake a parked engine. A resume with no parked
    /// engine leaves a permit, so a pause racing with the resume does
    /// not deadlock.
    pub fn resume(&self) {
        debug!("PauseGate::resume");
        self.resume.notify_one();
    }
}
