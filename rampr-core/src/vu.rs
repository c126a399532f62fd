use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum VuState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl VuState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Lifecycle cell shared between the pool and one worker task.
#[derive(Debug)]
pub(crate) struct VuControl {
    id: u64,
    state: AtomicU8,
    notify: Notify,
}

impl VuControl {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            state: AtomicU8::new(VuState::Idle as u8),
            notify: Notify::new(),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> VuState {
        VuState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state() == VuState::Running
    }

    /// Idle -> Running. Returns false if the worker was already told to stop.
    pub(crate) fn mark_running(&self) -> bool {
        self.state
            .compare_exchange(
                VuState::Idle as u8,
                VuState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Idle/Running -> Stopping. Stopping and Stopped are left alone.
    pub(crate) fn request_stop(&self) {
        let mut cur = self.state.load(Ordering::Acquire);
        loop {
            if cur >= VuState::Stopping as u8 {
                break;
            }
            match self.state.compare_exchange_weak(
                cur,
                VuState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
        self.notify.notify_waiters();
    }

    pub(crate) fn mark_stopped(&self) {
        self.state.store(VuState::Stopped as u8, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Resolves once the worker has been asked to stop.
    pub(crate) async fn stop_requested(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent `request_stop` can't slip between.
            notified.as_mut().enable();

            if self.state() as u8 >= VuState::Stopping as u8 {
                return;
            }

            notified.await;
        }
    }
}
