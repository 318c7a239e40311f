//! Container width notifications
//!
//! The host measures the timeline container and pushes widths through a
//! [`ResizeNotifier`]; the model picks up the latest one on its next layout pass.

use std::sync::Arc;
use tokio::sync::watch;

/// Widths closer than this are treated as unchanged
const WIDTH_EPSILON: f64 = 0.5;

/// Cloneable handle the host uses to report new container widths
#[derive(Debug, Clone)]
pub struct ResizeNotifier {
    tx: Arc<watch::Sender<f64>>,
}

impl ResizeNotifier {
    /// Report a width. Returns `true` if observers will see a change.
    pub fn notify(&self, width: f64) -> bool {
        if !width.is_finite() || width < 0.0 {
            return false;
        }
        self.tx.send_if_modified(|current| {
            if (*current - width).abs() < WIDTH_EPSILON {
                return false;
            }
            *current = width;
            true
        })
    }
}

/// Receiving side held by the timeline model
#[derive(Debug)]
pub struct ResizeObserver {
    rx: watch::Receiver<f64>,
}

impl ResizeObserver {
    /// Latest width if it changed since the last call.
    pub fn take_change(&mut self) -> Option<f64> {
        match self.rx.has_changed() {
            Ok(true) => Some(*self.rx.borrow_and_update()),
            _ => None,
        }
    }

    pub fn current(&self) -> f64 {
        *self.rx.borrow()
    }
}

pub fn resize_channel(initial_width: f64) -> (ResizeNotifier, ResizeObserver) {
    let (tx, rx) = watch::channel(initial_width);
    (ResizeNotifier { tx: Arc::new(tx) }, ResizeObserver { rx })
}
