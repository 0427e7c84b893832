//! Periodic "peek" attention animation for a closed widget
//!
//! Runs beside the conversation and never touches engine state. It only reads
//! widget visibility and publishes `peek` events.

use crate::runtime::SessionEvent;
use crate::script::PeekSchedule;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

enum Wake {
    Elapsed,
    Toggled,
    Stop,
}

async fn wait(delay: Option<Duration>, open: &mut watch::Receiver<bool>, cancel: &CancellationToken) -> Wake {
    let timer = async {
        match delay {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Wake::Stop,
        changed = open.changed() => {
            if changed.is_ok() { Wake::Toggled } else { Wake::Stop }
        }
        () = timer => Wake::Elapsed,
    }
}

/// Drive the peek schedule until `cancel` fires or the visibility channel
/// closes. Closing the widget restarts the schedule from `first_after`.
pub async fn run_peek_loop(
    schedule: PeekSchedule,
    mut open: watch::Receiver<bool>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
) {
    let emit = |visible: bool| {
        let _ = events.send(SessionEvent::Peek { visible });
    };

    let mut visible = false;
    let mut next = if *open.borrow_and_update() {
        None
    } else {
        Some(schedule.first_after)
    };

    loop {
        match wait(next, &mut open, &cancel).await {
            Wake::Stop => break,
            Wake::Toggled => {
                visible = false;
                if *open.borrow_and_update() {
                    emit(false);
                    next = None;
                } else {
                    next = Some(schedule.first_after);
                }
            }
            Wake::Elapsed if visible => {
                visible = false;
                emit(false);
                next = Some(schedule.every.saturating_sub(schedule.visible_for));
            }
            Wake::Elapsed => {
                visible = true;
                emit(true);
                next = Some(schedule.visible_for);
            }
        }
    }

    tracing::debug!("Peek loop stopped");
}
