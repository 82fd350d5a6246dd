//! Human-facing observer sink: formats policy-switch events for a terminal.
//!
//! The engine never blocks on this sink — `offer` is a non-blocking
//! `try_send` into a bounded channel, and a background task drains it and
//! prints. A full channel means the printer has fallen behind; the event is
//! dropped and counted, never backpressured into the hot path.

use cache_ext_core::{EventSink, PolicySwitchEvent};
use console::style;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use tabled::{Table, Tabled};

const CHANNEL_CAPACITY: usize = 64;

/// An `EventSink` backed by a bounded channel; construct with
/// [`terminal_sink`] to get the sink half plus a spawned printer task.
pub struct ChannelSink {
    tx: SyncSender<PolicySwitchEvent>,
}

impl EventSink for ChannelSink {
    fn offer(&self, event: &PolicySwitchEvent) -> bool {
        match self.tx.try_send(*event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Build a sink/printer pair: `ChannelSink` goes to the `Engine`, the
/// returned `Receiver` is drained by [`print_switch_events`] on a spawned
/// task.
pub fn terminal_sink() -> (ChannelSink, Receiver<PolicySwitchEvent>) {
    let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
    (ChannelSink { tx }, rx)
}

#[derive(Tabled)]
struct SwitchRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn switch_rows(event: &PolicySwitchEvent) -> Vec<SwitchRow> {
    vec![
        SwitchRow {
            field: "timestamp",
            value: event.timestamp.to_string(),
        },
        SwitchRow {
            field: "hit rate",
            value: format!("{}%", event.hit_rate),
        },
        SwitchRow {
            field: "old policy hit rate",
            value: format!("{}%", event.old_policy_hit_rate),
        },
        SwitchRow {
            field: "total accesses",
            value: event.total_accesses.to_string(),
        },
        SwitchRow {
            field: "one-time ratio",
            value: format!("{}%", event.one_time_ratio),
        },
        SwitchRow {
            field: "sequential ratio",
            value: format!("{}%", event.sequential_ratio),
        },
        SwitchRow {
            field: "avg hits/page",
            value: event.avg_hits_per_page.to_string(),
        },
        SwitchRow {
            field: "avg reuse distance",
            value: event.avg_reuse_distance.to_string(),
        },
        SwitchRow {
            field: "dirty ratio",
            value: format!("{}%", event.dirty_ratio),
        },
        SwitchRow {
            field: "working set size",
            value: event.working_set_size.to_string(),
        },
        SwitchRow {
            field: "working set ratio",
            value: format!("{}%", event.working_set_ratio),
        },
    ]
}

/// Drain `rx` until the sending half is dropped, printing one table per
/// switch event.
pub async fn print_switch_events(rx: Receiver<PolicySwitchEvent>) {
    // `std::sync::mpsc::Receiver` has no async recv; park a blocking task so
    // the printer doesn't spin the executor.
    tokio::task::spawn_blocking(move || {
        while let Ok(event) = rx.recv() {
            let heading = style(format!(
                "policy switch: {} -> {}",
                event.old_policy, event.new_policy
            ))
            .bold()
            .yellow();
            println!("{heading}");
            println!("{}", Table::new(switch_rows(&event)));
        }
    })
    .await
    .ok();
}
