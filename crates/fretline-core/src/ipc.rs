use fretline_domain_view::PreviewFrame;
use rtrb::Consumer;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    Start,
    Stop,
    Toggle,
    SetTempo { bpm: f64 },
    /// UI nudge, typically +/-5.
    AdjustTempo { delta: i32 },
    MeasuredWidth { note_width_percent_of_track: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Stopped,
    Running,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    SessionStateUpdated {
        state: SessionState,
        tempo_bpm: u32,
    },
    TransportUpdated {
        beat: f64,
        position: String,
        running: bool,
    },
    PreviewUpdated {
        frame: PreviewFrame,
    },
}

/// Receiving end of a controller subscription. Dropping it unsubscribes.
pub struct EventSubscriber {
    consumer: Consumer<Event>,
}

impl EventSubscriber {
    pub(crate) fn new(consumer: Consumer<Event>) -> Self {
        Self { consumer }
    }

    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.consumer.slots());
        while let Ok(event) = self.consumer.pop() {
            events.push(event);
        }
        events
    }
}
