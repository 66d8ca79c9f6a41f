//! Per-event bookkeeping record

use hepstore_core::{Result, SchemaVersion};
use hepstore_model::{Collection, Datatype, Handle};

/// Field block of [`EventInfo`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventInfoData {
    /// Event number
    pub number: i32,
}

handle_type! {
    /// Event number and other per-event metadata
    EventInfo
}

impl Datatype for EventInfo {
    const TYPE_NAME: &'static str = "EventInfo";
    const SCHEMA_VERSION: SchemaVersion = 1;
    type Data = EventInfoData;

    fn from_handle(handle: Handle<Self>) -> Self {
        Self(handle)
    }

    fn handle(&self) -> &Handle<Self> {
        &self.0
    }
}

impl EventInfo {
    /// Record with the given event number
    pub fn with_number(number: i32) -> Self {
        Self(Handle::with_data(EventInfoData { number }))
    }

    /// Event number
    pub fn number(&self) -> Result<i32> {
        self.read(|d| d.number)
    }

    /// Set the event number
    pub fn set_number(&self, number: i32) -> Result<()> {
        self.update(|d| d.number = number)
    }
}

/// Collection of [`EventInfo`] records
pub type EventInfoCollection = Collection<EventInfo>;
