//! Graph change records and events

pub mod diff;
pub mod graph_events;

pub use diff::GraphDiff;
pub use graph_events::{
    ChannelEventPublisher, GraphChangeEvent, GraphChangeKind, GraphEventPublisher,
    LoggingEventPublisher, DEFAULT_EVENT_SUBJECT,
};
