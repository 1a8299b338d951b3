//! Run plumbing shared by every sequencer implementation
//!
//! - [`event`]: worker-to-owner event channel and run reports
//! - [`cancel`]: cooperative cancellation token

pub mod cancel;
pub mod event;

pub use cancel::CancelToken;
pub use event::{
    drain_events, event_channel, EventReceiver, EventSender, RunOutcome, RunReport,
    SequencerEvent, WeakEventSender,
};
