#![allow(dead_code)]

use armdraw_communication::{shared_transport, RunHandle, SharedTransport, Transport};
use armdraw_core::{RunReport, SequencerEvent, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    sent: Vec<String>,
    replies: VecDeque<String>,
    stale: Vec<u8>,
    fail_prefix: Option<String>,
    silent: bool,
    closed: bool,
}

/// Scripted arm controller: acknowledges moves, answers everything else with OK
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that never answers
    pub fn silent() -> Self {
        let device = Self::new();
        device.state.lock().unwrap().silent = true;
        device
    }

    /// Device whose first write starting with `prefix` fails
    pub fn failing_on(prefix: &str) -> Self {
        let device = Self::new();
        device.state.lock().unwrap().fail_prefix = Some(prefix.to_string());
        device
    }

    pub fn shared(&self) -> SharedTransport {
        shared_transport(MockTransport {
            state: self.state.clone(),
        })
    }

    pub fn queue_stale(&self, bytes: &str) {
        self.state.lock().unwrap().stale.extend_from_slice(bytes.as_bytes());
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.sent().iter().filter(|line| line.starts_with(prefix)).count()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Transport for MockTransport {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TransportError::Closed);
        }
        let line = line.trim_end().to_string();
        if state
            .fail_prefix
            .as_deref()
            .is_some_and(|prefix| line.starts_with(prefix))
        {
            state.fail_prefix = None;
            return Err(TransportError::WriteFailed {
                reason: "cable unplugged".to_string(),
            });
        }
        if !state.silent {
            let reply = if line.starts_with("GOTO") {
                format!("Moved to angle: {}", &line[5..])
            } else if line == "STATUS" {
                "STATUS: idle".to_string()
            } else {
                "OK".to_string()
            };
            state.replies.push_back(reply);
        }
        state.sent.push(line);
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TransportError::Closed);
        }
        Ok(state.replies.pop_front())
    }

    fn clear_input(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock().unwrap();
        let mut discarded = std::mem::take(&mut state.stale);
        for reply in state.replies.drain(..) {
            discarded.extend_from_slice(reply.as_bytes());
            discarded.push(b'\n');
        }
        Ok(discarded)
    }

    fn name(&self) -> String {
        "mock".to_string()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Collect events until the run reports it finished, then join the worker
pub fn finish(mut handle: RunHandle) -> (Vec<SequencerEvent>, RunReport) {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event() {
        let done = matches!(event, SequencerEvent::Finished(_));
        events.push(event);
        if done {
            break;
        }
    }
    let report = handle.join().expect("worker panicked");
    (events, report)
}

/// Block until the worker reports reaching at least `index`
pub fn wait_for_frame(handle: &mut RunHandle, index: usize) {
    while let Some(event) = handle.next_event() {
        if matches!(event, SequencerEvent::Frame { index: i } if i >= index) {
            return;
        }
    }
}
