//! Scripted in-memory transport for protocol tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::{Instant, sleep_until};

use super::error::{GatewayError, GatewayResult};
use super::payloads::{GatewayMessage, GatewayPayload};
use super::transport::{GatewayTransport, TransportEvent, TransportFactory};

#[derive(Debug, Clone)]
pub enum Step {
    Frame(Value),
    Close(Option<u16>),
    Error,
    Wait(Duration),
}

/// What the code under test did to the transport.
#[derive(Debug, Default)]
pub struct TransportLog {
    pub urls: Vec<String>,
    pub sent: Vec<GatewayPayload>,
    pub closes: Vec<u16>,
}

impl TransportLog {
    pub fn sent_ops(&self) -> Vec<u8> {
        self.sent.iter().map(|payload| payload.op).collect()
    }
}

pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    wait_until: Option<Instant>,
    log: Arc<Mutex<TransportLog>>,
    connected: bool,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>, log: Arc<Mutex<TransportLog>>) -> Self {
        Self {
            steps: steps.into(),
            wait_until: None,
            log,
            connected: false,
        }
    }
}

#[async_trait]
impl GatewayTransport for ScriptedTransport {
    async fn connect(&mut self, url: &str) -> GatewayResult<()> {
        self.log.lock().urls.push(url.to_string());
        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, payload: &GatewayPayload) -> GatewayResult<()> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        self.log.lock().sent.push(payload.clone());
        Ok(())
    }

    async fn receive(&mut self) -> GatewayResult<TransportEvent> {
        loop {
            match self.steps.front().cloned() {
                None => std::future::pending::<()>().await,
                Some(Step::Wait(duration)) => {
                    let until = *self.wait_until.get_or_insert_with(|| Instant::now() + duration);
                    sleep_until(until).await;
                    self.wait_until = None;
                    self.steps.pop_front();
                }
                Some(Step::Frame(value)) => {
                    self.steps.pop_front();
                    return Ok(serde_json::from_value::<GatewayMessage>(value).map_or_else(
                        |e| TransportEvent::Malformed(e.to_string()),
                        TransportEvent::Frame,
                    ));
                }
                Some(Step::Close(code)) => {
                    self.steps.pop_front();
                    self.connected = false;
                    return Ok(TransportEvent::Closed(code));
                }
                Some(Step::Error) => {
                    self.steps.pop_front();
                    self.connected = false;
                    return Err(GatewayError::websocket("connection reset"));
                }
            }
        }
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        self.log.lock().closes.push(code);
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Hands out one scripted transport per connect, in order. Once the scripts
/// run out, further sockets hang without producing frames.
pub fn scripted_factory(scripts: Vec<Vec<Step>>) -> (TransportFactory, Arc<Mutex<TransportLog>>) {
    let log = Arc::new(Mutex::new(TransportLog::default()));
    let scripts = Arc::new(Mutex::new(VecDeque::from(scripts)));
    let factory_log = log.clone();

    let factory: TransportFactory = Box::new(move || {
        let steps = scripts.lock().pop_front().unwrap_or_default();
        Box::new(ScriptedTransport::new(steps, factory_log.clone()))
    });

    (factory, log)
}

pub fn hello(interval_ms: u64) -> Step {
    Step::Frame(serde_json::json!({ "op": 10, "d": { "heartbeat_interval": interval_ms } }))
}

pub fn dispatch(sequence: u64, event_type: &str, data: Value) -> Step {
    Step::Frame(serde_json::json!({ "op": 0, "s": sequence, "t": event_type, "d": data }))
}

pub fn ready(sequence: u64, session_id: &str, resume_url: &str) -> Step {
    dispatch(
        sequence,
        "READY",
        serde_json::json!({
            "v": 10,
            "user": { "id": "100", "username": "gatebird", "bot": true },
            "guilds": [],
            "session_id": session_id,
            "resume_gateway_url": resume_url,
            "application": { "id": "200", "flags": 0 }
        }),
    )
}

pub fn op(opcode: u8, data: Value) -> Step {
    Step::Frame(serde_json::json!({ "op": opcode, "d": data }))
}
