#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use swshell::device::SignatureCatalog;
use swshell::diagnostics::DiagnosticsSink;
use swshell::error::ConnectError;
use swshell::session::{Connector, DeviceTarget, ShellTransport};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const CATALOG: &str = r#"[
    {
        "name": "cisco_ios",
        "description": "Cisco IOS",
        "models": ["C2960", "WS-C\\d+"],
        "versions": ["Cisco IOS"],
        "pager": "terminal length 0",
        "mac-addr-list": "show mac address-table"
    },
    {
        "name": "huawei_vrp",
        "description": "Huawei VRP",
        "models": ["S5700"],
        "versions": ["VRP \\(R\\) software"],
        "pager": "screen-length 0 temporary",
        "mac-addr-list": "display mac-address"
    }
]"#;

pub const CISCO_VERSION: &str =
    "Cisco IOS Software, C2960 Software (C2960-LANBASEK9-M), Version 15.0(2)SE\r\n";

pub fn catalog() -> Arc<SignatureCatalog> {
    Arc::new(SignatureCatalog::from_json_str(CATALOG).expect("valid catalog"))
}

/// Scripted behavior of a simulated switch.
#[derive(Clone)]
pub struct SwitchScript {
    pub banner: String,
    pub prompt: String,
    /// Command (trimmed) to response body.
    pub responses: HashMap<String, String>,
}

impl SwitchScript {
    pub fn cisco() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "dis version".to_string(),
            "% Invalid input detected at '^' marker.\r\n".to_string(),
        );
        responses.insert("show version".to_string(), CISCO_VERSION.to_string());
        responses.insert(
            "show mac address-table".to_string(),
            "Vlan  Mac Address       Type     Ports\r\n 10   0011.2233.4455  DYNAMIC  Gi0/1\r\n"
                .to_string(),
        );
        Self {
            banner: "User Access Verification\r\n".to_string(),
            prompt: "sw1#".to_string(),
            responses,
        }
    }

    pub fn unknown() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "show version".to_string(),
            "MysteryOS 0.1 on frobnicator\r\n".to_string(),
        );
        Self {
            banner: String::new(),
            prompt: "box>".to_string(),
            responses,
        }
    }

    pub fn respond(mut self, command: &str, body: &str) -> Self {
        self.responses.insert(command.to_string(), body.to_string());
        self
    }
}

/// Observation and control handles of one simulated switch.
#[derive(Clone, Default)]
pub struct SwitchHandle {
    /// Every line received, in order.
    pub received: Arc<Mutex<Vec<String>>>,
    /// Set once the client side hung up.
    pub closed: Arc<AtomicBool>,
    /// While set, lines are read but never answered.
    pub mute: Arc<AtomicBool>,
    /// When set, the switch drops the connection on the next line.
    pub hang_up: Arc<AtomicBool>,
}

impl SwitchHandle {
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("received lock").clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits until the client side hangs up, giving up after `limit`.
    pub async fn wait_closed(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if self.is_closed() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.is_closed()
    }
}

/// Spawns a switch on an in-memory pipe. The switch echoes each line after
/// its prompt, then the scripted body, then the prompt again.
pub fn spawn_switch(script: SwitchScript) -> (ShellTransport, SwitchHandle) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let handle = SwitchHandle::default();
    let device = handle.clone();

    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let greeting = format!("{}{}", script.banner, script.prompt);
        if write.write_all(greeting.as_bytes()).await.is_err() {
            return;
        }
        let mut lines = BufReader::new(read).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    device
                        .received
                        .lock()
                        .expect("received lock")
                        .push(line.clone());
                    if device.hang_up.load(Ordering::SeqCst) {
                        break;
                    }
                    if device.mute.load(Ordering::SeqCst) {
                        continue;
                    }
                    let body = script
                        .responses
                        .get(line.trim())
                        .cloned()
                        .unwrap_or_default();
                    let reply = format!("{}{}\r\n{}{}", script.prompt, line, body, script.prompt);
                    if write.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                }
                _ => {
                    device.closed.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }
    });

    (ShellTransport::from_stream(client), handle)
}

/// Connector handing out simulated switches.
#[derive(Clone)]
pub struct FakeConnector {
    script: SwitchScript,
    fail: bool,
    pub connects: Arc<AtomicUsize>,
    pub switches: Arc<Mutex<Vec<SwitchHandle>>>,
}

impl FakeConnector {
    pub fn new(script: SwitchScript) -> Self {
        Self {
            script,
            fail: false,
            connects: Arc::new(AtomicUsize::new(0)),
            switches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(SwitchScript::cisco())
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn switch(&self, index: usize) -> SwitchHandle {
        self.switches.lock().expect("switches lock")[index].clone()
    }
}

impl Connector for FakeConnector {
    async fn connect(&self, target: &DeviceTarget) -> Result<ShellTransport, ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ConnectError::ConnectTimeout(target.device_addr()));
        }
        let (transport, handle) = spawn_switch(self.script.clone());
        self.switches.lock().expect("switches lock").push(handle);
        Ok(transport)
    }
}

/// Sink keeping every record in memory.
#[derive(Default)]
pub struct MemorySink {
    pub records: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl DiagnosticsSink for MemorySink {
    async fn record_unknown(&self, device_addr: &str, evidence: &str) -> Result<(), ConnectError> {
        self.records
            .lock()
            .expect("records lock")
            .push((device_addr.to_string(), evidence.to_string()));
        Ok(())
    }
}
