//! Test doubles for the engine's external collaborators
//!
//! - RecordingLauncher: fake player processes, tracks how many are alive and
//!   flags any launch that was not preceded by a sweep or that overlaps a
//!   live process
//! - ScriptedResolver: canned titles/streams, per-URL failures and gates
//! - FakeControl: in-memory player properties, records every command

use async_trait::async_trait;
use jukebox_ap::control::PlayerControl;
use jukebox_ap::error::{Error, Result};
use jukebox_ap::player::{ExitCause, LaunchRequest, PlayerLauncher, PlayerProcess};
use jukebox_ap::resolver::TrackResolver;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};

// ============================================================================
// Launcher
// ============================================================================

#[derive(Default)]
struct LauncherState {
    launches: Vec<LaunchRequest>,
    live: usize,
    max_live: usize,
    sweeps: usize,
    swept_since_launch: bool,
    violations: Vec<String>,
    exits: Vec<Option<oneshot::Sender<ExitCause>>>,
    failing_streams: HashSet<String>,
    sweep_gate: Option<Arc<Notify>>,
}

/// Launcher double that never spawns anything
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every launch of `stream` fail
    pub fn fail_stream(&self, stream: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_streams
            .insert(stream.to_string());
    }

    /// Block sweeps until the returned gate is notified
    pub fn hold_sweeps(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().sweep_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn release_sweeps(&self) {
        if let Some(gate) = self.state.lock().unwrap().sweep_gate.take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Terminate the most recent player as if it exited on its own
    pub fn finish_current(&self, cause: ExitCause) -> bool {
        let mut state = self.state.lock().unwrap();
        for slot in state.exits.iter_mut().rev() {
            if let Some(tx) = slot.take() {
                return tx.send(cause).is_ok();
            }
        }
        false
    }

    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.state.lock().unwrap().launches.clone()
    }

    pub fn launched_streams(&self) -> Vec<String> {
        self.launches().into_iter().map(|l| l.stream).collect()
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    pub fn sweeps(&self) -> usize {
        self.state.lock().unwrap().sweeps
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.lock().unwrap().violations.clone()
    }
}

#[async_trait]
impl PlayerLauncher for RecordingLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn PlayerProcess>> {
        let mut state = self.state.lock().unwrap();

        if state.failing_streams.contains(&request.stream) {
            return Err(Error::PlayerSpawn(format!("scripted failure for {}", request.stream)));
        }
        if state.live > 0 {
            let msg = format!("launch of {} while {} player(s) live", request.stream, state.live);
            state.violations.push(msg);
        }
        if !state.swept_since_launch {
            let msg = format!("launch of {} without a preceding stop_all", request.stream);
            state.violations.push(msg);
        }

        let (tx, rx) = oneshot::channel();
        let id = state.launches.len() as u32 + 1;
        state.launches.push(request.clone());
        state.exits.push(Some(tx));
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        state.swept_since_launch = false;

        Ok(Box::new(FakeProcess {
            id,
            exit_rx: Some(rx),
            state: Arc::clone(&self.state),
            terminated: false,
        }))
    }

    async fn sweep(&self) {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.sweeps += 1;
            state.swept_since_launch = true;
            state.sweep_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

struct FakeProcess {
    id: u32,
    exit_rx: Option<oneshot::Receiver<ExitCause>>,
    state: Arc<Mutex<LauncherState>>,
    terminated: bool,
}

impl FakeProcess {
    fn terminate(&mut self) {
        if !self.terminated {
            self.terminated = true;
            self.state.lock().unwrap().live -= 1;
        }
    }
}

#[async_trait]
impl PlayerProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(self.id)
    }

    async fn wait(&mut self) -> ExitCause {
        let cause = match self.exit_rx.as_mut() {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| ExitCause::Abnormal("harness dropped".to_string())),
            None => std::future::pending().await,
        };
        self.exit_rx = None;
        self.terminate();
        cause
    }

    async fn kill(&mut self) {
        self.terminate();
    }
}

impl Drop for FakeProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolver double: title `Title <url>`, stream `stream:<url>`
#[derive(Default)]
pub struct ScriptedResolver {
    failing_titles: Mutex<HashSet<String>>,
    failing_streams: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    stream_requests: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream_for(url: &str) -> String {
        format!("stream:{}", url)
    }

    pub fn title_for(url: &str) -> String {
        format!("Title {}", url)
    }

    pub fn fail_title(&self, url: &str) {
        self.failing_titles.lock().unwrap().insert(url.to_string());
    }

    pub fn fail_stream(&self, url: &str) {
        self.failing_streams.lock().unwrap().insert(url.to_string());
    }

    /// Hold stream resolution of `url` until the gate is notified
    pub fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn stream_requests(&self) -> Vec<String> {
        self.stream_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackResolver for ScriptedResolver {
    async fn resolve_title(&self, url: &str) -> Result<String> {
        if self.failing_titles.lock().unwrap().contains(url) {
            return Err(Error::Resolution(format!("no title for {}", url)));
        }
        Ok(Self::title_for(url))
    }

    async fn resolve_stream(&self, url: &str) -> Result<String> {
        self.stream_requests.lock().unwrap().push(url.to_string());

        let gate = self.gates.lock().unwrap().remove(url);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing_streams.lock().unwrap().contains(url) {
            return Err(Error::Resolution(format!("no stream for {}", url)));
        }
        Ok(Self::stream_for(url))
    }
}

// ============================================================================
// Control channel
// ============================================================================

/// In-memory player control
pub struct FakeControl {
    properties: Mutex<HashMap<String, Value>>,
    commands: Mutex<Vec<Vec<Value>>>,
    unreachable: AtomicBool,
}

impl Default for FakeControl {
    fn default() -> Self {
        let properties = HashMap::from([
            ("time-pos".to_string(), Value::Null),
            ("duration".to_string(), Value::Null),
            ("pause".to_string(), json!(false)),
        ]);
        Self {
            properties: Mutex::new(properties),
            commands: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
        }
    }
}

impl FakeControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.properties
            .lock()
            .unwrap()
            .insert(name.to_string(), value);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<Vec<Value>> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlayerControl for FakeControl {
    async fn send(&self, command: Vec<Value>) -> Result<Value> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::ControlUnreachable("no player".to_string()));
        }
        self.commands.lock().unwrap().push(command.clone());

        let verb = command.first().and_then(Value::as_str).unwrap_or_default();
        let name = command
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut properties = self.properties.lock().unwrap();

        match verb {
            "get_property" => properties
                .get(&name)
                .cloned()
                .ok_or_else(|| Error::ControlRejected("property not found".to_string())),
            "set_property" => {
                properties.insert(name, command.get(2).cloned().unwrap_or(Value::Null));
                Ok(Value::Null)
            }
            "cycle" => {
                let current = properties.get(&name).and_then(Value::as_bool).unwrap_or(false);
                properties.insert(name, json!(!current));
                Ok(Value::Null)
            }
            "seek" => Ok(Value::Null),
            other => Err(Error::ControlRejected(format!("unknown command {}", other))),
        }
    }
}
