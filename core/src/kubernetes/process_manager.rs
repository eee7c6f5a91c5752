//! Orchestrator for port-forward sessions.
//!
//! Every forwarded service runs as its own OS process in its own process
//! group. Each session gets a monitor task that waits for the child, so one
//! hung session never delays noticing that another one ended.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

use tokio::process::Child;
use tokio::sync::{oneshot, watch};

use crate::domain::{ForwardRequest, SessionKey, SessionState};
use crate::error::{Error, Result};
use crate::ports::SessionLauncher;

/// Result of starting one requested session.
#[derive(Debug)]
pub struct StartOutcome {
    pub key: SessionKey,
    pub command: String,
    /// Process id on success.
    pub result: Result<Option<u32>>,
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        self.result.is_ok()
    }
}

/// Snapshot of a tracked session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub key: SessionKey,
    pub command: String,
    pub state: SessionState,
}

struct Session {
    command: String,
    /// Process group id; equal to the child's pid.
    pgid: Option<i32>,
    state: watch::Receiver<SessionState>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl Session {
    fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }
}

/// Starts, tracks and stops forwarding sessions.
pub struct ForwardingOrchestrator<L: SessionLauncher> {
    launcher: L,

    /// Sessions by service identity.
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl<L: SessionLauncher> ForwardingOrchestrator<L> {
    /// Creates an orchestrator that spawns sessions through `launcher`.
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Starts one session per request.
    ///
    /// Each request uses its own context/namespace when set, else the given
    /// defaults. A request that fails to start is recorded in the `Error`
    /// state and does not affect the others. Must be called from within a
    /// tokio runtime.
    pub fn start<I, R>(
        &self,
        requests: I,
        default_context: &str,
        default_namespace: &str,
    ) -> Vec<StartOutcome>
    where
        I: IntoIterator<Item = R>,
        R: Into<ForwardRequest>,
    {
        requests
            .into_iter()
            .map(|request| self.start_one(request.into(), default_context, default_namespace))
            .collect()
    }

    fn start_one(
        &self,
        request: ForwardRequest,
        default_context: &str,
        default_namespace: &str,
    ) -> StartOutcome {
        let target = request.resolve(default_context, default_namespace);
        let key = target.key();
        let command = self.launcher.command_line(&target);

        let mut sessions = self.sessions.write();
        if sessions
            .get(&key)
            .is_some_and(|session| !session.current().is_terminal())
        {
            return StartOutcome {
                result: Err(Error::SessionExists(key.to_string())),
                key,
                command,
            };
        }

        let (state_tx, state_rx) = watch::channel(SessionState::Created);

        let (session, result) = match self.launcher.spawn(&target) {
            Ok(child) => {
                let pid = child.id();
                let (stop_tx, stop_rx) = oneshot::channel();
                state_tx.send_replace(SessionState::Running { pid });
                tracing::info!(session = %key, pid, "forwarding started");

                monitor(key.clone(), child, pid.map(|p| p as i32), state_tx, stop_rx);

                let session = Session {
                    command: command.clone(),
                    pgid: pid.map(|p| p as i32),
                    state: state_rx,
                    stop_tx: Some(stop_tx),
                };
                (session, Ok(pid))
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(session = %key, error = %message, "failed to start forwarding");
                state_tx.send_replace(SessionState::Error {
                    message: message.clone(),
                });

                let session = Session {
                    command: command.clone(),
                    pgid: None,
                    state: state_rx,
                    stop_tx: None,
                };
                let error = Error::Spawn {
                    service: key.to_string(),
                    reason: message,
                };
                (session, Err(error))
            }
        };

        sessions.insert(key.clone(), session);
        StartOutcome {
            key,
            command,
            result,
        }
    }

    /// Stops one session by signalling its whole process group.
    ///
    /// Returns the final state: `Killed` for a running session, otherwise
    /// whatever terminal state it already reached.
    pub async fn stop(&self, key: &SessionKey) -> Result<SessionState> {
        let mut state = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(key)
                .ok_or_else(|| Error::SessionNotFound(key.to_string()))?;

            if let Some(stop_tx) = session.stop_tx.take() {
                let _ = stop_tx.send(());
            }
            session.state.clone()
        };

        Ok(wait_terminal(&mut state).await)
    }

    /// Stops every live session and returns all final states.
    pub async fn stop_all(&self) -> Vec<(SessionKey, SessionState)> {
        let mut pending: Vec<(SessionKey, watch::Receiver<SessionState>)> = {
            let mut sessions = self.sessions.write();
            sessions
                .iter_mut()
                .map(|(key, session)| {
                    if let Some(stop_tx) = session.stop_tx.take() {
                        let _ = stop_tx.send(());
                    }
                    (key.clone(), session.state.clone())
                })
                .collect()
        };
        pending.sort_by(|a, b| a.0.cmp(&b.0));

        let mut results = Vec::with_capacity(pending.len());
        for (key, mut state) in pending {
            let final_state = wait_terminal(&mut state).await;
            results.push((key, final_state));
        }
        results
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Current state of a session.
    pub fn state(&self, key: &SessionKey) -> Option<SessionState> {
        self.sessions.read().get(key).map(Session::current)
    }

    /// All tracked sessions, ordered by key.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .read()
            .iter()
            .map(|(key, session)| SessionInfo {
                key: key.clone(),
                command: session.command.clone(),
                state: session.current(),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    /// Number of sessions still running.
    pub fn running_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|session| session.current().is_running())
            .count()
    }

    /// Waits until one session reaches a terminal state.
    pub async fn wait(&self, key: &SessionKey) -> Result<SessionState> {
        let mut state = self
            .sessions
            .read()
            .get(key)
            .map(|session| session.state.clone())
            .ok_or_else(|| Error::SessionNotFound(key.to_string()))?;

        Ok(wait_terminal(&mut state).await)
    }

    /// Waits for every session, each on its own receiver, and returns all
    /// final states ordered by key.
    pub async fn wait_all(&self) -> Vec<(SessionKey, SessionState)> {
        let mut pending: Vec<(SessionKey, watch::Receiver<SessionState>)> = self
            .sessions
            .read()
            .iter()
            .map(|(key, session)| (key.clone(), session.state.clone()))
            .collect();
        pending.sort_by(|a, b| a.0.cmp(&b.0));

        let mut results = Vec::with_capacity(pending.len());
        for (key, mut state) in pending {
            let final_state = wait_terminal(&mut state).await;
            results.push((key, final_state));
        }
        results
    }
}

impl<L: SessionLauncher> Drop for ForwardingOrchestrator<L> {
    fn drop(&mut self) {
        // The runtime may already be gone, so signal directly instead of
        // relying on the monitor tasks.
        for (key, session) in self.sessions.get_mut().iter_mut() {
            if !session.current().is_running() {
                continue;
            }
            #[cfg(unix)]
            if let Some(pgid) = session.pgid {
                if let Err(e) = signal_group(pgid) {
                    tracing::warn!(session = %key, pgid, error = %e, "failed to terminate process group");
                }
                continue;
            }
            if let Some(stop_tx) = session.stop_tx.take() {
                tracing::debug!(session = %key, "requesting stop on drop");
                let _ = stop_tx.send(());
            }
        }
    }
}

/// Waits for the child to exit on its own or for a stop request.
fn monitor(
    key: SessionKey,
    mut child: Child,
    pgid: Option<i32>,
    state_tx: watch::Sender<SessionState>,
    stop_rx: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        let final_state = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => SessionState::Exited { code: status.code() },
                Err(e) => SessionState::Error { message: e.to_string() },
            },
            Ok(()) = stop_rx => {
                terminate(&key, pgid, &mut child);
                let _ = child.wait().await; // Wait to avoid zombies
                SessionState::Killed
            }
        };

        tracing::info!(session = %key, state = %final_state, "forwarding ended");
        state_tx.send_replace(final_state);
    });
}

/// Sends the termination signal once to the child's process group.
fn terminate(key: &SessionKey, pgid: Option<i32>, child: &mut Child) {
    #[cfg(unix)]
    if let Some(pgid) = pgid {
        match signal_group(pgid) {
            Ok(()) => return,
            Err(e) => {
                tracing::warn!(session = %key, pgid, error = %e, "failed to signal process group");
            }
        }
    }

    #[cfg(not(unix))]
    let _ = pgid;

    if let Err(e) = child.start_kill() {
        tracing::warn!(session = %key, error = %e, "failed to kill forwarding process");
    }
}

#[cfg(unix)]
fn signal_group(pgid: i32) -> nix::Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    killpg(Pid::from_raw(pgid), Signal::SIGTERM)
}

async fn wait_terminal(state: &mut watch::Receiver<SessionState>) -> SessionState {
    if state.wait_for(SessionState::is_terminal).await.is_err() {
        tracing::debug!("session monitor went away before a final state");
    }
    // Monitor tasks publish exactly one terminal state.
    state.borrow().clone()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::{ForwardTarget, ServiceRecord};
    use std::collections::HashMap;
    use std::process::Stdio;
    use std::time::Duration;
    use tokio::process::Command;
    use tokio::time::timeout;

    const TEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Runs a per-service shell script instead of kubectl.
    struct ScriptLauncher {
        scripts: HashMap<String, String>,
    }

    impl ScriptLauncher {
        fn new(scripts: &[(&str, &str)]) -> Self {
            Self {
                scripts: scripts
                    .iter()
                    .map(|(name, script)| (name.to_string(), script.to_string()))
                    .collect(),
            }
        }
    }

    impl SessionLauncher for ScriptLauncher {
        fn command_line(&self, target: &ForwardTarget) -> String {
            self.scripts.get(&target.name).cloned().unwrap_or_default()
        }

        fn spawn(&self, target: &ForwardTarget) -> std::io::Result<Child> {
            let script = self.scripts.get(&target.name).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such forwarder")
            })?;
            Command::new("sh")
                .arg("-c")
                .arg(script)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .process_group(0)
                .spawn()
        }
    }

    fn record(name: &str) -> ServiceRecord {
        ServiceRecord::new("", "", name, ["8080"])
    }

    fn key(name: &str) -> SessionKey {
        SessionKey {
            context: "ctx".to_string(),
            namespace: "ns".to_string(),
            service: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_is_isolated() {
        let orchestrator = ForwardingOrchestrator::new(ScriptLauncher::new(&[
            ("a", "sleep 30"),
            ("c", "sleep 30"),
        ]));

        let records = [record("a"), record("broken"), record("c")];
        let outcomes = orchestrator.start(&records, "ctx", "ns");

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_started());
        assert!(matches!(outcomes[1].result, Err(Error::Spawn { .. })));
        assert!(outcomes[2].is_started());

        assert!(orchestrator.state(&key("a")).unwrap().is_running());
        assert!(orchestrator.state(&key("c")).unwrap().is_running());
        assert!(matches!(
            orchestrator.state(&key("broken")),
            Some(SessionState::Error { .. })
        ));
        assert_eq!(orchestrator.running_count(), 2);

        let stopped = timeout(TEST_TIMEOUT, orchestrator.stop_all()).await.unwrap();
        assert_eq!(stopped.len(), 3);
        assert_eq!(stopped[0], (key("a"), SessionState::Killed));
        assert!(matches!(stopped[1].1, SessionState::Error { .. }));
        assert_eq!(stopped[2], (key("c"), SessionState::Killed));
    }

    /// Pids in process group `pgid` that are neither zombies nor dead.
    #[cfg(target_os = "linux")]
    fn live_group_members(pgid: u32) -> Vec<u32> {
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<u32>().ok())
            .filter(|pid| {
                let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
                    return false;
                };
                // "pid (comm) state ppid pgrp ..."; comm may contain spaces.
                let Some(rest) = stat.rfind(')').map(|i| &stat[i + 1..]) else {
                    return false;
                };
                let fields: Vec<&str> = rest.split_whitespace().collect();
                matches!(fields.as_slice(), [state, _ppid, pgrp, ..]
                    if *state != "Z" && *state != "X" && pgrp.parse::<u32>() == Ok(pgid))
            })
            .collect()
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_stop_releases_whole_process_group() {
        let orchestrator = ForwardingOrchestrator::new(ScriptLauncher::new(&[
            ("a", "sleep 30 & sleep 30 & wait"),
            ("b", "sleep 30"),
        ]));
        let outcomes = orchestrator.start(&[record("a"), record("b")], "ctx", "ns");
        let pgid = match outcomes[0].result {
            Ok(Some(pid)) => pid,
            ref other => panic!("session did not start: {other:?}"),
        };
        let sibling_pgid = match outcomes[1].result {
            Ok(Some(pid)) => pid,
            ref other => panic!("session did not start: {other:?}"),
        };

        // Shell plus both background sleeps.
        timeout(TEST_TIMEOUT, async {
            while live_group_members(pgid).len() < 3 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        let state = timeout(TEST_TIMEOUT, orchestrator.stop(&key("a")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state, SessionState::Killed);

        timeout(TEST_TIMEOUT, async {
            while !live_group_members(pgid).is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("sub-children of the stopped session are still alive");

        assert!(!live_group_members(sibling_pgid).is_empty());
        timeout(TEST_TIMEOUT, orchestrator.stop_all()).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_kills_only_that_session() {
        let orchestrator = ForwardingOrchestrator::new(ScriptLauncher::new(&[
            ("a", "sleep 30 & sleep 30; wait"),
            ("b", "sleep 30"),
        ]));
        orchestrator.start(&[record("a"), record("b")], "ctx", "ns");

        let state = timeout(TEST_TIMEOUT, orchestrator.stop(&key("a")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state, SessionState::Killed);
        assert_eq!(orchestrator.state(&key("a")), Some(SessionState::Killed));
        assert!(orchestrator.state(&key("b")).unwrap().is_running());

        // Stopping a finished session reports its final state again.
        let again = orchestrator.stop(&key("a")).await.unwrap();
        assert_eq!(again, SessionState::Killed);

        timeout(TEST_TIMEOUT, orchestrator.stop_all()).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_exiting_on_its_own_is_reported() {
        let orchestrator = ForwardingOrchestrator::new(ScriptLauncher::new(&[
            ("flaky", "exit 3"),
            ("steady", "sleep 30"),
        ]));
        orchestrator.start(&[record("flaky"), record("steady")], "ctx", "ns");

        // The hung sibling must not delay noticing the exit.
        let state = timeout(TEST_TIMEOUT, orchestrator.wait(&key("flaky")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state, SessionState::Exited { code: Some(3) });
        assert!(orchestrator.state(&key("steady")).unwrap().is_running());

        timeout(TEST_TIMEOUT, orchestrator.stop_all()).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_all_collects_every_outcome() {
        let orchestrator = ForwardingOrchestrator::new(ScriptLauncher::new(&[
            ("ok", "exit 0"),
            ("bad", "exit 1"),
        ]));
        orchestrator.start(&[record("ok"), record("bad"), record("missing")], "ctx", "ns");

        let states = timeout(TEST_TIMEOUT, orchestrator.wait_all()).await.unwrap();
        let by_name: HashMap<_, _> = states
            .into_iter()
            .map(|(key, state)| (key.service, state))
            .collect();

        assert_eq!(by_name["ok"], SessionState::Exited { code: Some(0) });
        assert_eq!(by_name["bad"], SessionState::Exited { code: Some(1) });
        assert!(matches!(by_name["missing"], SessionState::Error { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_live_session_is_rejected() {
        let orchestrator = ForwardingOrchestrator::new(ScriptLauncher::new(&[("a", "sleep 30")]));

        assert!(orchestrator.start(&[record("a")], "ctx", "ns")[0].is_started());
        let second = orchestrator.start(&[record("a")], "ctx", "ns");
        assert!(matches!(second[0].result, Err(Error::SessionExists(_))));
        assert!(orchestrator.state(&key("a")).unwrap().is_running());

        timeout(TEST_TIMEOUT, orchestrator.stop_all()).await.unwrap();

        // Once finished, the same service can be started again.
        assert!(orchestrator.start(&[record("a")], "ctx", "ns")[0].is_started());
        timeout(TEST_TIMEOUT, orchestrator.stop_all()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let orchestrator = ForwardingOrchestrator::new(ScriptLauncher::new(&[]));
        assert!(matches!(
            orchestrator.stop(&key("nope")).await,
            Err(Error::SessionNotFound(_))
        ));
        assert!(orchestrator.state(&key("nope")).is_none());
    }

    #[tokio::test]
    async fn test_sessions_lists_commands() {
        let orchestrator = ForwardingOrchestrator::new(ScriptLauncher::new(&[
            ("b", "sleep 30"),
            ("a", "sleep 30"),
        ]));
        orchestrator.start(&[record("b"), record("a")], "ctx", "ns");

        let sessions = orchestrator.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].key, key("a"));
        assert_eq!(sessions[0].command, "sleep 30");

        timeout(TEST_TIMEOUT, orchestrator.stop_all()).await.unwrap();
    }
}
