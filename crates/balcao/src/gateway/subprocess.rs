//! Gateway subprocess supervisor.
//!
//! Spawns the external gateway (the process that holds the WhatsApp session),
//! bridges its stdio as JSON Lines, and restarts it according to the
//! configured policy with exponential backoff.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use balcao_gateway_protocol::{GatewayCommand, GatewayEvent};

use crate::config::{GatewayConfig, RestartPolicy};

const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// Grace period after forwarding `Shutdown` before the child is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// How one run of the child ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunOutcome {
    exit_success: bool,
    /// The child reported `ready` at least once.
    got_ready: bool,
    /// We asked it to stop (shutdown command or command channel closed).
    stop_requested: bool,
}

/// Consecutive failed attempts and the delay before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Backoff {
    attempts: u32,
    delay: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            attempts: 0,
            delay: INITIAL_BACKOFF,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    /// Delay to wait now; doubles the next one up to the cap.
    fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (self.delay * 2).min(MAX_BACKOFF);
        delay
    }

    fn exhausted(&self) -> bool {
        self.attempts >= MAX_ATTEMPTS
    }
}

/// Supervisor for the gateway subprocess.
pub struct SubprocessGateway {
    config: GatewayConfig,
}

impl SubprocessGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Run until the gateway stops for good.
    ///
    /// Events go to `events`; commands are read from `commands`. A final
    /// `Shutdown` event is always emitted before returning.
    pub async fn run(
        self,
        events: mpsc::Sender<GatewayEvent>,
        mut commands: mpsc::Receiver<GatewayCommand>,
    ) {
        let mut backoff = Backoff::new();

        let reason = loop {
            backoff.attempts += 1;
            info!(
                gateway = %self.config.name,
                attempt = backoff.attempts,
                command = %self.config.command,
                "Spawning gateway subprocess"
            );

            let outcome = match self.spawn_child() {
                Ok(child) => self.bridge(child, &events, &mut commands).await,
                Err(e) => {
                    error!(gateway = %self.config.name, error = %e, "Failed to spawn gateway");
                    if backoff.exhausted() || self.config.restart == RestartPolicy::Never {
                        let _ = events
                            .send(GatewayEvent::Error {
                                code: "spawn_failed".to_string(),
                                message: e.to_string(),
                                fatal: true,
                            })
                            .await;
                        break "spawn failed".to_string();
                    }
                    RunOutcome::default()
                }
            };

            if outcome.got_ready {
                backoff.reset();
            }
            if outcome.stop_requested {
                break "stopped".to_string();
            }
            if !should_restart(self.config.restart, &backoff, outcome.exit_success) {
                break "subprocess exited".to_string();
            }

            let delay = backoff.next_delay();
            warn!(
                gateway = %self.config.name,
                backoff_secs = delay.as_secs(),
                "Restarting gateway subprocess"
            );
            tokio::time::sleep(delay).await;
        };

        info!(gateway = %self.config.name, reason = %reason, "Gateway supervisor stopped");
        let _ = events.send(GatewayEvent::Shutdown { reason }).await;
    }

    fn spawn_child(&self) -> std::io::Result<Child> {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Take the gateway down with us if we die without cleaning up.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        cmd.spawn()
    }

    /// Pump events and commands until the child exits or we stop it.
    async fn bridge(
        &self,
        mut child: Child,
        events: &mpsc::Sender<GatewayEvent>,
        commands: &mut mpsc::Receiver<GatewayCommand>,
    ) -> RunOutcome {
        let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            error!(gateway = %self.config.name, "Gateway stdio not captured");
            let _ = child.kill().await;
            return RunOutcome::default();
        };
        let mut lines: Lines<BufReader<ChildStdout>> = BufReader::new(stdout).lines();
        let mut outcome = RunOutcome::default();

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if !self.forward(&line, events, &mut outcome).await {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!(gateway = %self.config.name, "Gateway stdout closed");
                        break;
                    }
                    Err(e) => {
                        error!(gateway = %self.config.name, error = %e, "Error reading gateway stdout");
                        break;
                    }
                },

                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!(gateway = %self.config.name, "Command channel closed");
                        outcome.stop_requested = true;
                        break;
                    };
                    let is_shutdown = matches!(command, GatewayCommand::Shutdown);
                    if let Err(e) = self.write_command(&mut stdin, &command).await {
                        error!(gateway = %self.config.name, error = %e, "Failed to write to gateway stdin");
                        break;
                    }
                    if is_shutdown {
                        outcome.stop_requested = true;
                        tokio::time::sleep(SHUTDOWN_GRACE).await;
                        break;
                    }
                }

                status = child.wait() => {
                    match status {
                        Ok(status) => {
                            info!(gateway = %self.config.name, status = %status, "Gateway subprocess exited");
                            outcome.exit_success = status.success();
                        }
                        Err(e) => {
                            error!(gateway = %self.config.name, error = %e, "Error waiting for gateway");
                        }
                    }
                    // Lines written right before exit may still be buffered.
                    while let Ok(Some(line)) = lines.next_line().await {
                        if !self.forward(&line, events, &mut outcome).await {
                            break;
                        }
                    }
                    return outcome;
                }
            }
        }

        let _ = child.kill().await;
        outcome.exit_success = child.wait().await.map(|s| s.success()).unwrap_or(false);
        outcome
    }

    /// Decode and forward one stdout line. Returns false when bridging
    /// should stop.
    async fn forward(
        &self,
        line: &str,
        events: &mpsc::Sender<GatewayEvent>,
        outcome: &mut RunOutcome,
    ) -> bool {
        let Some(event) = self.decode(line) else {
            return true;
        };
        if matches!(event, GatewayEvent::Ready { .. }) {
            outcome.got_ready = true;
        }
        let is_shutdown = matches!(event, GatewayEvent::Shutdown { .. });
        if events.send(event).await.is_err() {
            debug!(gateway = %self.config.name, "Event channel closed");
            outcome.stop_requested = true;
            return false;
        }
        !is_shutdown
    }

    fn decode(&self, line: &str) -> Option<GatewayEvent> {
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<GatewayEvent>(line) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(gateway = %self.config.name, line = %line, error = %e, "Failed to parse gateway event");
                None
            }
        }
    }

    async fn write_command(
        &self,
        stdin: &mut ChildStdin,
        command: &GatewayCommand,
    ) -> std::io::Result<()> {
        let mut json = serde_json::to_string(command)?;
        json.push('\n');
        stdin.write_all(json.as_bytes()).await?;
        stdin.flush().await
    }
}

fn should_restart(policy: RestartPolicy, backoff: &Backoff, exit_success: bool) -> bool {
    if backoff.exhausted() {
        error!(attempts = backoff.attempts, "Max gateway restart attempts reached");
        return false;
    }

    match policy {
        RestartPolicy::Always => true,
        RestartPolicy::OnFailure => !exit_success,
        RestartPolicy::Never => false,
    }
}
