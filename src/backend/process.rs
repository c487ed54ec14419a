//! Single renderer process lifecycle
//!
//! At most one child runs at a time. Output lines are forwarded from reader
//! threads over an mpsc channel; exit is picked up by `poll`, which the UI
//! calls every frame.

use crate::constant::{KILL_TIMEOUT_MS, STARTUP_GRACE_MS, TERMINATE_TIMEOUT_MS};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Renderer binary not found at: {}", .0.display())]
    BinaryMissing(PathBuf),

    #[error("Renderer binary is not executable: {}", .0.display())]
    NotExecutable(PathBuf),

    #[error("Failed to start renderer process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Renderer exited during startup ({0})")]
    ExitedDuringStartup(ExitOutcome),
}

/// Everything needed to start one renderer process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchRequest {
    pub wallpaper_id: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl LaunchRequest {
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Normal(i32),
    Crashed(Option<i32>),
}

impl ExitOutcome {
    fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Crashed(Some(signal));
            }
        }
        match status.code() {
            Some(code) => Self::Normal(code),
            None => Self::Crashed(None),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Normal(0))
    }
}

impl std::fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal(code) => write!(f, "exit code: {}, status: Normal", code),
            Self::Crashed(Some(signal)) => write!(f, "signal: {}, status: Crashed", signal),
            Self::Crashed(None) => write!(f, "status: Crashed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Info,
    Log,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub level: OutputLevel,
    pub text: String,
}

/// Notifications consumed by the log view
#[derive(Debug, Clone, PartialEq)]
pub enum LauncherEvent {
    Launched { wallpaper_id: String, command: String },
    Output { wallpaper_id: String, line: OutputLine },
    Finished { wallpaper_id: String, outcome: ExitOutcome },
    Stopped { wallpaper_id: String },
    Error(String),
}

#[derive(Debug, Clone)]
pub struct LauncherOptions {
    pub terminate_timeout: Duration,
    pub kill_timeout: Duration,
    pub startup_grace: Duration,
}

impl Default for LauncherOptions {
    fn default() -> Self {
        Self {
            terminate_timeout: Duration::from_millis(TERMINATE_TIMEOUT_MS),
            kill_timeout: Duration::from_millis(KILL_TIMEOUT_MS),
            startup_grace: Duration::from_millis(STARTUP_GRACE_MS),
        }
    }
}

struct RunningProcess {
    wallpaper_id: String,
    child: Child,
}

pub struct ProcessLauncher {
    options: LauncherOptions,
    running: Option<RunningProcess>,
    events: Sender<LauncherEvent>,
}

impl ProcessLauncher {
    pub fn new(options: LauncherOptions) -> (Self, Receiver<LauncherEvent>) {
        let (sender, receiver) = mpsc::channel();
        let launcher = Self {
            options,
            running: None,
            events: sender,
        };
        (launcher, receiver)
    }

    fn emit(&self, event: LauncherEvent) {
        // The receiver going away only means nobody is watching the log
        let _ = self.events.send(event);
    }

    fn fail(&self, error: LaunchError) -> LaunchError {
        warn!("{}", error);
        self.emit(LauncherEvent::Error(error.to_string()));
        error
    }

    /// Start `request`, stopping whatever is currently running first
    pub fn launch(&mut self, request: LaunchRequest) -> Result<(), LaunchError> {
        if let Err(e) = check_executable(&request.program) {
            return Err(self.fail(e));
        }

        self.stop();

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }

        info!(
            wallpaper_id = %request.wallpaper_id,
            program = %request.program.display(),
            args = ?request.args,
            "Launching renderer"
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return Err(self.fail(LaunchError::Spawn(e))),
        };

        if let Some(stdout) = child.stdout.take() {
            spawn_reader(
                stdout,
                OutputStream::Stdout,
                request.wallpaper_id.clone(),
                self.events.clone(),
            );
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(
                stderr,
                OutputStream::Stderr,
                request.wallpaper_id.clone(),
                self.events.clone(),
            );
        }

        // A renderer that dies right away with an error never really started
        let deadline = Instant::now() + self.options.startup_grace;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let outcome = ExitOutcome::from_status(status);
                    if !outcome.is_success() {
                        return Err(self.fail(LaunchError::ExitedDuringStartup(outcome)));
                    }
                    break;
                }
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(e) => {
                    reap(&mut child);
                    return Err(self.fail(LaunchError::Spawn(e)));
                }
            }
        }

        self.emit(LauncherEvent::Launched {
            wallpaper_id: request.wallpaper_id.clone(),
            command: request.command_line(),
        });
        self.running = Some(RunningProcess {
            wallpaper_id: request.wallpaper_id,
            child,
        });
        Ok(())
    }

    /// Terminate the running process: graceful first, forced after a timeout
    pub fn stop(&mut self) {
        let Some(mut process) = self.running.take() else {
            return;
        };

        info!(wallpaper_id = %process.wallpaper_id, "Stopping renderer");
        request_terminate(&mut process.child);

        if wait_timeout(&mut process.child, self.options.terminate_timeout).is_none() {
            warn!(
                wallpaper_id = %process.wallpaper_id,
                "Renderer did not terminate gracefully, killing it"
            );
            let _ = process.child.kill();
            if wait_timeout(&mut process.child, self.options.kill_timeout).is_none() {
                warn!(wallpaper_id = %process.wallpaper_id, "Renderer still alive after kill");
            }
        }

        self.emit(LauncherEvent::Stopped {
            wallpaper_id: process.wallpaper_id,
        });
    }

    /// Check whether the child exited on its own
    pub fn poll(&mut self) -> Option<ExitOutcome> {
        let process = self.running.as_mut()?;
        match process.child.try_wait() {
            Ok(Some(status)) => {
                let outcome = ExitOutcome::from_status(status);
                let wallpaper_id = process.wallpaper_id.clone();
                self.running = None;

                match outcome {
                    ExitOutcome::Crashed(_) => {
                        warn!(%wallpaper_id, %outcome, "Renderer crashed");
                        self.emit(LauncherEvent::Error("Wallpaper process crashed".to_string()));
                    }
                    ExitOutcome::Normal(_) => {
                        info!(%wallpaper_id, %outcome, "Renderer finished");
                    }
                }
                self.emit(LauncherEvent::Finished {
                    wallpaper_id,
                    outcome,
                });
                Some(outcome)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to query renderer state: {}", e);
                None
            }
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.poll();
        self.running.is_some()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.running.as_ref().map(|p| p.wallpaper_id.as_str())
    }
}

impl Drop for ProcessLauncher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn check_executable(program: &Path) -> Result<(), LaunchError> {
    let metadata = std::fs::metadata(program)
        .map_err(|_| LaunchError::BinaryMissing(program.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(LaunchError::NotExecutable(program.to_path_buf()));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(LaunchError::NotExecutable(program.to_path_buf()));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn request_terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!("SIGTERM failed ({}), falling back to kill", e);
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    let _ = child.kill();
}

fn wait_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
            _ => return None,
        }
    }
}

/// Kill a child we are giving up on and collect its exit status
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("Kill failed: {}", e);
    }
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(
    source: R,
    stream: OutputStream,
    wallpaper_id: String,
    events: Sender<LauncherEvent>,
) {
    thread::spawn(move || {
        let reader = BufReader::new(source);
        for line in reader.lines() {
            let Ok(text) = line else { break };
            let text = text.trim_end().to_string();
            if text.is_empty() {
                continue;
            }
            let level = match stream {
                OutputStream::Stdout => OutputLevel::Info,
                OutputStream::Stderr => classify_stderr(&text),
            };
            let event = LauncherEvent::Output {
                wallpaper_id: wallpaper_id.clone(),
                line: OutputLine {
                    stream,
                    level,
                    text,
                },
            };
            if events.send(event).is_err() {
                break;
            }
        }
    });
}

/// Renderers log plenty of harmless chatter on stderr; only flag real errors
pub fn classify_stderr(text: &str) -> OutputLevel {
    const BENIGN: &[&str] = &[
        "Fullscreen detection not supported",
        "Failed to initialize GLEW",
    ];

    let upper = text.to_uppercase();
    let is_error = upper.contains("ERROR")
        || upper.contains("FATAL")
        || upper.contains("CRITICAL")
        || (upper.contains("FAILED") && !BENIGN.iter().any(|b| text.contains(b)));

    if is_error {
        OutputLevel::Error
    } else {
        OutputLevel::Log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_stderr() {
        assert_eq!(classify_stderr("ERROR: no shader"), OutputLevel::Error);
        assert_eq!(classify_stderr("fatal glitch"), OutputLevel::Error);
        assert_eq!(classify_stderr("Load failed for texture"), OutputLevel::Error);
        assert_eq!(
            classify_stderr("Fullscreen detection not supported, failed silently"),
            OutputLevel::Log
        );
        assert_eq!(classify_stderr("[mpv] playing"), OutputLevel::Log);
    }

    #[test]
    fn test_command_line() {
        let request = LaunchRequest {
            wallpaper_id: "1".to_string(),
            program: PathBuf::from("/usr/bin/renderer"),
            args: vec!["--fps".to_string(), "60".to_string()],
            ..Default::default()
        };
        assert_eq!(request.command_line(), "/usr/bin/renderer --fps 60");
    }

    #[test]
    fn test_missing_binary_is_rejected() {
        let (mut launcher, events) = ProcessLauncher::new(LauncherOptions::default());
        let request = LaunchRequest {
            wallpaper_id: "1".to_string(),
            program: PathBuf::from("/definitely/not/here/renderer"),
            ..Default::default()
        };

        let result = launcher.launch(request);
        assert!(matches!(result, Err(LaunchError::BinaryMissing(_))));
        assert!(!launcher.is_running());
        assert!(matches!(events.try_recv(), Ok(LauncherEvent::Error(_))));
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::fs;
        use uuid::Uuid;

        fn shell(id: &str, script: &str) -> LaunchRequest {
            LaunchRequest {
                wallpaper_id: id.to_string(),
                program: PathBuf::from("/bin/sh"),
                args: vec!["-c".to_string(), script.to_string()],
                working_dir: None,
                env: vec![("WALLPAPER_TEST_VAR".to_string(), "from-env".to_string())],
            }
        }

        fn quick_options() -> LauncherOptions {
            LauncherOptions {
                terminate_timeout: Duration::from_secs(2),
                kill_timeout: Duration::from_secs(1),
                startup_grace: Duration::from_millis(100),
            }
        }

        fn wait_for<F: Fn(&LauncherEvent) -> bool>(
            events: &Receiver<LauncherEvent>,
            predicate: F,
        ) -> Option<LauncherEvent> {
            let deadline = Instant::now() + Duration::from_secs(5);
            while Instant::now() < deadline {
                if let Ok(event) = events.recv_timeout(Duration::from_millis(100))
                    && predicate(&event)
                {
                    return Some(event);
                }
            }
            None
        }

        #[test]
        fn test_launch_captures_output_and_stops() {
            let (mut launcher, events) = ProcessLauncher::new(quick_options());

            launcher
                .launch(shell("100", "echo \"$WALLPAPER_TEST_VAR\"; exec sleep 30"))
                .unwrap();
            assert!(launcher.is_running());
            assert_eq!(launcher.current_id(), Some("100"));

            let output = wait_for(&events, |e| matches!(e, LauncherEvent::Output { .. }));
            match output {
                Some(LauncherEvent::Output { wallpaper_id, line }) => {
                    assert_eq!(wallpaper_id, "100");
                    assert_eq!(line.text, "from-env");
                    assert_eq!(line.stream, OutputStream::Stdout);
                }
                other => panic!("unexpected event: {:?}", other),
            }

            launcher.stop();
            assert!(!launcher.is_running());
            assert_eq!(launcher.current_id(), None);
            assert!(wait_for(&events, |e| matches!(e, LauncherEvent::Stopped { .. })).is_some());
        }

        #[test]
        fn test_new_launch_replaces_running_process() {
            let (mut launcher, events) = ProcessLauncher::new(quick_options());

            launcher.launch(shell("first", "exec sleep 30")).unwrap();
            launcher.launch(shell("second", "exec sleep 30")).unwrap();

            assert_eq!(launcher.current_id(), Some("second"));
            let stopped = wait_for(&events, |e| matches!(e, LauncherEvent::Stopped { .. }));
            assert_eq!(
                stopped,
                Some(LauncherEvent::Stopped {
                    wallpaper_id: "first".to_string()
                })
            );

            launcher.stop();
        }

        #[test]
        fn test_early_failure_is_reported() {
            let (mut launcher, _events) = ProcessLauncher::new(quick_options());

            let result = launcher.launch(shell("bad", "exit 3"));
            assert!(matches!(
                result,
                Err(LaunchError::ExitedDuringStartup(ExitOutcome::Normal(3)))
            ));
            assert!(!launcher.is_running());
        }

        #[test]
        fn test_poll_detects_exit_and_crash() {
            let (mut launcher, events) = ProcessLauncher::new(quick_options());

            launcher.launch(shell("short", "sleep 0.3; exit 0")).unwrap();
            assert_eq!(launcher.current_id(), Some("short"));

            let deadline = Instant::now() + Duration::from_secs(5);
            let mut outcome = None;
            while outcome.is_none() && Instant::now() < deadline {
                outcome = launcher.poll();
                thread::sleep(Duration::from_millis(20));
            }
            assert_eq!(outcome, Some(ExitOutcome::Normal(0)));
            assert_eq!(launcher.current_id(), None);

            launcher.launch(shell("crash", "sleep 0.3; kill -9 $$")).unwrap();
            let deadline = Instant::now() + Duration::from_secs(5);
            let mut outcome = None;
            while outcome.is_none() && Instant::now() < deadline {
                outcome = launcher.poll();
                thread::sleep(Duration::from_millis(20));
            }
            assert_eq!(outcome, Some(ExitOutcome::Crashed(Some(9))));
            assert!(wait_for(&events, |e| matches!(e, LauncherEvent::Error(_))).is_some());
        }

        #[test]
        fn test_stop_kills_renderer_ignoring_sigterm() {
            let (mut launcher, events) = ProcessLauncher::new(LauncherOptions {
                terminate_timeout: Duration::from_millis(300),
                kill_timeout: Duration::from_secs(1),
                startup_grace: Duration::from_millis(100),
            });

            launcher
                .launch(shell("stubborn", "trap '' TERM; exec sleep 30"))
                .unwrap();
            assert!(launcher.is_running());

            let started = Instant::now();
            launcher.stop();
            assert!(started.elapsed() < Duration::from_secs(5));
            assert!(!launcher.is_running());
            assert_eq!(
                wait_for(&events, |e| matches!(e, LauncherEvent::Stopped { .. })),
                Some(LauncherEvent::Stopped {
                    wallpaper_id: "stubborn".to_string()
                })
            );
        }

        #[test]
        fn test_reap_leaves_no_running_child() {
            let mut child = Command::new("/bin/sh")
                .args(["-c", "exec sleep 30"])
                .spawn()
                .unwrap();

            reap(&mut child);
            assert!(child.try_wait().unwrap().is_some());
        }

        #[test]
        fn test_non_executable_binary_is_rejected() {
            let test_dir = std::env::temp_dir().join(format!("test_process_{}", Uuid::new_v4()));
            fs::create_dir_all(&test_dir).unwrap();
            let script = test_dir.join("renderer.sh");
            fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();

            let (mut launcher, _events) = ProcessLauncher::new(quick_options());
            let result = launcher.launch(LaunchRequest {
                wallpaper_id: "x".to_string(),
                program: script,
                ..Default::default()
            });
            assert!(matches!(result, Err(LaunchError::NotExecutable(_))));

            let _ = fs::remove_dir_all(&test_dir);
        }
    }
}
