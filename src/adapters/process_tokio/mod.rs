//! Subprocess runner built on `tokio::process`
//!
//! Children run with stdin closed and both output streams captured in full.
//! On Unix each child leads its own process group so a timeout can take down
//! helpers it spawned as well.

use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::errors::ProcessError;
use crate::domain::model::{CommandSpec, ProcessOutput};
use crate::ports::ProcessPort;

/// Process adapter that runs commands on the local machine
#[derive(Debug, Default, Clone)]
pub struct TokioProcessAdapter;

impl TokioProcessAdapter {
    pub fn new() -> Self {
        Self
    }

    fn build(command: &CommandSpec) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

fn drain<R>(reader: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            reader.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn collect(
    program: &str,
    handle: JoinHandle<io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, ProcessError> {
    match handle.await {
        Ok(result) => result.map_err(|source| ProcessError::Io {
            program: program.to_string(),
            source,
        }),
        Err(join) => Err(ProcessError::Io {
            program: program.to_string(),
            source: io::Error::new(io::ErrorKind::Other, join.to_string()),
        }),
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[async_trait]
impl ProcessPort for TokioProcessAdapter {
    async fn run(
        &self,
        command: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ProcessError> {
        let program = command.program.clone();
        debug!("Spawning: {}", command);
        let started = Instant::now();

        let mut child = Self::build(command).spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ProcessError::NotFound {
                    program: program.clone(),
                }
            } else {
                ProcessError::Spawn {
                    program: program.clone(),
                    source,
                }
            }
        })?;

        // the leader's pid is also the group id; it is gone once the child is reaped
        let group = child.id();
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let stdout_abort = stdout.abort_handle();
        let stderr_abort = stderr.abort_handle();

        // pipes stay open while any process in the group holds them
        let finish = async {
            let status = child.wait().await.map_err(|source| ProcessError::Io {
                program: program.clone(),
                source,
            });
            let stdout = collect(&program, stdout).await;
            let stderr = collect(&program, stderr).await;
            (status, stdout, stderr)
        };

        let finished = match timeout {
            Some(limit) => tokio::time::timeout(limit, finish).await.ok(),
            None => Some(finish.await),
        };
        let (status, stdout, stderr) = match finished {
            Some(done) => done,
            None => {
                let limit = timeout.unwrap_or_default();
                warn!("{} exceeded {:?}, killing it", program, limit);
                kill_group(group);
                if let Err(e) = child.kill().await {
                    debug!("kill after timeout failed: {}", e);
                }
                stdout_abort.abort();
                stderr_abort.abort();
                return Err(ProcessError::TimedOut {
                    program,
                    after: limit,
                });
            }
        };
        let status = status?;
        let stdout = stdout?;
        let stderr = stderr?;
        let elapsed = started.elapsed();
        debug!(
            "{} exited with {:?} after {:.2}s",
            program,
            status.code(),
            elapsed.as_secs_f64()
        );

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            elapsed,
        })
    }
}
