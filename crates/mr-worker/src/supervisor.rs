//! The model subprocess supervisor: spawn, wait, and signal-based kill,
//! writing stdout and stderr straight to one shared log file handle
//! rather than streaming lines anywhere.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command as TokioCommand;

/// Split the configured model command line and append the absolute
/// input/output directory paths as the last two arguments.
pub fn build_argv(command_line: &str, input_dir: &Path, output_dir: &Path) -> Vec<String> {
    let mut argv = mr_sdk::shell_split(command_line);
    argv.push(input_dir.to_string_lossy().into_owned());
    argv.push(output_dir.to_string_lossy().into_owned());
    argv
}

/// Spawn `argv[0]` with `argv[1..]`, stdin closed, stdout and stderr both
/// redirected to `log_file`. Returns the child and its pid (the pid is
/// what a later `KILL_JOB` tree-kill is rooted at).
pub fn spawn(argv: &[String], log_file: &std::fs::File) -> std::io::Result<(tokio::process::Child, u32)> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty model command"))?;

    let stdout_handle = log_file.try_clone()?;
    let stderr_handle = log_file.try_clone()?;

    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_handle))
        .stderr(Stdio::from(stderr_handle))
        .spawn()?;

    let pid = child.id().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "spawned child has no pid")
    })?;

    Ok((child, pid))
}

/// What a terminated model subprocess means for the job's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exit code 0.
    Success,
    /// Terminated by the same signal `KILL_JOB`'s tree-kill sends.
    Killed,
    /// Any other non-zero exit or signal.
    Failed,
}

#[cfg(unix)]
pub fn classify_exit(status: std::process::ExitStatus) -> ExitOutcome {
    use std::os::unix::process::ExitStatusExt;
    const KILL_SIGNAL: i32 = nix::sys::signal::Signal::SIGKILL as i32;

    if status.code() == Some(0) {
        ExitOutcome::Success
    } else if status.signal() == Some(KILL_SIGNAL) {
        ExitOutcome::Killed
    } else {
        ExitOutcome::Failed
    }
}

#[cfg(not(unix))]
pub fn classify_exit(status: std::process::ExitStatus) -> ExitOutcome {
    if status.success() {
        ExitOutcome::Success
    } else {
        ExitOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_argv_splits_command_and_appends_directories() {
        let argv = build_argv("/bin/sleep 0", Path::new("/data/in"), Path::new("/data/out"));
        assert_eq!(argv, vec!["/bin/sleep", "0", "/data/in", "/data/out"]);
    }

    #[test]
    fn build_argv_respects_quoted_arguments() {
        let argv = build_argv(r#"/bin/run "two words""#, Path::new("/in"), Path::new("/out"));
        assert_eq!(argv, vec!["/bin/run", "two words", "/in", "/out"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_and_wait_reports_success_for_exit_zero() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("job_log.txt");
        let log_file = std::fs::File::create(&log_path).unwrap();

        let argv = vec!["/bin/true".to_string()];
        let (mut child, _pid) = spawn(&argv, &log_file).unwrap();
        let status = child.wait().await.unwrap();

        assert_eq!(classify_exit(status), ExitOutcome::Success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_and_wait_reports_failed_for_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("job_log.txt");
        let log_file = std::fs::File::create(&log_path).unwrap();

        let argv = vec!["/bin/false".to_string()];
        let (mut child, _pid) = spawn(&argv, &log_file).unwrap();
        let status = child.wait().await.unwrap();

        assert_eq!(classify_exit(status), ExitOutcome::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn killed_child_reports_killed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("job_log.txt");
        let log_file = std::fs::File::create(&log_path).unwrap();

        let argv = vec!["/bin/sleep".to_string(), "30".to_string()];
        let (mut child, pid) = spawn(&argv, &log_file).unwrap();

        let trace = mr_sdk::trace::NullTraceWriter;
        mr_sdk::kill_process_tree(pid, &trace);

        let status = child.wait().await.unwrap();
        assert_eq!(classify_exit(status), ExitOutcome::Killed);
    }
}
