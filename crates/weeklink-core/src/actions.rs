use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

const CLIPBOARD_PROGRAMS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip", &[]),
];

#[cfg(target_os = "macos")]
const OPENER: (&str, &[&str]) = ("open", &[]);
#[cfg(target_os = "windows")]
const OPENER: (&str, &[&str]) = ("rundll32", &["url.dll,FileProtocolHandler"]);
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENER: (&str, &[&str]) = ("xdg-open", &[]);

/// Writes the link to the system clipboard through the first clipboard
/// program on this machine that accepts it.
#[instrument(skip(link))]
pub fn copy_to_clipboard(link: &str) -> anyhow::Result<()> {
    if link.is_empty() {
        debug!("nothing to copy");
        return Ok(());
    }
    copy_with(CLIPBOARD_PROGRAMS, link)
}

fn copy_with(programs: &[(&str, &[&str])], link: &str) -> anyhow::Result<()> {
    let mut last_failure = None;
    for (program, args) in programs {
        match pipe_into(program, args, link) {
            Ok(()) => {
                info!(program, "copied link to clipboard");
                return Ok(());
            }
            Err(PipeError::Missing) => {
                debug!(program, "clipboard program not installed");
            }
            Err(PipeError::Failed(err)) => {
                warn!(program, error = %format!("{err:#}"), "clipboard program failed; trying next");
                last_failure = Some(err);
            }
        }
    }

    let tried = programs
        .iter()
        .map(|(program, _)| *program)
        .collect::<Vec<_>>()
        .join(", ");
    match last_failure {
        Some(err) => Err(err.context(format!("no clipboard program succeeded (tried {tried})"))),
        None => Err(anyhow!("no clipboard program found (tried {tried})")),
    }
}

#[instrument(skip(link))]
pub fn open_in_browser(link: &str) -> anyhow::Result<()> {
    if link.is_empty() {
        debug!("nothing to open");
        return Ok(());
    }

    let (program, args) = OPENER;
    let output = Command::new(program)
        .args(args)
        .arg(link)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| format!("failed to run {program}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            warn!(program, stderr = %stderr, "opener failed");
        }
        return Err(anyhow!(
            "{program} exited with status {}",
            exit_code(&output.status)
        ));
    }

    info!(program, "opened link");
    Ok(())
}

enum PipeError {
    Missing,
    Failed(anyhow::Error),
}

fn pipe_into(program: &str, args: &[&str], input: &str) -> Result<(), PipeError> {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(PipeError::Missing),
        Err(err) => {
            return Err(PipeError::Failed(
                anyhow::Error::new(err).context(format!("failed to run {program}")),
            ));
        }
    };

    if let Some(mut stdin) = child.stdin.take()
        && let Err(err) = stdin.write_all(input.as_bytes())
    {
        drop(stdin);
        let _ = child.wait();
        return Err(PipeError::Failed(
            anyhow::Error::new(err).context(format!("failed writing to {program}")),
        ));
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("failed to wait for {program}"))
        .map_err(PipeError::Failed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            warn!(program, stderr = %stderr, "clipboard program failed");
        }
        return Err(PipeError::Failed(anyhow!(
            "{program} exited with status {}",
            exit_code(&output.status)
        )));
    }

    Ok(())
}

fn exit_code(status: &std::process::ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| "unknown".to_string(), |code| code.to_string())
}
