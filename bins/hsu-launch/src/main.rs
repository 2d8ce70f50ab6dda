use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::thread::JoinHandle;
use tracing::{error, info, warn};

use hsu_process::{ExitStatus, LaunchRequest, ProcMode, ProcessHandle, StdStream};

/// HSU Launch - run one process with explicit stream wiring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Launch request file (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Capture the child's stdout into the log
    #[arg(long)]
    pipe_stdout: bool,

    /// Capture the child's stderr into the log
    #[arg(long)]
    pipe_stderr: bool,

    /// Do not prepend the executable path to the arguments
    #[arg(long)]
    no_path: bool,

    /// Environment entry (KEY=VALUE); replaces the inherited environment
    #[arg(short, long = "env", value_name = "KEY=VALUE")]
    envs: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Executable path followed by its arguments
    #[arg(last = true)]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    let request = build_request(&args)?;
    info!("Launching {} {:?}", request.executable_path, request.arguments);

    let mut handle = ProcessHandle::spawn(&request, None)
        .with_context(|| format!("Failed to launch {}", request.executable_path))?;
    info!("Started pid {}", handle.raw_pid());

    let forwarders: Vec<_> = [
        (StdStream::Stdout, handle.take_stdout()),
        (StdStream::Stderr, handle.take_stderr()),
    ]
    .into_iter()
    .filter_map(|(stream, pipe)| pipe.map(|pipe| forward_lines(stream, pipe)))
    .collect();

    let status = handle.join();

    for forwarder in forwarders {
        if forwarder.join().is_err() {
            warn!("Output forwarder panicked");
        }
    }

    match status {
        Some(status) => {
            if status.is_setup_failure() {
                error!("Child exited with {} (setup failure or program exit code)", status);
            } else {
                info!("Child exited with {}", status);
            }
            std::process::exit(shell_code(status));
        }
        None => bail!("Child {} was not reaped", request.executable_path),
    }
}

fn build_request(args: &Args) -> Result<LaunchRequest> {
    let mut request = match (&args.config, args.command.split_first()) {
        (Some(config), None) => LaunchRequest::load_from_file(config)
            .with_context(|| format!("Failed to load {}", config))?,
        (None, Some((path, rest))) => LaunchRequest::new(path.as_str()).args(rest.iter().cloned()),
        (Some(_), Some(_)) => bail!("Pass either --config or a command, not both"),
        (None, None) => bail!("No command given; pass --config FILE or -- PATH [ARGS...]"),
    };

    // Command-line switches add to whatever the config file asked for.
    for (enabled, flag) in [
        (args.pipe_stdout, ProcMode::PIPE_STDOUT),
        (args.pipe_stderr, ProcMode::PIPE_STDERR),
        (args.no_path, ProcMode::NO_PATH),
    ] {
        if enabled {
            request.mode |= flag;
        }
    }

    if !args.envs.is_empty() {
        request = request.envs(args.envs.iter().cloned());
    }

    request.validate()?;
    Ok(request)
}

fn forward_lines(stream: StdStream, pipe: File) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(pipe).lines() {
            match line {
                Ok(line) if stream == StdStream::Stderr => warn!(%stream, "{}", line),
                Ok(line) => info!(%stream, "{}", line),
                Err(e) => {
                    warn!("Stopped reading child {}: {}", stream, e);
                    break;
                }
            }
        }
    })
}

/// Exit code following the shell convention of 128 + signal number.
fn shell_code(status: ExitStatus) -> i32 {
    match status {
        ExitStatus::Exited(code) => code,
        ExitStatus::Signaled { signal, .. } => 128 + signal,
    }
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    Ok(())
}
