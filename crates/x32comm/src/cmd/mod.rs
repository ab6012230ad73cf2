use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use tracing::debug;
use x32comm_audit::DrainFormat;
use x32comm_console::{AuditConfig, CancelToken, Console, ConsoleConfig, CONSOLE_PORT};

use crate::exit::{console_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod emulate;
pub mod fade;
pub mod get;
pub mod listen;
pub mod set;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a message expecting no response.
    Set(SetArgs),
    /// Set a channel fader to a level (0-100).
    SetFader(SetFaderArgs),
    /// Send an address and print the reply.
    Get(GetArgs),
    /// Print a channel fader level.
    GetFader(GetFaderArgs),
    /// Wait for one message and print it.
    Listen(ListenArgs),
    /// Fade a channel from one level to another.
    Fade(FadeArgs),
    /// Fade a channel from its current level.
    FadeTo(FadeToArgs),
    /// Answer fader messages like a console, until Ctrl-C.
    Emulate(EmulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// How to reach the console; shared by every command that dials.
#[derive(Debug, Clone)]
pub struct Connection {
    pub dest: Option<String>,
    pub port: u16,
    pub audit_dir: Option<PathBuf>,
    pub audit_format: AuditFormat,
    pub no_audit: bool,
}

pub fn run(command: Command, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Set(args) => set::run(args, conn),
        Command::SetFader(args) => set::run_fader(args, conn),
        Command::Get(args) => get::run(args, conn, format),
        Command::GetFader(args) => get::run_fader(args, conn, format),
        Command::Listen(args) => listen::run(args, conn, format),
        Command::Fade(args) => fade::run(args, conn, format),
        Command::FadeTo(args) => fade::run_to(args, conn, format),
        Command::Emulate(args) => emulate::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum AuditFormat {
    Raw,
    #[default]
    Structured,
}

impl From<AuditFormat> for DrainFormat {
    fn from(format: AuditFormat) -> Self {
        match format {
            AuditFormat::Raw => DrainFormat::Raw,
            AuditFormat::Structured => DrainFormat::Structured,
        }
    }
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// OSC address to send to.
    #[arg(long, short = 'm')]
    pub message: String,
    /// Float argument; omit to send the address with no arguments.
    #[arg(long, short = 'f', allow_negative_numbers = true)]
    pub float: Option<f64>,
}

#[derive(Args, Debug)]
pub struct SetFaderArgs {
    /// Channel number (1-99).
    #[arg(value_parser = clap::value_parser!(u32).range(1..=99))]
    pub channel: u32,
    /// Level as a percentage (0-100).
    #[arg(value_parser = parse_percent)]
    pub level: f32,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// OSC address to query; `~` is sent as a zero byte.
    #[arg(long, short = 'm')]
    pub message: String,
    /// How long to wait for the reply (e.g. 9s, 500ms).
    #[arg(long, default_value = "9s")]
    pub wait: String,
}

#[derive(Args, Debug)]
pub struct GetFaderArgs {
    /// Channel number (1-99).
    #[arg(value_parser = clap::value_parser!(u32).range(1..=99))]
    pub channel: u32,
    /// How long to wait for the reply (e.g. 9s, 500ms).
    #[arg(long, default_value = "9s")]
    pub wait: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// How long to wait for a message (e.g. 9s, 500ms).
    #[arg(long, default_value = "9s")]
    pub wait: String,
}

#[derive(Args, Debug)]
pub struct FadeArgs {
    /// Channel number (1-99).
    #[arg(long, short = 'c', value_parser = clap::value_parser!(u32).range(1..=99))]
    pub ch: u32,
    /// Start level (0-100).
    #[arg(long, short = 'a', value_parser = parse_percent)]
    pub start: f32,
    /// Stop level (0-100).
    #[arg(long, short = 'b', value_parser = parse_percent)]
    pub stop: f32,
    /// Fade duration (e.g. 2s, 750ms).
    #[arg(long, short = 'd', default_value = "2s")]
    pub duration: String,
}

#[derive(Args, Debug)]
pub struct FadeToArgs {
    /// Channel number (1-99).
    #[arg(long, short = 'c', value_parser = clap::value_parser!(u32).range(1..=99))]
    pub ch: u32,
    /// Stop level (0-100).
    #[arg(long, short = 'b', value_parser = parse_percent)]
    pub stop: f32,
    /// Fade duration (e.g. 2s, 750ms).
    #[arg(long, short = 'd', default_value = "2s")]
    pub duration: String,
    /// How long to wait for the current level.
    #[arg(long, default_value = "9s")]
    pub wait: String,
}

#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Address to answer on.
    #[arg(long, default_value = "0.0.0.0:10023")]
    pub bind: SocketAddr,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a 0-100 percentage into a 0.0-1.0 level.
fn parse_percent(input: &str) -> Result<f32, String> {
    let value: f32 = input
        .trim()
        .parse()
        .map_err(|_| format!("invalid level: {input}"))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("level must be between 0 and 100, got {value}"));
    }
    Ok(value / 100.0)
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Resolve `host:port`, or a bare host on the console port.
fn resolve_dest(dest: &str) -> CliResult<SocketAddr> {
    let resolved = match dest.to_socket_addrs() {
        Ok(addrs) => addrs.collect::<Vec<_>>(),
        Err(_) => (dest, CONSOLE_PORT)
            .to_socket_addrs()
            .map_err(|err| CliError::new(USAGE, format!("cannot resolve --dest {dest}: {err}")))?
            .collect(),
    };
    // The socket binds IPv4 by default, so prefer a matching peer.
    resolved
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| resolved.first())
        .copied()
        .ok_or_else(|| CliError::new(USAGE, format!("--dest {dest} resolved to no addresses")))
}

impl Connection {
    pub fn config(&self) -> CliResult<ConsoleConfig> {
        let dest = self.dest.as_deref().ok_or_else(|| {
            CliError::new(USAGE, "--dest (or X32COMM_DEST) is required for this command")
        })?;
        let remote = resolve_dest(dest)?;

        let audit = if self.no_audit {
            None
        } else {
            Some(AuditConfig {
                dir: self
                    .audit_dir
                    .clone()
                    .unwrap_or_else(std::env::temp_dir),
                format: self.audit_format.into(),
            })
        };

        Ok(ConsoleConfig::new(remote)
            .with_local(SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)))
            .with_audit(audit))
    }

    pub fn dial(&self) -> CliResult<Console> {
        let config = self.config()?;
        debug!(remote = %config.remote, local = %config.local, "dialing");
        Console::dial(config).map_err(|err| console_error("dial failed", err))
    }
}

/// Close the console, reporting teardown failures.
pub(crate) fn hang_up(mut console: Console) -> CliResult<()> {
    console
        .close()
        .map_err(|err| console_error("close failed", err))
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Cancel `token` on Ctrl-C.
pub(crate) fn cancel_on_ctrlc(token: &CancelToken) -> CliResult<()> {
    let token = token.clone();
    ctrlc::set_handler(move || token.cancel())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
