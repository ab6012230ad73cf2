mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use x32comm_console::DEFAULT_LOCAL_PORT;

use crate::cmd::{AuditFormat, Command, Connection};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "x32comm", version, about = "Control an X32 console over OSC")]
struct Cli {
    /// Console address (host:port, or host for port 10023).
    #[arg(long, env = "X32COMM_DEST", global = true)]
    dest: Option<String>,

    /// Local UDP port to send from.
    #[arg(long, short = 'p', env = "X32COMM_PORT", default_value_t = DEFAULT_LOCAL_PORT, global = true)]
    port: u16,

    /// Directory for per-session audit logs (default: system temp dir).
    #[arg(long, value_name = "DIR", global = true)]
    audit_dir: Option<PathBuf>,

    /// Audit log layout.
    #[arg(long, value_name = "FORMAT", default_value = "structured", global = true)]
    audit_format: AuditFormat,

    /// Do not write an audit log.
    #[arg(long, global = true, conflicts_with = "audit_dir")]
    no_audit: bool,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let conn = Connection {
        dest: cli.dest,
        port: cli.port,
        audit_dir: cli.audit_dir,
        audit_format: cli.audit_format,
        no_audit: cli.no_audit,
    };
    let result = cmd::run(cli.command, &conn, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
