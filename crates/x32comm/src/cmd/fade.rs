use x32comm_console::{CancelToken, FadeOutcome};

use crate::cmd::{cancel_on_ctrlc, hang_up, parse_duration, Connection, FadeArgs, FadeToArgs};
use crate::exit::{console_error, CliResult, CANCELLED, SUCCESS};
use crate::output::{print_fade, OutputFormat};

pub fn run(args: FadeArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let console = conn.dial()?;
    let cancel = CancelToken::new();
    cancel_on_ctrlc(&cancel)?;

    let outcome = console
        .fade(args.ch, args.start, args.stop, duration, &cancel)
        .map_err(|err| console_error("fade failed", err))?;
    print_fade(args.ch, outcome, format);

    hang_up(console)?;
    Ok(exit_code(outcome))
}

pub fn run_to(args: FadeToArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let wait = parse_duration(&args.wait)?;
    let console = conn.dial()?;
    let cancel = CancelToken::new();
    cancel_on_ctrlc(&cancel)?;

    let outcome = console
        .fade_to(args.ch, args.stop, duration, wait, &cancel)
        .map_err(|err| console_error("fade failed", err))?;
    print_fade(args.ch, outcome, format);

    hang_up(console)?;
    Ok(exit_code(outcome))
}

fn exit_code(outcome: FadeOutcome) -> i32 {
    match outcome {
        FadeOutcome::Converged { .. } => SUCCESS,
        FadeOutcome::Cancelled { .. } => CANCELLED,
    }
}
