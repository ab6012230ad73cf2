use crate::cmd::{hang_up, parse_duration, Connection, GetArgs, GetFaderArgs};
use crate::exit::{console_error, CliResult, SUCCESS};
use crate::output::{print_level, print_message, OutputFormat};

pub fn run(args: GetArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let wait = parse_duration(&args.wait)?;
    let console = conn.dial()?;

    let reply = console
        .query(&args.message, wait)
        .map_err(|err| console_error("query failed", err))?;
    print_message(&reply, format);

    hang_up(console)?;
    Ok(SUCCESS)
}

pub fn run_fader(args: GetFaderArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let wait = parse_duration(&args.wait)?;
    let console = conn.dial()?;

    let level = console
        .get_fader(args.channel, wait)
        .map_err(|err| console_error("get fader failed", err))?;
    print_level(args.channel, level, format);

    hang_up(console)?;
    Ok(SUCCESS)
}
