use crate::cmd::{hang_up, parse_duration, Connection, ListenArgs};
use crate::exit::{console_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let wait = parse_duration(&args.wait)?;
    let console = conn.dial()?;

    let msg = console
        .listen(wait)
        .map_err(|err| console_error("listen failed", err))?;
    print_message(&msg, format);

    hang_up(console)?;
    Ok(SUCCESS)
}
