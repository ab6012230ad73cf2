use tracing::info;
use x32comm_osc::Message;

use crate::cmd::{hang_up, Connection, SetArgs, SetFaderArgs};
use crate::exit::{console_error, CliResult, SUCCESS};

pub fn run(args: SetArgs, conn: &Connection) -> CliResult<i32> {
    let console = conn.dial()?;
    let sent = match args.float {
        Some(value) => console.compose(&args.message, value),
        None => console.send(&mut Message::new(args.message.as_str())),
    };
    sent.map_err(|err| console_error("send failed", err))?;
    info!(address = %args.message, value = ?args.float, "sent");

    hang_up(console)?;
    Ok(SUCCESS)
}

pub fn run_fader(args: SetFaderArgs, conn: &Connection) -> CliResult<i32> {
    let console = conn.dial()?;
    console
        .set_fader(args.channel, args.level)
        .map_err(|err| console_error("set fader failed", err))?;
    info!(channel = args.channel, level = args.level, "fader set");

    hang_up(console)?;
    Ok(SUCCESS)
}
