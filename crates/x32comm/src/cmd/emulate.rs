use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::info;
use x32comm_console::Emulator;

use crate::cmd::{install_ctrlc_handler, EmulateArgs};
use crate::exit::{console_error, CliResult, SUCCESS};

pub fn run(args: EmulateArgs) -> CliResult<i32> {
    let emulator = Emulator::bind(args.bind).map_err(|err| console_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    info!(addr = %emulator.local_addr(), "emulating console; Ctrl-C to stop");
    emulator
        .run(&running)
        .map_err(|err| console_error("emulator failed", err))?;

    Ok(SUCCESS)
}
