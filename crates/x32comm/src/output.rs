use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use x32comm_console::FadeOutcome;
use x32comm_osc::{Arg, Message};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum ArgValue<'a> {
    Int(i32),
    Float(f32),
    Str(&'a str),
}

impl<'a> From<&'a Arg> for ArgValue<'a> {
    fn from(arg: &'a Arg) -> Self {
        match arg {
            Arg::Int(v) => ArgValue::Int(*v),
            Arg::Float(v) => ArgValue::Float(*v),
            Arg::Str(v) => ArgValue::Str(v),
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    address: &'a str,
    tags: String,
    args: Vec<ArgValue<'a>>,
    size: usize,
    packet: String,
}

impl<'a> MessageOutput<'a> {
    fn new(msg: &'a Message) -> Self {
        Self {
            address: msg.address(),
            tags: msg.type_tags(),
            args: msg.args().iter().map(ArgValue::from).collect(),
            size: msg.raw().map_or(0, |raw| raw.len()),
            packet: msg.describe(),
        }
    }
}

pub fn print_message(msg: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&MessageOutput::new(msg)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["INDEX", "TYPE", "VALUE"]);
            for (i, arg) in msg.args().iter().enumerate() {
                table.add_row(vec![i.to_string(), arg.tag().name().to_string(), arg.to_string()]);
            }
            println!("{}", msg.address());
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let args: Vec<String> = msg.args().iter().map(ToString::to_string).collect();
            println!(
                "address={} tags=,{} args=[{}]",
                msg.address(),
                msg.type_tags(),
                args.join(", ")
            );
        }
        OutputFormat::Raw => print_raw(msg.raw().map_or(&[][..], |raw| raw.as_ref())),
    }
}

#[derive(Serialize)]
struct LevelOutput {
    channel: u32,
    level: f32,
    percent: f32,
}

pub fn print_level(channel: u32, level: f32, format: OutputFormat) {
    let out = LevelOutput {
        channel,
        level,
        percent: level * 100.0,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CHANNEL", "LEVEL", "PERCENT"]);
            table.add_row(vec![
                out.channel.to_string(),
                out.level.to_string(),
                format!("{:.1}", out.percent),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("channel={} level={}", out.channel, out.level),
        OutputFormat::Raw => println!("{}", out.level),
    }
}

#[derive(Serialize)]
struct FadeOutput {
    channel: u32,
    outcome: &'static str,
    steps: usize,
}

pub fn print_fade(channel: u32, outcome: FadeOutcome, format: OutputFormat) {
    let out = FadeOutput {
        channel,
        outcome: match outcome {
            FadeOutcome::Converged { .. } => "converged",
            FadeOutcome::Cancelled { .. } => "cancelled",
        },
        steps: outcome.steps(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CHANNEL", "OUTCOME", "STEPS"]);
            table.add_row(vec![
                out.channel.to_string(),
                out.outcome.to_string(),
                out.steps.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => println!(
            "channel={} outcome={} steps={}",
            out.channel, out.outcome, out.steps
        ),
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
