//! Wraith Prism CLI tool.
//!
//! One-shot configuration of the AMD Wraith Prism cooler's RGB lighting over
//! its USB HID interface. Each positional argument is one quoted command;
//! the whole batch is committed with a single apply frame.

use std::process;
use std::str::SplitWhitespace;

use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches,
    Command,
};
use hidapi::HidApi;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::amd_wraith_prism::{
    Channel, ChannelMap, Effect, Mode, Operation, Rgb, FLAG_FIXED_COLOUR,
};
use crate::error::Error;

mod amd_wraith_prism;
mod error;
mod session;
mod transport;

/// Command grammar shown below the option help.
const COMMAND_GRAMMAR: &str = "\
Commands:
  ring-map <channel>...
          Assign ring LEDs in order, first to fifteenth; missing slots repeat
          the last given channel. Channels: static, cycle, breath, rainbow,
          bounce, chase, swirl, morse, off
  effect <logo|fan> <mode> <speed> <brightness> <red> <green> <blue>
         [<red2> <green2> <blue2> <flags>]
          Set the logo or fan effect. Modes: static, cycle, breath.
          Speed runs from 1 (slowest) to 5 (fastest); static ignores it.
  ring-effect <channel> <speed> <brightness> <red> <green> <blue>
              [<red2> <green2> <blue2> <flags>]
          Configure one of the ring animation channels.
  mirage <red-hz> <green-hz> <blue-hz>
          Program the mirage frequencies, 0 to 65536; 0 disables a colour.
  query-channel <id>
          Print the raw state of channel 0 to 0x0f.

Flags bitmask (hex accepted):
  0x80    random colour
  0x40    blend colours
  0x20    fixed colour (default)
  0x01    reverse order";

fn main() {
    let matches = cli();

    setup_logging(matches.get_flag("verbose"));

    if let Err(err) = run(&matches) {
        eprintln!("\x1b[31mError:\x1b[0m {err}");
        process::exit(1);
    }
}

/// Open the device and run the requested command batch.
fn run(matches: &ArgMatches) -> Result<(), Error> {
    let timeout_ms = match matches.get_one::<u32>("timeout") {
        Some(ms) => *ms as i32,
        None => -1,
    };

    let api = HidApi::new()?;
    let device = transport::open_device(&api, timeout_ms)?;

    let commands = match matches.get_many::<String>("commands") {
        Some(commands) => commands,
        None => return Ok(()),
    };

    session::run(&device, commands.map(|command| parse_command(command)))
}

/// Route frame dumps and command tracing through the chosen verbosity.
fn setup_logging(verbose: bool) {
    let filter = if verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Get clap CLI parameters.
fn cli() -> ArgMatches {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .after_help(COMMAND_GRAMMAR)
        .arg(
            Arg::new("verbose")
                .help("Print transmitted and received frames")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .help("Reply read timeout in milliseconds [default: block forever]")
                .long("timeout")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("commands")
                .help("Commands to run in order, each quoted as one argument")
                .num_args(1..)
                .required(true),
        )
        .get_matches()
}

/// Resolve one command string into a device operation.
fn parse_command(command: &str) -> Result<Operation, Error> {
    debug!("parsing command: {:?}", command);

    let mut args = command.split_whitespace();

    match args.next() {
        Some("ring-map") => parse_ring_map(&mut args),
        Some("effect") => parse_effect(&mut args),
        Some("ring-effect") => parse_ring_effect(&mut args),
        Some("mirage") => parse_mirage(&mut args),
        Some("query-channel") => parse_query_channel(&mut args),
        Some(command) => Err(Error::InvalidParameter(format!("unknown command: {command}"))),
        None => Err(Error::InvalidParameter("empty command".into())),
    }
}

/// Parse the ring channel assignments of a `ring-map` command.
fn parse_ring_map(args: &mut SplitWhitespace) -> Result<Operation, Error> {
    let mut ring = Vec::new();
    for name in args {
        ring.push(Channel::ring_from_name(name)?);
    }

    let map = ChannelMap::new(Channel::Logo, Channel::Fan, &ring)?;
    Ok(Operation::ChannelMap(map))
}

/// Parse an `effect` command for the logo or fan zone.
fn parse_effect(args: &mut SplitWhitespace) -> Result<Operation, Error> {
    let channel = Channel::fixed_from_name(next_arg(args, "channel")?)?;
    let mode = Mode::from_name(next_arg(args, "mode")?)?;
    let level = parse_value(args, "speed", 1, 5)? as u8;
    let brightness = parse_value(args, "brightness", 0, 255)? as u8;
    let colour1 = parse_colour(args)?;
    let colour2 = parse_optional_colour(args)?;
    let flags = parse_optional_value(args, "flags", 255, u32::from(FLAG_FIXED_COLOUR))? as u8;

    let effect = Effect::fixed(channel, mode, level, brightness, colour1, colour2, flags)?;
    Ok(Operation::EffectUpdate(effect))
}

/// Parse a `ring-effect` command.
fn parse_ring_effect(args: &mut SplitWhitespace) -> Result<Operation, Error> {
    let channel = Channel::ring_from_name(next_arg(args, "channel")?)?;
    let level = parse_value(args, "speed", 1, 5)? as u8;
    let brightness = parse_value(args, "brightness", 0, 255)? as u8;
    let colour1 = parse_colour(args)?;
    let colour2 = parse_optional_colour(args)?;
    let flags = parse_optional_value(args, "flags", 255, u32::from(FLAG_FIXED_COLOUR))? as u8;

    let effect = Effect::ring(channel, level, brightness, colour1, colour2, flags)?;
    Ok(Operation::EffectUpdate(effect))
}

/// Parse a `mirage` command's three frequencies.
fn parse_mirage(args: &mut SplitWhitespace) -> Result<Operation, Error> {
    let red_hz = parse_value(args, "red frequency", 0, 65536)?;
    let green_hz = parse_value(args, "green frequency", 0, 65536)?;
    let blue_hz = parse_value(args, "blue frequency", 0, 65536)?;

    Ok(Operation::Mirage { red_hz, green_hz, blue_hz })
}

/// Parse a `query-channel` command.
fn parse_query_channel(args: &mut SplitWhitespace) -> Result<Operation, Error> {
    let channel = parse_value(args, "channel id", 0, 0x0F)? as u8;
    Ok(Operation::QueryChannel(channel))
}

/// Next argument, or an error naming the missing parameter.
fn next_arg<'a>(args: &mut SplitWhitespace<'a>, what: &str) -> Result<&'a str, Error> {
    args.next().ok_or_else(|| Error::InvalidParameter(format!("missing {what}")))
}

/// Next argument parsed as a number inside `min..=max`.
fn parse_value(args: &mut SplitWhitespace, what: &str, min: u32, max: u32) -> Result<u32, Error> {
    checked_value(next_arg(args, what)?, what, min, max)
}

/// Optional trailing argument with a default.
///
/// A present but malformed value is an error rather than the default.
fn parse_optional_value(
    args: &mut SplitWhitespace,
    what: &str,
    max: u32,
    default: u32,
) -> Result<u32, Error> {
    match args.next() {
        Some(arg) => checked_value(arg, what, 0, max),
        None => Ok(default),
    }
}

/// Parse a number and enforce its range.
fn checked_value(arg: &str, what: &str, min: u32, max: u32) -> Result<u32, Error> {
    let value = parse_number(arg)
        .ok_or_else(|| Error::InvalidParameter(format!("unable to parse {what}: {arg}")))?;

    if value < min || value > max {
        return Err(Error::InvalidParameter(format!("{what} {value} out of range {min} to {max}")));
    }

    Ok(value)
}

/// Numbers are decimal or 0x prefixed hex.
fn parse_number(arg: &str) -> Option<u32> {
    match arg.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => arg.parse().ok(),
    }
}

/// Three colour components in red, green, blue order.
fn parse_colour(args: &mut SplitWhitespace) -> Result<Rgb, Error> {
    Ok(Rgb {
        r: parse_value(args, "red", 0, 255)? as u8,
        g: parse_value(args, "green", 0, 255)? as u8,
        b: parse_value(args, "blue", 0, 255)? as u8,
    })
}

/// Optional secondary colour, defaulting to black.
fn parse_optional_colour(args: &mut SplitWhitespace) -> Result<Rgb, Error> {
    match args.clone().next() {
        Some(_) => parse_colour(args),
        None => Ok(Rgb::default()),
    }
}
