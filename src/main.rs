use clap::{arg, command, value_parser, Arg, ArgMatches};
use std::time::Duration;

use ristretto::controller::{ControllerConfig, MachineController};
use ristretto::facade::{render, PowerSwitch, StatusTextSensor};
use ristretto::link::{open_serial, LinkTransport, SimulatedMachine, Transport, DEFAULT_BAUD_RATE};
use ristretto::{display, info, logging, operations};

fn init_logging(trace: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    if trace {
        builder.filter_module("ristretto", log::LevelFilter::Trace);
        logging::enable_tracing();
    }
    builder.init();
}

fn controller_config(cmd: &ArgMatches) -> ControllerConfig {
    let millis = |id: &str| cmd.get_one::<u64>(id).copied().map(Duration::from_millis);
    let defaults = ControllerConfig::default();
    ControllerConfig {
        ack_timeout: millis("ack-timeout-ms").unwrap_or(defaults.ack_timeout),
        confirm_timeout: millis("confirm-timeout-ms").unwrap_or(defaults.confirm_timeout),
        command_attempts: cmd
            .get_one::<u32>("attempts")
            .copied()
            .unwrap_or(defaults.command_attempts),
        command_repeats: cmd
            .get_one::<usize>("repeats")
            .copied()
            .unwrap_or(defaults.command_repeats),
        ..defaults
    }
}

fn open_transport(
    cmd: &ArgMatches,
    poll_interval: Duration,
) -> Result<Box<dyn Transport>, Box<dyn std::error::Error>> {
    if cmd.get_flag("simulate") {
        info!("Using a simulated machine");
        return Ok(Box::new(LinkTransport::new(SimulatedMachine::new(
            poll_interval * 4,
        ))));
    }
    let port = cmd
        .get_one::<String>("port")
        .ok_or("either --port or --simulate is required")?;
    let baud = cmd
        .get_one::<u32>("baud")
        .copied()
        .unwrap_or(DEFAULT_BAUD_RATE);
    Ok(Box::new(open_serial(port, baud)?))
}

fn link_args() -> Vec<Arg> {
    vec![
        arg!(--port <path> "Serial port the machine is attached to").required(false),
        arg!(--baud <rate> "Baud rate of the serial port")
            .value_parser(value_parser!(u32))
            .default_value(DEFAULT_BAUD_RATE.to_string()),
        arg!(--simulate "Talk to a simulated machine instead of a serial port"),
        arg!(--"poll-ms" <millis> "How often to poll the link")
            .value_parser(value_parser!(u64))
            .default_value("100"),
        arg!(--"ack-timeout-ms" <millis> "How long to wait for a command to be acknowledged")
            .value_parser(value_parser!(u64))
            .required(false),
        arg!(--"confirm-timeout-ms" <millis> "How long to wait for the machine to power up")
            .value_parser(value_parser!(u64))
            .required(false),
        arg!(--attempts <count> "Transmissions of a command before giving up on its ack")
            .value_parser(value_parser!(u32))
            .required(false),
        arg!(--repeats <count> "Copies of each command telegram written per transmission")
            .value_parser(value_parser!(usize))
            .required(false),
        arg!(--trace "Trace packets and shutdown to the log"),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = command!()
        .subcommand_required(true)
        .subcommand(
            command!("monitor")
                .about("Monitor the status of the machine")
                .args(link_args()),
        )
        .subcommand(
            command!("power")
                .about("Turn the machine on or off")
                .arg(
                    arg!(<state> "Whether the machine should be on or off")
                        .value_parser(["on", "off"]),
                )
                .arg(arg!(--"no-clean" "Skip the rinse cycle after powering on"))
                .args(link_args()),
        )
        .get_matches();

    let Some((name, cmd)) = matches.subcommand() else {
        return Ok(());
    };

    init_logging(cmd.get_flag("trace"));
    display::initialize_display();

    let poll_interval = Duration::from_millis(cmd.get_one::<u64>("poll-ms").copied().unwrap_or(100));
    let controller = MachineController::new(controller_config(cmd));
    controller.open(open_transport(cmd, poll_interval)?);

    match name {
        "monitor" => {
            let sensor = StatusTextSensor::new();
            controller.add_status_sensor(&sensor);
            operations::monitor(controller, sensor, poll_interval).await?;
        }
        "power" => {
            let turn_on = cmd.get_one::<String>("state").map(String::as_str) == Some("on");
            let switch = PowerSwitch::new(controller.clone(), !cmd.get_flag("no-clean"));
            controller.register_power_switch(&switch)?;
            let status = operations::power(controller, &switch, turn_on, poll_interval).await?;
            info!("Machine is {}", render(status));
        }
        _ => {}
    }

    Ok(())
}
