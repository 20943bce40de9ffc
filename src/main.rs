use clap::{Args, Parser, Subcommand};
use icmp_probe::logging::{LogConfig, init_logging};
use icmp_probe::{
    DnsResolver, Interrupt, PingConfig, Pinger, PnetTransport, Result, TraceConfig, Tracer, report,
};
use std::io;
use std::process;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level: error, warn, info, debug, trace (RUST_LOG overrides)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Log format: pretty, compact, json
    #[arg(long, default_value = "compact", global = true)]
    log_format: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send echo requests and report round-trip times
    Ping {
        /// Hostname or IPv4 address
        target: String,

        /// Number of echo requests to send
        #[arg(short, long, default_value_t = 4)]
        count: u16,

        /// IP time to live of outgoing requests
        #[arg(short, long, default_value_t = 255)]
        ttl: u8,

        #[command(flatten)]
        wait: Wait,
    },
    /// Walk the path to a host one TTL at a time
    Traceroute {
        /// Hostname or IPv4 address
        target: String,

        /// Maximum number of hops to probe
        #[arg(short, long, default_value_t = 30)]
        max_hops: u8,

        /// Do not resolve hop addresses to hostnames
        #[arg(short, long)]
        numeric: bool,

        #[command(flatten)]
        wait: Wait,
    },
}

#[derive(Args, Debug)]
struct Wait {
    /// Seconds to wait for each reply
    #[arg(short = 'W', long = "timeout", default_value = "30", value_parser = parse_seconds)]
    timeout: Duration,
}

fn parse_seconds(value: &str) -> std::result::Result<Duration, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("{e}"))
}

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig { level: cli.log_level, format: cli.log_format });

    let interrupt = Interrupt::new();
    let result = interrupt.install_ctrlc().and_then(|_| match cli.command {
        Command::Ping { target, count, ttl, wait } => {
            let config = PingConfig { count, timeout: wait.timeout, ttl };
            run_ping(&target, config, interrupt)
        }
        Command::Traceroute { target, max_hops, numeric, wait } => {
            let config = TraceConfig { max_hops, timeout: wait.timeout, resolve_hops: !numeric };
            run_traceroute(&target, config, interrupt)
        }
    });

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        process::exit(1);
    }
}

fn run_ping(target: &str, config: PingConfig, interrupt: Interrupt) -> Result<()> {
    let pinger = Pinger::new(PnetTransport, DnsResolver, config).with_interrupt(interrupt);
    let mut stdout = io::stdout();

    let address = pinger.prepare(target)?;
    report::write_ping_header(&mut stdout, target, address)?;

    let mut print_error = None;
    let report = pinger.ping_address(target, address, |probe| {
        if let Err(e) = report::write_ping_probe(&mut stdout, probe) {
            print_error.get_or_insert(e);
        }
    });
    if let Some(e) = print_error {
        return Err(e.into());
    }

    report::write_ping_summary(&mut stdout, &report.summary)?;
    Ok(())
}

fn run_traceroute(target: &str, config: TraceConfig, interrupt: Interrupt) -> Result<()> {
    let tracer = Tracer::new(PnetTransport, DnsResolver, config).with_interrupt(interrupt);
    let mut stdout = io::stdout();

    let mut route = tracer.trace(target)?;
    report::write_trace_header(&mut stdout, target, route.target(), tracer.max_hops())?;
    for hop in route.by_ref() {
        report::write_hop(&mut stdout, &hop)?;
    }
    report::write_trace_footer(&mut stdout, route.interrupted())?;
    Ok(())
}
