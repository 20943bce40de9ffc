//! Console rendering of ping and traceroute results.

use crate::ping::{PingProbe, PingSummary};
use crate::probe::{ProbeFailure, ProbeOutcome};
use crate::tracer::TraceHop;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use std::io::{self, Write};
use std::net::Ipv4Addr;

const TIMED_OUT: &str = "  *        *        *        *        *    Request timed out.";

fn ms(rtt: Option<f64>) -> String {
    rtt.map_or_else(|| "*".to_string(), |rtt| format!("{:.0} ms", rtt))
}

fn warning(out: &mut impl Write, text: String) -> io::Result<()> {
    queue!(out, SetForegroundColor(Color::Red), Print(text), ResetColor, Print("\n"))
}

pub fn write_ping_header(out: &mut impl Write, host: &str, target: Ipv4Addr) -> io::Result<()> {
    writeln!(out, "Pinging ({}) {}", host, target)
}

pub fn write_ping_probe(out: &mut impl Write, probe: &PingProbe) -> io::Result<()> {
    let request = &probe.request;
    match &probe.outcome {
        ProbeOutcome::EchoReplyReceived { rtt, validity, source, reply } => {
            writeln!(
                out,
                "  TTL={}    RTT={:.0} ms    Type={}    Code={}        Identifier={}    Sequence Number={}    {}",
                probe.ttl, rtt, reply.icmp_type, reply.icmp_code, reply.identifier, reply.sequence_number, source
            )?;
            writeln!(
                out,
                "  Valid Reply={}    Sent Identifier={}    Sent Seq Number={}",
                validity.is_valid(),
                request.identifier(),
                request.sequence_number()
            )?;
            writeln!(out, "  Sent Data={}      Reply Data={}", request.payload(), reply.payload)?;
            for field in validity.mismatches() {
                warning(out, format!("ERROR: Echo reply {} does not match sent {}", field, field))?;
            }
        }
        ProbeOutcome::ErrorReceived { icmp_type, icmp_code, description, source, rtt, .. } => {
            writeln!(
                out,
                "  TTL={}    RTT={}    Type={}    Code={}    {}",
                probe.ttl,
                ms(*rtt),
                icmp_type,
                icmp_code,
                source
            )?;
            warning(out, format!("  Error description: {}", description))?;
        }
        ProbeOutcome::TimedOut => writeln!(out, "{}", TIMED_OUT)?,
        ProbeOutcome::Failed(failure) => warning(out, format!("  Probe failed: {}", describe_failure(failure)))?,
    }
    out.flush()
}

fn describe_failure(failure: &ProbeFailure) -> String {
    match failure {
        ProbeFailure::Malformed { len } => format!("malformed reply ({} bytes)", len),
        ProbeFailure::Transport(reason) => reason.clone(),
    }
}

pub fn write_ping_summary(out: &mut impl Write, summary: &PingSummary) -> io::Result<()> {
    let avg = summary
        .avg_rtt
        .map_or_else(|| "*".to_string(), |avg| format!("{:.1} ms", avg));
    writeln!(out)?;
    writeln!(
        out,
        "Min RTT={}    Max RTT={}    Avg RTT={}    Packet Loss Rate={:.1} %",
        ms(summary.min_rtt),
        ms(summary.max_rtt),
        avg,
        summary.loss_rate * 100.0
    )?;
    out.flush()
}

pub fn write_trace_header(out: &mut impl Write, host: &str, target: Ipv4Addr, max_hops: u8) -> io::Result<()> {
    writeln!(out, "Tracing route to ({}) {}", host, target)?;
    writeln!(out, "over a max of {} hops:", max_hops)?;
    writeln!(out)
}

pub fn write_hop(out: &mut impl Write, hop: &TraceHop) -> io::Result<()> {
    writeln!(
        out,
        "Hop {}\t{}\t{}\t{}\t {}",
        hop.ttl,
        ms(hop.rtts[0]),
        ms(hop.rtts[1]),
        ms(hop.rtts[2]),
        hop.address.as_deref().unwrap_or("Request timed out.")
    )?;
    if let Some(error) = &hop.error {
        warning(
            out,
            format!("Error: Type={}\tCode={}\tDesc={}", error.icmp_type, error.icmp_code, error.description),
        )?;
    }
    out.flush()
}

pub fn write_trace_footer(out: &mut impl Write, interrupted: bool) -> io::Result<()> {
    if interrupted {
        writeln!(out, "Trace interrupted.")
    } else {
        writeln!(out, "Trace complete.")
    }
}
