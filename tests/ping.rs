mod common;

use common::*;
use icmp_probe::{Error, Interrupt, PingConfig, Pinger, ProbeFailure, ProbeOutcome};
use std::time::Duration;

fn config(count: u16) -> PingConfig {
    PingConfig { count, timeout: Duration::from_millis(200), ttl: 255 }
}

fn close_to(value: Option<f64>, expected: f64) -> bool {
    value.is_some_and(|v| (v - expected).abs() < 5.0)
}

#[test]
fn test_two_of_four_replies() {
    let network = FakeNetwork::new(|_, request| match sequence_of(request) {
        0 => from(TARGET, echo_reply_aged(request, Duration::from_millis(10))),
        2 => from(TARGET, echo_reply_aged(request, Duration::from_millis(30))),
        _ => None,
    });
    let log = network.log();
    let pinger = Pinger::new(network, StaticResolver::new(), config(4)).with_identifier(0x4d2);

    let report = pinger.ping("target.example").unwrap();

    let summary = &report.summary;
    assert_eq!(summary.sent, 4);
    assert_eq!(summary.received, 2);
    assert!(close_to(summary.min_rtt, 10.0), "{summary:?}");
    assert!(close_to(summary.max_rtt, 30.0), "{summary:?}");
    assert!(close_to(summary.avg_rtt, 20.0), "{summary:?}");
    assert_eq!(summary.loss_rate, 0.5);

    assert_eq!(report.target, TARGET);
    assert!(report.probes[0].outcome.is_valid_reply());
    assert_eq!(report.probes[1].outcome, ProbeOutcome::TimedOut);
    assert!(!report.interrupted);

    let log = log.borrow();
    assert_eq!(log.opened, 4);
    assert_eq!(log.closed, 4);
    let sequences: Vec<u16> = log.sent.iter().map(|(_, p)| sequence_of(p)).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3]);
    assert!(log.sent.iter().all(|(ttl, p)| *ttl == 255 && identifier_of(p) == 0x4d2));
}

#[test]
fn test_probe_callback_sees_every_probe() {
    let network = FakeNetwork::new(|_, request| from(TARGET, echo_reply(request)));
    let pinger = Pinger::new(network, StaticResolver::new(), config(3));

    let target = pinger.prepare("target.example").unwrap();
    let mut seen = Vec::new();
    let report = pinger.ping_address("target.example", target, |probe| {
        seen.push(probe.request.sequence_number())
    });

    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(report.summary.received, 3);
    assert_eq!(report.summary.loss_rate, 0.0);
}

#[test]
fn test_unresolved_host_sends_nothing() {
    let network = FakeNetwork::new(|_, _| None);
    let log = network.log();
    let pinger = Pinger::new(network, StaticResolver::new(), config(4));

    let err = pinger.ping("nowhere.invalid").unwrap_err();

    assert!(matches!(err, Error::UnresolvedHost { ref host, .. } if host == "nowhere.invalid"));
    assert_eq!(log.borrow().opened, 0);
    assert!(log.borrow().sent.is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let pinger = Pinger::new(FakeNetwork::new(|_, _| None), StaticResolver::new(), config(0));
    assert!(matches!(pinger.ping("target.example"), Err(Error::Config(_))));
}

#[test]
fn test_mismatched_reply_counts_but_is_not_valid() {
    let network = FakeNetwork::new(|_, request| {
        let mut reply = echo_reply(request);
        reply.truncate(reply.len() - 1);
        from(TARGET, reply)
    });
    let pinger = Pinger::new(network, StaticResolver::new(), config(1));

    let report = pinger.ping("target.example").unwrap();

    assert_eq!(report.summary.received, 1);
    match &report.probes[0].outcome {
        ProbeOutcome::EchoReplyReceived { validity, .. } => {
            assert!(validity.identifier && validity.sequence);
            assert!(!validity.payload);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_malformed_and_error_replies_are_losses() {
    let network = FakeNetwork::new(|_, request| match sequence_of(request) {
        0 => from(TARGET, vec![0, 0, 0, 0]),
        1 => from(router(1), icmp_error(3, 1, request)),
        _ => from(TARGET, echo_reply(request)),
    });
    let log = network.log();
    let pinger = Pinger::new(network, StaticResolver::new(), config(3));

    let report = pinger.ping("target.example").unwrap();

    assert_eq!(report.probes[0].outcome, ProbeOutcome::Failed(ProbeFailure::Malformed { len: 4 }));
    match &report.probes[1].outcome {
        ProbeOutcome::ErrorReceived { description, quoted, .. } => {
            assert_eq!(*description, "Host Unreachable");
            assert_eq!(quoted.map(|q| q.sequence_number), Some(1));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(report.summary.sent, 3);
    assert_eq!(report.summary.received, 1);
    assert_eq!(log.borrow().closed, 3);
}

#[test]
fn test_interrupt_stops_between_probes() {
    let interrupt = Interrupt::new();
    let trigger = interrupt.clone();
    let network = FakeNetwork::new(move |_, request| {
        if sequence_of(request) == 1 {
            trigger.trigger();
        }
        from(TARGET, echo_reply(request))
    });
    let pinger = Pinger::new(network, StaticResolver::new(), config(4)).with_interrupt(interrupt);

    let report = pinger.ping("target.example").unwrap();

    assert!(report.interrupted);
    assert_eq!(report.probes.len(), 2);
    assert_eq!(report.summary.sent, 2);
}

#[test]
fn test_transport_failures_release_channels_and_run_continues() {
    let network = FakeNetwork::new(|_, request| from(TARGET, echo_reply(request)))
        .refusing_open(0)
        .failing_send(2);
    let log = network.log();
    let pinger = Pinger::new(network, StaticResolver::new(), config(4));

    let report = pinger.ping("target.example").unwrap();

    let failed =
        |i: usize| matches!(report.probes[i].outcome, ProbeOutcome::Failed(ProbeFailure::Transport(_)));
    assert!(failed(0));
    assert!(report.probes[1].outcome.is_valid_reply());
    assert!(failed(2));
    assert!(report.probes[3].outcome.is_valid_reply());
    assert_eq!(report.summary.sent, 4);
    assert_eq!(report.summary.received, 2);
    assert_eq!(report.summary.loss_rate, 0.5);

    let log = log.borrow();
    assert_eq!(log.attempts, 4);
    assert_eq!(log.opened, 3);
    assert_eq!(log.closed, log.opened);
    let sequences: Vec<u16> = log.sent.iter().map(|(_, p)| sequence_of(p)).collect();
    assert_eq!(sequences, vec![1, 3]);
}

#[test]
fn test_error_about_another_request_is_a_loss() {
    let network = FakeNetwork::new(|_, _| from(router(1), foreign_time_exceeded()));
    let pinger = Pinger::new(network, StaticResolver::new(), config(2));

    let report = pinger.ping("target.example").unwrap();

    assert!(report.probes.iter().all(|probe| probe.outcome == ProbeOutcome::TimedOut));
    assert_eq!(report.summary.received, 0);
}
