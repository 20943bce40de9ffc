//! ICMPv4 type constants and code descriptions for the message types the
//! prober understands.

pub const ECHO_REPLY: u8 = 0;
pub const DESTINATION_UNREACHABLE: u8 = 3;
pub const REDIRECT: u8 = 5;
pub const ECHO_REQUEST: u8 = 8;
pub const ROUTER_ADVERTISEMENT: u8 = 9;
pub const TIME_EXCEEDED: u8 = 11;
pub const PARAMETER_PROBLEM: u8 = 12;

const DESTINATION_UNREACHABLE_CODES: [&str; 16] = [
    "Net Unreachable",
    "Host Unreachable",
    "Protocol Unreachable",
    "Port Unreachable",
    "Fragmentation Needed and Don't Fragment was Set",
    "Source Route Failed",
    "Destination Network Unknown",
    "Destination Host Unknown",
    "Source Host Isolated",
    "Communication with Destination Network is Administratively Prohibited",
    "Communication with Destination Host is Administratively Prohibited",
    "Destination Network Unreachable for Type of Service",
    "Destination Host Unreachable for Type of Service",
    "Communication Administratively Prohibited",
    "Host Precedence Violation",
    "Precedence cutoff in effect",
];

const REDIRECT_CODES: [&str; 4] = [
    "Redirect Datagram for the Network (or subnet)",
    "Redirect Datagram for the Host",
    "Redirect Datagram for the Type of Service and Network",
    "Redirect Datagram for the Type of Service and Host",
];

const TIME_EXCEEDED_CODES: [&str; 2] = [
    "Time to Live exceeded in Transit",
    "Fragment Reassembly Time Exceeded",
];

const PARAMETER_PROBLEM_CODES: [&str; 3] = [
    "Pointer indicates the error",
    "Missing a Required Option",
    "Bad Length",
];

pub const UNKNOWN_CODE: &str = "Unknown code";
pub const UNKNOWN_TYPE: &str = "error";

/// Returns true for the inbound error types that carry a code table.
pub fn is_known_error(icmp_type: u8) -> bool {
    matches!(
        icmp_type,
        DESTINATION_UNREACHABLE | REDIRECT | ROUTER_ADVERTISEMENT | TIME_EXCEEDED | PARAMETER_PROBLEM
    )
}

/// Describes an inbound ICMP error message.
pub fn describe(icmp_type: u8, icmp_code: u8) -> &'static str {
    let table: &[&'static str] = match icmp_type {
        DESTINATION_UNREACHABLE => &DESTINATION_UNREACHABLE_CODES,
        REDIRECT => &REDIRECT_CODES,
        TIME_EXCEEDED => &TIME_EXCEEDED_CODES,
        PARAMETER_PROBLEM => &PARAMETER_PROBLEM_CODES,
        ROUTER_ADVERTISEMENT => {
            return match icmp_code {
                0 => "Normal router advertisement",
                16 => "Does not route common traffic",
                _ => UNKNOWN_CODE,
            };
        }
        _ => return UNKNOWN_TYPE,
    };
    table.get(icmp_code as usize).copied().unwrap_or(UNKNOWN_CODE)
}
