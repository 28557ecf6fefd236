use std::error::Error;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::hierarchy::AccessKind;

/// One trace line: a kind letter followed by a hex address, e.g.
/// `I 0x004017e0` or `S 7fff5a8c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub kind: AccessKind,
    pub address: u64,
}

static TRACE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([IiLlSs])\s+(?:0x)?([0-9a-fA-F]+)\s*$").expect("failed to compile regex")
});

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidFormat(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidFormat(line) => write!(f, "unrecognized trace line: {:?}", line),
        }
    }
}

impl Error for ParseError {}

impl FromStr for TraceRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TRACE_LINE
            .captures(s)
            .ok_or_else(|| ParseError::InvalidFormat(s.to_string()))?;
        let kind = match &caps[1] {
            "I" | "i" => AccessKind::InstructionFetch,
            "L" | "l" => AccessKind::DataRead,
            _ => AccessKind::DataWrite,
        };
        let address = u64::from_str_radix(&caps[2], 16)
            .map_err(|_| ParseError::InvalidFormat(s.to_string()))?;
        Ok(TraceRecord { kind, address })
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            AccessKind::InstructionFetch => 'I',
            AccessKind::DataRead => 'L',
            AccessKind::DataWrite => 'S',
        };
        write!(f, "{} 0x{:016x}", kind, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_kind() {
        assert_eq!(
            "I 0x004017e0".parse::<TraceRecord>().unwrap(),
            TraceRecord { kind: AccessKind::InstructionFetch, address: 0x004017e0 }
        );
        assert_eq!(
            "L 7fff5a8c".parse::<TraceRecord>().unwrap(),
            TraceRecord { kind: AccessKind::DataRead, address: 0x7fff5a8c }
        );
        assert_eq!(
            "s 10".parse::<TraceRecord>().unwrap(),
            TraceRecord { kind: AccessKind::DataWrite, address: 0x10 }
        );
    }

    #[test]
    fn tolerates_leading_whitespace() {
        assert!("  I 0x00".parse::<TraceRecord>().is_ok());
    }

    #[test]
    fn rejects_garbage() {
        assert!("X 0x10".parse::<TraceRecord>().is_err());
        assert!("I".parse::<TraceRecord>().is_err());
        assert!("I 0xZZ".parse::<TraceRecord>().is_err());
        assert!("".parse::<TraceRecord>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let rec = TraceRecord { kind: AccessKind::DataWrite, address: 0xdeadbeef };
        assert_eq!(rec.to_string().parse::<TraceRecord>().unwrap(), rec);
    }
}
