use std::str::FromStr;
use thiserror::Error;

/// A user event typed into the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    Toggle,
    /// Duration and gap submitted together; `None` leaves a field as it is
    Timing {
        duration_ms: Option<u32>,
        gap_ms: Option<u32>,
    },
    Intensity(u8),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("'{command}' expects {expected}")]
    Arguments {
        command: &'static str,
        expected: &'static str,
    },

    #[error("'{0}' is not a whole number")]
    Number(String),
}

pub const HELP: &str = "\
Commands:
  toggle                      switch EMDR on or off
  timing <duration|-> <gap|-> set pulse duration and gap in ms ('-' keeps a value)
  duration <ms>               set pulse duration
  gap <ms>                    set gap between pulses
  intensity <1-99>            set rumble intensity in percent
  status                      show the current session
  help                        show this list
  quit                        stop and exit";

// '-' stands for an empty field
fn parse_field(raw: &str) -> Result<Option<u32>, ParseError> {
    if raw == "-" {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| ParseError::Number(raw.to_string()))
}

impl FromStr for UiCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseError::Empty);
        };
        let args: Vec<&str> = words.collect();
        let head = head.to_ascii_lowercase();

        match (head.as_str(), args.as_slice()) {
            ("toggle" | "t", []) => Ok(UiCommand::Toggle),
            ("status" | "s", []) => Ok(UiCommand::Status),
            ("help" | "h" | "?", []) => Ok(UiCommand::Help),
            ("quit" | "q" | "exit", []) => Ok(UiCommand::Quit),
            ("timing", [duration, gap]) => Ok(UiCommand::Timing {
                duration_ms: parse_field(duration)?,
                gap_ms: parse_field(gap)?,
            }),
            ("timing", _) => Err(ParseError::Arguments {
                command: "timing",
                expected: "a duration and a gap",
            }),
            ("duration", [duration]) => Ok(UiCommand::Timing {
                duration_ms: parse_field(duration)?,
                gap_ms: None,
            }),
            ("duration", _) => Err(ParseError::Arguments {
                command: "duration",
                expected: "one value in ms",
            }),
            ("gap", [gap]) => Ok(UiCommand::Timing {
                duration_ms: None,
                gap_ms: parse_field(gap)?,
            }),
            ("gap", _) => Err(ParseError::Arguments {
                command: "gap",
                expected: "one value in ms",
            }),
            ("intensity", [percent]) => percent
                .parse::<u8>()
                .map(UiCommand::Intensity)
                .map_err(|_| ParseError::Number(percent.to_string())),
            ("intensity", _) => Err(ParseError::Arguments {
                command: "intensity",
                expected: "a percentage",
            }),
            (other, _) => Err(ParseError::Unknown(other.to_string())),
        }
    }
}
