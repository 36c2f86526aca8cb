// Wire encoding of GET /get_command. The encoding is inverted: "0" means reset.

/// What a command poll tells the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSignal {
    /// Nothing to do. Encoded as `"1"`.
    Idle,
    /// Zero the counters and push a zeroed snapshot. Encoded as `"0"`.
    Reset,
}

impl CommandSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandSignal::Idle => "1",
            CommandSignal::Reset => "0",
        }
    }

    /// Parse a poll response body. Surrounding whitespace is tolerated.
    pub fn from_wire(body: &str) -> Option<Self> {
        match body.trim() {
            "1" => Some(CommandSignal::Idle),
            "0" => Some(CommandSignal::Reset),
            _ => None,
        }
    }
}

impl From<bool> for CommandSignal {
    /// `true` = a reset edge was consumed.
    fn from(reset_pending: bool) -> Self {
        if reset_pending {
            CommandSignal::Reset
        } else {
            CommandSignal::Idle
        }
    }
}
