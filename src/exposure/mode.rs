use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which extremum a composite keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Brightest value seen per pixel and channel
    Light,
    /// Darkest value seen per pixel and channel
    Dark,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Light, Mode::Dark];

    /// Suffix appended to the video's file stem for this mode's output
    pub fn suffix(self) -> &'static str {
        match self {
            Mode::Light => "light",
            Mode::Dark => "dark",
        }
    }

    /// The per-channel reduction for this mode
    pub fn reducer(self) -> fn(u8, u8) -> u8 {
        match self {
            Mode::Light => std::cmp::max::<u8>,
            Mode::Dark => std::cmp::min::<u8>,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Mode::Light),
            "dark" => Ok(Mode::Dark),
            other => Err(format!("unknown mode '{}' (expected light or dark)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reducers() {
        assert_eq!(Mode::Light.reducer()(10, 200), 200);
        assert_eq!(Mode::Dark.reducer()(10, 200), 10);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("LIGHT".parse::<Mode>().unwrap(), Mode::Light);
        assert_eq!("dark".parse::<Mode>().unwrap(), Mode::Dark);
        assert!("both".parse::<Mode>().is_err());
        assert_eq!(Mode::Dark.to_string(), "dark");
    }
}
