//! Process configuration: adapter address, IPC socket paths, log filter.
//! Parsed from the command line with `argh`, the way the teacher's `Opt`
//! in `bt-a2dp-source::main` does.

use std::path::PathBuf;

use a2dp_coordinator::BdAddr;
use argh::FromArgs;

/// Bluetooth Advanced Audio Distribution Profile: source-role coordinator.
#[derive(FromArgs)]
pub struct Opt {
    /// local adapter BD_ADDR, as six colon-separated hex bytes
    #[argh(option, default = "default_adapter()")]
    pub adapter: CliBdAddr,

    /// unix socket path for the HAL IPC server
    #[argh(option, default = "PathBuf::from(\"/var/run/bluetooth/a2dp-hal\")")]
    pub hal_socket: PathBuf,

    /// unix socket path for the audio IPC server
    #[argh(option, default = "PathBuf::from(\"/var/run/bluetooth/a2dp-audio\")")]
    pub audio_socket: PathBuf,

    /// tracing filter directive, e.g. "a2dp_sourced=debug"
    #[argh(option, default = "String::from(\"info\")")]
    pub log: String,
}

fn default_adapter() -> CliBdAddr {
    CliBdAddr(BdAddr([0, 0, 0, 0, 0, 0]))
}

/// Thin wrapper so `BdAddr` can be parsed from a CLI argument without
/// putting `FromStr` on the core crate's public type for a one-off format.
pub struct CliBdAddr(pub BdAddr);

impl std::str::FromStr for CliBdAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(format!("expected 6 colon-separated hex bytes, got {}", parts.len()));
        }
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16).map_err(|e| e.to_string())?;
        }
        Ok(CliBdAddr(BdAddr(bytes)))
    }
}
