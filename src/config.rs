use std::str::FromStr;
use std::time::Duration;

/// Identifier of the group the PAKE runs over.
///
/// Only the Ed25519 group is available; the identifier is kept configurable
/// so the wire format can name the group it was negotiated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PakeCurve {
    #[default]
    Ed25519,
}

impl PakeCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            PakeCurve::Ed25519 => "ed25519",
        }
    }
}

impl FromStr for PakeCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(PakeCurve::Ed25519),
            other => Err(format!("unsupported PAKE curve '{other}' (supported: ed25519)")),
        }
    }
}

/// Tuning knobs for a relay instance.
///
/// The defaults match the deployed constants: hosts are pinged every two
/// seconds while they wait, and the reaper removes rooms that have been open
/// for more than three hours.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How often a waiting host is sent the keepalive sentinel.
    pub ping_interval: Duration,
    /// How often the reaper sweeps for stale rooms.
    pub reap_interval: Duration,
    /// Age beyond which a room is considered stale and reaped.
    pub max_room_age: Duration,
    /// Group identifier for the setup PAKE.
    pub pake_curve: PakeCurve,
    /// Chunk size for raw socket reads while piping.
    pub recv_buffer: usize,
    /// Maximum accepted frame length on the setup transport.
    pub max_frame: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(2),
            reap_interval: Duration::from_secs(10 * 60),
            max_room_age: Duration::from_secs(3 * 60 * 60),
            pake_curve: PakeCurve::default(),
            recv_buffer: 64 * 1024,
            max_frame: 8 * 1024 * 1024,
        }
    }
}
