// Raw MIDI message decoding for the live-input bridge

/// Note message extracted from a raw 3-byte device event.
///
/// Only the pressed-state protocol is decoded: a note-on with velocity
/// zero is a note-off in disguise, and the channel nibble is ignored.
/// Everything else (control change, pitch bend, system messages) is not
/// a note and decodes to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMessage {
    On { pitch: u8, velocity: u8 },
    Off { pitch: u8 },
}

const STATUS_NOTE_ON: u8 = 0x9;
const STATUS_NOTE_OFF: u8 = 0x8;

impl NoteMessage {
    /// Decode a raw device message; `None` for non-note or truncated
    /// packets.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let [status, pitch, velocity] = *bytes.first_chunk::<3>()?;

        match status >> 4 {
            STATUS_NOTE_ON if velocity > 0 => Some(Self::On { pitch, velocity }),
            STATUS_NOTE_ON | STATUS_NOTE_OFF => Some(Self::Off { pitch }),
            _ => None,
        }
    }

    pub fn pitch(&self) -> u8 {
        match *self {
            Self::On { pitch, .. } | Self::Off { pitch } => pitch,
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::On { .. })
    }
}
