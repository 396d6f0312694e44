//! Matroska element IDs used for segment indexing.

/// EBML header, the magic at the start of every stream.
pub const EBML: u32 = 0x1A45_DFA3;
pub const SEGMENT: u32 = 0x1853_8067;
pub const SEEK_HEAD: u32 = 0x114D_9B74;
pub const INFO: u32 = 0x1549_A966;
pub const TIMECODE_SCALE: u32 = 0x2A_D7B1;
pub const TRACKS: u32 = 0x1654_AE6B;
pub const CLUSTER: u32 = 0x1F43_B675;
pub const CUES: u32 = 0x1C53_BB6B;
pub const CUE_POINT: u32 = 0xBB;
pub const CUE_TIME: u32 = 0xB3;
pub const CUE_TRACK_POSITIONS: u32 = 0xB7;
pub const CUE_TRACK: u32 = 0xF7;
pub const CUE_CLUSTER_POSITION: u32 = 0xF1;
pub const VOID: u32 = 0xEC;

/// Default TimecodeScale in nanoseconds per tick.
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Human-readable element name for errors and logs.
pub fn name(id: u32) -> &'static str {
    match id {
        EBML => "EBML",
        SEGMENT => "Segment",
        SEEK_HEAD => "SeekHead",
        INFO => "Info",
        TIMECODE_SCALE => "TimecodeScale",
        TRACKS => "Tracks",
        CLUSTER => "Cluster",
        CUES => "Cues",
        CUE_POINT => "CuePoint",
        CUE_TIME => "CueTime",
        CUE_TRACK_POSITIONS => "CueTrackPositions",
        CUE_TRACK => "CueTrack",
        CUE_CLUSTER_POSITION => "CueClusterPosition",
        VOID => "Void",
        _ => "Unknown",
    }
}
