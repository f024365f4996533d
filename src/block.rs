//! Block value types for the v6 tagged-block header section.
//!
//! Each recognized tag (§6.2) decodes to a small record below. Unknown
//! tags decode to [`Block::Raw`], an opaque byte sequence that round-trips
//! losslessly — this is the format's forward-compatibility mechanism.

/// A decoded v6 block value.
///
/// One variant per tag this crate understands, plus [`Block::Raw`] for
/// everything the [registry](crate::registry) doesn't have a codec for.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// `TIME`: acquisition time breakdown plus coverage window.
    Time(Time),
    /// `ZONE`: timezone name.
    Zone(String),
    /// `CITY`: site city name.
    City(String),
    /// `LOCA`: site location.
    Loca(Loca),
    /// `SITD`: free-form site description.
    Sitd(String),
    /// `RCVI`: receiver/antenna model and firmware info.
    Rcvi(Rcvi),
    /// `TOOL`: name of the tool that produced the file.
    Tool(String),
    /// `GLRM`: ground/leakage removal processing record.
    Glrm(Glrm),
    /// `FOLS`: per-range-cell first-order-limit indices.
    Fols(Vec<[i32; 4]>),
    /// `END6`: terminator block, preserved as-seen (the source leaves its
    /// required-ness and payload unspecified; see DESIGN.md).
    End6(String),
    /// Any other tag: an opaque byte sequence of the block's stored length.
    Raw(Vec<u8>),
}

/// `TIME` block payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Time {
    /// Implementation-defined time source marker.
    pub time_mark: u8,
    /// Four-digit year.
    pub year: u16,
    /// Month, 1-12.
    pub month: u8,
    /// Day of month, 1-31.
    pub day: u8,
    /// Hour, 0-23.
    pub hour: u8,
    /// Minute, 0-59.
    pub minute: u8,
    /// Seconds, with sub-second precision.
    pub seconds: f64,
    /// Length of the acquisition window, in seconds.
    pub coverage_seconds: f64,
    /// Offset of local time from UTC, in hours.
    pub hours_from_utc: f64,
}

/// `LOCA` block payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loca {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude_meters: f64,
}

/// `RCVI` block payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Rcvi {
    /// Receiver model identifier.
    pub receiver_model: u32,
    /// Antenna model identifier.
    pub antenna_model: u32,
    /// Reference gain, in dB.
    pub reference_gain_db: f64,
    /// Firmware version string, exactly 32 bytes on the wire.
    pub firmware: String,
}

/// `GLRM` block payload: describes a ground/leakage-removal pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glrm {
    /// Removal method identifier.
    pub method: u8,
    /// Schema version of this block.
    pub version: u8,
    /// Number of (range, Doppler) points removed.
    pub num_points_removed: u32,
    /// Number of time samples removed.
    pub num_times_removed: u32,
    /// Number of range segments removed.
    pub num_segments_removed: u32,
    /// Power threshold used for single-point removal.
    pub point_power_threshold: f64,
    /// Power threshold used for whole-range removal.
    pub range_power_threshold: f64,
    /// Bin-distance threshold used for range removal.
    pub range_bin_threshold: f64,
    /// Whether the DC bin was also removed.
    pub remove_dc: bool,
}

impl Block {
    /// The tag this value would be written under, when it's known
    /// unambiguously from the variant. `Raw` has no intrinsic tag — its
    /// tag is whatever the file said, tracked alongside it in
    /// [`crate::header::Header::blocks`], so this method isn't used for
    /// `Raw` values during encoding.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Time(_) => "TIME",
            Block::Zone(_) => "ZONE",
            Block::City(_) => "CITY",
            Block::Loca(_) => "LOCA",
            Block::Sitd(_) => "SITD",
            Block::Rcvi(_) => "RCVI",
            Block::Tool(_) => "TOOL",
            Block::Glrm(_) => "GLRM",
            Block::Fols(_) => "FOLS",
            Block::End6(_) => "END6",
            Block::Raw(_) => "RAW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_tags() {
        assert_eq!(Block::Zone("UTC".into()).kind(), "ZONE");
        assert_eq!(Block::Raw(vec![1, 2, 3]).kind(), "RAW");
    }
}
