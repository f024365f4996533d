//! The layered, version-gated CS file header (§3, §4.3, §6.1).
//!
//! Each version `1..=6` adds a fixed block of fields, terminated by a
//! 32-bit "extent" giving the byte count of everything that still
//! follows. A v1-only reader can stop after validating that extent is
//! zero; a v6 file additionally carries an ordered, tagged-block
//! section after the v5 fields.

use std::io::{Read, Write};

use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, trace};

use crate::block::Block;
use crate::error::{Error, Result, Tag};
use crate::io::{latin1_bytes, ByteReader, ByteWriter};
use crate::registry::Registry;

/// Classical CS-file epoch: 1904-01-01T00:00:00, with no timezone.
fn epoch() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(1904, 1, 1)
        .expect("1904-01-01 is a valid calendar date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
}

const V1_HEADER_SIZE: u32 = 10;
const V2_HEADER_SIZE: u32 = 16;
const V3_HEADER_SIZE: u32 = 24;
const V4_HEADER_SIZE: u32 = 72;
const V5_HEADER_SIZE: u32 = 100;

/// An insertion-ordered `tag -> block value` mapping.
///
/// A plain `Vec` of pairs, per §9's guidance: the v6 section is small and
/// order-sensitive, and lookups are rare enough that a `HashMap` (which
/// would need a second side-table to remember insertion order) buys
/// nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blocks(Vec<(Tag, Block)>);

impl Blocks {
    /// An empty block section.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a block, preserving file order.
    pub fn push(&mut self, tag: Tag, block: Block) {
        self.0.push((tag, block));
    }

    /// Iterate over `(tag, block)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = &(Tag, Block)> {
        self.0.iter()
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up the first block with a given tag, if any.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&Block> {
        self.0.iter().find(|(t, _)| *t == tag).map(|(_, b)| b)
    }
}

impl<'a> IntoIterator for &'a Blocks {
    type Item = &'a (Tag, Block);
    type IntoIter = std::slice::Iter<'a, (Tag, Block)>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// CS file header metadata (§3).
///
/// Fields are grouped in comments by the version layer that introduces
/// them; `version` is the single source of truth for which of the
/// `Option` fields are populated. Use [`Header::validate`] to check that
/// invariant after hand-assembling one.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Format version, `1..=6`.
    pub version: i16,

    // -- v1 --
    /// Acquisition timestamp (no timezone; see §4.3).
    pub timestamp: NaiveDateTime,

    // -- v2 --
    /// Spectrum kind; `>= 2` means a quality row accompanies each range
    /// cell.
    pub cskind: Option<i16>,

    // -- v3 --
    /// 4-character site identifier.
    pub site_code: Option<String>,

    // -- v4 --
    /// Length of the acquisition window, in minutes.
    pub cover_minutes: Option<i32>,
    /// Whether the raw source data was deleted after processing.
    pub deleted_source: Option<bool>,
    /// Whether acquisition parameters were manually overridden.
    pub override_source: Option<bool>,
    /// Sweep start frequency, MHz.
    pub start_freq_mhz: Option<f32>,
    /// Sweep repeat frequency, MHz.
    pub rep_freq_mhz: Option<f32>,
    /// Sweep bandwidth, kHz.
    pub bandwidth_khz: Option<f32>,
    /// Whether the sweep direction is upward.
    pub sweep_up: Option<bool>,
    /// Number of Doppler cells (matrix columns).
    pub num_doppler_cells: Option<i32>,
    /// Number of range cells (matrix rows).
    pub num_range_cells: Option<i32>,
    /// Index of the first range cell.
    pub first_range_cell: Option<i32>,
    /// Distance spanned by one range cell, km.
    pub range_cell_dist_km: Option<f32>,

    // -- v5 --
    /// Output interval, implementation-defined units.
    pub output_interval: Option<i32>,
    /// 4-character code naming the type of file creator.
    pub create_type_code: Option<String>,
    /// 4-character creator version string.
    pub creator_version: Option<String>,
    /// Number of active receive channels.
    pub num_active_channels: Option<i32>,
    /// Number of channels present in the spectrum.
    pub num_spectra_channels: Option<i32>,
    /// Bitmask of which channels are active.
    pub active_channels: Option<u32>,

    // -- v6 --
    /// Ordered tagged-block section.
    pub blocks: Blocks,
}

impl Header {
    /// Build a minimal v1 header with nothing but a timestamp.
    #[must_use]
    pub fn new_v1(timestamp: NaiveDateTime) -> Self {
        Self {
            version: 1,
            timestamp,
            cskind: None,
            site_code: None,
            cover_minutes: None,
            deleted_source: None,
            override_source: None,
            start_freq_mhz: None,
            rep_freq_mhz: None,
            bandwidth_khz: None,
            sweep_up: None,
            num_doppler_cells: None,
            num_range_cells: None,
            first_range_cell: None,
            range_cell_dist_km: None,
            output_interval: None,
            create_type_code: None,
            creator_version: None,
            num_active_channels: None,
            num_spectra_channels: None,
            active_channels: None,
            blocks: Blocks::new(),
        }
    }

    /// Build a v4 header with the dimension fields populated and every
    /// other v4 field defaulted (`cover_minutes=0`, frequencies `0.0`,
    /// `sweep_up=true`, `first_range_cell=0`).
    #[must_use]
    pub fn new_v4(timestamp: NaiveDateTime, cskind: i16, num_range_cells: i32, num_doppler_cells: i32) -> Self {
        let mut h = Self::new_v1(timestamp);
        h.version = 4;
        h.cskind = Some(cskind);
        h.site_code = Some(String::new());
        h.cover_minutes = Some(0);
        h.deleted_source = Some(false);
        h.override_source = Some(false);
        h.start_freq_mhz = Some(0.0);
        h.rep_freq_mhz = Some(0.0);
        h.bandwidth_khz = Some(0.0);
        h.sweep_up = Some(true);
        h.num_doppler_cells = Some(num_doppler_cells);
        h.num_range_cells = Some(num_range_cells);
        h.first_range_cell = Some(0);
        h.range_cell_dist_km = Some(0.0);
        h
    }

    /// Promote a v4 (or earlier) header to v6 by attaching a block
    /// section. The caller is responsible for the v5 fields if skipping
    /// straight from v4; this matches the source's flat-struct model
    /// where nothing stops a caller from hand-assembling an
    /// inconsistent header (use [`Header::validate`] to catch that).
    #[must_use]
    pub fn with_v6_blocks(mut self, blocks: Blocks) -> Self {
        if self.output_interval.is_none() {
            self.output_interval = Some(0);
            self.create_type_code = Some(String::new());
            self.creator_version = Some(String::new());
            self.num_active_channels = Some(0);
            self.num_spectra_channels = Some(0);
            self.active_channels = Some(0);
        }
        self.version = 6;
        self.blocks = blocks;
        self
    }

    /// Format version.
    #[must_use]
    pub fn version(&self) -> i16 {
        self.version
    }

    /// Number of range cells, defaulting to 0 for headers older than v4
    /// (which carry no spectrum at all).
    #[must_use]
    pub fn num_range_cells(&self) -> i32 {
        self.num_range_cells.unwrap_or(0)
    }

    /// Number of Doppler cells, defaulting to 0 for headers older than
    /// v4.
    #[must_use]
    pub fn num_doppler_cells(&self) -> i32 {
        self.num_doppler_cells.unwrap_or(0)
    }

    /// Whether the spectrum carries a quality row per range cell.
    #[must_use]
    pub fn has_quality(&self) -> bool {
        self.cskind.unwrap_or(0) >= 2
    }

    /// Check that every field required by `self.version` is present,
    /// per the invariant in §3: "for any file claiming `version >= v`,
    /// all fields introduced up to version `v` are present".
    pub fn validate(&self) -> Result<()> {
        if !(1..=6).contains(&self.version) {
            return Err(Error::UnsupportedVersion(self.version));
        }
        if self.version >= 4 {
            let num_range_cells = self.num_range_cells.unwrap_or(0);
            let num_doppler_cells = self.num_doppler_cells.unwrap_or(0);
            if num_range_cells <= 0 || num_doppler_cells <= 0 {
                return Err(Error::InvalidDimensions {
                    num_range_cells,
                    num_doppler_cells,
                });
            }
            if self.cskind.unwrap_or(0) < 0 {
                return Err(Error::InvalidDimensions {
                    num_range_cells,
                    num_doppler_cells,
                });
            }
        }
        Ok(())
    }

    fn raw_timestamp(&self) -> u32 {
        let secs = (self.timestamp - epoch()).num_seconds();
        secs.clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Parse a header from `reader`, resolving v6 blocks through
    /// `registry`.
    pub fn read<R: Read>(reader: &mut R, registry: &Registry) -> Result<Self> {
        let mut r = ByteReader::new(reader);
        let version = r.read_i16()?;
        if !(1..=6).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        debug!("header: version {version}");

        let timestamp_secs = r.read_u32()?;
        let timestamp = epoch() + TimeDelta::seconds(i64::from(timestamp_secs));
        let v1_extent = r.read_i32()?;
        let mut h = Self::new_v1(timestamp);
        h.version = version;
        trace!("header: v1_extent={v1_extent}");
        if version == 1 {
            return Ok(h);
        }

        h.cskind = Some(r.read_i16()?);
        let v2_extent = r.read_i32()?;
        trace!("header: v2_extent={v2_extent}");
        if version == 2 {
            return Ok(h);
        }

        h.site_code = Some(r.read_string(4)?);
        let v3_extent = r.read_i32()?;
        trace!("header: v3_extent={v3_extent}");
        if version == 3 {
            return Ok(h);
        }

        h.cover_minutes = Some(r.read_i32()?);
        h.deleted_source = Some(r.read_i32()? != 0);
        h.override_source = Some(r.read_i32()? != 0);
        h.start_freq_mhz = Some(r.read_f32()?);
        h.rep_freq_mhz = Some(r.read_f32()?);
        h.bandwidth_khz = Some(r.read_f32()?);
        h.sweep_up = Some(r.read_i32()? != 0);
        h.num_doppler_cells = Some(r.read_i32()?);
        h.num_range_cells = Some(r.read_i32()?);
        h.first_range_cell = Some(r.read_i32()?);
        h.range_cell_dist_km = Some(r.read_f32()?);
        let v4_extent = r.read_i32()?;
        trace!("header: v4_extent={v4_extent}");
        if version == 4 {
            return Ok(h);
        }

        h.output_interval = Some(r.read_i32()?);
        h.create_type_code = Some(r.read_string(4)?);
        h.creator_version = Some(r.read_string(4)?);
        h.num_active_channels = Some(r.read_i32()?);
        h.num_spectra_channels = Some(r.read_i32()?);
        h.active_channels = Some(r.read_u32()?);
        let v5_extent = r.read_i32()?;
        trace!("header: v5_extent={v5_extent}");
        if version == 5 {
            return Ok(h);
        }

        // version == 6: tagged-block section.
        let mut section_size = i64::from(r.read_u32()?);
        debug!("header: v6 section_size={section_size}");
        while section_size > 0 {
            let tag = Tag::new(
                r.read_bytes(4)?
                    .as_slice()
                    .try_into()
                    .expect("read_bytes(4) returns exactly 4 bytes"),
            );
            let block_size = r.read_u32()?;
            let block = registry.decode(tag, r.get_mut(), block_size)?;
            h.blocks.push(tag, block);
            section_size -= 8 + i64::from(block_size);
            if section_size < 0 {
                return Err(Error::MalformedBlockSection(format!(
                    "section size went negative after block {tag:?} ({block_size} bytes)"
                )));
            }
        }
        Ok(h)
    }

    /// Serialize this header to `writer`, encoding v6 blocks through
    /// `registry`.
    pub fn write<W: Write>(&self, writer: &mut W, registry: &Registry) -> Result<()> {
        self.validate()?;
        let mut w = ByteWriter::new(writer);

        let encoded_blocks: Vec<(Tag, Vec<u8>)> = self
            .blocks
            .iter()
            .map(|(tag, block)| Ok((*tag, registry.encode(*tag, block)?)))
            .collect::<Result<_>>()?;

        let header_size = self.header_size(&encoded_blocks);

        w.write_i16(self.version)?;
        w.write_u32(self.raw_timestamp())?;
        w.write_i32((header_size - V1_HEADER_SIZE) as i32)?;
        if self.version == 1 {
            return Ok(());
        }

        w.write_i16(self.cskind.unwrap_or(0))?;
        w.write_i32((header_size - V2_HEADER_SIZE) as i32)?;
        if self.version == 2 {
            return Ok(());
        }

        write_fixed_string(&mut w, self.site_code.as_deref().unwrap_or(""), 4)?;
        w.write_i32((header_size - V3_HEADER_SIZE) as i32)?;
        if self.version == 3 {
            return Ok(());
        }

        w.write_i32(self.cover_minutes.unwrap_or(0))?;
        w.write_i32(i32::from(self.deleted_source.unwrap_or(false)))?;
        w.write_i32(i32::from(self.override_source.unwrap_or(false)))?;
        w.write_f32(self.start_freq_mhz.unwrap_or(0.0))?;
        w.write_f32(self.rep_freq_mhz.unwrap_or(0.0))?;
        w.write_f32(self.bandwidth_khz.unwrap_or(0.0))?;
        w.write_i32(i32::from(self.sweep_up.unwrap_or(true)))?;
        w.write_i32(self.num_doppler_cells.unwrap_or(0))?;
        w.write_i32(self.num_range_cells.unwrap_or(0))?;
        w.write_i32(self.first_range_cell.unwrap_or(0))?;
        w.write_f32(self.range_cell_dist_km.unwrap_or(0.0))?;
        w.write_i32((header_size - V4_HEADER_SIZE) as i32)?;
        if self.version == 4 {
            return Ok(());
        }

        w.write_i32(self.output_interval.unwrap_or(0))?;
        write_fixed_string(&mut w, self.create_type_code.as_deref().unwrap_or(""), 4)?;
        write_fixed_string(&mut w, self.creator_version.as_deref().unwrap_or(""), 4)?;
        w.write_i32(self.num_active_channels.unwrap_or(0))?;
        w.write_i32(self.num_spectra_channels.unwrap_or(0))?;
        w.write_u32(self.active_channels.unwrap_or(0))?;
        w.write_i32((header_size - V5_HEADER_SIZE) as i32)?;
        if self.version == 5 {
            return Ok(());
        }

        // version == 6.
        let section_size: u32 = encoded_blocks.iter().map(|(_, bytes)| 8 + bytes.len() as u32).sum();
        w.write_u32(section_size)?;
        for (tag, bytes) in &encoded_blocks {
            w.write_bytes(tag.as_bytes())?;
            w.write_u32(bytes.len() as u32)?;
            w.write_bytes(bytes)?;
        }
        Ok(())
    }

    /// Total on-disk header size, per the formula in §4.3 step 2.
    fn header_size(&self, encoded_blocks: &[(Tag, Vec<u8>)]) -> u32 {
        match self.version {
            1 => V1_HEADER_SIZE,
            2 => V2_HEADER_SIZE,
            3 => V3_HEADER_SIZE,
            4 => V4_HEADER_SIZE,
            5 => V5_HEADER_SIZE,
            _ => {
                let section_size: u32 = encoded_blocks.iter().map(|(_, bytes)| 8 + bytes.len() as u32).sum();
                V5_HEADER_SIZE + 4 + section_size
            }
        }
    }
}

fn write_fixed_string<W: Write>(w: &mut ByteWriter<W>, s: &str, width: usize) -> Result<()> {
    let mut bytes = latin1_bytes(s);
    bytes.resize(width, 0);
    w.write_bytes(&bytes)
}
