//! The top-level `CSFile` aggregate and its load/dump facade (§4.6, §6.3).

use std::io::{Cursor, Read, Write};

use log::debug;

use crate::error::Result;
use crate::header::Header;
use crate::preprocess::{Preprocess, Preprocessor};
use crate::registry::Registry;
use crate::spectrum::Spectrum;
use crate::{Complex, Float};

/// A fully decoded CS file: header metadata plus the spectrum matrix it
/// describes.
#[derive(Debug, Clone, PartialEq)]
pub struct CSFile {
    header: Header,
    spectrum: Spectrum,
}

impl CSFile {
    /// Pair a header with a spectrum whose shape matches it.
    #[must_use]
    pub fn new(header: Header, spectrum: Spectrum) -> Self {
        Self { header, spectrum }
    }

    /// The file's header metadata.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The decoded spectrum matrix.
    #[must_use]
    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    /// Self-spectrum of the first loop antenna.
    #[must_use]
    pub fn antenna1(&self) -> &[Float] {
        &self.spectrum.antenna1
    }

    /// Self-spectrum of the second loop antenna.
    #[must_use]
    pub fn antenna2(&self) -> &[Float] {
        &self.spectrum.antenna2
    }

    /// Self-spectrum of the monopole antenna.
    #[must_use]
    pub fn antenna3(&self) -> &[Float] {
        &self.spectrum.antenna3
    }

    /// Cross-spectrum between antennas 1 and 2.
    #[must_use]
    pub fn cross12(&self) -> &[Complex] {
        &self.spectrum.cross12
    }

    /// Cross-spectrum between antennas 1 and 3.
    #[must_use]
    pub fn cross13(&self) -> &[Complex] {
        &self.spectrum.cross13
    }

    /// Cross-spectrum between antennas 2 and 3.
    #[must_use]
    pub fn cross23(&self) -> &[Complex] {
        &self.spectrum.cross23
    }

    /// Per-bin quality row, present iff the header's `cskind >= 2`.
    #[must_use]
    pub fn quality(&self) -> Option<&[Float]> {
        self.spectrum.quality.as_deref()
    }
}

/// Read a complete CS file from `reader`: the header, then the spectrum
/// it describes. `preprocess` is applied to every spectrum channel as it
/// is decoded; pass `None` to keep raw values.
pub fn load<R: Read>(reader: &mut R, preprocess: Option<&dyn Preprocess>) -> Result<CSFile> {
    let registry = Registry::builtin();
    let header = Header::read(reader, &registry)?;
    debug!("csfile: loaded header, version {}", header.version());
    let default_preprocess = Preprocessor::default();
    let preprocess = preprocess.unwrap_or(&default_preprocess);
    let spectrum = Spectrum::read(reader, &header, preprocess)?;
    Ok(CSFile::new(header, spectrum))
}

/// [`load`] from an in-memory byte slice.
pub fn loads(bytes: &[u8], preprocess: Option<&dyn Preprocess>) -> Result<CSFile> {
    let mut cursor = Cursor::new(bytes);
    load(&mut cursor, preprocess)
}

/// Write `csfile` to `writer`, header then spectrum, with no
/// preprocessing applied (§4.4: preprocessing is a load-time concern
/// only).
pub fn dump<W: Write>(csfile: &CSFile, writer: &mut W) -> Result<()> {
    let registry = Registry::builtin();
    csfile.header.write(writer, &registry)?;
    csfile.spectrum.write(writer, &csfile.header)?;
    Ok(())
}

/// [`dump`] to an in-memory buffer.
pub fn dumps(csfile: &CSFile) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    dump(csfile, &mut out)?;
    Ok(out)
}

/// [`dump`] a standalone `(header, spectrum)` pair to an in-memory
/// buffer, without first constructing a [`CSFile`]. Convenient when a
/// caller already has the two pieces separately, e.g. fresh off
/// [`Spectrum::zeroed`].
pub fn dumps_parts(header: &Header, spectrum: &Spectrum) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let registry = Registry::builtin();
    header.write(&mut out, &registry)?;
    spectrum.write(&mut out, header)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::error::Tag;
    use crate::header::Blocks;
    use chrono::NaiveDate;

    fn epoch() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(1904, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn round_trips_through_dumps_and_loads() {
        let header = Header::new_v4(epoch(), 1, 3, 5);
        let spectrum = Spectrum::zeroed(&header).unwrap();
        let bytes = dumps_parts(&header, &spectrum).unwrap();
        let file = loads(&bytes, None).unwrap();
        assert_eq!(file.header(), &header);
        assert_eq!(file.spectrum(), &spectrum);
    }

    #[test]
    fn round_trips_through_csfile_dump_and_load() {
        let mut blocks = Blocks::new();
        blocks.push(Tag::new(b"ZONE"), Block::Zone("UTC".into()));
        let header = Header::new_v4(epoch(), 2, 2, 2).with_v6_blocks(blocks);
        let spectrum = Spectrum::zeroed(&header).unwrap();
        let original = CSFile::new(header, spectrum);

        let mut out = Vec::new();
        dump(&original, &mut out).unwrap();
        let mut cursor = Cursor::new(out);
        let decoded = load(&mut cursor, None).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn round_trips_through_csfile_dumps_and_loads() {
        let header = Header::new_v4(epoch(), 1, 2, 2);
        let spectrum = Spectrum::zeroed(&header).unwrap();
        let original = CSFile::new(header, spectrum);

        let bytes = dumps(&original).unwrap();
        let decoded = loads(&bytes, None).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn preprocess_is_applied_on_load_not_on_disk_bytes() {
        let header = Header::new_v4(epoch(), 0, 1, 3);
        let mut spectrum = Spectrum::zeroed(&header).unwrap();
        spectrum.antenna1 = vec![-1.0, 2.0, -3.0];
        let bytes = dumps_parts(&header, &spectrum).unwrap();

        let file = loads(&bytes, Some(&Preprocessor::Abs)).unwrap();
        assert_eq!(file.antenna1(), &[1.0, 2.0, 3.0]);

        let raw = loads(&bytes, None).unwrap();
        assert_eq!(raw.antenna1(), &[-1.0, 2.0, -3.0]);
    }

    #[test]
    fn accessors_expose_every_channel() {
        let header = Header::new_v4(epoch(), 2, 1, 1);
        let spectrum = Spectrum::zeroed(&header).unwrap();
        let file = CSFile::new(header, spectrum);
        assert_eq!(file.antenna1().len(), 1);
        assert_eq!(file.antenna2().len(), 1);
        assert_eq!(file.antenna3().len(), 1);
        assert_eq!(file.cross12().len(), 1);
        assert_eq!(file.cross13().len(), 1);
        assert_eq!(file.cross23().len(), 1);
        assert!(file.quality().is_some());
    }
}
