//! The per-range-cell spectrum matrix (§3, §4.4).
//!
//! Six fixed channels plus an optional seventh, stored as flat row-major
//! buffers of shape `[num_range_cells, num_doppler_cells]` rather than
//! `Vec<Vec<_>>`, so each channel is one contiguous allocation.

use std::io::{Read, Write};

use log::trace;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::io::{ByteReader, ByteWriter};
use crate::preprocess::{Preprocess, Preprocessor};
use crate::{Complex, Float};

/// The antenna self-spectra and cross-spectra decoded from a CS file.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    num_range_cells: usize,
    num_doppler_cells: usize,

    /// Self-spectrum of the first loop antenna.
    pub antenna1: Vec<Float>,
    /// Self-spectrum of the second loop antenna.
    pub antenna2: Vec<Float>,
    /// Self-spectrum of the monopole antenna.
    pub antenna3: Vec<Float>,
    /// Cross-spectrum between antennas 1 and 2.
    pub cross12: Vec<Complex>,
    /// Cross-spectrum between antennas 1 and 3.
    pub cross13: Vec<Complex>,
    /// Cross-spectrum between antennas 2 and 3.
    pub cross23: Vec<Complex>,
    /// Per-bin quality row, present iff `cskind >= 2`.
    pub quality: Option<Vec<Float>>,
}

impl Spectrum {
    /// Matrix shape, as `(num_range_cells, num_doppler_cells)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.num_range_cells, self.num_doppler_cells)
    }

    /// Build an all-zero spectrum with the shape and `quality` presence
    /// implied by `header`. Useful for constructing a file from scratch.
    pub fn zeroed(header: &Header) -> Result<Self> {
        let (num_range_cells, num_doppler_cells) = validated_dims(header)?;
        let n = num_range_cells * num_doppler_cells;
        Ok(Self {
            num_range_cells,
            num_doppler_cells,
            antenna1: vec![0.0; n],
            antenna2: vec![0.0; n],
            antenna3: vec![0.0; n],
            cross12: vec![Complex::new(0.0, 0.0); n],
            cross13: vec![Complex::new(0.0, 0.0); n],
            cross23: vec![Complex::new(0.0, 0.0); n],
            quality: header.has_quality().then(|| vec![0.0; n]),
        })
    }

    /// Read the spectrum matrix described by `header`, applying
    /// `preprocess` to every channel as each row comes off the wire
    /// (§4.4: real channels get `preprocess` applied directly; complex
    /// channels get it applied to their real and imaginary parts
    /// independently, then recombined).
    pub fn read<R: Read>(reader: &mut R, header: &Header, preprocess: &dyn Preprocess) -> Result<Self> {
        let (num_range_cells, num_doppler_cells) = validated_dims(header)?;
        let has_quality = header.has_quality();
        let mut r = ByteReader::new(reader);

        let mut antenna1 = Vec::with_capacity(num_range_cells * num_doppler_cells);
        let mut antenna2 = Vec::with_capacity(num_range_cells * num_doppler_cells);
        let mut antenna3 = Vec::with_capacity(num_range_cells * num_doppler_cells);
        let mut cross12 = Vec::with_capacity(num_range_cells * num_doppler_cells);
        let mut cross13 = Vec::with_capacity(num_range_cells * num_doppler_cells);
        let mut cross23 = Vec::with_capacity(num_range_cells * num_doppler_cells);
        let mut quality = has_quality.then(|| Vec::with_capacity(num_range_cells * num_doppler_cells));

        for i in 0..num_range_cells {
            trace!("spectrum: reading range cell {i}/{num_range_cells}");
            antenna1.extend(preprocess.apply(&r.read_f32_vec(num_doppler_cells)?));
            antenna2.extend(preprocess.apply(&r.read_f32_vec(num_doppler_cells)?));
            antenna3.extend(preprocess.apply(&r.read_f32_vec(num_doppler_cells)?));
            cross12.extend(read_complex_row(&mut r, num_doppler_cells, preprocess)?);
            cross13.extend(read_complex_row(&mut r, num_doppler_cells, preprocess)?);
            cross23.extend(read_complex_row(&mut r, num_doppler_cells, preprocess)?);
            if let Some(q) = quality.as_mut() {
                q.extend(preprocess.apply(&r.read_f32_vec(num_doppler_cells)?));
            }
        }

        Ok(Self {
            num_range_cells,
            num_doppler_cells,
            antenna1,
            antenna2,
            antenna3,
            cross12,
            cross13,
            cross23,
            quality,
        })
    }

    /// Write the spectrum matrix to `writer`, in the channel order fixed
    /// by the format. No preprocessing is applied on write: callers are
    /// expected to hand in final values (§4.4).
    pub fn write<W: Write>(&self, writer: &mut W, header: &Header) -> Result<()> {
        let (num_range_cells, num_doppler_cells) = validated_dims(header)?;
        if (num_range_cells, num_doppler_cells) != self.shape() {
            return Err(Error::InvalidDimensions {
                num_range_cells: num_range_cells as i32,
                num_doppler_cells: num_doppler_cells as i32,
            });
        }
        let has_quality = header.has_quality();
        if has_quality != self.quality.is_some() {
            return Err(Error::InvalidDimensions {
                num_range_cells: num_range_cells as i32,
                num_doppler_cells: num_doppler_cells as i32,
            });
        }

        let mut w = ByteWriter::new(writer);
        for i in 0..num_range_cells {
            let row = i * num_doppler_cells..(i + 1) * num_doppler_cells;
            w.write_f32_slice(&self.antenna1[row.clone()])?;
            w.write_f32_slice(&self.antenna2[row.clone()])?;
            w.write_f32_slice(&self.antenna3[row.clone()])?;
            write_complex_row(&mut w, &self.cross12[row.clone()])?;
            write_complex_row(&mut w, &self.cross13[row.clone()])?;
            write_complex_row(&mut w, &self.cross23[row.clone()])?;
            if let Some(q) = &self.quality {
                w.write_f32_slice(&q[row])?;
            }
        }
        Ok(())
    }
}

fn validated_dims(header: &Header) -> Result<(usize, usize)> {
    let num_range_cells = header.num_range_cells();
    let num_doppler_cells = header.num_doppler_cells();
    if num_range_cells <= 0 || num_doppler_cells <= 0 {
        return Err(Error::InvalidDimensions {
            num_range_cells,
            num_doppler_cells,
        });
    }
    Ok((num_range_cells as usize, num_doppler_cells as usize))
}

fn read_complex_row<R: Read>(r: &mut ByteReader<R>, n: usize, preprocess: &dyn Preprocess) -> Result<Vec<Complex>> {
    let floats = r.read_f32_vec(n * 2)?;
    let real: Vec<Float> = floats.iter().step_by(2).copied().collect();
    let imag: Vec<Float> = floats.iter().skip(1).step_by(2).copied().collect();
    let real = preprocess.apply(&real);
    let imag = preprocess.apply(&imag);
    Ok(real.into_iter().zip(imag).map(|(re, im)| Complex::new(re, im)).collect())
}

fn write_complex_row<W: Write>(w: &mut ByteWriter<W>, row: &[Complex]) -> Result<()> {
    let mut interleaved = Vec::with_capacity(row.len() * 2);
    for c in row {
        interleaved.push(c.re);
        interleaved.push(c.im);
    }
    w.write_f32_slice(&interleaved)
}

/// No-op helper kept for symmetry with [`Preprocessor::default`]; reads
/// and writes above accept `&dyn Preprocess` so any [`Preprocessor`]
/// variant (or a caller's custom impl) works without a generic parameter
/// on [`Spectrum::read`].
pub fn identity() -> Preprocessor {
    Preprocessor::default()
}
