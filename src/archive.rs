use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Multiplexer for the named output sections of one encoding run.
///
/// Sections buffer their payload and are independently closed. In single
/// container mode a closed section is appended to the shared stream as a
/// framing record `(true, name_len:u32, name, payload_len:u32, payload)` and
/// [`Archive::finish`] terminates the stream with one `false` byte. In split
/// mode every section becomes its own file named after the section and the
/// terminator is a no-op.
///
/// All numbers are big-endian.
pub struct Archive {
    mode: Mode,
}

enum Mode {
    Single {
        out: BufWriter<File>,
        finished: bool,
    },
    Split {
        dir: PathBuf,
    },
}

impl Archive {
    /// Single-file container at `path`.
    pub fn single<P: AsRef<Path>>(path: P) -> Result<Self> {
        let out = BufWriter::new(File::create(path)?);
        Ok(Archive {
            mode: Mode::Single {
                out,
                finished: false,
            },
        })
    }

    /// One file per section under `dir`.
    pub fn split<P: AsRef<Path>>(dir: P) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Archive {
            mode: Mode::Split {
                dir: dir.as_ref().to_path_buf(),
            },
        })
    }

    pub fn open(&self, name: &str) -> Section {
        Section {
            name: name.to_string(),
            buf: Vec::new(),
        }
    }

    /// Flushes a finished section into the container (or its own file).
    pub fn close(&mut self, section: Section) -> Result<()> {
        debug!(
            "closing section '{}' ({} bytes)",
            section.name,
            section.buf.len()
        );
        match &mut self.mode {
            Mode::Single { out, .. } => {
                out.write_u8(1)?;
                write_raw_string(out, &section.name)?;
                out.write_u32::<BigEndian>(section.buf.len() as u32)?;
                out.write_all(&section.buf)?;
            }
            Mode::Split { dir } => {
                let mut file = BufWriter::new(File::create(dir.join(&section.name))?);
                file.write_all(&section.buf)?;
            }
        }
        Ok(())
    }

    /// Writes the end-of-archive marker. Must be called exactly once, even
    /// after a failed run, so that a partial container still scans cleanly.
    pub fn finish(&mut self) -> Result<()> {
        if let Mode::Single { out, finished } = &mut self.mode {
            if !*finished {
                out.write_u8(0)?;
                out.flush()?;
                *finished = true;
            }
        }
        Ok(())
    }
}

fn write_raw_string<W: Write>(out: &mut W, value: &str) -> io::Result<()> {
    out.write_u32::<BigEndian>(value.len() as u32)?;
    out.write_all(value.as_bytes())
}

/// One named payload in the making. Every fixed-width write is range checked;
/// an out-of-range value is a fatal encoding error, never a truncation.
pub struct Section {
    name: String,
    buf: Vec<u8>,
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.buf.write_u8(v as u8)?;
        Ok(())
    }

    /// Unsigned byte, `0..=255`.
    pub fn write_u8(&mut self, v: i32) -> Result<()> {
        if !(0..=0xFF).contains(&v) {
            return Err(Error::Overflow {
                value: v as i64,
                width: "u8",
            });
        }
        self.buf.write_u8(v as u8)?;
        Ok(())
    }

    pub fn write_i8(&mut self, v: i32) -> Result<()> {
        if v < i8::MIN as i32 || v > i8::MAX as i32 {
            return Err(Error::Overflow {
                value: v as i64,
                width: "i8",
            });
        }
        self.buf.write_i8(v as i8)?;
        Ok(())
    }

    pub fn write_i16(&mut self, v: i32) -> Result<()> {
        if v < i16::MIN as i32 || v > i16::MAX as i32 {
            return Err(Error::Overflow {
                value: v as i64,
                width: "i16",
            });
        }
        self.buf.write_i16::<BigEndian>(v as i16)?;
        Ok(())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.buf.write_i32::<BigEndian>(v)?;
        Ok(())
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.buf.write_i64::<BigEndian>(v)?;
        Ok(())
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.buf.write_f64::<BigEndian>(v)?;
        Ok(())
    }

    /// Collection length as an `i32` count prefix.
    pub fn write_len(&mut self, v: usize) -> Result<()> {
        if v > i32::MAX as usize {
            return Err(Error::Overflow {
                value: v as i64,
                width: "i32",
            });
        }
        self.write_i32(v as i32)
    }

    #[cfg(test)]
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Length-prefixed UTF-8 string.
    pub fn write_string(&mut self, v: &str) -> Result<()> {
        if v.len() > i32::MAX as usize {
            return Err(Error::Overflow {
                value: v.len() as i64,
                width: "i32",
            });
        }
        write_raw_string(&mut self.buf, v)?;
        Ok(())
    }
}

/// Scans a single-file container back into `(name, payload)` records, in
/// write order. This is what downstream consumers do; here it mostly backs
/// the round-trip tests.
pub struct ArchiveReader<R: Read> {
    input: R,
}

impl ArchiveReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(ArchiveReader {
            input: BufReader::new(File::open(path)?),
        })
    }
}

impl<R: Read> ArchiveReader<R> {
    pub fn new(input: R) -> Self {
        ArchiveReader { input }
    }

    /// Next framed section, or `None` at the end-of-archive marker.
    pub fn next_section(&mut self) -> Result<Option<(String, Vec<u8>)>> {
        if self.input.read_u8()? == 0 {
            return Ok(None);
        }
        let name_len = self.input.read_u32::<BigEndian>()? as usize;
        let mut name = vec![0u8; name_len];
        self.input.read_exact(&mut name)?;
        let name = String::from_utf8(name)
            .map_err(|_| Error::Io(io::Error::new(io::ErrorKind::InvalidData, "non-utf8 name")))?;

        let payload_len = self.input.read_u32::<BigEndian>()? as usize;
        let mut payload = vec![0u8; payload_len];
        self.input.read_exact(&mut payload)?;
        Ok(Some((name, payload)))
    }
}
