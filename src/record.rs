//! TFRecord container framing
//!
//! A TFRecord file is a plain concatenation of records, each framed as
//! `len: u64 LE`, `masked_crc32c(len): u32 LE`, `data`, `masked_crc32c(data): u32 LE`.
//! There is no header and no index, so an empty file is a valid container.

use std::io::{self, Read, Write};

const MASK_DELTA: u32 = 0xa282_ead8;

/// Masked checksum as stored in TFRecord frames
pub fn masked_crc32c(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Errors raised while reading framed records back.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("record truncated while reading {0}")]
    Truncated(&'static str),

    #[error("checksum mismatch on record {0}")]
    ChecksumMismatch(&'static str),
}

/// Appends framed records to an underlying writer.
pub struct RecordWriter<W: Write> {
    inner: W,
    records_written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records_written: 0,
        }
    }

    pub fn write_record(&mut self, data: &[u8]) -> io::Result<()> {
        let len = (data.len() as u64).to_le_bytes();
        self.inner.write_all(&len)?;
        self.inner.write_all(&masked_crc32c(&len).to_le_bytes())?;
        self.inner.write_all(data)?;
        self.inner.write_all(&masked_crc32c(data).to_le_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Iterates over the records of a TFRecord stream, validating both checksums.
pub struct RecordReader<R: Read> {
    inner: R,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, done: false }
    }

    fn read_record(&mut self) -> Result<Option<Vec<u8>>, RecordError> {
        let mut len_bytes = [0u8; 8];
        match read_full(&mut self.inner, &mut len_bytes)? {
            0 => return Ok(None),
            8 => {}
            _ => return Err(RecordError::Truncated("length")),
        }

        let len_crc = read_u32(&mut self.inner, "length checksum")?;
        if len_crc != masked_crc32c(&len_bytes) {
            return Err(RecordError::ChecksumMismatch("length"));
        }

        let len = u64::from_le_bytes(len_bytes);
        // Grow with the stream instead of trusting the declared length
        let mut data = Vec::new();
        (&mut self.inner).take(len).read_to_end(&mut data)?;
        if usize::try_from(len).map_or(true, |len| data.len() != len) {
            return Err(RecordError::Truncated("data"));
        }

        let data_crc = read_u32(&mut self.inner, "data checksum")?;
        if data_crc != masked_crc32c(&data) {
            return Err(RecordError::ChecksumMismatch("data"));
        }

        Ok(Some(data))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Vec<u8>, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.read_record().transpose();
        if !matches!(result, Some(Ok(_))) {
            self.done = true;
        }
        result
    }
}

/// Read until `buf` is full or EOF, returning the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn read_u32<R: Read>(reader: &mut R, what: &'static str) -> Result<u32, RecordError> {
    let mut bytes = [0u8; 4];
    if read_full(reader, &mut bytes)? != 4 {
        return Err(RecordError::Truncated(what));
    }
    Ok(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn framed(records: &[&[u8]]) -> Vec<u8> {
        let mut writer = RecordWriter::new(Vec::new());
        for record in records {
            writer.write_record(record).unwrap();
        }
        writer.into_inner()
    }

    #[test]
    fn test_masked_crc32c() {
        let crc = crc32c::crc32c(b"123456789");
        assert_eq!(crc, 0xe306_9283);
        assert_eq!(
            masked_crc32c(b"123456789"),
            ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
        );
    }

    #[test]
    fn test_frame_layout() {
        let bytes = framed(&[b"abc"]);
        assert_eq!(bytes.len(), 8 + 4 + 3 + 4);
        assert_eq!(&bytes[..8], &3u64.to_le_bytes());
        assert_eq!(&bytes[8..12], &masked_crc32c(&3u64.to_le_bytes()).to_le_bytes());
        assert_eq!(&bytes[12..15], b"abc");
        assert_eq!(&bytes[15..], &masked_crc32c(b"abc").to_le_bytes());
    }

    #[test]
    fn test_reader_returns_records_in_order() {
        let bytes = framed(&[b"first", b"", b"third"]);
        let records: Vec<_> = RecordReader::new(Cursor::new(bytes))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records, vec![b"first".to_vec(), Vec::new(), b"third".to_vec()]);
    }

    #[test]
    fn test_empty_stream_has_no_records() {
        let mut reader = RecordReader::new(Cursor::new(Vec::new()));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_corrupted_data_is_detected() {
        let mut bytes = framed(&[b"payload"]);
        bytes[13] ^= 0xff;
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.next(),
            Some(Err(RecordError::ChecksumMismatch("data")))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_corrupted_length_is_detected() {
        let mut bytes = framed(&[b"payload"]);
        bytes[0] ^= 0xff;
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.next(),
            Some(Err(RecordError::ChecksumMismatch("length")))
        ));
    }

    #[test]
    fn test_oversized_length_is_truncated_not_allocated() {
        let len = (u64::MAX / 2).to_le_bytes();
        let mut bytes = len.to_vec();
        bytes.extend_from_slice(&masked_crc32c(&len).to_le_bytes());
        bytes.extend_from_slice(b"short");

        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.next(),
            Some(Err(RecordError::Truncated("data")))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_truncated_stream_is_detected() {
        let mut bytes = framed(&[b"payload"]);
        bytes.truncate(bytes.len() - 2);
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.next(),
            Some(Err(RecordError::Truncated(_)))
        ));
    }
}
