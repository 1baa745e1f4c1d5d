//! Splits a raw MJPEG byte stream into individual JPEG payloads.
//!
//! The stream carries no framing of its own, so payload boundaries are
//! recovered from the JPEG start-of-image and end-of-image markers.

pub const START_OF_IMAGE: [u8; 2] = [0xFF, 0xD8];
pub const END_OF_IMAGE: [u8; 2] = [0xFF, 0xD9];

/// Position of the first occurrence of `marker` in `haystack`.
pub fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|window| window == marker)
}

/// Accumulates stream bytes and hands out complete payloads one at a time.
///
/// After every extraction the buffer holds only bytes that follow the
/// emitted payload's end marker, so it is bounded by the distance between
/// two frame delimiters.
#[derive(Debug, Default)]
pub struct FrameDemuxer {
    buffer: Vec<u8>,
}

impl FrameDemuxer {
    pub fn new() -> Self {
        FrameDemuxer { buffer: Vec::new() }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pulls out the oldest complete payload, markers included. Returns
    /// `None` when the buffer does not yet hold a whole image.
    pub fn extract(&mut self) -> Option<Vec<u8>> {
        let start = match find_marker(&self.buffer, START_OF_IMAGE) {
            Some(start) => start,
            None => {
                self.discard_garbage();
                return None;
            }
        };

        let body = &self.buffer[start + START_OF_IMAGE.len()..];
        let end = start + START_OF_IMAGE.len() + find_marker(body, END_OF_IMAGE)?;
        let stop = end + END_OF_IMAGE.len();

        let payload = self.buffer[start..stop].to_vec();
        self.buffer.drain(..stop);

        Some(payload)
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    // Without a start marker nothing in the buffer can become part of a
    // payload, except a trailing 0xFF that may open the next marker.
    fn discard_garbage(&mut self) {
        let keep = match self.buffer.last() {
            Some(&byte) if byte == START_OF_IMAGE[0] => 1,
            _ => 0,
        };
        let len = self.buffer.len();
        self.buffer.drain(..len - keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(fill: u8, len: usize) -> Vec<u8> {
        let mut bytes = START_OF_IMAGE.to_vec();
        bytes.extend(std::iter::repeat(fill).take(len));
        bytes.extend_from_slice(&END_OF_IMAGE);
        bytes
    }

    #[test]
    fn test_find_marker() {
        assert_eq!(find_marker(&[0x00, 0xFF, 0xD8, 0x01], START_OF_IMAGE), Some(1));
        assert_eq!(find_marker(&[0xFF], START_OF_IMAGE), None);
        assert_eq!(find_marker(&[], END_OF_IMAGE), None);
    }

    #[test]
    fn test_waits_for_end_marker() {
        let mut demuxer = FrameDemuxer::new();
        let frame = payload(0x11, 32);

        demuxer.push(&frame[..20]);
        assert_eq!(demuxer.extract(), None);

        demuxer.push(&[]);
        assert_eq!(demuxer.extract(), None);

        demuxer.push(&frame[20..]);
        assert_eq!(demuxer.extract(), Some(frame));
        assert_eq!(demuxer.buffered_len(), 0);
    }

    #[test]
    fn test_arbitrary_chunking_preserves_payloads() {
        let frames: Vec<Vec<u8>> = (0..6u8).map(|i| payload(i + 1, 10 + i as usize * 7)).collect();
        let stream: Vec<u8> = frames.concat();

        for chunk_size in [1, 2, 3, 5, 13, 64, stream.len()] {
            let mut demuxer = FrameDemuxer::new();
            let mut emitted = Vec::new();

            for chunk in stream.chunks(chunk_size) {
                demuxer.push(chunk);
                // One payload per iteration, like the driver loop.
                if let Some(frame) = demuxer.extract() {
                    emitted.push(frame);
                }
            }
            while let Some(frame) = demuxer.extract() {
                emitted.push(frame);
            }

            assert_eq!(emitted, frames, "chunk size {}", chunk_size);
            assert_eq!(demuxer.buffered_len(), 0);
        }
    }

    #[test]
    fn test_keeps_remaining_frames_buffered() {
        let first = payload(0x21, 8);
        let second = payload(0x22, 8);

        let mut demuxer = FrameDemuxer::new();
        demuxer.push(&[first.clone(), second.clone()].concat());

        assert_eq!(demuxer.extract(), Some(first));
        assert_eq!(demuxer.buffered_len(), second.len());
        assert_eq!(demuxer.extract(), Some(second));
        assert_eq!(demuxer.extract(), None);
    }

    #[test]
    fn test_no_residue_after_extraction() {
        let frame = payload(0x33, 16);
        let mut stream = vec![0x01, 0x02];
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(&[0xFF, 0xD8, 0x44]);

        let mut demuxer = FrameDemuxer::new();
        demuxer.push(&stream);

        assert_eq!(demuxer.extract(), Some(frame));
        assert_eq!(demuxer.buffered_len(), 3);
    }

    #[test]
    fn test_end_marker_before_start_is_ignored() {
        let frame = payload(0x55, 4);
        let mut stream = END_OF_IMAGE.to_vec();
        stream.extend_from_slice(&frame);

        let mut demuxer = FrameDemuxer::new();
        demuxer.push(&stream);

        assert_eq!(demuxer.extract(), Some(frame));
    }

    #[test]
    fn test_garbage_without_start_marker_is_dropped() {
        let mut demuxer = FrameDemuxer::new();
        demuxer.push(&[0x01; 100]);
        assert_eq!(demuxer.extract(), None);
        assert_eq!(demuxer.buffered_len(), 0);

        // A split start marker survives compaction.
        demuxer.push(&[0x02, 0xFF]);
        assert_eq!(demuxer.extract(), None);
        assert_eq!(demuxer.buffered_len(), 1);

        demuxer.push(&[0xD8, 0x07, 0xFF, 0xD9]);
        assert_eq!(demuxer.extract(), Some(vec![0xFF, 0xD8, 0x07, 0xFF, 0xD9]));
    }
}
