use anyhow::Result;
use opencv::{
    core::{Mat, Vector},
    imgcodecs,
    prelude::*,
};
use tracing::debug;

use crate::traits::FrameDecoder;

/// Decodes JPEG payloads into BGR frames with OpenCV.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegDecoder;

impl FrameDecoder for JpegDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Option<Mat>> {
        let buf = Vector::<u8>::from_slice(payload);

        match imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR) {
            Ok(frame) if !frame.empty() => Ok(Some(frame)),
            Ok(_) => Ok(None),
            Err(error) => {
                debug!(%error, len = payload.len(), "imdecode rejected payload");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{encode_jpeg, solid_frame};

    #[test]
    fn test_decodes_encoded_frame() {
        let frame = solid_frame(48, 64, (20., 40., 60.));
        let jpeg = encode_jpeg(&frame);

        let decoded = JpegDecoder.decode(&jpeg).unwrap().unwrap();
        assert_eq!(decoded.rows(), 48);
        assert_eq!(decoded.cols(), 64);
        assert_eq!(decoded.channels(), 3);
    }

    #[test]
    fn test_corrupt_payload_is_none() {
        let garbage = [0xFF, 0xD8, 0x00, 0x13, 0x37, 0xFF, 0xD9];
        assert!(JpegDecoder.decode(&garbage).unwrap().is_none());
        assert!(JpegDecoder.decode(&[]).unwrap().is_none());
    }
}
