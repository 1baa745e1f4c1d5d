use std::io;

use anyhow::Result;
use opencv::core::Mat;

use crate::types::DetectionBox;

/// An unbounded byte stream of concatenated JPEG images.
pub trait ByteSource {
    /// Reads the next chunk into `buf`. `Ok(0)` means the producer closed.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Stops the producer. Calling this more than once must be harmless.
    fn terminate(&mut self) -> Result<()>;
}

pub trait FrameDecoder {
    /// Decodes one image payload. A corrupt payload is `Ok(None)`, not an error.
    fn decode(&self, payload: &[u8]) -> Result<Option<Mat>>;
}

pub trait Detector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<DetectionBox>>;
}

pub trait DisplaySink {
    fn show(&mut self, frame: &Mat) -> Result<()>;

    /// Waits briefly for input and reports whether the user asked to quit.
    fn poll_quit(&mut self) -> Result<bool>;

    fn release(&mut self) -> Result<()>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_chunk(buf)
    }

    fn terminate(&mut self) -> Result<()> {
        (**self).terminate()
    }
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn show(&mut self, frame: &Mat) -> Result<()> {
        (**self).show(frame)
    }

    fn poll_quit(&mut self) -> Result<bool> {
        (**self).poll_quit()
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}
