use std::{
    fs::File,
    io::{self, Read},
    process::{Child, ChildStdout, Command, Stdio},
};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{config::CaptureConfig, traits::ByteSource};

/// An external program writing concatenated JPEGs to its stdout.
///
/// The child is stopped on `terminate` or, failing that, on drop.
pub struct CaptureProcess {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl CaptureProcess {
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        info!(program, ?args, "starting capture process");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start capture process {:?}", program))?;

        let stdout = child
            .stdout
            .take()
            .context("Capture process has no stdout pipe")?;

        Ok(CaptureProcess {
            child: Some(child),
            stdout: Some(stdout),
        })
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

impl ByteSource for CaptureProcess {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stdout.as_mut() {
            Some(stdout) => stdout.read(buf),
            None => Ok(0),
        }
    }

    fn terminate(&mut self) -> Result<()> {
        let mut child = match self.child.take() {
            Some(child) => child,
            None => return Ok(()),
        };

        // Closing the pipe first lets a well-behaved producer exit on SIGPIPE.
        self.stdout = None;

        if let Err(error) = child.kill() {
            // InvalidInput means the child had already exited.
            if error.kind() != io::ErrorKind::InvalidInput {
                return Err(error).context("Failed to stop capture process");
            }
        }

        let status = child
            .wait()
            .context("Failed to reap capture process")?;
        info!(%status, "capture process stopped");

        Ok(())
    }
}

impl Drop for CaptureProcess {
    fn drop(&mut self) {
        if let Err(error) = self.terminate() {
            warn!("{:#}", error);
        }
    }
}

/// Any reader holding an MJPEG stream, such as a recording or a pipe.
pub struct ReaderSource<R> {
    reader: R,
    closed: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderSource {
            reader,
            closed: false,
        }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Ok(0);
        }
        self.reader.read(buf)
    }

    fn terminate(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Opens the byte stream the config asks for: a file, stdin (`-`), or the
/// capture program.
pub fn open_source(config: &CaptureConfig) -> Result<Box<dyn ByteSource>> {
    match &config.input {
        Some(path) if path.as_os_str() == "-" => {
            info!("reading stream from stdin");
            Ok(Box::new(ReaderSource::new(io::stdin())))
        }
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open stream file {}", path.display()))?;
            info!(path = %path.display(), "reading stream from file");
            Ok(Box::new(ReaderSource::new(file)))
        }
        None => Ok(Box::new(CaptureProcess::spawn(&config.program, &config.args)?)),
    }
}
