//! Trace input for replay
//!
//! Two line formats are accepted, and may be mixed across files:
//!
//! - whitespace separated `<timestamp> <key> <size> [...]`, the classic `.tr`
//!   layout (anything after the size is ignored)
//! - CSV `timestamp,key,size[,ttl]`, with an optional header row
//!
//! Blank lines and lines starting with `#` are skipped. Requests are streamed
//! one line at a time, so memory stays proportional to the cache, not the trace.

use crate::models::Request;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for trace parsing
#[derive(Debug, Error)]
pub enum TraceParseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("no trace files found in {0}")]
    NoTraceFiles(PathBuf),
}

/// Reader for request traces
#[derive(Debug)]
pub struct LogReader {
    input: PathBuf,
}

impl LogReader {
    /// Create a reader for a trace file or a directory of trace files
    pub fn new<P: AsRef<Path>>(input: P) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
        }
    }

    /// Trace files to replay, sorted by name
    ///
    /// A file input is returned as is, whatever its extension. In a
    /// directory only `.tr`, `.log`, `.csv` and `.txt` files are picked up.
    pub fn get_log_files(&self) -> Result<Vec<PathBuf>, TraceParseError> {
        if self.input.is_file() {
            return Ok(vec![self.input.clone()]);
        }

        let mut log_files = Vec::new();
        for entry in fs::read_dir(&self.input)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(ext) = path.extension() {
                if ext == "tr" || ext == "log" || ext == "csv" || ext == "txt" {
                    log_files.push(path);
                }
            }
        }

        if log_files.is_empty() {
            return Err(TraceParseError::NoTraceFiles(self.input.clone()));
        }
        log_files.sort();
        Ok(log_files)
    }

    /// Parse a single line into a Request
    ///
    /// `line_num` is zero-based; errors report it one-based.
    pub fn parse_line(line: &str, line_num: usize) -> Result<Option<Request>, String> {
        let line = line.trim();

        // Skip empty lines, comments, and header row
        if line.is_empty() || line.starts_with('#') || (line_num == 0 && line.contains("timestamp"))
        {
            return Ok(None);
        }

        let mut fields: Box<dyn Iterator<Item = &str>> = if line.contains(',') {
            Box::new(line.splitn(4, ',').map(str::trim))
        } else {
            Box::new(line.split_whitespace())
        };

        let ts_str = fields.next().ok_or("missing timestamp")?;
        let timestamp = parse_timestamp(ts_str)
            .ok_or_else(|| format!("invalid timestamp: {ts_str}"))?;

        let key = fields.next().filter(|k| !k.is_empty()).ok_or("missing key")?;

        let size_str = fields.next().ok_or("missing size")?;
        let size = size_str
            .parse::<usize>()
            .map_err(|_| format!("invalid size: {size_str}"))?;

        Ok(Some(Request::new(timestamp, key, size)))
    }

    /// Parse a whole trace file into memory
    #[cfg(test)]
    pub(crate) fn parse_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Vec<Request>, TraceParseError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut requests = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            match Self::parse_line(&line, line_num) {
                Ok(Some(request)) => requests.push(request),
                Ok(None) => {}
                Err(message) => {
                    return Err(TraceParseError::Parse {
                        path: path.to_path_buf(),
                        line: line_num + 1,
                        message,
                    })
                }
            }
        }

        Ok(requests)
    }

    /// Create a streaming iterator over all requests in all trace files,
    /// in file order and then line order.
    pub fn stream_requests(&self) -> Result<RequestIterator, TraceParseError> {
        let log_files = self.get_log_files()?;
        Ok(RequestIterator::new(log_files))
    }
}

// Some traces carry fractional timestamps; only the integer part is kept.
fn parse_timestamp(s: &str) -> Option<u64> {
    s.parse::<u64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map(|t| t as u64)
    })
}

/// Iterator that streams requests from multiple trace files
#[derive(Debug)]
pub struct RequestIterator {
    files: Vec<PathBuf>,
    current_file_index: usize,
    current_reader: Option<BufReader<File>>,
    current_line_num: usize,
    line_buffer: String,
}

impl RequestIterator {
    fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            current_file_index: 0,
            current_reader: None,
            current_line_num: 0,
            line_buffer: String::with_capacity(256),
        }
    }

    /// Open the next file for reading
    fn open_next_file(&mut self) -> io::Result<bool> {
        let Some(path) = self.files.get(self.current_file_index) else {
            return Ok(false);
        };

        log::debug!("replaying {}", path.display());
        let file = File::open(path)?;
        // 1MB buffer
        self.current_reader = Some(BufReader::with_capacity(1024 * 1024, file));
        self.current_line_num = 0;
        self.current_file_index += 1;
        Ok(true)
    }

    fn current_path(&self) -> PathBuf {
        self.current_file_index
            .checked_sub(1)
            .and_then(|i| self.files.get(i))
            .cloned()
            .unwrap_or_default()
    }
}

impl Iterator for RequestIterator {
    type Item = Result<Request, TraceParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_reader.is_none() {
                match self.open_next_file() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e.into())),
                }
            }

            let reader = self.current_reader.as_mut()?;
            self.line_buffer.clear();
            match reader.read_line(&mut self.line_buffer) {
                Ok(0) => {
                    // EOF, move to the next file
                    self.current_reader = None;
                }
                Ok(_) => {
                    let line_num = self.current_line_num;
                    self.current_line_num += 1;

                    match LogReader::parse_line(&self.line_buffer, line_num) {
                        Ok(Some(request)) => return Some(Ok(request)),
                        Ok(None) => {}
                        Err(message) => {
                            return Some(Err(TraceParseError::Parse {
                                path: self.current_path(),
                                line: line_num + 1,
                                message,
                            }))
                        }
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
