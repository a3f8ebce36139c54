//! File output of a fetch task.
//! 抓取任务的文件输出。

use super::traits::FileSink;
use crate::error::{Error, Result};
use std::{
    fs::{File, OpenOptions},
    io,
    os::unix::fs::FileExt,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Size of the zero buffer used for preallocation.
const ZERO_CHUNK: usize = 64 * 1024;

/// An output file written at fixed per-segment offsets.
///
/// The file is opened for writing without truncation, so an existing file keeps
/// any bytes outside of the fetched range.
///
/// 按固定分段偏移量写入的输出文件。
///
/// 文件以不截断的方式打开写入，因此已有文件在抓取范围之外的字节保持不变。
#[derive(Debug)]
pub struct FileOutput {
    file: Option<File>,
    path: PathBuf,
}

impl FileOutput {
    /// Opens `path` and preallocates `[offset, offset + len)`. On failure the
    /// file is closed and removed.
    ///
    /// 打开 `path` 并预分配 `[offset, offset + len)`。失败时关闭并删除该文件。
    pub fn create(path: impl AsRef<Path>, offset: u64, len: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
        {
            Ok(file) => file,
            Err(source) => return Err(Error::FileOutput { path, source }),
        };

        let mut output = Self {
            file: Some(file),
            path,
        };
        if let Err(source) = output.preallocate(offset, len) {
            output.file = None;
            if let Err(e) = std::fs::remove_file(&output.path) {
                warn!(path = ?output.path, error = %e, "Cannot remove output file");
            }
            return Err(Error::FileOutput {
                path: output.path,
                source,
            });
        }
        debug!(path = ?output.path, offset, len, "Output file preallocated");
        Ok(output)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> io::Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "output file is closed"))
    }
}

impl FileSink for FileOutput {
    fn preallocate(&mut self, offset: u64, len: u64) -> io::Result<()> {
        // Real blocks must be written; a sparse set_len reserves nothing.
        let file = self.file()?;
        let zeros = vec![0u8; ZERO_CHUNK.min(len as usize)];
        let end = offset + len;
        let mut pos = offset;
        while pos < end {
            let n = ((end - pos) as usize).min(zeros.len());
            file.write_all_at(&zeros[..n], pos)?;
            pos += n as u64;
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.file()?.write_all_at(buf, offset)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }
}
