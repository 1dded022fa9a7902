pub mod fasta;
pub mod fastq;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::LoadError;

/// 打开输入文件；以 `.gz` 结尾的文件透明解压
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>, LoadError> {
    let fh = File::open(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let gzipped = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(fh))))
    } else {
        Ok(Box::new(BufReader::new(fh)))
    }
}
