use std::path::PathBuf;

use thiserror::Error;

/// 读取参考序列或 reads 文件时的错误。整个文件的加载一起失败，不做部分成功。
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {format} file '{}' at line {line}: {defect}", .path.display())]
    Malformed {
        format: &'static str,
        path: PathBuf,
        line: usize,
        defect: String,
    },
    #[error("FASTA file '{}' contains no sequences", .path.display())]
    EmptyFasta { path: PathBuf },
    #[error("unable to find sequence with name similar to '{name}' in file '{}'", .path.display())]
    ReferenceNotFound { name: String, path: PathBuf },
}

/// k-mer 索引与打分相关的错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KmerError {
    #[error("k-mer size must be at least 1")]
    InvalidK,
    #[error("stride must be at least 1 (got '{0}')")]
    InvalidStride(String),
    /// 没有任何窗口被检查，命中比例无定义
    #[error("no k-mer windows examined: sequence length {len} is shorter than k={k}")]
    EmptyWindow { len: usize, k: usize },
}
