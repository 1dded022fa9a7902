//! # klamp
//!
//! 在 LAMP 扩增的纳米孔测序 reads 中筛查目标病毒基因组，不做完整比对。
//!
//! 纳米孔信号中同聚物（连续重复碱基）的长度不可靠，因此参考序列和每条 read
//! 都先折叠为游程形式，再用精确匹配的 k-mer 索引统计命中比例：
//!
//! - **游程折叠**：`AAGGTT` → `AGT` + `[2, 2, 2]`
//! - **k-mer 索引**：对折叠后的参考正链与反向互补链建立 k-mer → 次数 的索引
//! - **打分**：以步长 1（穷举）或 k/2（采样）滑动窗口，统计命中窗口数
//! - **汇总**：按样本累加命中数与窗口数，输出百分比
//!
//! ## 快速示例
//!
//! ```rust
//! use klamp::index::kmer::Stride;
//! use klamp::index::reference::ReferenceIndex;
//! use klamp::util::rle::RunLengths;
//!
//! let index = ReferenceIndex::build("ref", b"AAGGTT", 3).unwrap();
//! let read = RunLengths::collapse(b"AAGGTTCCCC");
//! let hc = index.kmers().count_hits(&read.collapsed, Stride::Exhaustive);
//! assert_eq!((hc.hits, hc.total), (1, 2));
//! assert_eq!(hc.fraction(), Some(0.5));
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — FASTA 参考序列 / FASTQ reads 读取（支持 gzip）
//! - [`index`] — k-mer 索引与参考索引
//! - [`detect`] — 逐样本打分与汇总报告
//! - [`util`] — 游程折叠、反向互补等工具函数

pub mod detect;
pub mod error;
pub mod index;
pub mod io;
pub mod util;

pub use detect::{DetectOpt, RunSummary, SampleReport};
pub use error::{KmerError, LoadError};
