//! 检测流程：参考索引 → 逐条 read 折叠、打分 → 样本级汇总。

pub mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::index::kmer::{HitCount, Stride, DEFAULT_KMER_SIZE};
use crate::index::reference::ReferenceIndex;
use crate::io::fasta;
use crate::io::fastq::{self, FastqRecord, ReadSet};
use crate::util::rle::RunLengths;

pub use report::{RunSummary, SampleReport};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectOpt {
    pub kmer_size: usize,
    pub stride: Stride,
    /// 记录每条 read 的诊断信息
    pub verbose: bool,
    pub decode_quals: bool,
    /// 0 = rayon 默认线程数
    pub threads: usize,
}

impl Default for DetectOpt {
    fn default() -> Self {
        Self {
            kmer_size: DEFAULT_KMER_SIZE,
            stride: Stride::HalfK,
            verbose: false,
            decode_quals: false,
            threads: 0,
        }
    }
}

/// 单条 read 的打分诊断
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadScore {
    pub id: String,
    pub raw_len: usize,
    pub collapsed_len: usize,
    pub compression_ratio: f64,
    pub hits: u64,
    pub total: u64,
}

impl ReadScore {
    pub fn fraction(&self) -> f64 {
        // total > 0 for every scored read
        self.hits as f64 / self.total as f64
    }
}

/// 折叠并打分一条 read。折叠后长度不足 k 的 read 返回 None，不计入统计。
pub fn score_read(index: &ReferenceIndex, seq: &[u8], stride: Stride) -> Option<(RunLengths, HitCount)> {
    let rl = RunLengths::collapse(seq);
    if rl.len() < index.k() {
        return None;
    }
    let hc = index.kmers().count_hits(&rl.collapsed, stride);
    Some((rl, hc))
}

/// 每个工作线程私有的部分汇总，最后按加法归约
#[derive(Debug, Default)]
struct SampleTally {
    scored: usize,
    skipped_short: usize,
    counts: HitCount,
    read_scores: Vec<ReadScore>,
}

impl SampleTally {
    fn add_read(mut self, index: &ReferenceIndex, rec: &FastqRecord, opt: &DetectOpt) -> Self {
        match score_read(index, &rec.seq, opt.stride) {
            None => self.skipped_short += 1,
            Some((rl, hc)) => {
                self.scored += 1;
                self.counts += hc;
                if opt.verbose {
                    self.read_scores.push(ReadScore {
                        id: rec.id.clone(),
                        raw_len: rec.seq.len(),
                        collapsed_len: rl.len(),
                        compression_ratio: rl.compression_ratio().unwrap_or(1.0),
                        hits: hc.hits,
                        total: hc.total,
                    });
                }
            }
        }
        self
    }

    fn merge(mut self, mut other: Self) -> Self {
        self.scored += other.scored;
        self.skipped_short += other.skipped_short;
        self.counts += other.counts;
        self.read_scores.append(&mut other.read_scores);
        self
    }
}

/// 对一个样本的所有 reads 打分。调用方负责在合适的 rayon 线程池中执行。
pub fn score_sample(index: &ReferenceIndex, name: &str, reads: &ReadSet, opt: &DetectOpt) -> SampleReport {
    let tally = reads
        .records()
        .par_iter()
        .fold(SampleTally::default, |acc, rec| acc.add_read(index, rec, opt))
        .reduce(SampleTally::default, SampleTally::merge);

    SampleReport {
        name: name.to_string(),
        n_reads: reads.len(),
        n_bases: reads.num_bases(),
        n_scored: tally.scored,
        n_skipped_short: tally.skipped_short,
        hits: tally.counts.hits,
        total: tally.counts.total,
        read_scores: tally.read_scores,
    }
}

pub fn build_reference(path: &Path, name: &str, kmer_size: usize) -> Result<ReferenceIndex> {
    let rec = fasta::load_reference(path, name)?;
    info!("Read {:.1}kb reference '{}' from {}", rec.seq.len() as f64 / 1000.0, rec.id, path.display());

    let index = ReferenceIndex::build(rec.id, &rec.seq, kmer_size)
        .with_context(|| format!("cannot index reference from '{}'", path.display()))?;
    info!(
        "Collapsed repeats in reference: {:.1}kb ({} distinct {}-mers on both strands)",
        index.collapsed_len as f64 / 1000.0,
        index.kmers().len(),
        index.k()
    );
    Ok(index)
}

/// 完整流程：读入并索引参考序列，然后依次处理每个样本文件。
pub fn run(reference: &Path, reference_name: &str, samples: &[PathBuf], opt: DetectOpt) -> Result<RunSummary> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build()
        .context("failed to initialize thread pool")?;

    let index = build_reference(reference, reference_name, opt.kmer_size)?;

    let mut reports = Vec::with_capacity(samples.len());
    for path in samples {
        info!("Reading sample '{}'...", path.display());
        let reads = fastq::load_reads(path, opt.decode_quals)?;
        info!(
            "Read {} reads ({:.1}kb) from sample '{}'",
            reads.len(),
            reads.num_bases() as f64 / 1000.0,
            path.display()
        );

        let name = path.display().to_string();
        let report = pool.install(|| score_sample(&index, &name, &reads, &opt));
        debug!("{} reads shorter than k after collapsing in '{}'", report.n_skipped_short, name);
        match report.percent() {
            Some(p) => info!(
                "Sample '{}': {}/{} k-mers matched ({:.2}%)",
                name, report.hits, report.total, p
            ),
            None => info!("Sample '{}': no data (no read reached k={} after collapsing)", name, index.k()),
        }
        reports.push(report);
    }

    Ok(RunSummary::new(&index, reference, opt, reports))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, seq: &[u8]) -> FastqRecord {
        FastqRecord {
            id: id.to_string(),
            seq: seq.to_vec(),
            qual: vec![0; seq.len()],
            metadata: Default::default(),
        }
    }

    fn make_seq(len: usize, seed: u32) -> Vec<u8> {
        let bases = [b'A', b'C', b'G', b'T'];
        let mut x = seed;
        let mut seq = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            seq.push(bases[(x >> 16) as usize % 4]);
        }
        seq
    }

    #[test]
    fn short_reads_are_excluded() {
        let index = ReferenceIndex::build("ref", b"AAGGTT", 3).unwrap();
        // collapses to AG: shorter than k
        assert!(score_read(&index, b"AAAAGGGG", Stride::Exhaustive).is_none());
        assert!(score_read(&index, b"", Stride::Exhaustive).is_none());

        let reads: ReadSet = vec![record("short", b"AAAAGGGG"), record("hit", b"AAGGTTCCCC")]
            .into_iter()
            .collect();
        let opt = DetectOpt { kmer_size: 3, stride: Stride::Exhaustive, ..DetectOpt::default() };
        let report = score_sample(&index, "s", &reads, &opt);
        assert_eq!(report.n_reads, 2);
        assert_eq!(report.n_scored, 1);
        assert_eq!(report.n_skipped_short, 1);
        assert_eq!((report.hits, report.total), (1, 2));
        assert_eq!(report.percent(), Some(50.0));
        assert!(report.read_scores.is_empty());
    }

    #[test]
    fn sample_without_scorable_reads_has_no_percentage() {
        let index = ReferenceIndex::build("ref", b"ACGTACGTAC", 5).unwrap();
        let reads: ReadSet = vec![record("a", b"AAAACCCC")].into_iter().collect();
        let report = score_sample(&index, "s", &reads, &DetectOpt { kmer_size: 5, ..DetectOpt::default() });
        assert_eq!(report.total, 0);
        assert_eq!(report.percent(), None);
    }

    #[test]
    fn verbose_records_reads_in_input_order() {
        let reference = make_seq(2_000, 11);
        let index = ReferenceIndex::build("ref", &reference, 15).unwrap();
        let reads: ReadSet = (0..200)
            .map(|i| {
                let seq = if i % 3 == 0 {
                    make_seq(300, 1000 + i)
                } else {
                    let start = (i as usize * 7) % 1_500;
                    reference[start..start + 300].to_vec()
                };
                record(&format!("read{}", i), &seq)
            })
            .collect();

        let opt = DetectOpt { kmer_size: 15, stride: Stride::Exhaustive, verbose: true, threads: 4, ..DetectOpt::default() };
        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let report = pool.install(|| score_sample(&index, "s", &reads, &opt));

        assert_eq!(report.read_scores.len(), 200);
        for (i, rs) in report.read_scores.iter().enumerate() {
            assert_eq!(rs.id, format!("read{}", i));
            assert!(rs.compression_ratio >= 1.0);
            if i % 3 != 0 {
                assert_eq!(rs.hits, rs.total);
            }
        }
        let hits: u64 = report.read_scores.iter().map(|r| r.hits).sum();
        let total: u64 = report.read_scores.iter().map(|r| r.total).sum();
        assert_eq!((report.hits, report.total), (hits, total));
    }

    #[test]
    fn parallel_and_sequential_totals_agree() {
        let reference = make_seq(3_000, 5);
        let index = ReferenceIndex::build("ref", &reference, 25).unwrap();
        let reads: ReadSet = (0..100)
            .map(|i| {
                let mut seq = reference[i * 20..i * 20 + 500].to_vec();
                seq[250] = b'N';
                record(&format!("r{}", i), &seq)
            })
            .collect();
        let opt = DetectOpt::default();

        let one = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let many = rayon::ThreadPoolBuilder::new().num_threads(8).build().unwrap();
        let a = one.install(|| score_sample(&index, "s", &reads, &opt));
        let b = many.install(|| score_sample(&index, "s", &reads, &opt));
        assert_eq!((a.hits, a.total), (b.hits, b.total));
        assert!(a.hits < a.total);
    }
}
