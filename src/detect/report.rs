use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::{DetectOpt, ReadScore};
use crate::index::reference::ReferenceIndex;

#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    pub name: String,
    pub n_reads: usize,
    pub n_bases: usize,
    /// 折叠后长度 ≥ k、参与统计的 reads
    pub n_scored: usize,
    pub n_skipped_short: usize,
    pub hits: u64,
    pub total: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub read_scores: Vec<ReadScore>,
}

impl SampleReport {
    /// 样本级命中百分比；没有任何 k-mer 被检查时为 None（"no data"）
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(100.0 * self.hits as f64 / self.total as f64)
        }
    }

    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for rs in &self.read_scores {
            writeln!(
                out,
                "#read\t{}\t{}\t{}\t{:.2}\t{}/{}\t{:.2}%",
                rs.id,
                rs.raw_len,
                rs.collapsed_len,
                rs.compression_ratio,
                rs.hits,
                rs.total,
                100.0 * rs.fraction()
            )?;
        }
        let pct = match self.percent() {
            Some(p) => format!("{:.2}%", p),
            None => "no data".to_string(),
        };
        writeln!(
            out,
            "{}\t{}/{}\t{}/{}\t{}",
            self.name, self.n_scored, self.n_reads, self.hits, self.total, pct
        )
    }
}

#[derive(Debug, Serialize)]
struct ReferenceInfo {
    path: String,
    name: String,
    raw_len: usize,
    collapsed_len: usize,
    distinct_kmers: usize,
}

/// JSON 汇总
#[derive(Debug, Serialize)]
pub struct RunSummary {
    version: String,
    timestamp: String,
    reference: ReferenceInfo,
    options: DetectOpt,
    pub samples: Vec<SampleReport>,
}

impl RunSummary {
    pub fn new(index: &ReferenceIndex, reference_path: &Path, options: DetectOpt, samples: Vec<SampleReport>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            reference: ReferenceInfo {
                path: reference_path.display().to_string(),
                name: index.name.clone(),
                raw_len: index.raw_len,
                collapsed_len: index.collapsed_len,
                distinct_kmers: index.kmers().len(),
            },
            options,
            samples,
        }
    }

    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "#sample\tscored/reads\thits/kmers\tpercent")?;
        for s in &self.samples {
            s.write_text(out)?;
        }
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("cannot create summary '{}'", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).context("failed to write summary")?;
        Ok(())
    }
}
