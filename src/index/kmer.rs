use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::KmerError;

pub const DEFAULT_KMER_SIZE: usize = 25;

/// 打分时相邻两个 k-mer 起点之间的步长
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stride {
    /// 步长 1，检查所有窗口
    Exhaustive,
    /// 步长 k/2（至少为 1），采样模式
    #[default]
    HalfK,
    /// 固定步长（≥ 1）
    Fixed(usize),
}

impl Stride {
    #[inline]
    pub fn step(self, k: usize) -> usize {
        match self {
            Stride::Exhaustive => 1,
            Stride::HalfK => (k / 2).max(1),
            Stride::Fixed(n) => n.max(1),
        }
    }
}

impl FromStr for Stride {
    type Err = KmerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half" | "half-k" => Ok(Stride::HalfK),
            "exhaustive" | "all" => Ok(Stride::Exhaustive),
            other => match other.parse::<usize>() {
                Ok(0) | Err(_) => Err(KmerError::InvalidStride(s.to_string())),
                Ok(1) => Ok(Stride::Exhaustive),
                Ok(n) => Ok(Stride::Fixed(n)),
            },
        }
    }
}

impl fmt::Display for Stride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stride::Exhaustive => write!(f, "exhaustive"),
            Stride::HalfK => write!(f, "half"),
            Stride::Fixed(n) => write!(f, "{}", n),
        }
    }
}

/// 一条序列的匹配统计：检查的窗口数与命中索引的窗口数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitCount {
    pub hits: u64,
    pub total: u64,
}

impl HitCount {
    /// `hits / total`；`total == 0` 时无定义，返回 None
    pub fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.hits as f64 / self.total as f64)
        }
    }
}

impl std::ops::AddAssign for HitCount {
    fn add_assign(&mut self, rhs: Self) {
        self.hits += rhs.hits;
        self.total += rhs.total;
    }
}

/// 精确匹配 k-mer 索引：k-mer → 出现次数。
///
/// 多次调用 [`KmerIndex::index`] 会累加到同一张表中，索引表示所有已索引序列
/// k-mer 内容的并集。构建完成后只读，可在多个线程间共享查询。
#[derive(Debug, Clone)]
pub struct KmerIndex {
    k: usize,
    counts: AHashMap<Vec<u8>, u32>,
}

impl PartialEq for KmerIndex {
    fn eq(&self, other: &Self) -> bool {
        self.k == other.k && *self.counts == *other.counts
    }
}

impl Eq for KmerIndex {}

impl KmerIndex {
    pub fn new(k: usize) -> Result<Self, KmerError> {
        if k == 0 {
            return Err(KmerError::InvalidK);
        }
        Ok(Self { k, counts: AHashMap::new() })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// 步长 1 滑动窗口，累加每个 k-mer 的计数。长度不足 k 时不做任何事。
    pub fn index(&mut self, seq: &[u8]) {
        if seq.len() < self.k {
            return;
        }
        for kmer in seq.windows(self.k) {
            match self.counts.get_mut(kmer) {
                Some(n) => *n += 1,
                None => {
                    self.counts.insert(kmer.to_vec(), 1);
                }
            }
        }
    }

    /// 在位置 0, s, 2s, … 处取 k-mer 并检查是否在索引中。
    /// 序列短于 k 时返回 (0, 0)。
    pub fn count_hits(&self, seq: &[u8], stride: Stride) -> HitCount {
        let k = self.k;
        let n = seq.len();
        let mut hc = HitCount::default();
        if n < k {
            return hc;
        }
        let step = stride.step(k);
        for i in (0..=n - k).step_by(step) {
            hc.total += 1;
            if self.counts.contains_key(&seq[i..i + k]) {
                hc.hits += 1;
            }
        }
        hc
    }

    /// 命中比例；没有检查任何窗口时返回 [`KmerError::EmptyWindow`]
    pub fn frac_hits(&self, seq: &[u8], stride: Stride) -> Result<f64, KmerError> {
        self.count_hits(seq, stride)
            .fraction()
            .ok_or(KmerError::EmptyWindow { len: seq.len(), k: self.k })
    }

    #[inline]
    pub fn contains(&self, kmer: &[u8]) -> bool {
        self.counts.contains_key(kmer)
    }

    /// Occurrence count of `kmer` across all indexed sequences (0 if absent).
    pub fn occurrences(&self, kmer: &[u8]) -> u32 {
        self.counts.get(kmer).copied().unwrap_or(0)
    }

    /// Number of distinct k-mers.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all occurrence counts.
    pub fn total_kmers(&self) -> u64 {
        self.counts.values().map(|&n| n as u64).sum()
    }
}
