use crate::error::KmerError;
use crate::util::dna;
use crate::util::rle::RunLengths;

use super::kmer::KmerIndex;

/// 参考基因组的 k-mer 索引（正链 + 反向互补链）。
///
/// 参考序列先经过同聚物折叠，再对折叠后的正链和它的反向互补分别建索引。
/// 折叠与反向互补可交换，所以这等价于对反向互补序列先折叠再建索引。
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    pub name: String,
    /// 原始参考长度
    pub raw_len: usize,
    /// 折叠后参考长度
    pub collapsed_len: usize,
    kmers: KmerIndex,
}

impl ReferenceIndex {
    pub fn build(name: impl Into<String>, seq: &[u8], k: usize) -> Result<Self, KmerError> {
        let rl = RunLengths::collapse(seq);
        let mut kmers = KmerIndex::new(k)?;
        kmers.index(&rl.collapsed);
        kmers.index(&dna::revcomp(&rl.collapsed));
        Ok(Self {
            name: name.into(),
            raw_len: seq.len(),
            collapsed_len: rl.len(),
            kmers,
        })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.kmers.k()
    }

    #[inline]
    pub fn kmers(&self) -> &KmerIndex {
        &self.kmers
    }
}
