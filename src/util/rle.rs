//! 同聚物（homopolymer）游程压缩。
//!
//! 纳米孔信号中同一碱基连续重复的长度不可靠，因此参考序列和每条 read
//! 在建索引 / 匹配之前都先折叠为「碱基 + 重复次数」的形式。

/// 折叠后的序列：`collapsed[i]` 为第 i 个游程的碱基，`counts[i]` 为其长度（≥ 1）。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunLengths {
    pub collapsed: Vec<u8>,
    pub counts: Vec<u32>,
}

impl RunLengths {
    /// 单次线性扫描。第一个碱基直接开启第一个游程，不使用占位哨兵值。
    pub fn collapse(seq: &[u8]) -> Self {
        let mut collapsed = Vec::new();
        let mut counts = Vec::new();
        let mut run: Option<(u8, u32)> = None;

        for &b in seq {
            run = match run {
                Some((prev, n)) if prev == b => Some((prev, n + 1)),
                Some((prev, n)) => {
                    collapsed.push(prev);
                    counts.push(n);
                    Some((b, 1))
                }
                None => Some((b, 1)),
            };
        }
        if let Some((prev, n)) = run {
            collapsed.push(prev);
            counts.push(n);
        }

        Self { collapsed, counts }
    }

    /// 还原原始序列
    pub fn expand(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.original_len());
        for (&b, &n) in self.collapsed.iter().zip(&self.counts) {
            out.extend(std::iter::repeat(b).take(n as usize));
        }
        out
    }

    /// Number of runs.
    #[inline]
    pub fn len(&self) -> usize {
        self.collapsed.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }

    pub fn original_len(&self) -> usize {
        self.counts.iter().map(|&n| n as usize).sum()
    }

    /// 原始长度 / 折叠后长度；空序列返回 None。
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.original_len() as f64 / self.len() as f64)
    }
}
