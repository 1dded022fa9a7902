use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::LoadError;

/// Value of a `key=value` token in a read header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(u64),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub seq: Vec<u8>,
    /// Phred scores, or zeros when quality decoding is skipped
    pub qual: Vec<u8>,
    pub metadata: BTreeMap<String, MetaValue>,
}

/// 解析 header 行：`@id key=value ...`。只有恰好含一个 `=` 的 token 才作为元数据。
fn parse_header(line: &str) -> Option<(String, BTreeMap<String, MetaValue>)> {
    let mut parts = line.split_whitespace();
    let id = parts.next()?.strip_prefix('@')?;
    let mut metadata = BTreeMap::new();
    for part in parts {
        if part.matches('=').count() != 1 {
            continue;
        }
        if let Some((k, v)) = part.split_once('=') {
            let value = if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) {
                v.parse().map(MetaValue::Int).unwrap_or_else(|_| MetaValue::Text(v.to_string()))
            } else {
                MetaValue::Text(v.to_string())
            };
            metadata.insert(k.to_string(), value);
        }
    }
    Some((id.to_string(), metadata))
}

/// 逐条读取 FASTQ 记录。空行被跳过，记录按 header → 序列 → `+` → 质量 的顺序循环。
pub struct FastqReader<R: BufRead> {
    reader: R,
    path: PathBuf,
    buf: String,
    line_no: usize,
    decode_quals: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>, decode_quals: bool) -> Self {
        Self { reader, path: path.into(), buf: String::new(), line_no: 0, decode_quals }
    }

    fn malformed(&self, defect: impl Into<String>) -> LoadError {
        LoadError::Malformed {
            format: "FASTQ",
            path: self.path.clone(),
            line: self.line_no,
            defect: defect.into(),
        }
    }

    /// 读取下一条非空行（已去除首尾空白）；文件结束返回 false
    fn next_line(&mut self) -> Result<bool, LoadError> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|source| LoadError::Io { path: self.path.clone(), source })?;
            if n == 0 {
                return Ok(false);
            }
            self.line_no += 1;
            let trimmed = self.buf.trim();
            if !trimmed.is_empty() {
                if trimmed.len() != self.buf.len() {
                    self.buf = trimmed.to_string();
                }
                return Ok(true);
            }
        }
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>, LoadError> {
        if !self.next_line()? {
            return Ok(None);
        }
        let (id, metadata) = match parse_header(&self.buf) {
            Some(h) => h,
            None => return Err(self.malformed("expected header line starting with '@'")),
        };

        if !self.next_line()? {
            return Err(self.malformed(format!("unexpected end of file after header of read '{}'", id)));
        }
        let seq = self.buf.as_bytes().to_ascii_uppercase();

        if !self.next_line()? {
            return Err(self.malformed(format!("missing '+' line for read '{}'", id)));
        }
        if !self.buf.starts_with('+') {
            return Err(self.malformed(format!("expected '+' separator for read '{}'", id)));
        }

        if !self.next_line()? {
            return Err(self.malformed(format!("missing quality line for read '{}'", id)));
        }
        if self.buf.len() != seq.len() {
            return Err(self.malformed(format!(
                "read '{}' has {} bases but {} quality values",
                id,
                seq.len(),
                self.buf.len()
            )));
        }
        let qual = if self.decode_quals {
            let mut q = Vec::with_capacity(seq.len());
            for &b in self.buf.as_bytes() {
                match b.checked_sub(33) {
                    Some(v) => q.push(v),
                    None => return Err(self.malformed(format!("invalid quality character in read '{}'", id))),
                }
            }
            q
        } else {
            vec![0u8; seq.len()]
        };

        Ok(Some(FastqRecord { id, seq, qual, metadata }))
    }
}

/// 一个样本文件中的全部 reads。重复的 read id 由后出现的记录覆盖，保留首次出现的顺序。
#[derive(Debug, Clone, Default)]
pub struct ReadSet {
    records: Vec<FastqRecord>,
    positions: HashMap<String, usize>,
}

impl ReadSet {
    pub fn insert(&mut self, rec: FastqRecord) {
        if let Some(&i) = self.positions.get(&rec.id) {
            self.records[i] = rec;
            return;
        }
        self.positions.insert(rec.id.clone(), self.records.len());
        self.records.push(rec);
    }

    pub fn get(&self, id: &str) -> Option<&FastqRecord> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_bases(&self) -> usize {
        self.records.iter().map(|r| r.seq.len()).sum()
    }

    pub fn records(&self) -> &[FastqRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FastqRecord> {
        self.records.iter()
    }
}

impl FromIterator<FastqRecord> for ReadSet {
    fn from_iter<I: IntoIterator<Item = FastqRecord>>(iter: I) -> Self {
        let mut set = ReadSet::default();
        for rec in iter {
            set.insert(rec);
        }
        set
    }
}

pub fn load_reads(path: &Path, decode_quals: bool) -> Result<ReadSet, LoadError> {
    let mut reader = FastqReader::new(super::open_input(path)?, path, decode_quals);
    let mut set = ReadSet::default();
    while let Some(rec) = reader.next_record()? {
        set.insert(rec);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(data: &'static [u8], decode_quals: bool) -> Result<ReadSet, LoadError> {
        let mut r = FastqReader::new(Cursor::new(data), "test.fq", decode_quals);
        let mut set = ReadSet::default();
        while let Some(rec) = r.next_record()? {
            set.insert(rec);
        }
        Ok(set)
    }

    #[test]
    fn parse_records_with_metadata() {
        let data = b"@r1 runid=abc read=42 ch=7 flag=a=b bare\nacgt\n+\nIIII\n\n@r2\nGG\n+\n!!\n";
        let set = read_all(data, false).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.num_bases(), 6);

        let r1 = set.get("r1").unwrap();
        assert_eq!(r1.seq, b"ACGT");
        assert_eq!(r1.qual, vec![0; 4]);
        assert_eq!(r1.metadata.get("runid"), Some(&MetaValue::Text("abc".to_string())));
        assert_eq!(r1.metadata.get("read"), Some(&MetaValue::Int(42)));
        assert_eq!(r1.metadata.get("ch"), Some(&MetaValue::Int(7)));
        assert!(!r1.metadata.contains_key("flag"));
        assert_eq!(r1.metadata.len(), 3);

        assert!(set.get("r2").unwrap().metadata.is_empty());
    }

    #[test]
    fn decodes_phred33_when_requested() {
        let set = read_all(b"@r1\nACG\n+\n!+I\n", true).unwrap();
        assert_eq!(set.get("r1").unwrap().qual, vec![0, 10, 40]);
    }

    #[test]
    fn quality_length_mismatch_fails() {
        let err = read_all(b"@r1\nACGT\n+\nIII\n", false).unwrap_err();
        match err {
            LoadError::Malformed { line, defect, .. } => {
                assert_eq!(line, 4);
                assert!(defect.contains("4 bases but 3 quality"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_at_sign_fails() {
        assert!(matches!(
            read_all(b"r1\nACGT\n+\nIIII\n", false),
            Err(LoadError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn out_of_order_lines_fail() {
        assert!(matches!(
            read_all(b"@r1\nACGT\nIIII\n+\n", false),
            Err(LoadError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn truncated_record_fails() {
        assert!(matches!(
            read_all(b"@r1\nACGT\n+\n", false),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn duplicate_ids_keep_last_record_in_first_position() {
        let set = read_all(b"@a\nAA\n+\n!!\n@b\nCC\n+\n!!\n@a\nTT\n+\n!!\n", false).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records()[0].id, "a");
        assert_eq!(set.records()[0].seq, b"TT");
        assert_eq!(set.records()[1].id, "b");
    }
}
