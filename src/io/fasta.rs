use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::util::dna;

pub const DEFAULT_REFERENCE_NAME: &str = "SARSCoV2";

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    path: PathBuf,
    buf: String,
    line_no: usize,
    done: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
            buf: String::new(),
            line_no: 0,
            done: false,
            peek_header: None,
        }
    }

    fn read_line(&mut self) -> Result<usize, LoadError> {
        self.buf.clear();
        let n = self
            .reader
            .read_line(&mut self.buf)
            .map_err(|source| LoadError::Io { path: self.path.clone(), source })?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n)
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>, LoadError> {
        if self.done {
            return Ok(None);
        }

        // Find header line; only blank lines may precede the first one
        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                if self.read_line()? == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if let Some(rest) = self.buf.strip_prefix('>') {
                    break rest.trim().to_string();
                }
                if !self.buf.trim().is_empty() {
                    return Err(LoadError::Malformed {
                        format: "FASTA",
                        path: self.path.clone(),
                        line: self.line_no,
                        defect: "sequence data before the first '>' header".to_string(),
                    });
                }
            }
        };

        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut seq: Vec<u8> = Vec::new();
        loop {
            if self.read_line()? == 0 {
                self.done = true;
                break;
            }
            if let Some(rest) = self.buf.strip_prefix('>') {
                self.peek_header = Some(rest.trim().to_string());
                break;
            }
            seq.extend(dna::normalize_seq(self.buf.as_bytes()));
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }
}

/// 名称比较用的规范化：去掉首尾空白、`-`、`_` 与内部空白，转小写
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn read_fasta(path: &Path) -> Result<Vec<FastaRecord>, LoadError> {
    let mut reader = FastaReader::new(super::open_input(path)?, path);
    let mut records = Vec::new();
    while let Some(rec) = reader.next_record()? {
        records.push(rec);
    }
    Ok(records)
}

/// 从（可能含多条记录的）FASTA 文件中取出目标参考序列。
///
/// 只有一条记录时直接返回；否则先精确匹配 id，再按 [`normalize_name`] 匹配。
pub fn load_reference(path: &Path, preferred_name: &str) -> Result<FastaRecord, LoadError> {
    let mut records = read_fasta(path)?;
    select_reference(&mut records, preferred_name).ok_or_else(|| {
        if records.is_empty() {
            LoadError::EmptyFasta { path: path.to_path_buf() }
        } else {
            LoadError::ReferenceNotFound {
                name: preferred_name.to_string(),
                path: path.to_path_buf(),
            }
        }
    })
}

fn select_reference(records: &mut Vec<FastaRecord>, name: &str) -> Option<FastaRecord> {
    if records.len() == 1 {
        return records.pop();
    }
    let pos = records.iter().position(|r| r.id == name).or_else(|| {
        let wanted = normalize_name(name);
        records.iter().position(|r| normalize_name(&r.id) == wanted)
    })?;
    Some(records.swap_remove(pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(data: &'static [u8]) -> FastaReader<Cursor<&'static [u8]>> {
        FastaReader::new(Cursor::new(data), "test.fa")
    }

    fn record(id: &str, seq: &[u8]) -> FastaRecord {
        FastaRecord { id: id.to_string(), desc: None, seq: seq.to_vec() }
    }

    #[test]
    fn parse_multi_record_fasta() {
        let mut r = reader(b">MN908947.3 Severe acute\nACgTNN\nacc\n>chr2\nAAA\n");

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "MN908947.3");
        assert_eq!(r1.desc.as_deref(), Some("Severe acute"));
        assert_eq!(r1.seq, b"ACGTNNACC");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "chr2");
        assert_eq!(r2.desc, None);
        assert_eq!(r2.seq, b"AAA");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn crlf_and_leading_blank_lines() {
        let mut r = reader(b"\n\n>chr1 desc\r\nAC g t n\r\n acgt\r\n");
        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "chr1");
        assert_eq!(r1.seq, b"ACGTNACGT");
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn sequence_before_header_is_malformed() {
        let mut r = reader(b"\nACGT\n>chr1\nAC\n");
        match r.next_record() {
            Err(LoadError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn name_normalization() {
        assert_eq!(normalize_name(" SARS-CoV-2 "), "sarscov2");
        assert_eq!(normalize_name("sars_cov2"), normalize_name("SARSCoV2"));
    }

    #[test]
    fn single_record_is_returned_regardless_of_name() {
        let mut recs = vec![record("whatever", b"ACGT")];
        let r = select_reference(&mut recs, DEFAULT_REFERENCE_NAME).unwrap();
        assert_eq!(r.id, "whatever");
    }

    #[test]
    fn exact_name_wins_over_similar_name() {
        let mut recs = vec![
            record("SARS-CoV-2", b"AAAA"),
            record("SARSCoV2", b"CCCC"),
            record("other", b"GGGG"),
        ];
        let r = select_reference(&mut recs, "SARSCoV2").unwrap();
        assert_eq!(r.seq, b"CCCC");
    }

    #[test]
    fn similar_name_is_resolved() {
        let mut recs = vec![record("human", b"AAAA"), record("sars_cov-2", b"CCCC")];
        let r = select_reference(&mut recs, "SARSCoV2").unwrap();
        assert_eq!(r.id, "sars_cov-2");
    }

    #[test]
    fn missing_name_is_none() {
        let mut recs = vec![record("human", b"AAAA"), record("mouse", b"CCCC")];
        assert!(select_reference(&mut recs, "SARSCoV2").is_none());
        assert_eq!(recs.len(), 2);
    }
}
