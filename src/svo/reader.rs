//! Streaming reader for the SVO corpus format.
//!
//! One triple per line, four tab-separated fields `S V O N` with `N` a
//! decimal count >= 1. A malformed line aborts the stream with a parse
//! error carrying the 1-based line number.

use crate::error::{PipelineError, PipelineResult};
use crate::types::Triple;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};

/// Line-by-line SVO reader over any buffered source.
pub struct SvoReader<R: BufRead> {
    lines: Lines<R>,
    path: PathBuf,
    line_no: usize,
}

impl SvoReader<BufReader<File>> {
    /// Open an SVO file for streaming.
    pub fn open(path: &Path) -> PipelineResult<Self> {
        let file = File::open(path).map_err(|e| PipelineError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> SvoReader<R> {
    /// Wrap an already-open source. The path is only used in error messages.
    pub fn new(reader: R, path: &Path) -> Self {
        Self {
            lines: reader.lines(),
            path: path.to_path_buf(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for SvoReader<R> {
    type Item = PipelineResult<Triple>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => {
                return Some(Err(PipelineError::FileRead {
                    path: self.path.clone(),
                    source: e,
                }));
            }
        };
        self.line_no += 1;
        Some(parse_line(&line, &self.path, self.line_no))
    }
}

/// Parse one SVO line.
pub fn parse_line(line: &str, path: &Path, line_no: usize) -> PipelineResult<Triple> {
    let parse_err = |reason: String| PipelineError::Parse {
        path: path.to_path_buf(),
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 4 {
        return Err(parse_err(format!(
            "expected 4 tab-separated fields, found {}",
            fields.len()
        )));
    }

    let count: u64 = fields[3]
        .trim_end()
        .parse()
        .map_err(|_| parse_err(format!("count '{}' is not an integer", fields[3].trim_end())))?;
    if count == 0 {
        return Err(parse_err("count must be >= 1".to_string()));
    }

    Ok(Triple {
        subject: fields[0].to_string(),
        verb: fields[1].to_string(),
        object: fields[2].to_string(),
        count,
    })
}

/// Write one triple in the SVO line format.
pub fn write_triple<W: Write>(writer: &mut W, triple: &Triple, path: &Path) -> PipelineResult<()> {
    writeln!(writer, "{triple}").map_err(|e| PipelineError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(input: &str) -> PipelineResult<Vec<Triple>> {
        SvoReader::new(Cursor::new(input.to_string()), Path::new("test.svo")).collect()
    }

    #[test]
    fn parses_well_formed_lines() {
        let triples = read_all("alice\tlikes\trome\t3\nbob\thates\tlondon\t1\n").unwrap();
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].subject, "alice");
        assert_eq!(triples[0].verb, "likes");
        assert_eq!(triples[0].object, "rome");
        assert_eq!(triples[0].count, 3);
    }

    #[test]
    fn reports_line_number_on_missing_field() {
        let err = read_all("alice\tlikes\trome\t3\nbob\thates\tlondon\n").unwrap_err();
        match err {
            PipelineError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_integer_and_zero_counts() {
        assert!(read_all("a\tv\tb\tmany\n").is_err());
        assert!(read_all("a\tv\tb\t0\n").is_err());
    }

    #[test]
    fn tolerates_missing_trailing_newline() {
        let triples = read_all("alice\tlikes\trome\t3").unwrap();
        assert_eq!(triples.len(), 1);
    }
}
