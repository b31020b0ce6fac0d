use anyhow::{bail, Result};
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    strict: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            strict: false,
            peek_header: None,
        }
    }

    /// Rejects non-blank lines before the first header instead of skipping them.
    pub fn strict(reader: R) -> Self {
        Self { strict: true, ..Self::new(reader) }
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        // Find header line
        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                self.buf.clear();
                let n = self.reader.read_line(&mut self.buf)?;
                if n == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if self.buf.starts_with('>') {
                    let h = self.buf[1..].trim().to_string();
                    break h;
                }
                if self.strict && !self.buf.trim().is_empty() {
                    bail!("sequence data before first '>' header: '{}'", self.buf.trim());
                }
            }
        };

        // Parse id and description
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Read sequence lines; case is preserved
        let mut seq: Vec<u8> = Vec::new();
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                self.done = true;
                break;
            }
            if self.buf.starts_with('>') {
                let h = self.buf[1..].trim().to_string();
                self.peek_header = Some(h);
                break;
            }
            for &b in self.buf.as_bytes() {
                match b {
                    b'\n' | b'\r' | b' ' | b'\t' => {}
                    _ => seq.push(b),
                }
            }
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }

    pub fn read_all(mut self) -> Result<Vec<FastaRecord>> {
        let mut out = Vec::new();
        while let Some(rec) = self.next_record()? {
            out.push(rec);
        }
        Ok(out)
    }
}

/// Parses FASTA text held in memory.
pub fn parse_str(text: &str) -> Result<Vec<FastaRecord>> {
    FastaReader::strict(text.as_bytes()).read_all()
}

/// Parses FASTA given as separate lines (newlines optional).
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<FastaRecord>> {
    let mut text = String::new();
    for l in lines {
        text.push_str(l.as_ref().trim_end_matches(['\r', '\n']));
        text.push('\n');
    }
    parse_str(&text)
}

/// Renders `(name, seq)` pairs as FASTA without line wrapping and without a
/// trailing newline.
pub fn format_records<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    records
        .into_iter()
        .map(|(name, seq)| format!(">{}\n{}", name, String::from_utf8_lossy(seq)))
        .collect::<Vec<_>>()
        .join("\n")
}
