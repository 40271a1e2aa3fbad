use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::database::Reader;
use crate::{Result, RfeError};

/// Buffered CSV reader with configurable separator and quote character.
///
/// The first line is taken as the header. Lines whose field count does not
/// match the header are skipped with a warning carrying the line number.
pub struct CsvReader {
    lines: std::io::Lines<BufReader<File>>,
    colnames: Vec<String>,
    sep: char,
    quotechar: char,
    line_number: usize,
    peeked: Option<Vec<String>>,
    num_skipped: usize,
    done: bool,
}

impl CsvReader {
    pub fn new(path: &Path, sep: char, quotechar: char) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| RfeError::Io(format!("Could not open '{}': {}", path.display(), e)))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Err(RfeError::Io(e.to_string())),
            None => {
                return Err(RfeError::Io(format!(
                    "CSV file '{}' is empty.",
                    path.display()
                )))
            }
        };

        let colnames = split_line(&header, sep, quotechar);

        let mut reader = Self {
            lines,
            colnames,
            sep,
            quotechar,
            line_number: 1,
            peeked: None,
            num_skipped: 0,
            done: false,
        };
        reader.advance();
        Ok(reader)
    }

    /// Number of corrupted lines skipped so far.
    pub fn num_skipped(&self) -> usize {
        self.num_skipped
    }

    fn advance(&mut self) {
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.line_number += 1;
                    if line.is_empty() {
                        continue;
                    }
                    let fields = split_line(&line, self.sep, self.quotechar);
                    if fields.len() != self.colnames.len() {
                        self.num_skipped += 1;
                        log::warn!(
                            "Corrupted line {}: expected {} fields, got {}. Skipping.",
                            self.line_number,
                            self.colnames.len(),
                            fields.len()
                        );
                        continue;
                    }
                    self.peeked = Some(fields);
                    return;
                }
                Some(Err(e)) => {
                    self.num_skipped += 1;
                    self.line_number += 1;
                    log::warn!("Could not read line {}: {}. Skipping.", self.line_number, e);
                }
                None => {
                    self.peeked = None;
                    self.done = true;
                    return;
                }
            }
        }
    }
}

fn split_line(line: &str, sep: char, quotechar: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        if c == quotechar {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);

    fields
}

impl Reader for CsvReader {
    fn eof(&self) -> bool {
        self.done && self.peeked.is_none()
    }

    fn next_line(&mut self) -> Vec<String> {
        let line = self.peeked.take().unwrap_or_default();
        self.advance();
        line
    }

    fn colnames(&self) -> Vec<String> {
        self.colnames.clone()
    }

    fn sep(&self) -> char {
        self.sep
    }

    fn quotechar(&self) -> char {
        self.quotechar
    }
}
