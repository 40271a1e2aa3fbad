/// Line-oriented bulk ingest source.
pub trait Reader {
    fn eof(&self) -> bool;

    /// The fields of the next line. Corrupted lines are skipped by the
    /// implementation, which logs a warning with the line number.
    fn next_line(&mut self) -> Vec<String>;

    fn colnames(&self) -> Vec<String>;

    fn sep(&self) -> char;

    fn quotechar(&self) -> char;
}
