use std::fs::File;
use std::io::{stdin, BufRead, BufReader, Cursor};
use std::path::Path;

use anyhow::{anyhow, Result};
use paste::paste;

/// One sequence/structure pair as read from input. Both strings are kept as
/// written; validating them is the evaluator's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRecord {
    pub header: Option<String>,
    pub sequence: String,
    pub structure: String,
}

#[derive(Debug, Default)]
struct PartialRecord {
    header: Option<String>,
    sequence: Option<String>,
    structure: Option<String>,
}

impl PartialRecord {
    fn is_complete(&self) -> bool {
        self.structure.is_some()
    }

    /// Move a complete record to `records`. Nothing to do for an empty one.
    fn flush(&mut self, records: &mut Vec<EvalRecord>) -> Result<()> {
        let current = std::mem::take(self);
        let name = current.header.clone().unwrap_or_else(|| format!("#{}", records.len() + 1));
        match current {
            PartialRecord { header: None, sequence: None, .. } => Ok(()),
            PartialRecord { sequence: None, .. } => {
                Err(anyhow!("Record {}: missing sequence line", name))
            }
            PartialRecord { structure: None, .. } => {
                Err(anyhow!("Record {}: missing structure line", name))
            }
            PartialRecord { header, sequence: Some(sequence), structure: Some(structure) } => {
                records.push(EvalRecord { header, sequence, structure });
                Ok(())
            }
        }
    }
}

// ============================================================
//  FASTA-like parsers
// ============================================================

/// Any number of records: an optional `>header` line, a sequence line and a
/// structure line each. Only the first token of a line counts, so trailing
/// energies or comments are ignored. Records may be separated by blank lines
/// or simply follow each other.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<EvalRecord>> {
    let mut records = Vec::new();
    let mut current = PartialRecord::default();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            if current.is_complete() {
                current.flush(&mut records)?;
            }
            continue;
        }

        if line.starts_with('>') {
            current.flush(&mut records)?;
            current.header = Some(line.to_string());
            continue;
        }

        if current.is_complete() {
            current.flush(&mut records)?;
        }
        let token = line.split_whitespace().next().unwrap_or_default().to_string();
        if current.sequence.is_none() {
            current.sequence = Some(token);
        } else {
            current.structure = Some(token);
        }
    }
    current.flush(&mut records)?;
    Ok(records)
}

/// Exactly the first record of the input.
pub fn read_record<R: BufRead>(reader: R) -> Result<EvalRecord> {
    read_records(reader)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Missing sequence line"))
}

// ============================================================
//  Macro generating file/string/stdin/input helpers
// ============================================================

/// Generate input adapters for a base parser function `fn base<R: BufRead>(R) -> Result<T>`.
///
/// This expands into:
/// - `base_string(&str)`
/// - `base_file<P: AsRef<Path>>(P)`
/// - `base_stdin()`
/// - `base_input(&str)`  (dispatches "-" → stdin, otherwise → file)
macro_rules! define_input_variants {
    ($base:ident, $ret:ty) => {
        paste! {
            /// Read from a string buffer.
            pub fn [<$base _string>](s: &str) -> $ret {
                $base(Cursor::new(s))
            }

            /// Read from a file path.
            pub fn [<$base _file>]<P: AsRef<Path>>(path: P) -> $ret {
                let reader = BufReader::new(File::open(path)?);
                $base(reader)
            }

            /// Read from stdin.
            pub fn [<$base _stdin>]() -> $ret {
                let reader = BufReader::new(stdin());
                $base(reader)
            }

            /// Read either from stdin ("-") or a file path.
            pub fn [<$base _input>](s: &str) -> $ret {
                if s == "-" {
                    [<$base _stdin>]()
                } else {
                    [<$base _file>](s)
                }
            }
        }
    };
}

define_input_variants!(read_records, Result<Vec<EvalRecord>>);
define_input_variants!(read_record, Result<EvalRecord>);

/// Position ruler for a sequence of `len + 1` nucleotides: a digit every ten
/// positions, a comma in between.
pub fn ruler(len: usize) -> String {
    let mut s = String::with_capacity(len + 1);
    let mut skip = 0;
    for i in 0..=len {
        if i % 10 == 0 {
            let t = (i / 10).to_string();
            skip = t.len() - 1;
            s.push_str(&t);
        } else if skip > 0 {
            skip -= 1;
        } else {
            s.push(if i % 10 == 5 { ',' } else { '.' });
        }
    }
    s
}
