//! Interactive request entry.
//!
//! Used by `sql2rf` when no request file is given. The prompt asks for a
//! column set (default, all, or one column at a time) and for the output
//! files, and produces the same [`RequestSpec`] a request file would. No
//! criteria are collected: an interactive run exports every record.

use std::io::{BufRead, Write};

use crate::columns::{Column, ColumnSet};
use crate::error::{Error, Result};
use crate::request::{OutputFile, RequestSpec};

/// Columns always included when choosing one at a time.
const ALWAYS: &[&str] = &["ID", "AK", "PV"];
/// Columns never offered one at a time.
const NEVER_OFFERED: &[&str] = &["8F", "NL", "P1", "P2", "SD", "SO", "SX"];

fn hint(code: &str) -> &'static str {
    match code {
        "AA" => " (of first author)",
        "FA" | "FC" | "FF" | "HA" | "HF" | "HL" | "IL" | "IS" | "PG" | "TK" => {
            " (relevant to serials only)"
        },
        "BU" | "CG" | "CL" | "IO" | "ND" => " (relevant to newspapers only)",
        "IM" | "MF" | "MG" | "MA" => " (relevant to music only)",
        "SC" | "JK" | "CD" | "CA" => " (relevant to cartographic materials only)",
        _ => "",
    }
}

/// Whether a column is asked about, given the columns chosen so far.
fn offered(code: &str, chosen: &[Column]) -> bool {
    let has = |c: &str| chosen.iter().any(|x| x.code == c);
    if ALWAYS.contains(&code) || NEVER_OFFERED.contains(&code) {
        return false;
    }
    match code {
        "AD" | "AT" | "AR" | "II" | "VF" => has("AA"),
        "SN" => has("SE"),
        "PU" => has("PD"),
        _ => true,
    }
}

/// Line-based question and answer over any reader/writer pair.
#[derive(Debug)]
pub struct Prompt<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    /// Create a prompt.
    pub fn new(input: R, output: W) -> Self {
        Prompt { input, output }
    }

    fn answer(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::InvalidRequest {
                path: "<stdin>".into(),
                reason: "input ended before the request was complete".to_string(),
            });
        }
        Ok(line.trim().to_uppercase())
    }

    /// Ask until one of `choices` is given.
    ///
    /// # Errors
    ///
    /// Returns an error if input ends or output cannot be written.
    pub fn choose(&mut self, question: &str, choices: &[&str]) -> Result<String> {
        write!(self.output, "{question} ")?;
        self.output.flush()?;
        loop {
            let answer = self.answer()?;
            if choices.contains(&answer.as_str()) {
                return Ok(answer);
            }
            write!(
                self.output,
                "Sorry, your choice was not recognised. Please enter {}: ",
                choices.join(", ")
            )?;
            self.output.flush()?;
        }
    }

    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if input ends or output cannot be written.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self.choose(&format!("{question} (Y/N):"), &["Y", "N"])? == "Y")
    }

    /// Collect a complete request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if input ends early or no output
    /// file is chosen, or an IO error.
    pub fn request(&mut self) -> Result<RequestSpec> {
        writeln!(self.output, "Select one of the following options:")?;
        writeln!(self.output, "   D     Default columns")?;
        writeln!(self.output, "   A     All columns")?;
        writeln!(self.output, "   S     Select columns to include")?;
        let columns = match self.choose("Choose an option:", &["D", "A", "S"])?.as_str() {
            "D" => ColumnSet::Default,
            "A" => ColumnSet::All,
            _ => ColumnSet::Explicit(self.pick_columns()?),
        };

        writeln!(self.output, "Select output files to include:")?;
        let mut files = std::collections::BTreeSet::new();
        for (file, question) in [
            (OutputFile::Records, "Include the Records file?"),
            (OutputFile::Titles, "Include the Titles file?"),
            (OutputFile::Names, "Include the Names file?"),
            (OutputFile::Topics, "Include the Topics file?"),
        ] {
            if self.confirm(question)? {
                files.insert(file);
            }
        }
        if files.is_empty() {
            return Err(Error::InvalidRequest {
                path: "<stdin>".into(),
                reason: "no output files selected".to_string(),
            });
        }

        Ok(RequestSpec {
            files,
            columns,
            ..RequestSpec::default()
        })
    }

    fn pick_columns(&mut self) -> Result<Vec<Column>> {
        writeln!(self.output, "Choose the optional columns:")?;
        let mut chosen = Vec::new();
        for column in Column::exportable() {
            if ALWAYS.contains(&column.code) {
                chosen.push(*column);
                continue;
            }
            if !offered(column.code, &chosen) {
                continue;
            }
            let question = format!("Include {}{}?", column.label, hint(column.code));
            if self.confirm(&question)? {
                chosen.push(*column);
            }
        }
        Ok(chosen)
    }
}

/// Run the prompt on standard input and output.
///
/// # Errors
///
/// As for [`Prompt::request`].
pub fn prompt_request() -> Result<RequestSpec> {
    let stdin = std::io::stdin();
    Prompt::new(stdin.lock(), std::io::stdout()).request()
}
