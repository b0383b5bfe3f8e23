//! Credential loader for the `host:port:username:password` proxy list

use crate::proxy::models::ProxyCredential;
use crate::report::{Event, Reporter};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Number of colon-separated fields in a well-formed line
const FIELD_COUNT: usize = 4;

/// Result of parsing a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Credential(ProxyCredential),
    Blank,
    /// Split into this many fields instead of four
    Malformed(usize),
}

/// Loader for proxy credential lists
pub struct CredentialLoader;

impl CredentialLoader {
    /// Parse a single line.
    ///
    /// Surrounding whitespace is dropped first. Fields are taken
    /// positionally and not validated beyond their count.
    pub fn parse_line(line: &str) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::Blank;
        }

        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != FIELD_COUNT {
            return LineOutcome::Malformed(parts.len());
        }

        LineOutcome::Credential(ProxyCredential::new(
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
            parts[3].to_string(),
        ))
    }

    /// Parse credentials from a string (multiple lines), in line order.
    ///
    /// Malformed lines are reported and skipped.
    pub fn parse_string(content: &str, reporter: &dyn Reporter) -> Vec<ProxyCredential> {
        content
            .lines()
            .enumerate()
            .filter_map(|(index, line)| match Self::parse_line(line) {
                LineOutcome::Credential(credential) => Some(credential),
                LineOutcome::Blank => None,
                LineOutcome::Malformed(fields) => {
                    reporter.report(Event::MalformedLine {
                        line_number: index + 1,
                        fields,
                        line: line.trim().to_string(),
                    });
                    None
                }
            })
            .collect()
    }

    /// Load credentials from a file.
    ///
    /// A missing or unreadable file is reported and yields an empty list;
    /// callers treat an empty list as a failed run.
    pub fn load<P: AsRef<Path>>(path: P, reporter: &dyn Reporter) -> Vec<ProxyCredential> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                reporter.report(Event::MissingInputFile {
                    path: path.to_path_buf(),
                });
                return Vec::new();
            }
            Err(e) => {
                reporter.report(Event::SourceUnreadable {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
                return Vec::new();
            }
        };

        let credentials = Self::parse_string(&content, reporter);
        reporter.report(Event::CredentialsLoaded {
            path: path.to_path_buf(),
            count: credentials.len(),
        });
        credentials
    }
}
