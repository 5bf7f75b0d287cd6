//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`CommitId`] - Commit identifier with its rewrite depth (`C4`, `C4'`, `C4'^5`)
//! - [`ValidName`] - A branch or tag name that passed validation
//!
//! # Validation
//!
//! Commit ids are parsed once at the boundary and carried as numbers after
//! that. Branch names go through [`validate_branch_name`], which applies the
//! naming grammar and the configured length limit.
//!
//! # Examples
//!
//! ```
//! use gitsim::core::types::{validate_branch_name, CommitId};
//!
//! let id: CommitId = "C3''".parse().unwrap();
//! assert_eq!(id.number(), 3);
//! assert_eq!(id.rewrite_depth(), 2);
//! assert_eq!(id.bumped().unwrap().to_string(), "C3'''");
//! assert_eq!(id.base().to_string(), "C3");
//!
//! assert!(validate_branch_name("bugFix", 9).is_ok());
//! assert!(validate_branch_name("c12", 9).is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix reserved for remote-tracking branches.
pub const REMOTE_PREFIX: &str = "o/";

/// The protected trunk branch.
pub const TRUNK: &str = "master";

/// Accepted alias for [`TRUNK`].
pub const TRUNK_ALIAS: &str = "main";

/// The id of the HEAD ref.
pub const HEAD: &str = "HEAD";

/// Errors from type validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("commit {0} cannot be rewritten any further")]
    RewriteLimit(String),
}

/// A commit identifier.
///
/// Every commit id is a base number plus a rewrite depth. Depth zero prints
/// as `C<n>`, depths one to three as trailing primes, and anything deeper
/// as `C<n>'^<k>`.
///
/// Ordering is by `(number, depth)` so a rewritten commit sorts directly
/// after the commit it was rewritten from.
///
/// # Example
///
/// ```
/// use gitsim::core::types::CommitId;
///
/// let id = CommitId::new(7);
/// let deep = (0..4).try_fold(id, |id, _| id.bumped()).unwrap();
/// assert_eq!(deep.to_string(), "C7'^4");
/// assert!(id < id.bumped().unwrap());
/// assert!(deep < CommitId::new(8));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId {
    number: u64,
    depth: u32,
}

impl CommitId {
    /// Create a base (never rewritten) id.
    pub fn new(number: u64) -> Self {
        Self { number, depth: 0 }
    }

    /// Create an id with an explicit rewrite depth.
    pub fn with_depth(number: u64, depth: u32) -> Self {
        Self { number, depth }
    }

    /// The numeric part of the id.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// How many times the underlying change has been rewritten.
    pub fn rewrite_depth(&self) -> u32 {
        self.depth
    }

    /// The id with one more rewrite applied.
    ///
    /// # Errors
    ///
    /// [`TypeError::RewriteLimit`] when the depth is already at its maximum.
    pub fn bumped(&self) -> Result<Self, TypeError> {
        let depth = self
            .depth
            .checked_add(1)
            .ok_or_else(|| TypeError::RewriteLimit(self.to_string()))?;
        Ok(Self {
            number: self.number,
            depth,
        })
    }

    /// The id with the rewrite suffix stripped.
    pub fn base(&self) -> Self {
        Self::new(self.number)
    }

    /// Whether `text` looks like a commit id, ignoring case.
    ///
    /// Used by ref resolution, which accepts `c4` for `C4`.
    pub fn looks_like_id(text: &str) -> bool {
        text.parse::<CommitId>().is_ok()
            || text
                .strip_prefix('c')
                .map(|rest| format!("C{rest}").parse::<CommitId>().is_ok())
                .unwrap_or(false)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.depth {
            0 => write!(f, "C{}", self.number),
            d @ 1..=3 => write!(f, "C{}{}", self.number, "'".repeat(d as usize)),
            d => write!(f, "C{}'^{}", self.number, d),
        }
    }
}

impl FromStr for CommitId {
    type Err = TypeError;

    /// Parse `C<n>`, `C<n>'`..`C<n>'''` and `C<n>'^<k>`.
    ///
    /// A caret form with a small `k` (`C5'^2`) is accepted and canonicalized
    /// to the prime form on display.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidCommitId(s.to_string());

        let rest = s.strip_prefix('C').ok_or_else(invalid)?;
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(invalid());
        }
        let number: u64 = rest[..digits_end].parse().map_err(|_| invalid())?;
        let suffix = &rest[digits_end..];

        let depth = if let Some(caret) = suffix.strip_prefix("'^") {
            if caret.is_empty() || !caret.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            caret.parse::<u32>().map_err(|_| invalid())?
        } else if suffix.chars().all(|c| c == '\'') {
            suffix.len() as u32
        } else {
            return Err(invalid());
        };

        Ok(Self { number, depth })
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.to_string()
    }
}

/// A branch or tag name accepted by [`validate_branch_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidName {
    /// The name to use.
    pub name: String,
    /// The name as given, when it had to be shortened.
    pub truncated_from: Option<String>,
}

/// Whether a branch name belongs to the remote-tracking namespace.
pub fn is_remote_name(name: &str) -> bool {
    name.starts_with(REMOTE_PREFIX)
}

/// Rewrite every `main` path segment to `master`.
///
/// `main`, `feature/main` and `main-fix` all hit, `maintain` does not.
pub fn alias_trunk(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    let mut segment = String::new();
    for c in name.chars() {
        if is_word_char(c) {
            segment.push(c);
        } else {
            push_segment(&mut out, &segment);
            segment.clear();
            out.push(c);
        }
    }
    push_segment(&mut out, &segment);
    out
}

fn push_segment(out: &mut String, segment: &str) {
    if segment == TRUNK_ALIAS {
        out.push_str(TRUNK);
    } else {
        out.push_str(segment);
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '/' | '-')
}

/// Validate a user-supplied branch or tag name.
///
/// Rules, in order:
/// - surrounding whitespace is ignored
/// - word characters, optionally separated by a single `.`, `/` or `-`,
///   at least two characters, starting and ending with a word character
/// - must not start with the remote prefix `o/`
/// - must not look like a commit id (`C12`, `c3`)
/// - must not contain `HEAD` in any case
///
/// Names longer than `max_len` are truncated and the original is reported
/// back in [`ValidName::truncated_from`].
///
/// # Errors
///
/// Returns `TypeError::InvalidBranchName` when any rule fails.
pub fn validate_branch_name(raw: &str, max_len: usize) -> Result<ValidName, TypeError> {
    let name = raw.trim();
    let bad = |why: &str| TypeError::InvalidBranchName(format!("'{name}' {why}"));

    let chars: Vec<char> = name.chars().collect();
    if chars.len() < 2 {
        return Err(bad("is too short"));
    }
    if !chars.iter().all(|&c| is_word_char(c) || is_separator(c)) {
        return Err(bad("may only contain letters, digits, '_', '.', '/' and '-'"));
    }
    if !is_word_char(chars[0]) || !is_word_char(chars[chars.len() - 1]) {
        return Err(bad("must start and end with a letter or digit"));
    }
    if chars
        .windows(2)
        .any(|pair| is_separator(pair[0]) && is_separator(pair[1]))
    {
        return Err(bad("cannot contain consecutive separators"));
    }
    if is_remote_name(name) {
        return Err(bad("cannot start with the remote prefix 'o/'"));
    }
    if (chars[0] == 'C' || chars[0] == 'c') && chars[1..].iter().all(|c| c.is_ascii_digit()) {
        return Err(bad("looks like a commit id"));
    }
    if name.to_ascii_lowercase().contains("head") {
        return Err(bad("cannot contain 'HEAD'"));
    }

    if chars.len() > max_len {
        return Ok(ValidName {
            name: chars[..max_len].iter().collect(),
            truncated_from: Some(name.to_string()),
        });
    }
    Ok(ValidName {
        name: name.to_string(),
        truncated_from: None,
    })
}
