//! engine::command
//!
//! The structured command contract.
//!
//! # Architecture
//!
//! Callers hand the engine a [`CommandRequest`]: a dialect, a method name,
//! positional arguments, and an options map whose values are the arguments
//! that followed each flag. The engine parses the method into a closed enum
//! ([`GitMethod`] or [`HgMethod`]) and rejects options the method does not
//! support before anything else happens.
//!
//! # Example
//!
//! ```
//! use gitsim::engine::command::{CommandRequest, Dialect};
//!
//! let request = CommandRequest::git("checkout").with_option("-b", ["bugFix"]);
//! assert_eq!(request.dialect, Dialect::Git);
//! assert_eq!(request.options["-b"], vec!["bugFix".to_string()]);
//! ```

use super::error::CommandError;
use crate::core::types::HEAD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which command vocabulary a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Git,
    Hg,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Git => f.write_str("git"),
            Dialect::Hg => f.write_str("hg"),
        }
    }
}

/// One command as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub dialect: Dialect,
    pub method: String,
    #[serde(default, rename = "generalArgs", alias = "general_args")]
    pub general_args: Vec<String>,
    #[serde(default, rename = "optionsMap", alias = "options")]
    pub options: BTreeMap<String, Vec<String>>,
}

impl CommandRequest {
    fn new(dialect: Dialect, method: &str) -> Self {
        Self {
            dialect,
            method: method.to_string(),
            general_args: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    /// A git request with no arguments.
    pub fn git(method: &str) -> Self {
        Self::new(Dialect::Git, method)
    }

    /// An hg request with no arguments.
    pub fn hg(method: &str) -> Self {
        Self::new(Dialect::Hg, method)
    }

    /// Append positional arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.general_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a flag and the arguments that followed it.
    pub fn with_option<I, S>(mut self, flag: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .insert(flag.to_string(), values.into_iter().map(Into::into).collect());
        self
    }
}

/// Every git method the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitMethod {
    Commit,
    Add,
    Checkout,
    Switch,
    Branch,
    Tag,
    Merge,
    Rebase,
    CherryPick,
    Revert,
    Reset,
    Describe,
    Log,
    RevList,
    Show,
    Status,
    Fetch,
    Push,
    Pull,
    Clone,
    FakeTeamwork,
    Remote,
}

impl GitMethod {
    /// Look a method up by name.
    pub fn parse(name: &str) -> Result<Self, CommandError> {
        let method = match name {
            "commit" => GitMethod::Commit,
            "add" => GitMethod::Add,
            "checkout" => GitMethod::Checkout,
            "switch" => GitMethod::Switch,
            "branch" => GitMethod::Branch,
            "tag" => GitMethod::Tag,
            "merge" => GitMethod::Merge,
            "rebase" => GitMethod::Rebase,
            "cherry-pick" | "cherrypick" => GitMethod::CherryPick,
            "revert" => GitMethod::Revert,
            "reset" => GitMethod::Reset,
            "describe" => GitMethod::Describe,
            "log" => GitMethod::Log,
            "rev-list" | "revlist" => GitMethod::RevList,
            "show" => GitMethod::Show,
            "status" => GitMethod::Status,
            "fetch" => GitMethod::Fetch,
            "push" => GitMethod::Push,
            "pull" => GitMethod::Pull,
            "clone" => GitMethod::Clone,
            "fakeTeamwork" | "fake-teamwork" => GitMethod::FakeTeamwork,
            "remote" => GitMethod::Remote,
            other => {
                return Err(CommandError::validation(format!(
                    "the git command {other} is not supported"
                )))
            }
        };
        Ok(method)
    }

    /// The canonical name, as shown in messages.
    pub fn name(&self) -> &'static str {
        match self {
            GitMethod::Commit => "commit",
            GitMethod::Add => "add",
            GitMethod::Checkout => "checkout",
            GitMethod::Switch => "switch",
            GitMethod::Branch => "branch",
            GitMethod::Tag => "tag",
            GitMethod::Merge => "merge",
            GitMethod::Rebase => "rebase",
            GitMethod::CherryPick => "cherry-pick",
            GitMethod::Revert => "revert",
            GitMethod::Reset => "reset",
            GitMethod::Describe => "describe",
            GitMethod::Log => "log",
            GitMethod::RevList => "rev-list",
            GitMethod::Show => "show",
            GitMethod::Status => "status",
            GitMethod::Fetch => "fetch",
            GitMethod::Push => "push",
            GitMethod::Pull => "pull",
            GitMethod::Clone => "clone",
            GitMethod::FakeTeamwork => "fakeTeamwork",
            GitMethod::Remote => "remote",
        }
    }

    /// Flags this method accepts.
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            GitMethod::Commit => &["--amend", "-a", "--all", "-am", "-m"],
            GitMethod::Checkout => &["-b", "-B", "-"],
            GitMethod::Switch => &["-c", "-"],
            GitMethod::Branch => &["-d", "-D", "-f", "--force", "-a", "-r", "-u", "--contains"],
            GitMethod::Tag => &["-d"],
            GitMethod::Merge => &["--no-ff"],
            GitMethod::Rebase => &[
                "-i",
                "--solution-ordering",
                "--interactive-test",
                "--aboveAll",
                "-p",
                "--preserve-merges",
            ],
            GitMethod::Reset => &["--hard", "--soft"],
            GitMethod::Push => &["--force"],
            GitMethod::Pull => &["--rebase"],
            GitMethod::Remote => &["-v"],
            _ => &[],
        }
    }
}

/// Every hg method the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HgMethod {
    Commit,
    Status,
    Export,
    Graft,
    Log,
    Bookmark,
    Rebase,
    Update,
    Backout,
    Histedit,
    Pull,
    Summary,
}

impl HgMethod {
    /// Look a method up by name or alias.
    pub fn parse(name: &str) -> Result<Self, CommandError> {
        let method = match name {
            "commit" | "ci" => HgMethod::Commit,
            "status" | "st" => HgMethod::Status,
            "export" => HgMethod::Export,
            "graft" => HgMethod::Graft,
            "log" => HgMethod::Log,
            "bookmark" | "bookmarks" | "book" => HgMethod::Bookmark,
            "rebase" => HgMethod::Rebase,
            "update" | "up" => HgMethod::Update,
            "backout" => HgMethod::Backout,
            "histedit" => HgMethod::Histedit,
            "pull" => HgMethod::Pull,
            "summary" | "sum" => HgMethod::Summary,
            other => {
                return Err(CommandError::validation(format!(
                    "the hg command {other} is not supported"
                )))
            }
        };
        Ok(method)
    }

    pub fn name(&self) -> &'static str {
        match self {
            HgMethod::Commit => "commit",
            HgMethod::Status => "status",
            HgMethod::Export => "export",
            HgMethod::Graft => "graft",
            HgMethod::Log => "log",
            HgMethod::Bookmark => "bookmark",
            HgMethod::Rebase => "rebase",
            HgMethod::Update => "update",
            HgMethod::Backout => "backout",
            HgMethod::Histedit => "histedit",
            HgMethod::Pull => "pull",
            HgMethod::Summary => "summary",
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self {
            HgMethod::Commit => &["--amend", "-A", "-m"],
            HgMethod::Graft => &["-r"],
            HgMethod::Log => &["-f"],
            HgMethod::Bookmark => &["-r", "-f", "-d"],
            HgMethod::Rebase => &["-d", "-s", "-b"],
            HgMethod::Update => &["-r"],
            HgMethod::Backout => &["-r"],
            _ => &[],
        }
    }
}

/// Positional arguments and options of one invocation, with the argument
/// checks every method shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    method: String,
    pub general: Vec<String>,
    pub options: BTreeMap<String, Vec<String>>,
}

impl Args {
    /// Check the options against `supported` and take ownership of the rest.
    pub fn new(
        method: &str,
        general: Vec<String>,
        options: BTreeMap<String, Vec<String>>,
        supported: &[&str],
    ) -> Result<Self, CommandError> {
        if let Some(flag) = options.keys().find(|f| !supported.contains(&f.as_str())) {
            return Err(CommandError::validation(format!(
                "the option {flag} is not supported by {method}"
            )));
        }
        Ok(Self {
            method: method.to_string(),
            general,
            options,
        })
    }

    /// Whether a flag was given.
    pub fn has(&self, flag: &str) -> bool {
        self.options.contains_key(flag)
    }

    /// The values that followed a flag, if it was given.
    pub fn option(&self, flag: &str) -> Option<&[String]> {
        self.options.get(flag).map(Vec::as_slice)
    }

    /// Values of a flag followed by the positional arguments.
    pub fn option_then_general(&self, flag: &str) -> Vec<String> {
        let mut out = self.option(flag).map(<[String]>::to_vec).unwrap_or_default();
        out.extend(self.general.iter().cloned());
        out
    }

    fn what(&self, option: Option<&str>) -> String {
        match option {
            Some(option) => format!("with {} {}", self.method, option),
            None => format!("with {}", self.method),
        }
    }

    /// Reject too few or too many arguments.
    pub fn validate_bounds(
        &self,
        args: &[String],
        lower: usize,
        upper: usize,
        option: Option<&str>,
    ) -> Result<(), CommandError> {
        if args.len() < lower {
            return Err(CommandError::validation(format!(
                "too few arguments {}: expected at least {lower}",
                self.what(option)
            )));
        }
        if args.len() > upper {
            return Err(CommandError::validation(format!(
                "too many arguments {}: expected at most {upper}",
                self.what(option)
            )));
        }
        Ok(())
    }

    /// One or two arguments; a missing second argument means `HEAD`.
    pub fn two_args_implied_head(
        &self,
        args: &[String],
        option: Option<&str>,
    ) -> Result<(String, String), CommandError> {
        self.validate_bounds(args, 1, 2, option)?;
        let second = args.get(1).cloned().unwrap_or_else(|| HEAD.to_string());
        Ok((args[0].clone(), second))
    }

    /// Zero or one argument; a missing argument means `HEAD`.
    pub fn one_arg_implied_head(
        &self,
        args: &[String],
        option: Option<&str>,
    ) -> Result<String, CommandError> {
        self.validate_bounds(args, 0, 1, option)?;
        Ok(args.first().cloned().unwrap_or_else(|| HEAD.to_string()))
    }

    /// Reject any positional argument.
    pub fn no_general_args(&self) -> Result<(), CommandError> {
        if self.general.is_empty() {
            Ok(())
        } else {
            Err(CommandError::validation(format!(
                "{} does not take positional arguments",
                self.method
            )))
        }
    }

    /// `[origin] [refspec]`: at most two arguments, the first naming the
    /// remote. Returns the refspec, if any.
    pub fn two_args_for_origin(&self) -> Result<Option<String>, CommandError> {
        self.validate_bounds(&self.general, 0, 2, None)?;
        match self.general.first() {
            None => Ok(None),
            Some(remote) if remote == "origin" => Ok(self.general.get(1).cloned()),
            Some(remote) => Err(CommandError::validation(format!(
                "{remote} is not a remote in your repository; try adding origin to that argument"
            ))),
        }
    }

    /// Replace every `.` argument and option value with `HEAD`.
    pub fn map_dot_to_head(&mut self) {
        let swap = |arg: &mut String| {
            if arg == "." {
                *arg = HEAD.to_string();
            }
        };
        self.general.iter_mut().for_each(swap);
        self.options.values_mut().flatten().for_each(swap);
    }

    /// Move the `-r` values in front of the positional arguments.
    pub fn prepend_option_r(&mut self) {
        if let Some(revs) = self.options.get("-r") {
            let mut general = revs.clone();
            general.append(&mut self.general);
            self.general = general;
        }
    }

    /// Move the `-r` values after the positional arguments.
    pub fn append_option_r(&mut self) {
        if let Some(revs) = self.options.get("-r") {
            self.general.extend(revs.iter().cloned());
        }
    }
}
