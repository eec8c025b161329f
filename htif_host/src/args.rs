//! Classification of the hybrid front-end command line.
//!
//! A command line mixes three namespaces that share no grammar:
//!
//! ```text
//! htif_host [EMULATOR OPTION]... [VERILOG PLUSARG]... [HOST OPTION]... BINARY [TARGET OPTION]...
//! ```
//!
//! Host options come from an [`OptionTable`]. `+name[=value]` tokens are
//! plusargs; a fixed set of them are aliases for host options. Everything
//! from the first token that cannot be consumed onwards belongs to the target
//! program and is never interpreted.
//!
//! While *permissive* (`+permissive` ... `+permissive-off`) any token that
//! is not recognized is skipped, on the assumption that a hardware simulator
//! sharing the command line will consume it. While strict (the default) an
//! unrecognized option is an error, and an unrecognized positional or plusarg
//! is the binary.

use std::path::PathBuf;

use log::{debug, warn};

use crate::error::{HtifError, Result};
use crate::options::{
    HasArg, LongOption, Lookup, OptionTable, OptionTag, PERMISSIVE_OFF, PERMISSIVE_ON,
    PLUSARG_ALIASES, PlusAlias,
};

/// A `+name` or `+name=value` token consumed during scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlusArg {
    pub name: String,
    pub value: Option<String>,
}

impl PlusArg {
    fn parse(token: &str) -> Self {
        let body = token.strip_prefix('+').unwrap_or(token);
        match body.split_once('=') {
            Some((name, value)) => Self {
                name: name.to_string(),
                value: Some(value.to_string()),
            },
            None => Self {
                name: body.to_string(),
                value: None,
            },
        }
    }
}

/// A host option selected on the command line, either directly or through a
/// plusarg alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedOption {
    pub tag: OptionTag,
    pub name: &'static str,
    pub value: Option<String>,
}

/// Parsed host options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostOptions {
    pub signature_file: Option<PathBuf>,
    selected: Vec<SelectedOption>,
}

impl HostOptions {
    /// Every selection in command-line order.
    pub fn selected(&self) -> &[SelectedOption] {
        &self.selected
    }

    /// The last selection carrying `tag`.
    pub fn get(&self, tag: OptionTag) -> Option<&SelectedOption> {
        self.selected.iter().rev().find(|sel| sel.tag == tag)
    }

    /// `Some(display)` when a frame buffer was requested; the display is
    /// `None` for a bare `+rfb`/`--rfb`.
    pub fn rfb(&self) -> Option<Option<&str>> {
        self.get(OptionTag::Rfb).map(|sel| sel.value.as_deref())
    }

    pub fn disk(&self) -> Option<&str> {
        self.get(OptionTag::Disk).and_then(|sel| sel.value.as_deref())
    }

    pub fn chroot(&self) -> Option<&str> {
        self.get(OptionTag::Chroot).and_then(|sel| sel.value.as_deref())
    }
}

/// Result of classifying one argument vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Invoking program name, for diagnostics.
    pub program: String,
    pub options: HostOptions,
    pub plusargs: Vec<PlusArg>,
    /// Tokens skipped while permissive, left for downstream consumers.
    pub passthrough: Vec<String>,
    /// Binary path (or `"none"`) followed by its own arguments.
    pub target_args: Vec<String>,
}

/// Per-token classification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawOption<'a> {
    /// `--name` or `--name=value`.
    LongOption {
        name: &'a str,
        inline: Option<&'a str>,
    },
    /// `-x` and other single-dash tokens.
    Flag(&'a str),
    PlusArg(&'a str),
    Positional(&'a str),
    /// A bare `--`.
    EndOfOptions,
}

impl<'a> RawOption<'a> {
    fn from_token(token: &'a str) -> Self {
        if token == "--" {
            RawOption::EndOfOptions
        } else if let Some(long) = token.strip_prefix("--") {
            match long.split_once('=') {
                Some((name, value)) => RawOption::LongOption {
                    name,
                    inline: Some(value),
                },
                None => RawOption::LongOption {
                    name: long,
                    inline: None,
                },
            }
        } else if token.len() > 1 && token.starts_with('-') {
            RawOption::Flag(&token[1..])
        } else if token.starts_with('+') {
            RawOption::PlusArg(token)
        } else {
            RawOption::Positional(token)
        }
    }
}

/// What scanning does after looking at one token.
enum Step<'a> {
    Continue,
    /// The token is not ours; it starts the target arguments.
    Terminate,
    /// The token is an option nobody recognizes.
    Unrecognized(String),
    Select(&'a LongOption, Option<String>),
}

/// Splits an argument vector into host options, plusargs and target
/// arguments.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: OptionTable,
}

impl Classifier {
    pub fn new(table: OptionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &OptionTable {
        &self.table
    }

    /// Classify `argv`; `argv[0]` is the invoking program name.
    pub fn classify<S: AsRef<str>>(&self, argv: &[S]) -> Result<Classification> {
        let mut out = Classification {
            program: argv
                .first()
                .map_or_else(|| "htif_host".to_string(), |s| s.as_ref().to_string()),
            ..Classification::default()
        };
        let args: Vec<&str> = argv.iter().skip(1).map(AsRef::as_ref).collect();

        let mut permissive = false;
        let mut idx = 0;
        while idx < args.len() {
            let token = args[idx];
            idx += 1;

            let step = match RawOption::from_token(token) {
                RawOption::EndOfOptions => break,
                RawOption::LongOption { name, inline } => match self.table.lookup_abbrev(name) {
                    Lookup::Missing => Step::Unrecognized(format!(
                        "Unknown argument '{token}' (did you mean to enable +permissive parsing?)"
                    )),
                    Lookup::Ambiguous(names) => Step::Unrecognized(format!(
                        "Option '--{name}' is ambiguous; possibilities: --{}",
                        names.join(" --")
                    )),
                    Lookup::Found(opt) => match (opt.has_arg, inline) {
                        (HasArg::No, None) => Step::Select(opt, None),
                        (HasArg::No, Some(_)) => Step::Unrecognized(format!(
                            "Option '--{name}' doesn't allow an argument"
                        )),
                        (HasArg::Optional, value) => Step::Select(opt, value.map(str::to_string)),
                        (HasArg::Required, Some(value)) => {
                            Step::Select(opt, Some(value.to_string()))
                        }
                        (HasArg::Required, None) if idx < args.len() => {
                            idx += 1;
                            Step::Select(opt, Some(args[idx - 1].to_string()))
                        }
                        (HasArg::Required, None) => Step::Unrecognized(format!(
                            "Option '--{name}' requires an argument"
                        )),
                    },
                },
                RawOption::Flag(group) if wants_help(group, permissive) => {
                    match self.table.by_tag(OptionTag::Help) {
                        Some(opt) => Step::Select(opt, None),
                        None => return Err(HtifError::HelpRequested),
                    }
                }
                RawOption::Flag(_) => Step::Unrecognized(format!(
                    "Unknown argument '{token}' (did you mean to enable +permissive parsing?)"
                )),
                RawOption::PlusArg(plusarg) => self.plusarg(plusarg, &mut permissive)?,
                RawOption::Positional(_) if permissive => {
                    warn!("Skipping '{token}' while parsing permissively");
                    out.passthrough.push(token.to_string());
                    Step::Continue
                }
                RawOption::Positional(_) => Step::Terminate,
            };

            match step {
                Step::Continue => {}
                Step::Terminate => {
                    idx -= 1;
                    break;
                }
                Step::Unrecognized(msg) if permissive => {
                    debug!("Ignoring unrecognized option while permissive: {msg}");
                    out.passthrough.push(token.to_string());
                }
                Step::Unrecognized(msg) => return Err(HtifError::InvalidArgument(msg)),
                Step::Select(opt, value) => select(&mut out.options, opt, value)?,
            }

            if matches!(RawOption::from_token(token), RawOption::PlusArg(_)) {
                out.plusargs.push(PlusArg::parse(token));
            }
        }

        out.target_args = args[idx.min(args.len())..]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if out.target_args.is_empty() {
            return Err(HtifError::NoBinary);
        }
        debug!(
            "Classified command line: {} host option(s), {} plusarg(s), target {:?}",
            out.options.selected.len(),
            out.plusargs.len(),
            out.target_args
        );
        Ok(out)
    }

    fn plusarg(&self, token: &str, permissive: &mut bool) -> Result<Step<'_>> {
        for alias in PLUSARG_ALIASES {
            let (tag, value) = match *alias {
                PlusAlias::Exact(pattern, tag) if token == pattern => (tag, None),
                PlusAlias::Prefix(pattern, tag) => match token.strip_prefix(pattern) {
                    Some(rest) => (tag, Some(rest.to_string())),
                    None => continue,
                },
                PlusAlias::Exact(..) => continue,
            };
            if let Some(opt) = self.table.by_tag(tag) {
                return Ok(Step::Select(opt, value));
            }
        }

        if token.starts_with(PERMISSIVE_OFF) {
            if !*permissive {
                return Err(HtifError::invalid(
                    "Found +permissive-off when not parsing permissively",
                ));
            }
            *permissive = false;
            Ok(Step::Continue)
        } else if token.starts_with(PERMISSIVE_ON) {
            if *permissive {
                return Err(HtifError::invalid(
                    "Found +permissive when already parsing permissively",
                ));
            }
            *permissive = true;
            Ok(Step::Continue)
        } else if *permissive {
            Ok(Step::Unrecognized(format!("unrecognized plusarg '{token}'")))
        } else {
            Ok(Step::Terminate)
        }
    }
}

/// Whether a short-flag group reaches `-h`. Scanning a group stops at its
/// first unknown flag unless parsing permissively.
fn wants_help(group: &str, permissive: bool) -> bool {
    match group.find('h') {
        Some(0) => true,
        Some(_) => permissive,
        None => false,
    }
}

fn select(options: &mut HostOptions, opt: &LongOption, value: Option<String>) -> Result<()> {
    match opt.tag {
        OptionTag::Help => return Err(HtifError::HelpRequested),
        OptionTag::Signature => options.signature_file = value.as_deref().map(PathBuf::from),
        _ => {}
    }
    debug!("Selected host option --{} {:?}", opt.name, value);
    options.selected.push(SelectedOption {
        tag: opt.tag,
        name: opt.name,
        value,
    });
    Ok(())
}
