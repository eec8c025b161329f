//! Usage text for the front-end command line.
//!
//! The command line cannot be parsed by clap (option scanning has to stop at
//! the binary and honor permissive mode), but clap still renders the help.

use clap::{Arg, ArgAction, Command};

use crate::options::{HasArg, OptionTable, OptionTag};

const PLUSARG_HELP: &str = "\
EMULATOR OPTIONS
  Consult the emulator's own documentation for available options.

PLUSARGS
  +rfb[=DISPLAY]      Same as --rfb[=DISPLAY]
  +disk=DISK          Same as --disk=DISK
  +signature=FILE     Same as --signature=FILE
  +chroot=PATH        Same as --chroot=PATH
  +permissive         Ignore unrecognized arguments until +permissive-off
  +permissive-off     Stop ignoring unrecognized arguments

Everything from BINARY onwards is passed to the target program. BINARY may be
'none' to run without loading a program.";

/// Build the clap command describing `table`.
pub fn usage_command(program: &str, table: &OptionTable) -> Command {
    let mut cmd = Command::new(program.to_string())
        .override_usage(format!(
            "{program} [EMULATOR OPTION]... [VERILOG PLUSARG]... [HOST OPTION]... BINARY [TARGET OPTION]..."
        ))
        .about("Run a BINARY on a target driven through the host-target interface.")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .next_help_heading("HOST OPTIONS")
        .after_help(PLUSARG_HELP);

    for opt in table.iter() {
        let mut arg = Arg::new(opt.name).long(opt.name).help(opt.help);
        arg = match opt.has_arg {
            HasArg::No => arg.action(ArgAction::SetTrue),
            HasArg::Required => arg.num_args(1),
            HasArg::Optional => arg.num_args(0..=1).require_equals(true),
        };
        if opt.has_arg != HasArg::No && !opt.value_name.is_empty() {
            arg = arg.value_name(opt.value_name);
        }
        if opt.tag == OptionTag::Help {
            arg = arg.short('h');
        }
        cmd = cmd.arg(arg);
    }
    cmd
}

/// Rendered help text for `program`.
pub fn render_usage(program: &str, table: &OptionTable) -> String {
    usage_command(program, table).render_help().to_string()
}
