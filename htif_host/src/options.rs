//! Host long-option table and the plusarg aliases that map onto it.

/// Whether a long option takes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasArg {
    /// `--name` only.
    No,
    /// `--name=value` or `--name value`.
    Required,
    /// `--name` or `--name=value`.
    Optional,
}

/// Dispatch tag delivered with every selected option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionTag {
    Help,
    /// Remote frame-buffer device.
    Rfb,
    /// Disk image device.
    Disk,
    /// Memory-signature output file.
    Signature,
    /// Chroot path for proxied syscalls.
    Chroot,
    /// An option contributed by the embedding application.
    Extension(u16),
}

/// One entry of the host long-option table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongOption {
    pub name: &'static str,
    pub has_arg: HasArg,
    pub tag: OptionTag,
    /// Placeholder shown in usage text for the value.
    pub value_name: &'static str,
    pub help: &'static str,
}

impl LongOption {
    pub const fn new(name: &'static str, has_arg: HasArg, tag: OptionTag) -> Self {
        Self {
            name,
            has_arg,
            tag,
            value_name: "",
            help: "",
        }
    }

    pub const fn value_name(mut self, value_name: &'static str) -> Self {
        self.value_name = value_name;
        self
    }

    pub const fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }
}

/// How a plusarg prefix is turned into a long option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlusAlias {
    /// The token must equal the pattern exactly; no value.
    Exact(&'static str, OptionTag),
    /// The token starts with the pattern; the rest is the value.
    Prefix(&'static str, OptionTag),
}

/// Fixed plusarg to long-option mapping, checked in order.
pub(crate) const PLUSARG_ALIASES: &[PlusAlias] = &[
    PlusAlias::Exact("+rfb", OptionTag::Rfb),
    PlusAlias::Prefix("+rfb=", OptionTag::Rfb),
    PlusAlias::Prefix("+disk=", OptionTag::Disk),
    PlusAlias::Prefix("+signature=", OptionTag::Signature),
    PlusAlias::Prefix("+chroot=", OptionTag::Chroot),
];

pub(crate) const PERMISSIVE_OFF: &str = "+permissive-off";
pub(crate) const PERMISSIVE_ON: &str = "+permissive";

/// Outcome of [`OptionTable::lookup_abbrev`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a LongOption),
    /// Names of every option the abbreviation could stand for.
    Ambiguous(Vec<&'static str>),
    Missing,
}

/// Ordered, extensible table of host long options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTable {
    entries: Vec<LongOption>,
}

impl OptionTable {
    /// An empty table. `-h` still requests help.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an option. Later entries never shadow earlier ones with the same name.
    pub fn with(mut self, option: LongOption) -> Self {
        self.entries.push(option);
        self
    }

    pub fn push(&mut self, option: LongOption) {
        self.entries.push(option);
    }

    pub fn lookup(&self, name: &str) -> Option<&LongOption> {
        self.entries.iter().find(|opt| opt.name == name)
    }

    /// Resolve `name` as `getopt_long` does: an exact match, or else an
    /// abbreviation shared by exactly one option.
    pub fn lookup_abbrev(&self, name: &str) -> Lookup<'_> {
        if let Some(opt) = self.lookup(name) {
            return Lookup::Found(opt);
        }
        if name.is_empty() {
            return Lookup::Missing;
        }
        let mut matches = self.entries.iter().filter(|opt| opt.name.starts_with(name));
        match (matches.next(), matches.next()) {
            (Some(opt), None) => Lookup::Found(opt),
            (Some(first), Some(second)) => {
                let mut names = vec![first.name, second.name];
                names.extend(matches.map(|opt| opt.name));
                Lookup::Ambiguous(names)
            }
            (None, _) => Lookup::Missing,
        }
    }

    /// First option carrying `tag`. Used to resolve plusarg aliases.
    pub fn by_tag(&self, tag: OptionTag) -> Option<&LongOption> {
        self.entries.iter().find(|opt| opt.tag == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LongOption> {
        self.entries.iter()
    }
}

impl Default for OptionTable {
    fn default() -> Self {
        Self::empty()
            .with(
                LongOption::new("help", HasArg::No, OptionTag::Help)
                    .help("Print this help message and exit"),
            )
            .with(
                LongOption::new("rfb", HasArg::Optional, OptionTag::Rfb)
                    .value_name("DISPLAY")
                    .help("Add a remote frame buffer on port 5900 + DISPLAY (default 0)"),
            )
            .with(
                LongOption::new("disk", HasArg::Required, OptionTag::Disk)
                    .value_name("DISK")
                    .help("Add DISK device (use a ramdisk since this isn't supported)"),
            )
            .with(
                LongOption::new("signature", HasArg::Required, OptionTag::Signature)
                    .value_name("FILE")
                    .help("Write torture test signature to FILE"),
            )
            .with(
                LongOption::new("chroot", HasArg::Required, OptionTag::Chroot)
                    .value_name("PATH")
                    .help("Use PATH as location of syscall-servicing binaries"),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_builtin_options() {
        let table = OptionTable::default();
        for name in ["help", "rfb", "disk", "signature", "chroot"] {
            assert!(table.lookup(name).is_some(), "missing --{name}");
        }
        assert_eq!(table.lookup("rfb").unwrap().has_arg, HasArg::Optional);
        assert_eq!(
            table.by_tag(OptionTag::Signature).unwrap().name,
            "signature"
        );
    }

    #[test]
    fn extensions_are_appended_in_order() {
        let table = OptionTable::default()
            .with(LongOption::new("dtb", HasArg::Required, OptionTag::Extension(0)));
        let names: Vec<_> = table.iter().map(|opt| opt.name).collect();
        assert_eq!(names.last(), Some(&"dtb"));
        assert!(OptionTable::empty().lookup("help").is_none());
    }

    #[test]
    fn abbreviations_resolve_when_unique() {
        let mut table = OptionTable::default();
        assert_eq!(table.lookup_abbrev("sig"), Lookup::Found(table.lookup("signature").unwrap()));
        assert_eq!(table.lookup_abbrev("rfb"), Lookup::Found(table.lookup("rfb").unwrap()));
        assert_eq!(table.lookup_abbrev(""), Lookup::Missing);
        assert_eq!(table.lookup_abbrev("bogus"), Lookup::Missing);

        table.push(LongOption::new("disk-cache", HasArg::No, OptionTag::Extension(1)));
        assert_eq!(table.lookup_abbrev("dis"), Lookup::Ambiguous(vec!["disk", "disk-cache"]));
        assert_eq!(table.lookup_abbrev("disk"), Lookup::Found(table.lookup("disk").unwrap()));
        assert_eq!(table.lookup_abbrev("disk-"), Lookup::Found(table.lookup("disk-cache").unwrap()));
    }
}
