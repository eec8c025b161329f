use std::{env, process};

use anyhow::{Context, Result};
use htif_host::{
    Classifier, GoblinLoader, HtifError, MemImage, OptionTag, Session, render_usage, signal,
};
use log::{debug, info, warn};

fn main() -> Result<()> {
    env_logger::init();
    signal::install().context("failed to install signal handlers")?;

    let argv: Vec<String> = env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let classifier = Classifier::default();
    let mut target = MemImage::default();

    let program = argv.first().map_or("htif_host", String::as_str);
    let mut session =
        match Session::with_collaborators(&mut target, &GoblinLoader, &classifier, &argv) {
            Ok(session) => session,
            Err(HtifError::HelpRequested) => {
                print!("{}", render_usage(program, classifier.table()));
                process::exit(1);
            }
            Err(err @ HtifError::NoBinary) => {
                print!("{}", render_usage(program, classifier.table()));
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

    for sel in session.options().selected() {
        if matches!(sel.tag, OptionTag::Rfb | OptionTag::Disk | OptionTag::Chroot) {
            warn!("--{} is not supported by the memory-image target, ignoring", sel.name);
        }
    }
    if !session.passthrough().is_empty() {
        debug!("Left for the simulator: {:?}", session.passthrough());
    }
    info!("Target arguments: {:?}", session.target_args());

    let code = session.run()?;
    process::exit(code);
}
