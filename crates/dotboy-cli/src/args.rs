use crate::config::HostConfig;
use clap::{Parser, ValueEnum};
use dotboy_core::DmgRevision;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Revision {
    #[value(name = "rev0")]
    Rev0,
    #[value(name = "reva")]
    RevA,
    #[value(name = "revb")]
    RevB,
    #[value(name = "revc")]
    RevC,
}

impl From<Revision> for DmgRevision {
    fn from(rev: Revision) -> Self {
        match rev {
            Revision::Rev0 => DmgRevision::Rev0,
            Revision::RevA => DmgRevision::RevA,
            Revision::RevB => DmgRevision::RevB,
            Revision::RevC => DmgRevision::RevC,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dotboy", about = "Run a Game Boy ROM headless")]
pub struct Args {
    /// Path to ROM file
    pub rom: PathBuf,

    /// Number of frames to run
    #[arg(long)]
    pub frames: Option<u32>,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for battery saves
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Write the last frame to this PNG file
    #[arg(long)]
    pub screenshot: Option<PathBuf>,

    /// Write a dump of VRAM tile data to this PNG file
    #[arg(long)]
    pub tiles: Option<PathBuf>,

    /// Print bytes sent over the serial port
    #[arg(long)]
    pub serial: bool,

    /// DMG board revision
    #[arg(long, value_enum, default_value_t = Revision::RevC)]
    pub revision: Revision,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Everything a run needs, after merging the config file with the command
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub rom: PathBuf,
    pub frames: u32,
    pub save_dir: Option<PathBuf>,
    pub palette: [u32; 4],
    pub print_serial: bool,
    pub screenshot: Option<PathBuf>,
    pub tiles: Option<PathBuf>,
    pub revision: DmgRevision,
}

impl Args {
    /// Command-line flags win over the config file.
    pub fn options(&self, cfg: HostConfig) -> Options {
        Options {
            rom: self.rom.clone(),
            frames: self.frames.unwrap_or(cfg.frames),
            save_dir: self.save_dir.clone().or(cfg.save_dir),
            palette: cfg.palette,
            print_serial: self.serial || cfg.print_serial,
            screenshot: self.screenshot.clone(),
            tiles: self.tiles.clone(),
            revision: self.revision.into(),
        }
    }
}
