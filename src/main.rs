//! stacktui: build a block tower in the terminal.

mod app;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;
use stacktui::config::{GameConfig, default_sprites};
use stacktui::logging;
use stacktui::theme::{Palette, Theme};
use std::path::PathBuf;
use std::time::Duration;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref(), &args.log_level)?;
    let theme = Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = args.game_config();
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, async move {
        let mut app = App::new(args, config, theme);
        app.run().await
    })
}

/// Drag-and-drop block tower builder in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "stacktui",
    version,
    about = "Drag blocks from the tray onto a tower, or throw them down the hole.",
    long_about = "stacktui is a small block-stacking game for the terminal.\n\n\
        Drag a block out of the tray at the bottom with the mouse. Drop it above the top of \
        the tower to stack it; drop it lower and it is thrown away. Pull a block out of the \
        tower and everything above it falls into the gap. Drop blocks into the hole on the \
        right to get rid of them.\n\n\
        CONTROLS:\n  Mouse drag    Pick up, move and drop blocks; drag the tray to scroll\n  \
        Left/Right    Scroll the tray (also h/l)\n  R             Restart\n  Q / Esc       Quit"
)]
pub struct Args {
    /// Number of blocks in the tray.
    #[arg(short, long, default_value = "10", value_name = "N")]
    pub blocks: usize,

    /// Play field width in world units (each is 4 columns). Defaults to what fits.
    #[arg(long, value_name = "UNITS")]
    pub width: Option<f32>,

    /// Play field height in world units (each is 2 rows). Defaults to what fits.
    #[arg(long, value_name = "UNITS")]
    pub height: Option<f32>,

    /// Pause between tray spawns at start.
    #[arg(long, default_value = "50", value_name = "MS")]
    pub spawn_delay_ms: u64,

    /// Distance between tray slots in world units.
    #[arg(long, default_value = "2.25", value_name = "UNITS")]
    pub tray_spacing: f32,

    /// Target render frames per second (1 to 1000).
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Skip tweens: blocks land, fall and vanish instantly.
    #[arg(long)]
    pub no_animation: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file. Logging is off without it.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter when RUST_LOG is not set.
    #[arg(long, default_value = "info", value_name = "FILTER")]
    pub log_level: String,
}

impl Args {
    fn game_config(&self) -> GameConfig {
        GameConfig {
            sprites: default_sprites(self.blocks),
            tray_spacing: self.tray_spacing,
            spawn_delay: Duration::from_millis(self.spawn_delay_ms),
            frame_rate: self.frame_rate,
            ..GameConfig::default()
        }
    }
}
