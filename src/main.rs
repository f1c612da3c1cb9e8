mod applet;
mod clock;
mod config;
mod geometry;
mod notify;
mod render;
mod settings;
mod timer;
mod types;

use anyhow::{Context, Result};
use std::path::Path;

use crate::applet::{run_applet, AppletOptions, PanelCorner};
use crate::clock::{LocalTime, TimeSource};
use crate::config::{APP_NAME, MAX_CLOCK_SIZE, MAX_PANEL_SIZE, MIN_CLOCK_SIZE};
use crate::render::{Renderer, SvgRenderer};
use crate::settings::{FileStore, SettingKey, Settings};
use crate::types::clamp_size;

const USAGE: &str = "Usage: panel-clock [--uuid <id>] [--panel-size <px>] [--anchor <corner>]
       panel-clock --set <key> <value>
       panel-clock --get <key>
       panel-clock --reset-face
       panel-clock --snapshot <file.png> [--size <px>]
Keys: clock-size, clock-hands, clock-outline, clock-face
Corners: top-left, top-right, bottom-left, bottom-right";

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            return iter.next().map(String::as_str);
        }
    }
    None
}

fn flag_pair<'a>(args: &'a [String], flag: &str) -> Option<(&'a str, &'a str)> {
    let idx = args.iter().position(|arg| arg == flag)?;
    match (args.get(idx + 1), args.get(idx + 2)) {
        (Some(key), Some(value)) => Some((key.as_str(), value.as_str())),
        _ => None,
    }
}

fn parse_size(args: &[String], flag: &str) -> Result<Option<u32>> {
    flag_value(args, flag)
        .map(|value| {
            value
                .parse::<u32>()
                .with_context(|| format!("{flag} expects a pixel count, got {value:?}"))
        })
        .transpose()
}

fn parse_panel_size(args: &[String]) -> Result<u32> {
    let Some(size) = parse_size(args, "--panel-size")? else {
        return Ok(MAX_CLOCK_SIZE);
    };
    if !(MIN_CLOCK_SIZE..=MAX_PANEL_SIZE).contains(&size) {
        anyhow::bail!("--panel-size must be between {MIN_CLOCK_SIZE} and {MAX_PANEL_SIZE}, got {size}");
    }
    Ok(size)
}

fn open_settings() -> Result<Settings<FileStore>> {
    Ok(Settings::new(FileStore::open_default()?))
}

fn notify_running_clock() -> Result<()> {
    let path = notify::runtime_socket_path();
    if notify::send_changed(&path)? {
        log::debug!("notified clock on {}", path.display());
    } else {
        log::info!("no running clock on {}, change applies at next start", path.display());
    }
    Ok(())
}

fn snapshot(path: &Path, size: Option<u32>) -> Result<()> {
    let mut settings = open_settings()?;
    let config = settings.load();
    let size = size.map(|size| clamp_size(size as i64)).unwrap_or(config.size);
    let frame = SvgRenderer::default().render(LocalTime.now(), &config, size)?;
    frame
        .save_png(path)
        .with_context(|| format!("write {}", path.display()))?;
    log::info!("wrote {size}px clock to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        eprintln!("{USAGE}");
        return Ok(());
    }
    if args.iter().any(|arg| arg == "--set") {
        let (key, value) = flag_pair(&args, "--set").context("--set needs <key> <value>")?;
        let key: SettingKey = key.parse()?;
        let mut settings = open_settings()?;
        settings.set(key, value)?;
        log::info!("{key} = {} in {}", settings.get(key), settings.store().path().display());
        return notify_running_clock();
    }
    if let Some(key) = flag_value(&args, "--get") {
        let key: SettingKey = key.parse()?;
        println!("{}", open_settings()?.get(key));
        return Ok(());
    }
    if args.iter().any(|arg| arg == "--reset-face") {
        open_settings()?.reset_face_to_transparent()?;
        return notify_running_clock();
    }
    if let Some(path) = flag_value(&args, "--snapshot") {
        return snapshot(Path::new(path), parse_size(&args, "--size")?);
    }

    let corner = match flag_value(&args, "--anchor") {
        Some(value) => value.parse::<PanelCorner>()?,
        None => PanelCorner::TopRight,
    };
    let panel_size = parse_panel_size(&args)?;
    let uuid = flag_value(&args, "--uuid").unwrap_or(APP_NAME).to_string();
    run_applet(AppletOptions {
        uuid,
        panel_size,
        corner,
    })
}
