//! lumen - render a demo scene to a PNG.
//!
//! ```text
//! lumen [--scene cornell|instances] [--width N] [--height N] [--frames N]
//!       [--threads N] [--depth N] [--settings FILE] [--output FILE]
//! ```

mod scenes;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use lumen_renderer::{RenderSettings, Renderer};

use crate::scenes::SceneKind;

#[derive(Debug, Clone, PartialEq)]
struct Options {
    scene: SceneKind,
    width: u32,
    height: u32,
    frames: u32,
    threads: Option<usize>,
    depth: Option<u32>,
    settings: Option<PathBuf>,
    output: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            scene: SceneKind::Cornell,
            width: 640,
            height: 480,
            frames: 64,
            threads: None,
            depth: None,
            settings: None,
            output: PathBuf::from("lumen.png"),
        }
    }
}

impl Options {
    fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(flag) = args.next() {
            let mut value = || {
                args.next()
                    .with_context(|| format!("Missing value for {}", flag))
            };
            match flag.as_str() {
                "--scene" => options.scene = value()?.parse()?,
                "--width" => options.width = parse_number(&flag, &value()?)?,
                "--height" => options.height = parse_number(&flag, &value()?)?,
                "--frames" => options.frames = parse_number(&flag, &value()?)?,
                "--threads" => options.threads = Some(parse_number(&flag, &value()?)?),
                "--depth" => options.depth = Some(parse_number(&flag, &value()?)?),
                "--settings" => options.settings = Some(PathBuf::from(value()?)),
                "--output" => options.output = PathBuf::from(value()?),
                other => bail!("Unknown argument '{}'", other),
            }
        }

        if options.width == 0 || options.height == 0 {
            bail!("Image size must be non-zero, got {}x{}", options.width, options.height);
        }
        Ok(options)
    }

    /// Settings file (or defaults) with command-line overrides applied.
    fn render_settings(&self) -> Result<RenderSettings> {
        let mut settings = match &self.settings {
            Some(path) => RenderSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => RenderSettings::default(),
        };
        if let Some(threads) = self.threads {
            settings.thread_count = threads;
        }
        if let Some(depth) = self.depth {
            settings.max_ray_depth = depth;
        }
        Ok(settings)
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value '{}' for {}", value, flag))
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let options = Options::parse(std::env::args().skip(1))?;
    let settings = options.render_settings()?;
    let seed = settings.seed;

    log::info!(
        "Rendering {:?} at {}x{}, {} frames",
        options.scene,
        options.width,
        options.height,
        options.frames
    );

    let (scene, mut camera) = scenes::build(options.scene, options.width, options.height)?;
    log::info!(
        "Scene: {} primitives, {} instances, {} lights",
        scene.primitives().len(),
        scene.instances().len(),
        scene.lights().len()
    );

    let mut renderer = Renderer::with_settings(options.width, options.height, settings);
    let start = Instant::now();

    for frame in 0..options.frames {
        camera.compute_ray_directions(seed.wrapping_add(frame as u64));
        renderer
            .render_scene(&camera, &scene)
            .with_context(|| format!("Failed to render frame {}", frame + 1))?;
    }

    let elapsed = start.elapsed();
    log::info!(
        "Rendered {} frames in {:.2?} ({:.2?} per frame)",
        options.frames,
        elapsed,
        elapsed / options.frames.max(1)
    );

    let image = renderer.image();
    image::save_buffer(
        &options.output,
        &image.to_rgba8(),
        image.width,
        image.height,
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("Failed to write {}", options.output.display()))?;

    log::info!("Saved {}", options.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options> {
        Options::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        assert_eq!(parse(&[]).unwrap(), Options::default());
    }

    #[test]
    fn test_all_flags() {
        let options = parse(&[
            "--scene", "instances", "--width", "320", "--height", "200", "--frames", "8",
            "--threads", "2", "--depth", "3", "--output", "out.png",
        ])
        .unwrap();

        assert_eq!(options.scene, SceneKind::Instances);
        assert_eq!((options.width, options.height), (320, 200));
        assert_eq!(options.frames, 8);
        assert_eq!(options.threads, Some(2));
        assert_eq!(options.depth, Some(3));
        assert_eq!(options.output, PathBuf::from("out.png"));

        let settings = options.render_settings().unwrap();
        assert_eq!(settings.thread_count, 2);
        assert_eq!(settings.max_ray_depth, 3);
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse(&["--width"]).is_err());
        assert!(parse(&["--width", "wide"]).is_err());
        assert!(parse(&["--width", "0"]).is_err());
        assert!(parse(&["--scene", "kitchen"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn test_missing_settings_file() {
        let options = parse(&["--settings", "/nonexistent/lumen.json"]).unwrap();
        assert!(options.render_settings().is_err());
    }
}
