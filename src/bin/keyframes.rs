use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use keyframes::{KeyframeSettings, KeyframeValue, ParsedAnimation, RectValue, Time};

#[derive(Parser, Debug)]
#[command(name = "keyframes", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the interpolated value at one or more frames.
    Sample(SampleArgs),
    /// Parse an animation and print it back in canonical form.
    Normalize(AnimArgs),
    /// Print the parsed keyframes as JSON.
    Inspect(AnimArgs),
}

#[derive(Parser, Debug)]
struct AnimArgs {
    /// Animation text, e.g. "0=0;50=100;100|=100".
    #[arg(long)]
    anim: String,

    /// Value shape of the animated parameter.
    #[arg(long, value_enum, default_value_t = ShapeChoice::Scalar)]
    shape: ShapeChoice,

    /// Keyframe settings JSON.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Fail on malformed segments instead of skipping them.
    #[arg(long)]
    strict: bool,
}

#[derive(Parser, Debug)]
struct SampleArgs {
    #[command(flatten)]
    anim: AnimArgs,

    /// Frame to sample; may be repeated.
    #[arg(long = "at", required = true)]
    at: Vec<i64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShapeChoice {
    Scalar,
    Rect,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Sample(args) => match args.anim.shape {
            ShapeChoice::Scalar => cmd_sample::<f64>(&args),
            ShapeChoice::Rect => cmd_sample::<RectValue>(&args),
        },
        Command::Normalize(args) => match args.shape {
            ShapeChoice::Scalar => cmd_normalize::<f64>(&args),
            ShapeChoice::Rect => cmd_normalize::<RectValue>(&args),
        },
        Command::Inspect(args) => match args.shape {
            ShapeChoice::Scalar => cmd_inspect::<f64>(&args),
            ShapeChoice::Rect => cmd_inspect::<RectValue>(&args),
        },
    }
}

fn load_settings(args: &AnimArgs) -> anyhow::Result<KeyframeSettings> {
    match &args.settings {
        Some(path) => KeyframeSettings::load(path)
            .with_context(|| format!("load settings '{}'", path.display())),
        None => Ok(KeyframeSettings::default()),
    }
}

fn parse<V: KeyframeValue>(
    args: &AnimArgs,
) -> anyhow::Result<(KeyframeSettings, ParsedAnimation<V>)> {
    let settings = load_settings(args)?;
    let parsed = if args.strict {
        let keys =
            keyframes::parse_animation_strict::<V>(&args.anim, settings.fps, settings.default_kind)
                .context("parse animation")?;
        ParsedAnimation {
            keyframes: keys,
            skipped: 0,
        }
    } else {
        keyframes::parse_animation::<V>(&args.anim, settings.fps, settings.default_kind)
    };
    if parsed.keyframes.is_empty() {
        anyhow::bail!("animation '{}' holds no usable keyframe", args.anim);
    }
    if parsed.skipped > 0 {
        eprintln!("skipped {} malformed segment(s)", parsed.skipped);
    }
    Ok((settings, parsed))
}

fn cmd_sample<V: KeyframeValue>(args: &SampleArgs) -> anyhow::Result<()> {
    let (settings, parsed) = parse::<V>(&args.anim)?;
    for &frame in &args.at {
        let at = Time::new(frame, settings.fps);
        let value = keyframes::value_at(&parsed.keyframes, at)
            .with_context(|| format!("sample frame {frame}"))?;
        println!("{frame}\t{}", value.write_text(settings.use_opacity));
    }
    Ok(())
}

fn cmd_normalize<V: KeyframeValue>(args: &AnimArgs) -> anyhow::Result<()> {
    let (settings, parsed) = parse::<V>(args)?;
    println!(
        "{}",
        keyframes::write_animation(&parsed.keyframes, settings.use_opacity)
    );
    Ok(())
}

fn cmd_inspect<V: KeyframeValue>(args: &AnimArgs) -> anyhow::Result<()> {
    let (_, parsed) = parse::<V>(args)?;
    let report: Vec<serde_json::Value> = parsed
        .keyframes
        .iter()
        .map(|k| {
            serde_json::json!({
                "frame": k.position.frame(),
                "kind": k.kind,
                "value": k.value.clone().into_value(),
            })
        })
        .collect();
    let text = serde_json::to_string_pretty(&report).context("serialize keyframes")?;
    println!("{text}");
    Ok(())
}
