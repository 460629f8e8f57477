use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use subrender::{
    Coordinator, OsdRes, SubCodec, SubOpts, SubPacket, VecPacketSource, VideoParams,
    encode_picture,
};

#[derive(Parser, Debug)]
#[command(name = "subrender", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a subtitle script frame by frame through the render-ahead coordinator.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input script JSON (codec plus packets).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Playback frame rate.
    #[arg(long, default_value_t = 24.0)]
    fps: f64,

    /// Output width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Frames to pre-render ahead of playback (0 renders synchronously).
    #[arg(long, default_value_t = 10)]
    render_ahead: usize,

    /// Seconds to play. Defaults to the end of the last packet.
    #[arg(long)]
    duration: Option<f64>,

    /// Write a PNG for every frame whose subtitle changed.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Script {
    codec: String,
    #[serde(default)]
    extradata: Option<String>,
    #[serde(default)]
    video: Option<VideoParams>,
    packets: Vec<ScriptPacket>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ScriptPacket {
    pts: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    picture: Option<ScriptPicture>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ScriptPicture {
    x: u16,
    y: u16,
    w: u16,
    h: u16,
    #[serde(default = "default_color")]
    color: [u8; 4],
}

fn default_color() -> [u8; 4] {
    [255, 255, 255, 255]
}

impl ScriptPacket {
    fn into_packet(self) -> SubPacket {
        let data = match (self.text, self.picture) {
            (Some(text), _) => text.into_bytes(),
            (None, Some(p)) => {
                let coverage = vec![255u8; usize::from(p.w) * usize::from(p.h)];
                encode_picture(p.x, p.y, p.w, p.h, p.color, &coverage)
            }
            (None, None) => Vec::new(),
        };
        SubPacket::new(self.pts, self.duration, data)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Play(args) => cmd_play(args),
    }
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    if !(args.fps.is_finite() && args.fps > 0.0) {
        anyhow::bail!("fps must be positive, got {}", args.fps);
    }

    let raw = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read script '{}'", args.in_path.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("parse script '{}'", args.in_path.display()))?;

    let end = args.duration.unwrap_or_else(|| {
        script
            .packets
            .iter()
            .filter_map(|p| p.pts.map(|pts| pts + p.duration.unwrap_or(0.0)))
            .fold(0.0, f64::max)
    });

    let mut codec = SubCodec::new(script.codec);
    if let Some(extra) = script.extradata {
        codec = codec.with_extradata(extra);
    }
    let source: VecPacketSource = script
        .packets
        .into_iter()
        .map(ScriptPacket::into_packet)
        .collect::<Vec<_>>()
        .into();

    let opts = SubOpts {
        render_ahead: args.render_ahead,
        ..SubOpts::default()
    };
    let coord = Coordinator::new(codec, source, opts)?;
    if let Some(video) = script.video {
        coord.set_video_params(video);
    }
    eprintln!(
        "backend {} ({})",
        coord.backend_name(),
        if coord.is_threaded() {
            "render-ahead"
        } else {
            "synchronous"
        }
    );

    if let Some(dir) = &args.dump_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create dump dir '{}'", dir.display()))?;
    }

    let res = OsdRes::new(args.width, args.height);
    let frame_pts = |i: u64| i as f64 / args.fps;
    let frames = (end * args.fps).ceil().max(1.0) as u64;
    let ahead = args.render_ahead as u64;

    for i in 0..=ahead.min(frames) {
        coord.read_packets(frame_pts(i));
    }

    let mut dumped = 0u64;
    let mut cached = 0u64;
    let mut last_dumped = 0u64;
    for i in 0..frames {
        coord.read_packets(frame_pts(i + ahead));
        let frame = coord.acquire(res, frame_pts(i));
        if frame.is_cached() {
            cached += 1;
        }

        if let Some(dir) = &args.dump_dir
            && frame.change_id != 0
            && frame.change_id != last_dumped
        {
            last_dumped = frame.change_id;
            let rgba = frame.composite_rgba(res.w, res.h);
            let path = dir.join(format!("frame_{i:06}.png"));
            image::save_buffer_with_format(
                &path,
                &rgba,
                res.w,
                res.h,
                image::ColorType::Rgba8,
                image::ImageFormat::Png,
            )
            .with_context(|| format!("write png '{}'", path.display()))?;
            dumped += 1;
        }
        frame.release();
    }

    let stats = coord.cache_stats();
    eprintln!("played {frames} frames ({cached} pre-rendered), dumped {dumped}");
    eprintln!(
        "cache: requested {} published {} shared {} pruned {} dropped {}",
        stats.requested,
        stats.published(),
        stats.shared_renders,
        stats.pruned,
        stats.dropped_full + stats.dropped_out_of_order
    );
    coord.destroy();
    Ok(())
}
