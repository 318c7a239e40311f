use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use titantron_timeline::analysis::{AnalysisPhase, DetectionType};
use titantron_timeline::api::{AnalysisApi, HttpApiClient};
use titantron_timeline::chapters::{ChapterUpdate, PromotionOutcome};
use titantron_timeline::config::Config;
use titantron_timeline::session::VideoSession;
use titantron_timeline::time::{format_timestamp, secs_to_ticks};
use titantron_timeline::timeline::svg::render_svg;

fn video_arg() -> Arg {
    Arg::new("video")
        .value_name("VIDEO_ID")
        .help("Video item id")
        .required(true)
        .value_parser(value_parser!(i64))
}

fn cli() -> Command {
    Command::new("Titantron Timeline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Match-boundary detection timeline for wrestling video libraries")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .global(true),
        )
        .arg(
            Arg::new("server")
                .short('s')
                .long("server")
                .value_name("URL")
                .help("Backend base URL")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("status")
                .about("Show the analysis job status")
                .arg(video_arg()),
        )
        .subcommand(
            Command::new("analyze")
                .about("Start an analysis run")
                .arg(video_arg())
                .arg(
                    Arg::new("phase")
                        .short('p')
                        .long("phase")
                        .value_parser(["both", "visual", "audio"])
                        .default_value("both")
                        .help("Which detectors to run"),
                )
                .arg(
                    Arg::new("wait")
                        .short('w')
                        .long("wait")
                        .action(ArgAction::SetTrue)
                        .help("Poll until the run finishes"),
                ),
        )
        .subcommand(
            Command::new("clear")
                .about("Discard a finished run")
                .arg(video_arg()),
        )
        .subcommand(
            Command::new("render")
                .about("Render the timeline as SVG")
                .arg(video_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Write to a file instead of stdout"),
                )
                .arg(
                    Arg::new("zoom")
                        .short('z')
                        .long("zoom")
                        .value_parser(value_parser!(u32))
                        .default_value("1")
                        .help("Zoom level (power of two)"),
                )
                .arg(
                    Arg::new("width")
                        .long("width")
                        .value_parser(value_parser!(f64))
                        .help("Viewport width in pixels"),
                ),
        )
        .subcommand(
            Command::new("detections")
                .about("List detections of the last completed run")
                .arg(video_arg())
                .arg(
                    Arg::new("hide")
                        .long("hide")
                        .value_name("TYPE")
                        .action(ArgAction::Append)
                        .help("Hide a detection type (bell, music_start, scene_change, dark_frame, graphics_change)"),
                ),
        )
        .subcommand(
            Command::new("accept")
                .about("Promote a detection to a chapter")
                .arg(video_arg())
                .arg(
                    Arg::new("index")
                        .value_name("INDEX")
                        .required(true)
                        .value_parser(value_parser!(usize))
                        .help("Row index from the detections list"),
                )
                .arg(
                    Arg::new("title")
                        .short('t')
                        .long("title")
                        .help("Chapter title (defaults to the detection type's suggestion)"),
                ),
        )
        .subcommand(
            Command::new("chapters")
                .about("List, add, edit or delete chapters")
                .arg(video_arg())
                .arg(
                    Arg::new("add")
                        .long("add")
                        .value_name("TITLE")
                        .requires("at")
                        .help("Create a chapter with this title"),
                )
                .arg(
                    Arg::new("at")
                        .long("at")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(f64))
                        .help("Start of the new chapter"),
                )
                .arg(
                    Arg::new("delete")
                        .long("delete")
                        .value_name("CHAPTER_ID")
                        .value_parser(value_parser!(i64))
                        .conflicts_with("add")
                        .help("Delete a chapter"),
                )
                .arg(
                    Arg::new("chapter")
                        .long("chapter")
                        .value_name("CHAPTER_ID")
                        .value_parser(value_parser!(i64))
                        .conflicts_with_all(["add", "delete"])
                        .help("Chapter to rename or move"),
                )
                .arg(
                    Arg::new("rename")
                        .long("rename")
                        .value_name("TITLE")
                        .requires("chapter")
                        .help("New title for --chapter"),
                )
                .arg(
                    Arg::new("move")
                        .long("move")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(f64))
                        .requires("chapter")
                        .help("New start for --chapter"),
                ),
        )
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("titantron_timeline=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.output.log_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(path).with_context(|| format!("reading config {}", path))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    if let Some(server) = matches.get_one::<String>("server") {
        config.server.base_url = server.clone();
    }

    config.validate()?;
    Ok(config)
}

fn video_id(matches: &ArgMatches) -> Result<i64> {
    matches
        .get_one::<i64>("video")
        .copied()
        .context("missing video id")
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    init_logging(&config, matches.get_flag("verbose"));
    info!("🚀 {}", config.summary().replace('\n', " "));

    let client = Arc::new(HttpApiClient::new(&config.server)?);

    match matches.subcommand() {
        Some(("status", sub)) => status(&client, video_id(sub)?).await,
        Some(("analyze", sub)) => analyze(client, &config, sub).await,
        Some(("clear", sub)) => clear(client, &config, video_id(sub)?).await,
        Some(("render", sub)) => render(client, &config, sub).await,
        Some(("detections", sub)) => detections(client, &config, sub).await,
        Some(("accept", sub)) => accept(client, &config, sub).await,
        Some(("chapters", sub)) => chapters(client, &config, sub).await,
        Some((other, _)) => anyhow::bail!("unknown command: {}", other),
        None => anyhow::bail!("no command given"),
    }
}

async fn status(client: &HttpApiClient, video_id: i64) -> Result<()> {
    let status = client.status(video_id).await?;
    println!("Status:   {:?}", status.status);
    if let Some(fraction) = status.fraction() {
        println!("Progress: {:.0}%", fraction * 100.0);
    }
    if let Some(message) = &status.message {
        println!("Message:  {}", message);
    }
    if let Some(error) = status.failure_message() {
        println!("Error:    {}", error);
    }
    Ok(())
}

async fn analyze(client: Arc<HttpApiClient>, config: &Config, sub: &ArgMatches) -> Result<()> {
    let phase = sub
        .get_one::<String>("phase")
        .and_then(|p| AnalysisPhase::parse(p))
        .unwrap_or_default();

    let mut session = VideoSession::open(video_id(sub)?, client, config).await?;
    session.start_analysis(phase).await?;
    println!("Analysis started ({})", phase.as_str());

    if !sub.get_flag("wait") {
        return Ok(());
    }

    while !session.snapshot().is_settled() {
        if !session.next_update().await {
            break;
        }
        let snapshot = session.snapshot();
        if let Some(fraction) = snapshot.status.fraction() {
            info!("⏳ {:?} {:.0}%", snapshot.status.status, fraction * 100.0);
        }
    }

    session.sync();
    if let Some(error) = session.error_message() {
        warn!("Analysis did not complete: {}", error);
        anyhow::bail!(error);
    }
    if let Some(banner) = session.audio_banner() {
        println!("{}", banner);
    }
    println!("Completed with {} detections", session.detection_list().detections().len());
    Ok(())
}

async fn clear(client: Arc<HttpApiClient>, config: &Config, video_id: i64) -> Result<()> {
    let mut session = VideoSession::open(video_id, client, config).await?;
    if session.clear_analysis().await? {
        println!("Cleared analysis results");
    } else {
        println!("Nothing to clear: status is {:?}", session.snapshot().status.status);
    }
    session.close();
    Ok(())
}

async fn render(client: Arc<HttpApiClient>, config: &Config, sub: &ArgMatches) -> Result<()> {
    let mut session = VideoSession::open(video_id(sub)?, client, config).await?;
    session.close();

    let timeline = session.timeline_mut();
    if let Some(width) = sub.get_one::<f64>("width") {
        timeline.set_container_width(*width);
    }
    if let Some(zoom) = sub.get_one::<u32>("zoom") {
        timeline.set_zoom(*zoom);
    }

    let svg = render_svg(timeline);
    match sub.get_one::<String>("output") {
        Some(path) => {
            let path = PathBuf::from(path);
            tokio::fs::write(&path, svg).await?;
            info!("🖼️ Timeline written to {}", path.display());
        }
        None => println!("{}", svg),
    }
    Ok(())
}

async fn detections(client: Arc<HttpApiClient>, config: &Config, sub: &ArgMatches) -> Result<()> {
    let mut session = VideoSession::open(video_id(sub)?, client, config).await?;
    session.close();

    if let Some(banner) = session.audio_banner() {
        println!("{}", banner);
    }

    let list = session.detection_list_mut();
    for name in sub.get_many::<String>("hide").into_iter().flatten() {
        match DetectionType::parse(name) {
            Some(kind) => list.set_visible(kind, false),
            None => warn!("Unknown detection type: {}", name),
        }
    }

    let counts = list.counts();
    for (kind, count) in &counts {
        let state = if list.is_visible(*kind) { "shown" } else { "hidden" };
        println!("{:<16} {:>4}  ({})", kind.label(), count, state);
    }
    println!();

    for row in list.rows() {
        println!(
            "{:>4}  {:>9}  {:<16} {:>3}%  -> {}",
            row.index, row.timestamp, row.badge, row.confidence_pct, row.suggested_title
        );
    }
    Ok(())
}

async fn accept(client: Arc<HttpApiClient>, config: &Config, sub: &ArgMatches) -> Result<()> {
    let index = *sub.get_one::<usize>("index").context("missing index")?;
    let mut session = VideoSession::open(video_id(sub)?, client, config).await?;
    session.close();

    session.accept_detection(index)?;
    if let Some(title) = sub.get_one::<String>("title") {
        session.set_draft_title(title)?;
    }

    match session.confirm_draft().await? {
        PromotionOutcome::Created(chapter) => println!("Created chapter {}: {}", chapter.id, chapter.label()),
        PromotionOutcome::Failed(reason) => anyhow::bail!("Chapter was not saved: {}", reason),
    }
    Ok(())
}

async fn chapters(client: Arc<HttpApiClient>, config: &Config, sub: &ArgMatches) -> Result<()> {
    let mut session = VideoSession::open(video_id(sub)?, client, config).await?;
    session.close();

    if let Some(title) = sub.get_one::<String>("add") {
        let at = sub.get_one::<f64>("at").copied().context("--at is required with --add")?;
        if let PromotionOutcome::Failed(reason) = session.create_manual(title, secs_to_ticks(at)).await {
            anyhow::bail!("Chapter was not saved: {}", reason);
        }
    }

    if let Some(chapter_id) = sub.get_one::<i64>("delete") {
        session.delete_chapter(*chapter_id).await?;
    }

    if let Some(chapter_id) = sub.get_one::<i64>("chapter") {
        let mut update = ChapterUpdate::default();
        if let Some(title) = sub.get_one::<String>("rename") {
            update = update.with_title(title.trim());
        }
        if let Some(at) = sub.get_one::<f64>("move") {
            update = update.with_start(secs_to_ticks(*at));
        }
        if update.is_empty() {
            anyhow::bail!("--chapter needs --rename or --move");
        }
        let chapter = session.update_chapter(*chapter_id, &update).await?;
        println!("Updated chapter {}: {}", chapter.id, chapter.label());
    }

    for chapter in session.chapters_with_ends() {
        let end = chapter.end_ticks.map(format_timestamp).unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6}  {:>9} - {:<9}  {}",
            chapter.id,
            format_timestamp(chapter.start_ticks),
            end,
            chapter.title
        );
    }
    Ok(())
}
