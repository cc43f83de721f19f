use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use synth_studio::{
    AspectRatio, AssetKind, Config, JobPhase, LogLevel, MediaClient, MediaReference,
    StudioRunner, UploadedAsset,
};

fn cli() -> Command {
    Command::new("Synth Studio")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Face-swap studio simulator and generative media tools")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("studio")
                .about("Run the face-swap studio simulation")
                .arg(
                    Arg::new("source")
                        .short('s')
                        .long("source")
                        .value_name("FILE")
                        .help("Face to swap in (image or video)")
                        .required(true),
                )
                .arg(
                    Arg::new("target")
                        .short('t')
                        .long("target")
                        .value_name("FILE")
                        .help("Video to modify")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("edit-image")
                .about("Edit a portrait with a text instruction")
                .arg(
                    Arg::new("image")
                        .short('i')
                        .long("image")
                        .value_name("FILE")
                        .help("Source image")
                        .required(true),
                )
                .arg(
                    Arg::new("prompt")
                        .short('p')
                        .long("prompt")
                        .value_name("TEXT")
                        .help("What to change, e.g. \"add glasses\"")
                        .required(true),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Write the edited image here instead of printing a data URL"),
                ),
        )
        .subcommand(
            Command::new("generate-video")
                .about("Generate a 720p video from a text description")
                .arg(
                    Arg::new("prompt")
                        .short('p')
                        .long("prompt")
                        .value_name("TEXT")
                        .help("Description of the video")
                        .required(true),
                )
                .arg(
                    Arg::new("aspect")
                        .short('a')
                        .long("aspect")
                        .value_name("RATIO")
                        .help("Aspect ratio")
                        .value_parser(["16:9", "9:16"]),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the REST and WebSocket API")
                .arg(
                    Arg::new("port")
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(config.server.log_filter(matches.get_flag("verbose")))
        .init();

    if let Err(e) = &loaded {
        warn!("Failed to load config, using defaults: {}", e);
    }
    config.validate()?;

    match matches.subcommand() {
        Some(("studio", args)) => run_studio(&config, args).await,
        Some(("edit-image", args)) => run_edit_image(&config, args).await,
        Some(("generate-video", args)) => run_generate_video(&config, args).await,
        Some(("serve", args)) => run_server(config, args).await,
        _ => unreachable!("subcommand is required"),
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String> {
    args.get_one::<String>(name)
        .ok_or_else(|| anyhow!("missing --{}", name))
}

async fn run_studio(config: &Config, args: &ArgMatches) -> Result<()> {
    let source = UploadedAsset::open(required(args, "source")?).await?;
    let target = UploadedAsset::open(required(args, "target")?).await?;

    let runner = StudioRunner::from_config(&config.studio);
    runner.attach_source(source).await?;
    runner.attach_target(target).await?;

    let mut updates = runner.subscribe();
    if !runner.start().await {
        return Err(anyhow!("Studio refused to start"));
    }

    let mut printed = 0;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                changed.context("studio runner stopped")?;
                let state = updates.borrow_and_update().clone();

                for entry in &state.logs()[printed..] {
                    let marker = match entry.level {
                        LogLevel::Info => "ℹ️ ",
                        LogLevel::Success => "✅",
                        LogLevel::Warn => "⚠️ ",
                        LogLevel::Error => "❌",
                    };
                    println!("[{}] {} {}", entry.local_time(), marker, entry.message);
                }
                printed = state.logs().len();

                if state.phase() == JobPhase::Completed {
                    info!("🎉 {} ({}%)", state.status_label(), state.progress_percent());
                    if let Some(result) = state.result() {
                        println!("Result: {}", result);
                    }
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, resetting studio");
                runner.reset().await;
                return Ok(());
            }
        }
    }
}

async fn run_edit_image(config: &Config, args: &ArgMatches) -> Result<()> {
    let client = MediaClient::from_config(&config.media)?;
    let image = UploadedAsset::open(required(args, "image")?).await?;
    if image.kind != AssetKind::Image {
        return Err(anyhow!("{} is not an image", image.name));
    }

    let bytes = image.read_bytes().await?;
    let prompt = required(args, "prompt")?;
    let reference = client
        .edit_image(&bytes, Some(image.mime_type.as_str()), prompt)
        .await?;

    match (args.get_one::<String>("output"), &reference) {
        (Some(output), MediaReference::Embedded(data)) => {
            let output = PathBuf::from(output);
            tokio::fs::write(&output, &data.data).await?;
            info!("💾 Edited image written to {}", output.display());
        }
        _ => println!("{}", reference),
    }

    Ok(())
}

async fn run_generate_video(config: &Config, args: &ArgMatches) -> Result<()> {
    let client = MediaClient::from_config(&config.media)?;
    let prompt = required(args, "prompt")?;
    let aspect_ratio = match args.get_one::<String>("aspect") {
        Some(aspect) => aspect.parse::<AspectRatio>()?,
        None => config.media.default_aspect_ratio,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    info!("⏳ Generating video, this usually takes 1-2 minutes...");
    match client
        .generate_video_with_cancel(prompt, aspect_ratio, &cancel)
        .await
    {
        Ok(reference) => {
            println!("{}", reference);
            Ok(())
        }
        Err(e) => {
            error!("Video generation failed: {}", e);
            Err(e.into())
        }
    }
}

async fn run_server(mut config: Config, args: &ArgMatches) -> Result<()> {
    if let Some(port) = args.get_one::<u16>("port") {
        config.server.port = *port;
    }
    info!("{}", config.summary());

    synth_studio::api::ApiServer::new(config).start().await
}
