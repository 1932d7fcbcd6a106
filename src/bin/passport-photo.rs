//! CLI for the passport photo editor.

use clap::{Args, Parser, Subcommand, ValueEnum};
use passport_photo::logging::LoggingConfig;
use passport_photo::{
    AttireSelection, ConfigChange, HexColor, InstructionBuilder, LightingMode, Locale,
    SessionPhase, SessionServer, Settings, UploadedImage,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "passport-photo")]
#[command(about = "Turn a portrait into a passport photo with Gemini image models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Language of failure messages
    #[arg(long, value_enum, global = true)]
    locale: Option<LocaleArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit one photo and save the result
    Edit(EditArgs),

    /// List selectable backgrounds, attire and lighting modes
    Options,

    /// Serve an editor session as JSON-RPC over stdio
    Session(SessionArgs),
}

#[derive(Args)]
struct EditArgs {
    /// Portrait to edit (PNG, JPEG or WebP)
    input: PathBuf,

    /// Directory for the downloaded result
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Background color (#RRGGBB)
    #[arg(long, default_value = "#FFFFFF")]
    background: String,

    /// Replacement attire (e.g., formal-suit, saree)
    #[arg(long, default_value = "no-change")]
    attire: String,

    /// Lighting mode (normal, bright, studio, auto-fix)
    #[arg(long, default_value = "studio")]
    lighting: String,

    /// Skip facial detail enhancement
    #[arg(long)]
    no_enhance_face: bool,

    /// Skip skin smoothing
    #[arg(long)]
    no_smooth_skin: bool,

    /// Print the instruction without calling the model
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct SessionArgs {
    /// Default directory for downloads
    #[arg(long, default_value = ".")]
    download_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LocaleArg {
    En,
    Bn,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::En => Locale::English,
            LocaleArg::Bn => Locale::Bengali,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    LoggingConfig::from_verbosity(cli.verbose).init()?;

    let mut settings = Settings::from_env()?;
    if let Some(locale) = cli.locale {
        settings.locale = locale.into();
    }

    match cli.command {
        Commands::Edit(args) => edit_photo(args, &settings, cli.json).await?,
        Commands::Options => list_options(&settings, cli.json)?,
        Commands::Session(args) => run_session(args, &settings).await?,
    }

    Ok(())
}

fn config_changes(args: &EditArgs) -> anyhow::Result<Vec<ConfigChange>> {
    let attire = AttireSelection::from_label(&args.attire)
        .ok_or_else(|| anyhow::anyhow!("unknown attire '{}'", args.attire))?;
    let lighting = LightingMode::from_label(&args.lighting)
        .ok_or_else(|| anyhow::anyhow!("unknown lighting mode '{}'", args.lighting))?;

    Ok(vec![
        ConfigChange::BackgroundColor(HexColor::parse(&args.background)?),
        ConfigChange::Attire(attire),
        ConfigChange::EnhanceFace(!args.no_enhance_face),
        ConfigChange::SmoothSkin(!args.no_smooth_skin),
        ConfigChange::Lighting(lighting),
    ])
}

async fn edit_photo(args: EditArgs, settings: &Settings, json_output: bool) -> anyhow::Result<()> {
    let mut session = settings.session();
    for change in config_changes(&args)? {
        session.apply(change)?;
    }

    if args.dry_run {
        let instruction = InstructionBuilder::new().build(&session.state().config);
        if json_output {
            println!("{}", serde_json::to_string_pretty(&instruction)?);
        } else {
            println!("{instruction}");
        }
        return Ok(());
    }

    session.select_image(UploadedImage::from_path(&args.input)?)?;
    let invoker = settings.invoker()?;
    session.generate(&invoker).await;

    let snapshot = session.snapshot();
    if session.phase() == SessionPhase::Failed {
        if json_output {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        anyhow::bail!(
            "{}",
            snapshot.error.unwrap_or_else(|| settings.locale.failure_message().to_string())
        );
    }

    let download = session
        .download()
        .ok_or_else(|| anyhow::anyhow!("no result was produced"))?;
    std::fs::create_dir_all(&args.output_dir)?;
    let path = download.save_in(&args.output_dir)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": path.display().to_string(),
            "size_bytes": download.data.len(),
            "mime_type": download.mime_type,
            "editor": invoker.editor_name(),
            "config": snapshot.config,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Saved passport photo: {} ({} bytes) via {}",
            path.display(),
            download.data.len(),
            invoker.editor_name()
        );
    }

    Ok(())
}

fn list_options(settings: &Settings, json_output: bool) -> anyhow::Result<()> {
    let catalog = settings.catalog();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    println!("BACKGROUNDS:");
    for preset in &catalog.backgrounds {
        println!("  {:<14} {}", preset.name, preset.value);
    }
    println!("\nATTIRE:");
    for attire in &catalog.attire {
        println!("  {}", attire);
    }
    println!("\nLIGHTING:");
    for mode in &catalog.lighting {
        println!("  {}", mode);
    }

    Ok(())
}

async fn run_session(args: SessionArgs, settings: &Settings) -> anyhow::Result<()> {
    tracing::info!("starting session server on stdio");
    let mut server =
        SessionServer::new(settings.session(), settings.invoker()?).with_download_dir(args.download_dir);
    server.run().await?;
    Ok(())
}
