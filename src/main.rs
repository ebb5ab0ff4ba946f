use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fieldstake::algorithms::geodesy::{bearing, distance, format_bearing};
use fieldstake::algorithms::projection::Projector;
use fieldstake::api::report::{JsonFormatter, SurveyReport, TextFormatter};
use fieldstake::survey::{Survey, SurveyRepository};
use fieldstake::utils::config::{ConfigurationManager, FieldConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fieldstake")]
#[command(about = "Field survey geometry: distances, bearings, areas")]
struct Cmd {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Action {
    /// Distance and bearing between two coordinates
    Inverse {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lng1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lng2: f64,
    },
    /// Area, perimeter and point table of a survey file or stored survey id
    Metrics {
        survey: String,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Use the approximate planar fallback instead of transverse Mercator
        #[arg(long)]
        approximate: bool,
    },
    /// Surveys stored in the configured survey directory
    List,
    /// Validate a configuration file
    CheckConfig { file: PathBuf },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Inverse { lat1, lng1, lat2, lng2 } => inverse(lat1, lng1, lat2, lng2),
        Action::Metrics {
            survey,
            format,
            approximate,
        } => metrics(&survey, format, approximate, cmd.config.as_deref()),
        Action::List => list(cmd.config.as_deref()),
        Action::CheckConfig { file } => check_config(&file),
    }
}

fn load_config(path: Option<&Path>) -> Result<FieldConfig> {
    match path {
        Some(path) => {
            let manager = ConfigurationManager::from_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?;
            Ok(manager.config().clone())
        }
        None => Ok(FieldConfig::default()),
    }
}

fn inverse(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Result<()> {
    let d = distance(lat1, lng1, lat2, lng2);
    let b = bearing(lat1, lng1, lat2, lng2);
    println!("distance: {:.3} m", d);
    println!("bearing:  {:.4}° ({})", b, format_bearing(b));
    Ok(())
}

fn read_survey(file: &Path) -> Result<Survey> {
    let content = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let document: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", file.display()))?;
    let fallback_id = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("survey");
    let (survey, issues) = Survey::from_document(document, fallback_id)?;
    for issue in &issues {
        log::warn!("record {}: {:?}", issue.index(), issue);
    }
    Ok(survey)
}

/// A path to an existing file, otherwise an id in the configured survey directory
fn resolve_survey(target: &str, config: &FieldConfig) -> Result<Survey> {
    let path = Path::new(target);
    if path.is_file() {
        return read_survey(path);
    }
    let Some(repo) = config.survey_repository()? else {
        anyhow::bail!("{} is not a file and no survey_dir is configured", target);
    };
    repo.load(target)
        .with_context(|| format!("loading survey {} from {}", target, repo.dir().display()))
}

fn metrics(target: &str, format: Format, approximate: bool, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if approximate {
        config.projection = Projector::ApproximateFallback;
    }

    let survey = resolve_survey(target, &config)?;
    let report = SurveyReport::build(&survey, &config.polygon_metrics());
    match format {
        Format::Text => print!("{}", TextFormatter::new().format_text(&report)),
        Format::Json => println!("{}", JsonFormatter::pretty().format_json(&report)?),
    }
    Ok(())
}

fn list(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let Some(repo) = config.survey_repository()? else {
        anyhow::bail!("no survey_dir configured");
    };
    for listing in repo.list()? {
        println!(
            "{:<32} {:>5} points  {}  {}",
            listing.id,
            listing.point_count,
            listing.updated_at.format("%Y-%m-%d %H:%M"),
            listing.name
        );
    }
    Ok(())
}

fn check_config(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let config: FieldConfig =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", file.display()))?;
    let result = ConfigurationManager::validate(&config);

    for error in &result.errors {
        println!("error:      {}", error);
    }
    for warning in &result.warnings {
        println!("warning:    {}", warning);
    }
    for suggestion in &result.suggestions {
        println!("suggestion: {}", suggestion);
    }
    if !result.is_valid {
        anyhow::bail!("{} is invalid ({} errors)", file.display(), result.errors.len());
    }
    println!("{} is valid", file.display());
    Ok(())
}
