use anyhow::Context;
use clap::Parser;
use news_digest::archive::{current_year_week, week_range, WeeklyArchive};
use news_digest::delivery::{render_html, MailgunDelivery};
use news_digest::{
    DigestConfig, DigestPipeline, FeedIngester, HeuristicModel, HttpPageFetcher, OpenAiModel,
    ScoreModel, SummaryModel,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Debug, Parser)]
#[command(name = "news-digest", about = "Weekly categorized news digest")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// ISO year of the digest period. Defaults to the current week.
    #[arg(long, requires = "week")]
    year: Option<i32>,

    /// ISO week number of the digest period.
    #[arg(long, requires = "year")]
    week: Option<u32>,

    /// Print the rendered digest instead of emailing it.
    #[arg(long)]
    skip_delivery: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = DigestConfig::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;
    init_logging(&config.log_file)?;

    let (year, week) = match (args.year, args.week) {
        (Some(year), Some(week)) => (year, week),
        _ => current_year_week(),
    };
    let (period_start, period_end) = week_range(year, week)?;
    info!(year, week, %period_start, %period_end, "building digest");

    // Ingest the week's articles and merge them into the weekly archive so
    // repeated runs accumulate rather than overwrite.
    let ingester = FeedIngester::new(config.retry_policy());
    let fetched = ingester
        .fetch_all(&config.categories, period_start, period_end)
        .await;
    let archive = WeeklyArchive::new(&config.base_folder);
    let existing = archive.load(year, week);
    let (articles, added) = WeeklyArchive::merge(existing, fetched);
    info!(total = articles.len(), added, "articles collected for the week");
    archive.save(year, week, &articles)?;

    let (score_model, summary_model): (Arc<dyn ScoreModel>, Arc<dyn SummaryModel>) =
        match OpenAiModel::from_env() {
            Some(model) => {
                let model = Arc::new(model);
                (model.clone(), model)
            }
            None => {
                warn!("OPENAI_API_KEY not set, using the offline heuristic model");
                let model = Arc::new(HeuristicModel);
                (model.clone(), model)
            }
        };

    let pipeline = DigestPipeline::new(
        &config,
        Arc::new(HttpPageFetcher::new()),
        score_model,
        summary_model,
    );
    let digest = pipeline.run(articles, period_start, period_end).await;
    pipeline.report().log_totals();

    if args.skip_delivery {
        println!("{}", render_html(&digest));
    } else {
        let delivery = MailgunDelivery::from_env()?;
        delivery.deliver(&digest).await?;
    }

    Ok(())
}

fn init_logging(log_file: &str) -> anyhow::Result<()> {
    if let Some(dir) = Path::new(log_file).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let file = Arc::new(File::options().create(true).append(true).open(log_file)?);
    tracing_subscriber::fmt()
        .with_writer(file.and(std::io::stdout))
        .with_ansi(false)
        .init();
    Ok(())
}
