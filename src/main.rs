use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use gateway::{Gateway, Route};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsdesk::cli::{ChannelCommands, Cli, Commands, NewsCommands, SourceCommands};
use newsdesk::config::Config;
use newsdesk::domain::{Category, Channel, ChannelConfig, DateCheckStatus, Importance, News, Record};
use newsdesk::errors::{AppError, AppResult};
use newsdesk::services::{
    DispatchOutcome, DispatchService, FetchNewsParams, GenerateNewsParams, NewsService, SourceService,
};
use newsdesk::storage::{Collection, Criteria, Database, QueryOptions};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("NEWSDESK_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> AppResult<()> {
    // Load configuration
    let config = Config::from_env()?;
    init_logging(cli.verbose);

    // Initialize storage
    let db = if config.uses_memory_store() {
        Database::in_memory(config.store_latency)
    } else {
        Database::open(&config.db_path, config.store_latency)?
    };

    // Initialize remote gateway
    let gateway = Arc::new(Gateway::new(config.gateway_config())?);

    match cli.command {
        Commands::News { command } => run_news(command, &db, gateway).await,
        Commands::Sources { command } => run_sources(command, &db, gateway).await,
        Commands::Channels {
            command: ChannelCommands::List,
        } => cmd_channels(&db).await,
        Commands::Send {
            channel,
            news_id,
            config: config_id,
        } => cmd_send(&db, gateway, channel, &news_id, config_id.as_deref()).await,
        Commands::Status => cmd_status(&config, &gateway),
        Commands::Wipe => {
            db.wipe()?;
            println!("All collections dropped. Built-in data will be restored on next use.");
            Ok(())
        }
    }
}

async fn run_news(command: NewsCommands, db: &Database, gateway: Arc<Gateway>) -> AppResult<()> {
    let service = NewsService::new(gateway.clone(), db.news.clone());

    match command {
        NewsCommands::List {
            category,
            importance,
            search,
            order,
            limit,
        } => cmd_news_list(&db.news, category, importance, search, order, limit).await,
        NewsCommands::Show { id } => cmd_news_show(&db.news, &id).await,
        NewsCommands::Add {
            title,
            category,
            importance,
            summary,
            content,
            source,
            tags,
            date,
            url,
            highlight,
        } => {
            let mut news = News::new(title, category, importance)
                .with_summary(summary)
                .with_content(content)
                .with_source(source, None)
                .with_tags(tags)
                .with_publication_date(date.unwrap_or_else(|| Utc::now().date_naive()));
            news.external_url = url;
            news.is_highlighted = highlight;

            let created = db.news.create(news).await?;
            println!("Added news: {}", created.id());
            print_news_line(&created);
            Ok(())
        }
        NewsCommands::Delete { id } => {
            if db.news.delete(&id).await? {
                println!("Deleted news: {}", id);
            } else {
                println!("News not found: {}", id);
            }
            Ok(())
        }
        NewsCommands::Clear => {
            let report = service.clear_all_news().await?;
            println!("{}", report.message);
            Ok(())
        }
        NewsCommands::Fetch {
            source,
            topic,
            category,
            dispatch,
        } => {
            let params = match source {
                Some(id) => {
                    let source = db.sources.get(&id).await?.ok_or(AppError::NotFound {
                        collection: "sources",
                        id: id.clone(),
                    })?;
                    FetchNewsParams::for_source(&source, category)
                }
                None => FetchNewsParams {
                    category,
                    ..FetchNewsParams::default()
                },
            };
            let params = match topic {
                Some(topic) => params.with_topic(topic),
                None => params,
            };

            cmd_news_fetch(&service, &DispatchService::new(gateway, db), &params, dispatch).await
        }
        NewsCommands::VerifyDates { sample_size } => cmd_verify_dates(&service, sample_size).await,
        NewsCommands::Generate {
            topic,
            source_name,
            category,
        } => {
            let draft = service
                .generate_news(&GenerateNewsParams {
                    topic,
                    source_name,
                    category,
                    ..GenerateNewsParams::default()
                })
                .await?;

            if draft.demo {
                println!("(local draft: no generator configured)\n");
            }
            println!("{}", draft.title);
            println!("  Category: {}  Importance: {}", draft.category, draft.importance);
            if let Some(date) = draft.publication_date {
                println!("  Date: {}", date);
            }
            println!("  Tags: {}", draft.tags.join(", "));
            println!("\n{}\n\n{}", draft.summary, draft.content);
            Ok(())
        }
    }
}

async fn cmd_news_list(
    news: &Collection<News>,
    category: Option<Category>,
    importance: Option<Importance>,
    search: Option<String>,
    order: Option<String>,
    limit: Option<usize>,
) -> AppResult<()> {
    let mut criteria = Criteria::new()
        .maybe_eq("category", category)
        .maybe_eq("importance", importance);
    if let Some(search) = search {
        criteria = criteria.contains("title", search);
    }

    let options = QueryOptions { order, limit };
    let items = news.filter(&criteria, &options).await?;

    if items.is_empty() {
        println!("No news found.");
        return Ok(());
    }

    for item in &items {
        print_news_line(item);
    }
    println!("\n{} item(s)", items.len());

    Ok(())
}

async fn cmd_news_show(news: &Collection<News>, id: &str) -> AppResult<()> {
    let item = news.get(id).await?.ok_or_else(|| AppError::NotFound {
        collection: "news",
        id: id.to_string(),
    })?;

    println!("{}", item.title);
    println!("  Id: {}", item.id());
    println!("  Category: {}  Importance: {}", item.category, item.importance);
    if let Some(date) = item.publication_date {
        println!("  Published: {}", date);
    }
    if !item.source_name.is_empty() {
        println!("  Source: {}", item.source_name);
    }
    if let Some(url) = &item.external_url {
        println!("  URL: {}", url);
    }
    if !item.tags.is_empty() {
        println!("  Tags: {}", item.tags.join(", "));
    }
    if !item.summary.is_empty() {
        println!("\n{}", item.summary);
    }
    if !item.content.is_empty() {
        println!("\n{}", item.content);
    }

    Ok(())
}

async fn cmd_news_fetch(
    service: &NewsService,
    dispatcher: &DispatchService,
    params: &FetchNewsParams,
    dispatch: bool,
) -> AppResult<()> {
    println!("Fetching news...\n");

    let report = service.fetch_real_news(params).await?;

    if report.demo {
        println!("(demo content: no backend configured or backend unavailable)\n");
    }
    for news in &report.created_news {
        print_news_line(news);
    }
    println!(
        "\nFetch complete: {} created, {} updated, {} skipped, {} rejected",
        report.created_count, report.updated_count, report.skipped_count, report.rejected_count
    );

    if dispatch {
        for news in &report.created_news {
            let outcomes = dispatcher.dispatch_automatic(news).await?;
            print_outcomes(news, &outcomes);
        }
    }

    Ok(())
}

async fn cmd_verify_dates(service: &NewsService, sample_size: usize) -> AppResult<()> {
    let report = service.verify_news_dates(sample_size).await?;

    for check in &report.results {
        let marker = match check.status {
            DateCheckStatus::Correct => "ok",
            DateCheckStatus::Incorrect => "!!",
            DateCheckStatus::UnableToVerify => "??",
        };
        println!("  [{}] {}", marker, check.title);
        if check.status == DateCheckStatus::Incorrect {
            println!(
                "       saved {} / found {} ({} day(s))",
                check.saved_date.map(|d| d.to_string()).unwrap_or_default(),
                check.found_date.map(|d| d.to_string()).unwrap_or_default(),
                check.difference_days.unwrap_or_default()
            );
        }
    }

    println!(
        "\nVerified {}: {} correct, {} incorrect, {} unverifiable ({}% accuracy)",
        report.total_verified,
        report.correct_dates,
        report.incorrect_dates,
        report.unable_to_verify,
        report.accuracy_percentage
    );
    println!("{}", report.recommendation);

    Ok(())
}

async fn run_sources(command: SourceCommands, db: &Database, gateway: Arc<Gateway>) -> AppResult<()> {
    let service = SourceService::new(gateway, db.sources.clone());

    match command {
        SourceCommands::List => {
            let sources = service.list().await?;
            if sources.is_empty() {
                println!("No sources configured.");
                return Ok(());
            }

            println!("Sources:\n");
            for source in sources {
                let state = if source.is_active { "active" } else { "inactive" };
                println!("  {} [{}] ({})", source.name, source.update_method, state);
                println!("    Id: {}", source.id());
                if let Some(rss) = source.rss_url() {
                    println!("    Feed: {}", rss);
                } else if !source.website.is_empty() {
                    println!("    Site: {}", source.website);
                }
                println!();
            }
            Ok(())
        }
        SourceCommands::Reset => {
            let report = service.reset_sources().await?;
            println!("{}", report.message);
            Ok(())
        }
        SourceCommands::Toggle { id } => {
            let source = service.toggle(&id).await?;
            let state = if source.is_active { "activated" } else { "deactivated" };
            println!("Source {}: {}", state, source.name);
            Ok(())
        }
    }
}

async fn cmd_channels(db: &Database) -> AppResult<()> {
    println!("Channel configurations:\n");
    print_configs(&db.telegram_configs).await?;
    print_configs(&db.whatsapp_configs).await?;
    print_configs(&db.teams_configs).await?;
    print_configs(&db.email_configs).await?;
    Ok(())
}

async fn print_configs<C: ChannelConfig>(configs: &Collection<C>) -> AppResult<()> {
    for config in configs.list(None, None).await? {
        let mut flags = vec![if config.is_active() { "active" } else { "inactive" }];
        if config.sends_automatically() {
            flags.push("automatic");
        }
        println!(
            "  {:<9} {} -> {} (min {}, category {}) [{}]",
            C::CHANNEL.as_str(),
            config.id(),
            config.target_label(),
            config.min_importance(),
            String::from(config.category()),
            flags.join(", ")
        );
    }
    Ok(())
}

async fn cmd_send(
    db: &Database,
    gateway: Arc<Gateway>,
    channel: Channel,
    news_id: &str,
    config_id: Option<&str>,
) -> AppResult<()> {
    let news = db.news.get(news_id).await?.ok_or_else(|| AppError::NotFound {
        collection: "news",
        id: news_id.to_string(),
    })?;

    let receipt = DispatchService::new(gateway, db)
        .send_to_channel(channel, &news, config_id)
        .await?;

    let status = if receipt.success { "OK" } else { "FAILED" };
    println!("{} [{}]: {}", status, channel, receipt.message);
    if let Some(verdict) = &receipt.ai_analysis {
        let decision = if verdict.approved { "approved" } else { "rejected" };
        println!("  Triage {}: {}", decision, verdict.reason);
    }
    if receipt.demo {
        println!("  (simulated: no backend configured)");
    }

    Ok(())
}

fn cmd_status(config: &Config, gateway: &Gateway) -> AppResult<()> {
    match gateway.config().base_url() {
        Some(url) => println!("Backend: {}", url),
        None => println!("Backend: not configured (demo mode)"),
    }

    for route in Route::ALL {
        let state = match gateway.config().url_for(route) {
            Some(url) => url,
            None => "local fallback".to_string(),
        };
        println!("  {:<16} {}", route.as_str(), state);
    }

    if config.uses_memory_store() {
        println!("Storage: in-memory (data is lost on exit)");
    } else {
        println!("Storage: {}", config.db_path);
    }

    Ok(())
}

fn print_news_line(news: &News) {
    let date = news.publication_date.map(|d| d.to_string()).unwrap_or_else(|| "----------".to_string());
    let star = if news.is_highlighted { "*" } else { " " };
    println!(
        "{} {} {:<5} {:<18} {} ({})",
        star,
        date,
        news.importance.as_str(),
        news.category.as_str(),
        news.title,
        news.id()
    );
}

fn print_outcomes(news: &News, outcomes: &[DispatchOutcome]) {
    if outcomes.is_empty() {
        println!("  No automatic channel accepted: {}", news.title);
        return;
    }
    for outcome in outcomes {
        match &outcome.result {
            Ok(receipt) => println!("  Sent to {} ({}): {}", outcome.channel, outcome.target, receipt.message),
            Err(e) => println!("  FAILED {} ({}): {}", outcome.channel, outcome.target, e),
        }
    }
}
