use clap::Parser;
use exhibition_feed::adapters::{PostgrestStore, StaticSession, SupabaseAuth, TracingNotifier};
use exhibition_feed::core::filter::{bookmark_link, REGIONS};
use exhibition_feed::domain::model::{Exhibition, ExhibitionId};
use exhibition_feed::domain::ports::SessionSource;
use exhibition_feed::utils::error::ErrorSeverity;
use exhibition_feed::utils::{logger, validation::Validate};
use exhibition_feed::{
    CliArgs, FeedConfig, FeedController, FeedDependencies, FeedError, FeedSnapshot, FeedStatus,
    Result,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.list_regions {
        for region in REGIONS {
            println!("{}", region);
        }
        return Ok(());
    }

    let config = match args.resolve_config().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(args.verbose, None);
            report_and_exit(&e);
        }
    };

    if config.json_logs() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(args.verbose, config.log_level());
    }

    tracing::info!("Starting exhibition-feed against {}", config.store.url);
    if args.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    if let Err(e) = run(&args, &config).await {
        report_and_exit(&e);
    }
    Ok(())
}

async fn run(args: &CliArgs, config: &FeedConfig) -> Result<()> {
    let store = Arc::new(PostgrestStore::new(config.store.clone())?);
    let sessions: Arc<dyn SessionSource> = match config.fixed_user() {
        Some(user_id) => Arc::new(StaticSession::user(user_id)),
        None => Arc::new(SupabaseAuth::new(
            config.store.clone(),
            config.access_token().map(str::to_string),
        )?),
    };

    let controller = FeedController::spawn(
        FeedDependencies {
            exhibitions: store.clone(),
            bookmarks: store,
            sessions,
            notifier: Arc::new(TracingNotifier),
        },
        config.initial_filter()?,
    );

    controller.mount();
    let mut snapshot = controller.settled().await?;

    if let Some(id) = args.toggle {
        let exhibition = find_or_stub(&snapshot, id);
        match controller.toggle_bookmark(&exhibition).await {
            Ok(action) => {
                tracing::info!("✅ Bookmark {:?}: {}", action, exhibition.title);
                snapshot = controller.settled().await?;
            }
            Err(e) => {
                tracing::warn!("Bookmark toggle failed: {}", e);
                if !e.is_transient() {
                    return Err(e);
                }
            }
        }
    }

    for _ in 1..args.pages {
        if !snapshot.has_more {
            break;
        }
        controller.load_more();
        snapshot = controller.settled().await?;
    }

    print_snapshot(&controller, &snapshot).await;

    if let Some(link) = config.feed.as_ref().and_then(|f| f.link.as_deref()) {
        let shared = bookmark_link(link, snapshot.filter.bookmark_only())?;
        println!("🔗 {}", shared);
    }

    controller.shutdown();
    Ok(())
}

fn find_or_stub(snapshot: &FeedSnapshot, id: ExhibitionId) -> Exhibition {
    snapshot
        .items
        .iter()
        .find(|e| e.id == id)
        .cloned()
        .unwrap_or_else(|| Exhibition {
            id,
            title: format!("exhibition #{}", id),
            date_range: None,
            location: None,
            is_free: false,
            is_recommended: false,
            gallery: None,
        })
}

async fn print_snapshot(controller: &FeedController, snapshot: &FeedSnapshot) {
    let filter = &snapshot.filter;
    println!(
        "category={} region={} bookmarks_only={} pages={}",
        filter.category(),
        if filter.region().is_empty() { "-" } else { filter.region() },
        filter.bookmark_only(),
        snapshot.page
    );

    for exhibition in &snapshot.items {
        let marker = if controller.is_bookmarked(exhibition).await {
            "★"
        } else {
            " "
        };
        println!(
            "{} [{}] {} | {} | {}",
            marker,
            exhibition.id,
            exhibition.title,
            exhibition.date_range.as_deref().unwrap_or("-"),
            exhibition
                .gallery_address()
                .or(exhibition.location.as_deref())
                .unwrap_or("-"),
        );
    }

    match snapshot.status() {
        FeedStatus::MoreAvailable => println!("… more exhibitions available (--pages)"),
        FeedStatus::AllLoaded => println!("All exhibitions loaded."),
        FeedStatus::NoResults => println!("No exhibitions match these filters."),
        FeedStatus::Empty(reason) => println!("Nothing to show: {:?}", reason),
        FeedStatus::Loading => println!("Still loading."),
    }
}

fn report_and_exit(e: &FeedError) -> ! {
    tracing::error!(
        "❌ exhibition-feed failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
