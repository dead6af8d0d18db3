// SPDX-License-Identifier: MPL-2.0

use anyhow::{Context, Result, bail};
use plaza::config::{APP_NAME, IS_DEVEL};
use plaza::state::AppSettings;
use plaza::{
    Config, FeedController, NoticeKind, NoticeQueue, Normalizer, NormalizedPost, PlazaClient,
    PostDetail, VideoCoordinator, runtime,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Terminal has no real viewport; any height works for modal bookkeeping
const VIEWPORT_HEIGHT: f64 = 800.0;

enum Command {
    /// Print this many feed windows
    Feed { pages: usize },
    /// Open one post as if from a link
    Post { id: String },
}

fn parse_args() -> Result<Command> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => Ok(Command::Feed { pages: 1 }),
        Some("--post") => {
            let id = args.next().context("--post needs a post id")?;
            Ok(Command::Post { id })
        }
        Some(pages) => {
            let pages = pages
                .parse::<usize>()
                .with_context(|| format!("expected a page count, got {pages:?}"))?;
            if pages == 0 {
                bail!("page count must be at least 1");
            }
            Ok(Command::Feed { pages })
        }
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plaza=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install tracing subscriber")
}

fn summarize(post: &NormalizedPost) -> serde_json::Value {
    json!({
        "id": post.id,
        "author": post.author.name,
        "content": post.content,
        "createdAt": post.created_at,
        "media": post.media,
        "gallery": post.media_gallery.len(),
        "likes": post.likes,
        "liked": post.liked,
        "comments": post.comments.len(),
    })
}

fn main() {
    let _ = dotenvy::dotenv();
    if let Err(e) = init_tracing() {
        eprintln!("{e:#}");
    }

    if let Err(e) = runtime::block_on(run()) {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let command = parse_args()?;
    let config = Config::from_env().context("Failed to load configuration")?;
    let settings = AppSettings::load();
    info!(api_base = %config.api_base, devel = IS_DEVEL, "Starting {APP_NAME}");

    let client = Arc::new(PlazaClient::new(&config).context("Failed to build HTTP client")?);
    let notices = Arc::new(NoticeQueue::new());
    let feed = Arc::new(FeedController::new(
        client,
        Normalizer::new(config.api_base.clone()),
        notices.clone(),
    ));

    // The viewer may resolve after the first window; the feed reconciles either way
    let viewer_task = {
        let feed = feed.clone();
        runtime::spawn(async move { feed.load_viewer().await })
    };

    let output = match command {
        Command::Feed { pages } => {
            for _ in 0..pages {
                if feed.load_more().await.context("Failed to load feed")? == 0 {
                    break;
                }
            }
            await_viewer(viewer_task).await;
            let posts = feed.posts();
            info!(posts = posts.len(), has_more = feed.has_more(), "Feed loaded");
            json!(posts.iter().map(|p| summarize(p)).collect::<Vec<_>>())
        }
        Command::Post { id } => {
            await_viewer(viewer_task).await;
            let post = feed
                .open_deep_link(&id)
                .await
                .with_context(|| format!("Failed to open post {id}"))?;

            let videos = VideoCoordinator::new(VIEWPORT_HEIGHT);
            videos.set_autoplay(settings.autoplay_videos);
            let detail = PostDetail::open(
                post,
                feed.clone(),
                Some(videos.clone()),
                settings.likes_page_size,
            );
            let output = json!({
                "post": summarize(detail.post()),
                "gallery": detail.gallery(),
                "likedBy": detail.visible_likes(),
                "moreLikes": detail.has_more_likes(),
                "comments": detail.comments(),
            });
            drop(detail);
            videos.shutdown();
            output
        }
    };

    for notice in notices.drain() {
        match notice.kind {
            NoticeKind::Error => warn!("{}", notice.message),
            NoticeKind::Info => info!("{}", notice.message),
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to render output")?
    );
    Ok(())
}

async fn await_viewer(
    task: tokio::task::JoinHandle<Result<plaza::NormalizedUser, plaza::FeedError>>,
) {
    match task.await {
        Ok(Ok(viewer)) => info!(viewer = %viewer.id, "Signed in"),
        Ok(Err(e)) => warn!(error = %e, "Continuing without a signed-in user"),
        Err(e) => warn!(error = %e, "Viewer lookup task failed"),
    }
}
