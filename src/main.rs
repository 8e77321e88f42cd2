use clap::Parser;

use quill::client::SearchClient;
use quill::worker::WorkerConfig;

/// Query the blog post search worker from the command line.
#[derive(Parser)]
struct Args {
    /// Search term
    term: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let args = Args::parse();

    let (client, mut worker) = SearchClient::spawn(WorkerConfig::from_config());
    let mut results = client.subscribe();

    let id = client.search_posts(&args.term);
    log::info!("issued search {id} for {:?}", args.term);

    tokio::select! {
        changed = results.changed() => {
            changed?;
            for result in results.borrow().iter() {
                println!(
                    "{}  {}  by {} [{}]",
                    result.date.format("%Y-%m-%d"),
                    result.title,
                    result.author.label(),
                    result.category.label()
                );
                println!("    {}  {}", result.slug, result.description);
            }
        }
        // Surfaces the worker's own error if it dies before answering
        status = &mut worker => {
            status??;
            anyhow::bail!("search worker exited before serving results");
        }
    }

    // Closing the request channel lets the worker wind down
    drop(client);
    worker.await??;

    Ok(())
}
