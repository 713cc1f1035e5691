use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};

use substack_blog::config::Config;
use substack_blog::page::{Blog, Outcome, PageShell, DEFAULT_TEMPLATE};
use substack_blog::slug::requested_slug;

/// Get the config directory path (~/.config/substack-blog/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("substack-blog"))
}

#[derive(Parser, Debug)]
#[command(
    name = "substack-blog",
    about = "Render a blog listing or a single post from a Substack feed"
)]
struct Args {
    /// Config file (default: ~/.config/substack-blog/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed URL, overriding the config file and SUBSTACK_FEED_URL
    #[arg(long, global = true, value_name = "URL")]
    feed_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the listing of all posts
    List(OutputArgs),
    /// Render a single post
    Post {
        /// Slug of the post (a full post URL also works)
        #[arg(conflicts_with = "query")]
        id: Option<String>,

        /// Page query string to read the `id` parameter from, e.g. "?id=my-post"
        #[arg(long, value_name = "QUERY")]
        query: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct OutputArgs {
    /// Emit the rendered page state as JSON instead of HTML
    #[arg(long)]
    json: bool,

    /// HTML page template with {{title}}, <!-- alert -->, <!-- feed --> and <!-- post --> markers
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Write to FILE instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };

    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?
        .with_env_overrides();

    if let Some(url) = &args.feed_url {
        config.feed_url = url.clone();
    }
    Ok(config)
}

fn write_page(shell: &PageShell, output: &OutputArgs) -> Result<()> {
    let rendered = if output.json {
        serde_json::to_string_pretty(shell).context("Failed to serialize page")?
    } else {
        let template = match &output.template {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template: {}", path.display()))?,
            None => DEFAULT_TEMPLATE.to_string(),
        };
        shell.render_document(&template)
    };

    match &output.output {
        Some(path) => write_file(path, &rendered),
        None => {
            println!("{}", rendered);
            Ok(())
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = content.len(), "Wrote page");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays the rendered page
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let source = config.feed_source().context("Invalid feed configuration")?;
    let blog = Blog::new(reqwest::Client::new(), source, config.post_page.clone());

    let (shell, outcome, output) = match &args.command {
        Command::List(output) => {
            let mut shell = PageShell::new(config.listing_title.clone());
            let outcome = blog.display_feed(&mut shell).await;
            (shell, outcome, output)
        }
        Command::Post { id, query, output } => {
            let slug = match (id, query) {
                (Some(id), _) => Some(id.clone()),
                (None, Some(query)) => requested_slug(query),
                (None, None) => None,
            };
            let mut shell = PageShell::new(config.title_template.clone());
            let outcome = blog.display_post(slug.as_deref(), &mut shell).await;
            (shell, outcome, output)
        }
    };

    write_page(&shell, output)?;

    if let Outcome::Reported(err) = outcome {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
    Ok(())
}
