use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod workflow;

use api::client::{ApiClient, ApiConfig};
use api::models::{FileCreate, FolderCreate};
use config::Config;
use workflow::StorageWorkflow;

#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "Console client for the Stowage cloud storage API", long_about = None)]
struct Cli {
    /// Bearer token; falls back to STOWAGE_TOKEN, the config file, or a prompt
    #[arg(long, global = true)]
    token: Option<String>,
    /// Project id; falls back to the config file or a prompt
    #[arg(long, global = true)]
    project: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full demonstration workflow against the API
    Demo,
    /// List top-level items, or a folder's contents
    Ls {
        /// Folder id; omit for the top-level listing
        folder: Option<String>,
        /// Number of items to skip
        #[arg(long)]
        skip: Option<u32>,
        /// Number of items to take
        #[arg(long)]
        top: Option<u32>,
    },
    /// List the recycle bin
    Bin {
        #[arg(long)]
        skip: Option<u32>,
        #[arg(long)]
        top: Option<u32>,
    },
    /// Create a folder
    Mkdir {
        /// Parent folder id
        parent: String,
        /// Display name for the new folder
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Upload a local file into a folder
    Upload {
        /// Parent folder id
        parent: String,
        /// Local file to upload
        path: PathBuf,
    },
    /// Download a file to a local path
    Download {
        /// File id
        file: String,
        /// Destination path
        out: PathBuf,
    },
    /// Move a file (or folder with --folder) to the recycle bin
    Rm {
        id: String,
        #[arg(long)]
        folder: bool,
    },
    /// Restore a file (or folder) from the recycle bin
    Restore {
        id: String,
        #[arg(long)]
        folder: bool,
    },
    /// Permanently delete a file (or folder) from the recycle bin
    Purge {
        id: String,
        #[arg(long)]
        folder: bool,
    },
    /// Store the bearer token and project id
    Login,
    /// Clear stored credentials
    Logout,
    /// Show what is configured
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stowage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load()?;

    // Commands that never talk to the API
    match &cli.command {
        Commands::Login => return login(&mut config).await,
        Commands::Logout => return logout(&mut config),
        Commands::Status => return status(&config),
        _ => {}
    }

    let token = resolve_token(cli.token, &config).await?;
    let origin = config.origin().to_string();

    match cli.command {
        Commands::Demo => {
            let project = resolve_project(cli.project, &config).await?;
            let client = ApiClient::new(ApiConfig::new(&origin, &token))?;
            workflow::run_demo(client, &project, &std::env::temp_dir()).await?;
        }
        Commands::Ls { folder, skip, top } => {
            match folder {
                Some(folder_id) => {
                    let workflow = build_workflow(&origin, &token, String::new())?;
                    let page = workflow.folder_items(&folder_id, skip, top).await?;
                    print_page(&page.files, &page.folders);
                }
                None => {
                    let project = resolve_project(cli.project, &config).await?;
                    let workflow = build_workflow(&origin, &token, project)?;
                    let page = workflow.top_level_items(skip, top).await?;
                    print_page(&page.files, &page.folders);
                }
            }
        }
        Commands::Bin { skip, top } => {
            let project = resolve_project(cli.project, &config).await?;
            let workflow = build_workflow(&origin, &token, project)?;
            let page = workflow.recycle_bin_items(skip, top).await?;
            print_page(&page.files, &page.folders);
        }
        Commands::Mkdir {
            parent,
            name,
            description,
        } => {
            let mut workflow = build_workflow(&origin, &token, String::new())?;
            let payload = FolderCreate {
                display_name: name,
                description,
            };
            let folder = workflow.create_folder(&parent, &payload).await?;
            println!("created folder {} ({})", folder.display_name, folder.id);
        }
        Commands::Upload { parent, path } => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("path has no usable file name"))?;
            let source = tokio::fs::File::open(&path).await?;

            let mut workflow = build_workflow(&origin, &token, String::new())?;
            let spinner = spinner(format!("uploading {name}"));
            let file = workflow
                .create_file(&parent, &FileCreate::new(name), reqwest::Body::from(source))
                .await?;
            spinner.finish_with_message(format!("uploaded {} ({})", file.display_name, file.id));
        }
        Commands::Download { file, out } => {
            let mut workflow = build_workflow(&origin, &token, String::new())?;
            let spinner = spinner(format!("downloading {file}"));
            workflow.download_file(&file, &out).await?;
            spinner.finish_with_message(format!("saved to {}", out.display()));
        }
        Commands::Rm { id, folder } => {
            let workflow = build_workflow(&origin, &token, String::new())?;
            if folder {
                workflow.delete_folder(&id).await?;
            } else {
                workflow.delete_file(&id).await?;
            }
            println!("moved {id} to the recycle bin");
        }
        Commands::Restore { id, folder } => {
            let workflow = build_workflow(&origin, &token, String::new())?;
            if folder {
                workflow.restore_folder(&id).await?;
            } else {
                workflow.restore_file(&id).await?;
            }
            println!("restored {id}");
        }
        Commands::Purge { id, folder } => {
            let workflow = build_workflow(&origin, &token, String::new())?;
            if folder {
                workflow.purge_folder(&id).await?;
            } else {
                workflow.purge_file(&id).await?;
            }
            println!("permanently deleted {id}");
        }
        Commands::Login | Commands::Logout | Commands::Status => unreachable!(),
    }

    Ok(())
}

fn build_workflow(
    origin: &str,
    token: &str,
    project: String,
) -> anyhow::Result<StorageWorkflow> {
    let client = ApiClient::new(ApiConfig::new(origin, token))?;
    Ok(StorageWorkflow::new(client, project))
}

async fn resolve_token(explicit: Option<String>, config: &Config) -> anyhow::Result<String> {
    if let Some(token) = explicit {
        return Ok(token);
    }
    if let Ok(token) = std::env::var("STOWAGE_TOKEN") {
        if !token.is_empty() {
            return Ok(token);
        }
    }
    if let Some(token) = &config.token {
        return Ok(token.clone());
    }
    prompt_token().await
}

async fn resolve_project(explicit: Option<String>, config: &Config) -> anyhow::Result<String> {
    if let Some(project) = explicit {
        return Ok(project);
    }
    if let Some(project) = &config.project_id {
        return Ok(project.clone());
    }
    prompt_project()
}

async fn prompt_token() -> anyhow::Result<String> {
    print!("Bearer token: ");
    std::io::stdout().flush()?;

    let token = tokio::task::spawn_blocking(|| -> anyhow::Result<String> {
        Ok(rpassword::read_password()?)
    })
    .await??;

    let token = token.trim().to_string();
    if token.is_empty() {
        anyhow::bail!("a bearer token is required");
    }
    Ok(token)
}

fn prompt_project() -> anyhow::Result<String> {
    print!("Project id: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let project = input.trim().to_string();
    if project.is_empty() {
        anyhow::bail!("a project id is required");
    }
    Ok(project)
}

async fn login(config: &mut Config) -> anyhow::Result<()> {
    let token = prompt_token().await?;
    let project = prompt_project()?;

    config.token = Some(token);
    config.project_id = Some(project);
    config.save()?;
    println!("credentials saved to {}", Config::config_path()?.display());
    Ok(())
}

fn logout(config: &mut Config) -> anyhow::Result<()> {
    config.token = None;
    config.project_id = None;
    config.save()?;
    println!("logged out");
    Ok(())
}

fn status(config: &Config) -> anyhow::Result<()> {
    println!("api: {}", config.origin());
    match &config.project_id {
        Some(project) => println!("project: {}", project),
        None => println!("project: not set"),
    }
    if config.token.is_some() {
        println!("token: stored");
    } else {
        println!("token: not stored (will prompt)");
    }
    Ok(())
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_page(files: &[api::models::File], folders: &[api::models::Folder]) {
    if files.is_empty() && folders.is_empty() {
        println!("empty");
        return;
    }
    for folder in folders {
        println!("folder  {}  {}", folder.id, folder.display_name);
    }
    for file in files {
        let size = file.size.map(format_size).unwrap_or_default();
        println!("file    {}  {}  {}", file.id, file.display_name, size);
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
