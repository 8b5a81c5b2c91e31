use clap::Parser;
use rpm_packaging_status::tasks::{TaskFile, TaskRunner};
use rpm_packaging_status::utils::logger;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "status-tasks")]
#[command(about = "Run the lint, venv and status environments defined in tasks.toml")]
struct Args {
    /// Environment to run (pep8, venv, status, ...)
    env: Option<String>,

    /// Path to the task definition file
    #[arg(short, long, default_value = "tasks.toml")]
    file: PathBuf,

    /// List the available environments and exit
    #[arg(short, long)]
    list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Extra arguments substituted for {posargs}
    #[arg(last = true)]
    posargs: Vec<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let file = match TaskFile::from_file(&args.file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("❌ Failed to load '{}': {}", args.file.display(), e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    // tasks.toml 所在目錄即專案根目錄
    let root = args
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    if let Err(e) = file.validate(&root) {
        tracing::error!("❌ {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if args.list || args.env.is_none() {
        println!("📋 Environments:");
        for (name, env) in &file.env {
            println!(
                "  {:<8} {}",
                name,
                env.description.as_deref().unwrap_or_default()
            );
        }
        return;
    }

    let env = args.env.unwrap_or_default();
    let runner = TaskRunner::new(root, file);
    if let Err(e) = runner.run(&env, &args.posargs).await {
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}
