//! Command-line front end.
//!
//! All behavior lives in the library; this binary parses arguments, opens
//! the MySQL connection, renders the run log and stages templates.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;

use subcolumns2grid::config::{GlobalsConfig, MigrationSource};
use subcolumns2grid::fix::{run_fix, FixOptions};
use subcolumns2grid::migrate::{run_migration, MigrateOptions};
use subcolumns2grid::model::TEMPLATE_PREFIX;
use subcolumns2grid::report::MigrationLog;
use subcolumns2grid::rollback::{run_rollback, AcceptAll, Confirm};
use subcolumns2grid::storage::MySqlStorage;

#[derive(Parser)]
#[command(
    name = "subcolumns2grid",
    version,
    about = "One-time migration of legacy sub-column layouts to grid columns"
)]
struct Cli {
    /// MySQL connection string of the CMS database.
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Repair or cleanse structurally broken sub-column groups
    Fix {
        /// Run everything, then discard the transaction
        #[arg(long)]
        dry_run: bool,
        /// Delete corrupt groups whose rows are all invisible
        #[arg(long)]
        cleanse: bool,
    },
    /// Convert sub-column elements into grid columns
    Migrate {
        /// Definition origin; omitted, it is auto-detected
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
        /// Theme id the new grid definitions belong to
        #[arg(long, default_value_t = 0)]
        theme: i64,
        /// TOML file with globals column-set profiles
        #[arg(long)]
        globals: Option<PathBuf>,
        /// Run everything, then discard the transaction
        #[arg(long)]
        dry_run: bool,
        /// Stage wrapper templates for inside classes into this directory
        #[arg(long)]
        templates_dir: Option<PathBuf>,
    },
    /// Undo a previous migration run
    Rollback {
        /// Answer yes to every confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Globals,
    Database,
}

impl From<SourceArg> for MigrationSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Globals => MigrationSource::Globals,
            SourceArg::Database => MigrationSource::Database,
        }
    }
}

/// Prompts on stdin, defaulting to no.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{} {} [y/N] ", "?".cyan(), prompt);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let url = cli
        .database_url
        .context("no database connection string; pass --database-url or set DATABASE_URL")?;
    let mut storage = MySqlStorage::connect(&url)
        .await
        .context("failed to connect to the database")?;
    println!("{} Connected to database", "✓".green());

    match cli.command {
        Command::Fix { dry_run, cleanse } => {
            let log = run_fix(&mut storage, FixOptions { dry_run, cleanse }).await?;
            render_log(&log);
            println!(
                "\n{} {} groups repaired, {} rows deleted",
                "✓".green().bold(),
                log.groups_repaired,
                log.rows_deleted
            );
        }
        Command::Migrate {
            source,
            theme,
            globals,
            dry_run,
            templates_dir,
        } => {
            let globals = match globals {
                Some(path) => Some(
                    GlobalsConfig::load(&path)
                        .with_context(|| format!("failed to load globals from {}", path.display()))?,
                ),
                None => None,
            };
            let log = run_migration(
                &mut storage,
                MigrateOptions {
                    source: source.map(Into::into),
                    globals,
                    theme_id: theme,
                    dry_run,
                },
            )
            .await?;
            render_log(&log);

            if let Some(dir) = templates_dir {
                if dry_run {
                    println!("{} dry-run: template staging skipped", "!".yellow());
                } else {
                    stage_templates(&dir, &log)?;
                }
            } else if !log.required_templates.is_empty() {
                println!(
                    "{} {} inside-class templates are needed; re-run with --templates-dir to stage them",
                    "!".yellow(),
                    log.required_templates.len()
                );
            }

            println!(
                "\n{} {} definitions migrated, {} groups rewritten, {} skipped",
                "✓".green().bold(),
                log.definitions_migrated,
                log.groups_rewritten,
                log.groups_skipped
            );
        }
        Command::Rollback { yes } => {
            let log = if yes {
                run_rollback(&mut storage, &mut AcceptAll).await?
            } else {
                run_rollback(&mut storage, &mut StdinConfirm).await?
            };
            render_log(&log);
            println!(
                "\n{} {} rows reverted, {} templates cleared, {} definitions deleted",
                "✓".green().bold(),
                log.rows_reverted,
                log.templates_cleared,
                log.definitions_deleted
            );
        }
    }

    Ok(())
}

fn render_log(log: &MigrationLog) {
    for note in log.notes() {
        println!("  {} {note}", "→".cyan());
    }
    for error in log.errors() {
        println!("  {} {error}", "!".red());
    }
}

/// Write one wrapper template per required inside class.
///
/// Existing files are left alone so hand-edited templates survive re-runs.
fn stage_templates(dir: &Path, log: &MigrationLog) -> Result<()> {
    if log.required_templates.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create template directory {}", dir.display()))?;

    for class in &log.required_templates {
        let path = dir.join(format!("{TEMPLATE_PREFIX}start_{class}.html5"));
        if path.exists() {
            println!("  {} {} exists, kept", "→".cyan(), path.display());
            continue;
        }
        let body = format!(
            "<div class=\"<?= $this->class ?> {class}\">\n\
             <?php $this->block('inside'); ?>\n\
             <?php $this->endblock(); ?>\n"
        );
        fs::write(&path, body)
            .with_context(|| format!("failed to write template {}", path.display()))?;
        println!("  {} staged {}", "✓".green(), path.display());
    }
    Ok(())
}
