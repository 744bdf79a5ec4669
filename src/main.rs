// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use produktmatch::logging::{init_logging, LogConfig};
use produktmatch::{
    import_csv_dir, load_dataset, open_dataset, CapabilityId, Dataset, ReportView, Selection,
};

#[derive(Parser)]
#[command(name = "produktmatch")]
#[command(version, about = "Find companies that together cover a product's capability requirements")]
struct Cli {
    /// SQLite dataset with the five product/company relations
    #[arg(long, global = true, env = "PRODUKTMATCH_DB", default_value = "produktmatch.sqlite")]
    db: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dataset from <Relation>.csv exports
    Import {
        /// Directory holding the five CSV files
        dir: PathBuf,

        /// Replace an existing dataset file
        #[arg(long)]
        force: bool,
    },

    /// List products
    Products,

    /// Match one product against all companies
    Report {
        /// Product name (or numeric id)
        product: String,

        /// Capability id to leave out of the requirements (repeatable)
        #[arg(long = "exclude", value_name = "ID")]
        exclude: Vec<i64>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show a company profile
    Company {
        /// Company name
        name: String,
    },

    /// Interactive terminal UI (default)
    Ui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose))?;

    match cli.command.unwrap_or(Commands::Ui) {
        Commands::Import { dir, force } => run_import(&dir, &cli.db, force),
        Commands::Products => run_products(&cli.db),
        Commands::Report {
            product,
            exclude,
            json,
        } => run_report(&cli.db, &product, &exclude, json),
        Commands::Company { name } => run_company(&cli.db, &name),
        Commands::Ui => run_ui_mode(&cli.db),
    }
}

fn load(db_path: &Path) -> Result<Dataset> {
    if !db_path.exists() {
        eprintln!("❌ Dataset not found: {:?}", db_path);
        eprintln!("   Run: produktmatch import <csv-dir>");
        eprintln!("   or pass --db <file.sqlite>.");
        std::process::exit(1);
    }

    open_dataset(db_path).with_context(|| format!("Failed to load dataset {:?}", db_path))
}

fn find_product<'a>(dataset: &'a Dataset, query: &str) -> Result<&'a produktmatch::Product> {
    if let Some(product) = dataset.product_by_name(query) {
        return Ok(product);
    }
    if let Ok(id) = query.parse::<i64>() {
        if let Some(product) = dataset.product(id.into()) {
            return Ok(product);
        }
    }
    bail!("Unknown product: {}", query)
}

fn run_import(dir: &Path, db_path: &Path, force: bool) -> Result<()> {
    println!("🗄️  Import: CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if db_path.exists() {
        if !force {
            bail!("{:?} already exists (use --force to replace it)", db_path);
        }
        std::fs::remove_file(db_path)
            .with_context(|| format!("Failed to remove {:?}", db_path))?;
    }

    // 1. Import CSVs
    println!("\n📂 Reading CSV files from {:?}...", dir);
    let conn = Connection::open(db_path).context("Failed to create dataset file")?;
    let stats = import_csv_dir(dir, &conn)?;
    for (relation, count) in &stats.relations {
        println!("✓ {:<26} {} rows", relation, count);
    }

    // 2. Verify integrity by loading it back
    println!("\n🔍 Verifying dataset...");
    let dataset = load_dataset(&conn).context("Imported dataset failed integrity check")?;
    let ds = dataset.stats();
    println!(
        "✓ {} products, {} companies, {} capabilities",
        ds.products, ds.companies, ds.capabilities
    );

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Imported {} rows into {:?}", stats.total(), db_path);

    Ok(())
}

fn run_products(db_path: &Path) -> Result<()> {
    let dataset = load(db_path)?;

    for product in dataset.products() {
        let n = dataset.requirements_of(product.id).len();
        println!("{:>6}  {}  ({} krav)", product.id.0, product.name, n);
    }

    Ok(())
}

fn run_report(db_path: &Path, query: &str, exclude: &[i64], json: bool) -> Result<()> {
    let dataset = load(db_path)?;
    let product = find_product(&dataset, query)?;

    let mut selection = Selection::for_product(&dataset, product.id);
    for id in exclude {
        selection.deselect(CapabilityId(*id));
    }

    let index = dataset.capability_index();
    let outcome = selection.evaluate(&index);
    let view = ReportView::build(product, &selection, &outcome, &index);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", view.render());
    }

    Ok(())
}

fn run_company(db_path: &Path, name: &str) -> Result<()> {
    let dataset = load(db_path)?;

    match dataset.company_profile_by_name(name) {
        Some(profile) => {
            print!("{}", profile.render());
            Ok(())
        }
        None => bail!("Unknown company: {}", name),
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(db_path: &Path) -> Result<()> {
    println!("🖥️  Loading Produktmatch UI...\n");

    let dataset = load(db_path)?;
    if dataset.products().is_empty() {
        bail!("Dataset has no products");
    }

    let mut app = ui::App::new(dataset);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_db_path: &Path) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: produktmatch report <product>");
    std::process::exit(1);
}
