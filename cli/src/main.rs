//! docweave CLI - harvest DOCX table fragments and recompose them.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use docweave::{harvest_file, ExportOptions, Exporter, HarvestOptions, Template};

mod store;

use store::DirStore;

#[derive(Parser)]
#[command(name = "docweave")]
#[command(version)]
#[command(about = "Recompose stored DOCX table fragments into standalone documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a DOCX into stored fragments (one per table)
    Harvest {
        /// Source DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Fragment store directory
        #[arg(short, long, value_name = "DIR", env = "DOCWEAVE_STORE")]
        store: PathBuf,

        /// Context paragraphs kept before each table
        #[arg(long, default_value = "3")]
        before: usize,

        /// Context paragraphs kept after each table
        #[arg(long, default_value = "1")]
        after: usize,
    },

    /// List the fragments in a store
    #[command(alias = "ls")]
    List {
        /// Fragment store directory
        #[arg(short, long, value_name = "DIR", env = "DOCWEAVE_STORE")]
        store: PathBuf,
    },

    /// Export selected fragments as one DOCX
    Export {
        /// Fragment ids, in output order (repeatable)
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,

        /// Fragment store directory
        #[arg(short, long, value_name = "DIR", env = "DOCWEAVE_STORE")]
        store: PathBuf,

        /// Output file (suggested name if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Blank template package (built-in minimal template if not specified)
        #[arg(long, value_name = "FILE")]
        template: Option<PathBuf>,

        /// Do not insert page breaks between fragments
        #[arg(long)]
        no_page_breaks: bool,

        /// Do not inline based-on ancestor chains into the style catalog
        #[arg(long)]
        flat_styles: bool,
    },

    /// Preview what harvesting a DOCX would produce, without writing
    Info {
        /// Source DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Harvest {
            input,
            store,
            before,
            after,
        } => cmd_harvest(&input, &store, before, after),
        Commands::List { store } => cmd_list(&store),
        Commands::Export {
            ids,
            store,
            output,
            template,
            no_page_breaks,
            flat_styles,
        } => cmd_export(
            &ids,
            &store,
            output.as_deref(),
            template.as_deref(),
            no_page_breaks,
            flat_styles,
        ),
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_harvest(
    input: &Path,
    store_dir: &Path,
    before: usize,
    after: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = HarvestOptions::new().with_context(before, after);
    let harvest = harvest_file(input, &options)?;

    if harvest.is_empty() {
        println!("{}", "No tables found; nothing stored.".yellow());
        return Ok(());
    }

    let store = DirStore::open(store_dir);
    let written = store.save(&harvest)?;

    println!(
        "{} {} fragment(s) from {}",
        "Stored".green().bold(),
        written,
        input.display()
    );
    for record in &harvest.fragments {
        match &record.caption {
            Some(caption) => println!("  {} {}  {}", "├─".dimmed(), record.id, caption.dimmed()),
            None => println!("  {} {}", "├─".dimmed(), record.id),
        }
    }
    Ok(())
}

fn cmd_list(store_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = DirStore::open(store_dir);
    let records = store.load_all()?;

    if records.is_empty() {
        println!("{}", "Store is empty.".yellow());
        return Ok(());
    }

    println!("{} fragment(s):", records.len());
    for record in &records {
        let caption = record.caption.as_deref().unwrap_or("-");
        println!(
            "  {}  {}  {}",
            record.id.bold(),
            record.created.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            caption
        );
    }
    Ok(())
}

fn cmd_export(
    ids: &[String],
    store_dir: &Path,
    output: Option<&Path>,
    template_path: Option<&Path>,
    no_page_breaks: bool,
    flat_styles: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = DirStore::open(store_dir);
    let template = match template_path {
        Some(path) => Template::from_path(path)?,
        None => Template::minimal(),
    };

    let options = ExportOptions::new()
        .with_page_breaks(!no_page_breaks)
        .with_inline_ancestors(!flat_styles);
    let outcome = Exporter::new(&store, &template)
        .with_styles(&store)
        .with_options(options)
        .export(ids)?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&outcome.suggested_name));
    fs::write(&path, &outcome.bytes)?;

    println!(
        "{} {} fragment(s), {} page break(s), {} style(s) -> {}",
        "Exported".green().bold(),
        outcome.fragment_count,
        outcome.section_breaks,
        outcome.style_count,
        path.display()
    );
    for issue in &outcome.issues {
        println!("  {} {}", "warning:".yellow(), issue);
    }
    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let harvest = harvest_file(input, &HarvestOptions::new())?;

    println!("{}", input.display().to_string().bold());
    println!("  tables: {}", harvest.len());
    println!(
        "  style catalog: {}",
        if harvest.styles_xml.is_some() {
            "present"
        } else {
            "absent"
        }
    );
    for (record, closure) in harvest.fragments.iter().zip(&harvest.closures) {
        let caption = record.caption.as_deref().unwrap_or("-");
        let styles: Vec<&str> = closure
            .resolved()
            .map(|r| r.definition.id.as_str())
            .collect();
        println!(
            "  {} {}  caption: {}  styles: [{}]",
            "├─".dimmed(),
            record.id,
            caption,
            styles.join(", ")
        );
    }
    Ok(())
}
