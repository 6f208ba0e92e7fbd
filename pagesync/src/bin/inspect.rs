//! pagesync-inspect: print the component tree of a page model document.
//!
//! ```text
//! pagesync-inspect page.json
//! pagesync-inspect --update fragment.json page.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::info;
use pagesync::core::{Component, ComponentKind, Factories, Page, PageModel};

/// Inspect a page model document
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Page model JSON file
    model: PathBuf,

    /// Fragment to merge before printing
    #[arg(short, long)]
    update: Option<PathBuf>,

    /// Print meta-data records next to each component
    #[arg(short, long)]
    meta: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let page = Page::new(load(&cli.model)?, Arc::new(Factories::default()))?;
    info!("Loaded {}", cli.model.display());

    if let Some(path) = &cli.update {
        let fragment = load(path)?;
        page.apply_update(&fragment);
        info!("Merged {}", path.display());
    }

    if let Some(title) = page.title() {
        println!("title: {title}");
    }
    println!("preview: {}", page.is_preview());
    print_tree(page.root(), 0, cli.meta);
    Ok(())
}

fn load(path: &Path) -> Result<PageModel, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn print_tree(component: &Arc<Component>, depth: usize, meta: bool) {
    let indent = "  ".repeat(depth);
    let kind = match component.kind() {
        ComponentKind::Component => "component",
        ComponentKind::Container => "container",
        ComponentKind::ContainerItem => "container-item",
    };
    let name = component.name().unwrap_or_default();
    let hidden = if component.is_hidden() { " (hidden)" } else { "" };
    println!("{indent}{kind} {} [{name}]{hidden}", component.id());

    if meta {
        let bracket = component.meta();
        for record in bracket.begin().iter().chain(bracket.end()) {
            println!("{indent}  ~ {:?} {}", record.position(), record.data());
        }
    }

    for child in component.children() {
        print_tree(child, depth + 1, meta);
    }
}
