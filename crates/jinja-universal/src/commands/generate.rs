//! `generate`: render per-language folders and refresh the README table
//! and the extension manifest description.

use crate::render::{self, GenerateFilter};
use anyhow::{Context, Result};
use clap::Args;
use jinja_universal_registry::{
    BASE_RULE_FILES, GENERATED_FOLDER_SUFFIX, Registry, RepoLayout, layout::REQUIRED_TEMPLATES,
    store,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Sort languages.toml alphabetically and exit
    #[arg(long)]
    pub sort: bool,

    /// Generate ALL languages (including extra)
    #[arg(long)]
    pub all: bool,

    /// Only native Zed languages
    #[arg(long)]
    pub native: bool,

    /// Only extension languages
    #[arg(long)]
    pub ext: bool,

    /// Repository root to operate on
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub root: PathBuf,
}

struct Templates {
    config: String,
    injections: String,
}

pub fn run(args: &GenerateArgs) -> Result<()> {
    let layout = RepoLayout::new(&args.root);
    tracing::debug!(root = %layout.root.display(), "generate starting");
    layout.validate_generate_environment()?;

    if args.sort {
        let registry = store::load(&layout.config_path)?;
        store::save(&layout.config_path, &registry)?;
        println!("Sorted {} languages in languages.toml", registry.len());
        return Ok(());
    }

    let registry = store::load(&layout.config_path)?;
    let templates = load_templates(&layout)?;
    let filter = GenerateFilter {
        all: args.all,
        native: args.native,
        ext: args.ext,
    };

    print_stats(&registry);
    println!("Filter: {}", filter.label());

    let (generated, skipped, deleted) =
        generate_languages(&layout, &registry, &filter, &templates)?;
    println!("\nGenerated {generated} language folders");
    if skipped > 0 {
        println!("Skipped {skipped} languages");
    }
    if deleted > 0 {
        println!("Deleted {deleted} old folders");
    }

    update_readme(&layout, &registry, &filter, generated)?;
    println!("README.md updated!");

    update_manifest(&layout, &registry, &filter, generated)?;
    println!("extension.toml updated!");

    Ok(())
}

fn load_templates(layout: &RepoLayout) -> Result<Templates> {
    // Same file names the environment validation checked for.
    let read = |name: &str| {
        let path = layout.template_path(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read template {}", path.display()))
    };
    Ok(Templates {
        config: read(REQUIRED_TEMPLATES[0])?,
        injections: read(REQUIRED_TEMPLATES[1])?,
    })
}

fn print_stats(registry: &Registry) {
    println!("Loaded {} languages from languages.toml", registry.len());
    let counts = registry.count_by_source();
    println!(
        "  Native: {}, Extension: {}, Extra: {}",
        counts[0].1, counts[1].1, counts[2].1
    );
}

/// Write folders for every selected language and remove generated folders
/// whose language fell out of the selection. The base `jinja2` folder is
/// never touched: it does not carry the generated suffix.
fn generate_languages(
    layout: &RepoLayout,
    registry: &Registry,
    filter: &GenerateFilter,
    templates: &Templates,
) -> Result<(usize, usize, usize)> {
    let selected: BTreeSet<&str> = registry
        .iter()
        .filter(|(_, descriptor)| filter.includes(descriptor))
        .map(|(id, _)| id)
        .collect();

    let mut deleted = 0;
    for stale in existing_generated_folders(&layout.languages_dir)? {
        if !selected.contains(stale.as_str()) {
            let dir = layout.generated_dir(&stale);
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to delete {}", dir.display()))?;
            deleted += 1;
        }
    }

    let mut generated = 0;
    let mut skipped = 0;
    for (id, descriptor) in registry.iter() {
        if !selected.contains(id) {
            skipped += 1;
            continue;
        }
        let dir = layout.generated_dir(id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let config = render::render_language_config(
            &templates.config,
            &descriptor.name,
            &descriptor.detection_tokens(),
        );
        write_file(&dir.join("config.toml"), &config)?;

        let injections =
            render::render_injections(&templates.injections, &descriptor.zed_language);
        write_file(&dir.join("injections.scm"), &injections)?;

        for rule_file in BASE_RULE_FILES {
            let source = layout.jinja2_dir.join(rule_file);
            if source.exists() {
                std::fs::copy(&source, dir.join(rule_file))
                    .with_context(|| format!("failed to copy {}", source.display()))?;
            }
        }
        generated += 1;
    }

    Ok((generated, skipped, deleted))
}

/// Ids of languages that currently have a generated folder on disk.
fn existing_generated_folders(languages_dir: &Path) -> Result<Vec<String>> {
    if !languages_dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(languages_dir)
        .with_context(|| format!("failed to read {}", languages_dir.display()))?
    {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(id) = name.strip_suffix(GENERATED_FOLDER_SUFFIX) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

fn update_readme(
    layout: &RepoLayout,
    registry: &Registry,
    filter: &GenerateFilter,
    generated: usize,
) -> Result<()> {
    let content = std::fs::read_to_string(&layout.readme_path)
        .with_context(|| format!("failed to read {}", layout.readme_path.display()))?;

    let content = render::update_summary_count(&content, generated)?;
    let content = render::replace_marked_block(
        &content,
        render::README_MODE_START,
        render::README_MODE_END,
        &render::render_mode_block(filter),
    )?;
    let table = render::readme_table(registry, filter);
    let content = render::replace_marked_block(
        &content,
        render::README_TABLE_START,
        render::README_TABLE_END,
        &table,
    )?;

    std::fs::write(&layout.readme_path, content)
        .with_context(|| format!("failed to write {}", layout.readme_path.display()))
}

fn update_manifest(
    layout: &RepoLayout,
    registry: &Registry,
    filter: &GenerateFilter,
    generated: usize,
) -> Result<()> {
    let content = std::fs::read_to_string(&layout.manifest_path)
        .with_context(|| format!("failed to read {}", layout.manifest_path.display()))?;
    let description =
        render::manifest_description(generated, &filter.selected_categories(registry));
    let patched = render::patch_manifest_description(&content, &description)?;
    std::fs::write(&layout.manifest_path, patched)
        .with_context(|| format!("failed to write {}", layout.manifest_path.display()))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
