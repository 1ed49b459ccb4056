//! `sync`: reconcile languages.toml against what Zed actually supports.
//!
//! Modes, checked in order: `--classify` (capability survey, optionally
//! with a JSON export), `--list` (print the upstream inventory), `--diff`
//! (compare without writing), and the default reconcile which rewrites
//! source tiers, backfills detection tokens, and with `--add` introduces
//! missing languages.

use anyhow::Result;
use clap::Args;
use jinja_universal_registry::{Registry, RepoLayout, store};
use jinja_universal_zed::reconcile::{self, AddMode, SyncPlan};
use jinja_universal_zed::{LanguageInfo, ZedCache, classify, extensions, native};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// List Zed languages without touching the registry
    #[arg(long)]
    pub list: bool,

    /// Add missing languages to the registry
    #[arg(long)]
    pub add: bool,

    /// Compare the registry with Zed without writing
    #[arg(long)]
    pub diff: bool,

    /// Analyze extension grammar/LSP capabilities
    #[arg(long)]
    pub classify: bool,

    /// Write the classify report as JSON (implies --classify)
    #[arg(long, value_name = "PATH")]
    pub classify_json: Option<PathBuf>,

    /// Only native/built-in languages
    #[arg(long)]
    pub native: bool,

    /// Only extension languages
    #[arg(long)]
    pub ext: bool,

    /// Repository root to operate on
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub root: PathBuf,
}

pub fn run(args: &SyncArgs) -> Result<()> {
    let layout = RepoLayout::new(&args.root);
    tracing::debug!(root = %layout.root.display(), "sync starting");
    layout.validate_sync_environment()?;
    let cache = ZedCache::new(&layout.cache_dir);

    if args.classify || args.classify_json.is_some() {
        let capabilities = classify::collect_extension_capabilities(&cache)?;
        classify::print_capability_report(&capabilities);
        if let Some(path) = &args.classify_json {
            classify::write_capability_json(&capabilities, path)?;
            println!("\nSaved JSON report to: {}", path.display());
        }
        return Ok(());
    }

    let (fetch_native, fetch_ext) = fetch_flags(args);
    let (native_langs, ext_langs) = fetch_languages(&cache, fetch_native, fetch_ext)?;

    if args.list {
        print_list(args, &native_langs, &ext_langs);
        return Ok(());
    }

    if args.diff {
        let registry = store::load_lenient(&layout.config_path)?;
        let remote = reconcile::remote_by_language(&native_langs, &ext_langs);
        print_diff(&registry, &remote);
        return Ok(());
    }

    println!("\nLoading languages.toml...");
    let mut registry = store::load_lenient(&layout.config_path)?;
    println!("  Found {} configured languages", registry.len());

    let native_ids: BTreeSet<String> = native_langs
        .iter()
        .map(|lang| lang.zed_language.clone())
        .collect();
    let ext_ids: BTreeSet<String> = ext_langs
        .iter()
        .map(|lang| lang.zed_language.clone())
        .collect();
    let remote = reconcile::remote_by_language(&native_langs, &ext_langs);

    let plan = reconcile::plan(&registry, &native_ids, &ext_ids, &remote, add_mode(args));
    let stats = reconcile::apply(&mut registry, &plan);
    store::save(&layout.config_path, &registry)?;

    print_results(&registry, &plan, &stats, args.add);
    Ok(())
}

/// Which upstream tiers to fetch. Both flags (or neither) mean both.
fn fetch_flags(args: &SyncArgs) -> (bool, bool) {
    if !args.native && !args.ext {
        return (true, true);
    }
    (args.native, args.ext)
}

fn add_mode(args: &SyncArgs) -> AddMode {
    if !args.add {
        AddMode::None
    } else if args.native && !args.ext {
        AddMode::NativeOnly
    } else if args.ext && !args.native {
        AddMode::ExtensionOnly
    } else {
        AddMode::All
    }
}

fn fetch_languages(
    cache: &ZedCache,
    fetch_native: bool,
    fetch_ext: bool,
) -> Result<(Vec<LanguageInfo>, Vec<LanguageInfo>)> {
    let mut native_langs = Vec::new();
    if fetch_native {
        println!("Fetching Zed built-in languages...");
        native_langs = native::fetch_native_languages(cache)?;
        println!("  Found {} native languages", native_langs.len());
    }

    let mut ext_langs = Vec::new();
    if fetch_ext {
        println!("\nFetching Zed extension languages...");
        // Grammar identity filtering only makes sense when the native
        // side was fetched too.
        let native_signatures = if fetch_native {
            native::native_grammar_signatures(cache)?
        } else {
            BTreeSet::new()
        };
        let scan = extensions::fetch_extension_languages(cache, &native_signatures)?;
        println!("  Found {} extension languages", scan.languages.len());
        if !scan.skipped_native_reexports.is_empty() {
            println!(
                "  Filtered {} extension grammars already declared native in Zed's workspace",
                scan.skipped_native_reexports.len()
            );
        }
        if !scan.skipped_duplicates.is_empty() {
            println!(
                "  Skipped {} duplicate grammar claims",
                scan.skipped_duplicates.len()
            );
        }
        ext_langs = scan.languages;
    }

    Ok((native_langs, ext_langs))
}

fn print_list(args: &SyncArgs, native_langs: &[LanguageInfo], ext_langs: &[LanguageInfo]) {
    if args.native && !args.ext {
        print_languages(native_langs, "Zed Native Languages");
    } else if args.ext && !args.native {
        print_languages(ext_langs, "Zed Extension Languages");
    } else {
        print_languages(native_langs, "Zed Native Languages");
        print_languages(ext_langs, "Zed Extension Languages");
        println!("\nTotal: {} languages", native_langs.len() + ext_langs.len());
    }
}

fn print_languages(languages: &[LanguageInfo], title: &str) {
    println!("\n{title} ({}):", languages.len());
    println!("{}", "-".repeat(50));
    let mut sorted: Vec<&LanguageInfo> = languages.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    for lang in sorted {
        let mut extensions = lang
            .extensions
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if lang.extensions.len() > 3 {
            extensions.push_str("...");
        }
        println!("  {}: {} [{extensions}]", lang.id, lang.name);
    }
}

/// Three-way comparison: entries only we track, languages only Zed has,
/// and detection-token drift on the common set.
fn print_diff(registry: &Registry, remote: &BTreeMap<String, LanguageInfo>) {
    println!();
    println!("{}", "=".repeat(60));
    println!("COMPARISON: languages.toml vs Zed");
    println!("{}", "=".repeat(60));

    let ours: BTreeMap<&str, (&str, &jinja_universal_registry::LanguageDescriptor)> = registry
        .iter()
        .map(|(id, descriptor)| (descriptor.zed_language.as_str(), (id, descriptor)))
        .collect();

    let only_ours: Vec<&str> = ours
        .keys()
        .filter(|slug| !remote.contains_key(**slug))
        .copied()
        .collect();
    if !only_ours.is_empty() {
        println!("\n[!] In our config but NOT in Zed ({}):", only_ours.len());
        for slug in &only_ours {
            let (id, descriptor) = &ours[slug];
            println!("    - {id} ({})", descriptor.name);
        }
    }

    let only_zed: Vec<&LanguageInfo> = remote
        .values()
        .filter(|lang| !ours.contains_key(lang.zed_language.as_str()))
        .collect();
    if !only_zed.is_empty() {
        println!("\n[+] In Zed but NOT in our config ({}):", only_zed.len());
        for lang in &only_zed {
            let extensions = if lang.extensions.is_empty() {
                "none".to_string()
            } else {
                lang.extensions
                    .iter()
                    .take(3)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("    + {} ({}) [{extensions}]", lang.id, lang.name);
        }
    }

    let mut differences: Vec<(&str, Vec<String>)> = Vec::new();
    for (slug, (id, descriptor)) in &ours {
        let Some(upstream) = remote.get(*slug) else {
            continue;
        };
        let our_ext: BTreeSet<&String> = descriptor.extensions.iter().flatten().collect();
        let zed_ext: BTreeSet<&String> = upstream.extensions.iter().collect();
        if our_ext == zed_ext {
            continue;
        }
        let mut diffs = Vec::new();
        let only_ours_ext: Vec<&str> = our_ext
            .difference(&zed_ext)
            .map(|s| s.as_str())
            .collect();
        let only_zed_ext: Vec<&str> = zed_ext
            .difference(&our_ext)
            .map(|s| s.as_str())
            .collect();
        if !only_ours_ext.is_empty() {
            diffs.push(format!("only in ours: {}", only_ours_ext.join(", ")));
        }
        if !only_zed_ext.is_empty() {
            diffs.push(format!("only in Zed: {}", only_zed_ext.join(", ")));
        }
        differences.push((*id, diffs));
    }
    if !differences.is_empty() {
        println!("\n[~] Extension differences ({}):", differences.len());
        for (id, diffs) in differences.iter().take(20) {
            println!("    {id}:");
            for diff in diffs {
                println!("      - {diff}");
            }
        }
        if differences.len() > 20 {
            println!("    ... and {} more", differences.len() - 20);
        }
    }

    if only_ours.is_empty() && only_zed.is_empty() && differences.is_empty() {
        println!("\n[OK] No differences found!");
    }

    let common = ours.keys().filter(|slug| remote.contains_key(**slug)).count();
    println!();
    println!("{}", "=".repeat(60));
    println!(
        "Summary: {} in our config, {} in Zed, {common} common",
        registry.len(),
        remote.len()
    );
    println!("{}", "=".repeat(60));
}

fn print_results(registry: &Registry, plan: &SyncPlan, stats: &reconcile::ApplyStats, added: bool) {
    println!("\nResults:");
    println!("  Updated: {} source fields", stats.updated);
    println!("  Backfilled detections: {}", stats.backfilled);
    if added {
        println!("  Added: {} new languages", stats.added);
        let review: Vec<&str> = plan
            .additions
            .iter()
            .filter(|addition| addition.needs_review)
            .map(|addition| addition.id.as_str())
            .collect();
        if !review.is_empty() {
            println!(
                "  Needs review (no detection tokens): {}",
                review.join(", ")
            );
        }
    }

    let counts = registry.count_by_source();
    println!("\nBy source:");
    println!("  Native:    {}", counts[0].1);
    println!("  Extension: {}", counts[1].1);
    println!("  Extra:     {}", counts[2].1);
    println!("\nDone! Run `jinja-universal generate` to regenerate language folders.");
}
