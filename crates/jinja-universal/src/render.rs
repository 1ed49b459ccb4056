//! Pure rendering helpers for the generate command: template
//! substitution, the README language table, and the manifest description.
//!
//! Nothing here touches the filesystem; the command layer decides what to
//! write where.

use anyhow::{Context, Result, bail};
use jinja_universal_registry::{LanguageDescriptor, Registry, Source};
use regex::Regex;
use toml_edit::DocumentMut;

/// Jinja flavor suffixes appended to every detection token.
pub const JINJA_VARIANTS: [&str; 3] = ["jinja", "jinja2", "j2"];

pub const README_TABLE_START: &str = "<!-- LANGUAGES_TABLE_START -->";
pub const README_TABLE_END: &str = "<!-- LANGUAGES_TABLE_END -->";
pub const README_MODE_START: &str = "<!-- GENERATED_MODE_START -->";
pub const README_MODE_END: &str = "<!-- GENERATED_MODE_END -->";

/// Which registry entries a generate run covers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateFilter {
    pub all: bool,
    pub native: bool,
    pub ext: bool,
}

impl GenerateFilter {
    /// Entries without detection tokens are never generated; an entry
    /// whose folder would match nothing only causes confusion.
    pub fn includes(&self, descriptor: &LanguageDescriptor) -> bool {
        if !descriptor.has_detection_tokens() {
            return false;
        }
        if self.all {
            return true;
        }
        if self.native && descriptor.source == Source::Native {
            return true;
        }
        if self.ext && descriptor.source == Source::Extension {
            return true;
        }
        if !self.native && !self.ext {
            return matches!(descriptor.source, Source::Native | Source::Extension);
        }
        false
    }

    pub fn label(&self) -> &'static str {
        if self.all {
            "all (native + extension + extra)"
        } else if self.native && self.ext {
            "native + extension"
        } else if self.native {
            "native only"
        } else if self.ext {
            "extension only"
        } else {
            "native + extension (default)"
        }
    }

    pub fn scope(&self) -> &'static str {
        if self.all {
            "all native, extension, and extra languages."
        } else if self.native && self.ext {
            "all native and extension languages."
        } else if self.native {
            "only native languages."
        } else if self.ext {
            "only extension languages."
        } else {
            "all native and extension languages (extra excluded)."
        }
    }

    /// Source tiers actually covered by this run, in fixed order.
    pub fn selected_categories(&self, registry: &Registry) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|source| {
                registry
                    .iter()
                    .any(|(_, d)| d.source == *source && self.includes(d))
            })
            .collect()
    }
}

/// Substitute `$key` / `${key}` placeholders.
pub fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in values {
        rendered = rendered.replace(&format!("${{{key}}}"), value);
        rendered = rendered.replace(&format!("${key}"), value);
    }
    rendered
}

/// Path suffixes for a generated language: every detection token crossed
/// with every Jinja variant, tokens in sorted order.
pub fn generated_path_suffixes(tokens: &[String]) -> Vec<String> {
    let mut sorted: Vec<&String> = tokens.iter().collect();
    sorted.sort();
    sorted
        .iter()
        .flat_map(|token| {
            JINJA_VARIANTS
                .iter()
                .map(move |variant| format!("{token}.{variant}"))
        })
        .collect()
}

pub fn render_language_config(template: &str, name: &str, tokens: &[String]) -> String {
    let suffixes = generated_path_suffixes(tokens)
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ");
    substitute(template, &[("name", name), ("suffixes", &suffixes)])
}

pub fn render_injections(template: &str, zed_language: &str) -> String {
    substitute(template, &[("zed_language", zed_language)])
}

/// The README language table for the selected entries: header, the base
/// Jinja2 row, then one row per language sorted by display name.
pub fn readme_table(registry: &Registry, filter: &GenerateFilter) -> String {
    let mut lines = vec![
        "| Language | File Extensions |".to_string(),
        "|----------|-----------------|".to_string(),
        "| Jinja2 | `.html.*`, `.j2`, `.jinja`, `.jinja2` |".to_string(),
    ];

    let mut rows: Vec<(String, String)> = registry
        .iter()
        .filter(|(_, descriptor)| filter.includes(descriptor))
        .map(|(_, descriptor)| {
            (
                format!("{}-Jinja", descriptor.name),
                detection_cell(descriptor),
            )
        })
        .collect();
    rows.sort_by_key(|(name, _)| name.to_lowercase());

    for (name, detection) in rows {
        lines.push(format!("| {name} | {detection} |"));
    }
    lines.join("\n")
}

/// How an entry's detection tokens read in the README: suffixes match as
/// `.token.*`, filenames as `filename.*`.
fn detection_cell(descriptor: &LanguageDescriptor) -> String {
    if descriptor.suffixes.is_some() || descriptor.filenames.is_some() {
        let mut parts = Vec::new();
        if let Some(suffixes) = &descriptor.suffixes {
            let mut sorted: Vec<&String> = suffixes.iter().collect();
            sorted.sort();
            parts.extend(sorted.iter().map(|s| format!("`.{s}.*`")));
        }
        if let Some(filenames) = &descriptor.filenames {
            let mut sorted: Vec<&String> = filenames.iter().collect();
            sorted.sort();
            parts.extend(sorted.iter().map(|f| format!("`{f}.*`")));
        }
        return parts.join(", ");
    }
    let mut tokens = descriptor.detection_tokens();
    tokens.sort();
    tokens
        .iter()
        .map(|token| format!("`.{token}.*`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Replace the content between two markers, keeping the markers.
pub fn replace_marked_block(
    content: &str,
    start_marker: &str,
    end_marker: &str,
    replacement: &str,
) -> Result<String> {
    let start = content.find(start_marker);
    let end = content.find(end_marker);
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(format!(
            "{}\n\n{replacement}\n\n{}",
            &content[..start + start_marker.len()],
            &content[end..]
        )),
        _ => bail!("markers not found or invalid order: expected '{start_marker}' and '{end_marker}'"),
    }
}

/// Update the collapsible-section summary line with the generated count.
pub fn update_summary_count(content: &str, count: usize) -> Result<String> {
    let pattern =
        Regex::new(r"<summary>Click to expand the full list of \d+ supported languages</summary>")
            .expect("summary pattern is valid");
    if !pattern.is_match(content) {
        bail!("README summary line not found or has unexpected format");
    }
    Ok(pattern
        .replace(
            content,
            format!("<summary>Click to expand the full list of {count} supported languages</summary>"),
        )
        .into_owned())
}

pub fn render_mode_block(filter: &GenerateFilter) -> String {
    format!(
        "**Generated selection:** `{}`\n\nLiteral scope: {}",
        filter.label(),
        filter.scope()
    )
}

/// Join items as prose: "a", "a and b", "a, b, and c".
pub fn human_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} and {second}"),
        [head @ .., last] => format!("{}, and {last}", head.join(", ")),
    }
}

pub fn manifest_description(count: usize, categories: &[Source]) -> String {
    let source_phrase = if categories.is_empty() {
        "configured".to_string()
    } else {
        let labels: Vec<&str> = categories.iter().map(|source| source.as_str()).collect();
        let noun = if labels.len() == 1 {
            "category"
        } else {
            "categories"
        };
        format!("{} {noun}", human_list(&labels))
    };
    format!(
        "Jinja2 template support for {count} languages across Zed's {source_phrase} \
         (Python, YAML, TOML, Markdown, HTML, JS, SQL, and more)"
    )
}

/// Patch the `description` field of the extension manifest, preserving
/// formatting and every other field.
pub fn patch_manifest_description(content: &str, description: &str) -> Result<String> {
    let mut document: DocumentMut = content
        .parse()
        .context("extension.toml is not valid TOML")?;
    if !document.contains_key("description") {
        bail!("extension.toml has no description field to update");
    }
    document["description"] = toml_edit::value(description);
    Ok(document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(
        name: &str,
        source: Source,
        extensions: Option<&[&str]>,
        suffixes: Option<&[&str]>,
        filenames: Option<&[&str]>,
    ) -> LanguageDescriptor {
        let owned = |values: &[&str]| values.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        LanguageDescriptor {
            name: name.to_string(),
            zed_language: name.to_lowercase(),
            extensions: extensions.map(owned),
            suffixes: suffixes.map(owned),
            filenames: filenames.map(owned),
            source,
        }
    }

    #[test]
    fn substitute_handles_both_placeholder_forms() {
        assert_eq!(
            substitute("name = \"$name\" (${name})", &[("name", "YAML-Jinja")]),
            "name = \"YAML-Jinja\" (YAML-Jinja)"
        );
    }

    #[test]
    fn path_suffixes_cross_sorted_tokens_with_variants() {
        let tokens = vec!["yml".to_string(), "yaml".to_string()];
        assert_eq!(
            generated_path_suffixes(&tokens),
            vec![
                "yaml.jinja",
                "yaml.jinja2",
                "yaml.j2",
                "yml.jinja",
                "yml.jinja2",
                "yml.j2",
            ]
        );
    }

    #[test]
    fn language_config_quotes_every_suffix() {
        let rendered = render_language_config(
            "name = \"$name\"\npath_suffixes = [$suffixes]\n",
            "YAML-Jinja",
            &["yaml".to_string()],
        );
        assert_eq!(
            rendered,
            "name = \"YAML-Jinja\"\npath_suffixes = [\"yaml.jinja\", \"yaml.jinja2\", \"yaml.j2\"]\n"
        );
    }

    #[test]
    fn default_filter_excludes_extra_and_token_less_entries() {
        let filter = GenerateFilter::default();
        assert!(filter.includes(&descriptor("YAML", Source::Native, Some(&["yaml"]), None, None)));
        assert!(!filter.includes(&descriptor("RST", Source::Extra, Some(&["rst"]), None, None)));
        assert!(!filter.includes(&descriptor("Bare", Source::Native, None, None, None)));
    }

    #[test]
    fn all_filter_still_requires_detection_tokens() {
        let filter = GenerateFilter {
            all: true,
            ..Default::default()
        };
        assert!(filter.includes(&descriptor("RST", Source::Extra, Some(&["rst"]), None, None)));
        assert!(!filter.includes(&descriptor("Bare", Source::Extra, None, None, None)));
    }

    #[test]
    fn table_keeps_base_row_and_sorts_case_insensitively() {
        let mut registry = Registry::new();
        registry.insert(
            "zig".to_string(),
            descriptor("Zig", Source::Extension, Some(&["zig"]), None, None),
        );
        registry.insert(
            "ansible".to_string(),
            descriptor("ansible", Source::Extension, Some(&["yml"]), None, None),
        );
        let table = readme_table(&registry, &GenerateFilter::default());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[2], "| Jinja2 | `.html.*`, `.j2`, `.jinja`, `.jinja2` |");
        assert_eq!(lines[3], "| ansible-Jinja | `.yml.*` |");
        assert_eq!(lines[4], "| Zig-Jinja | `.zig.*` |");
    }

    #[test]
    fn detection_cell_prefers_suffixes_and_filenames() {
        let d = descriptor(
            "Dotenv",
            Source::Extra,
            Some(&["ignored"]),
            Some(&["env"]),
            Some(&["Dockerfile"]),
        );
        let table = {
            let mut registry = Registry::new();
            registry.insert("dotenv".to_string(), d);
            readme_table(
                &registry,
                &GenerateFilter {
                    all: true,
                    ..Default::default()
                },
            )
        };
        assert!(table.contains("| Dotenv-Jinja | `.env.*`, `Dockerfile.*` |"));
    }

    #[test]
    fn marked_block_replacement_keeps_markers() {
        let content = "a\n<!-- S -->\nold\n<!-- E -->\nb";
        let updated = replace_marked_block(content, "<!-- S -->", "<!-- E -->", "new").unwrap();
        assert_eq!(updated, "a\n<!-- S -->\n\nnew\n\n<!-- E -->\nb");
    }

    #[test]
    fn marked_block_replacement_rejects_missing_markers() {
        assert!(replace_marked_block("no markers", "<!-- S -->", "<!-- E -->", "x").is_err());
    }

    #[test]
    fn summary_count_is_rewritten() {
        let content = "<summary>Click to expand the full list of 3 supported languages</summary>";
        let updated = update_summary_count(content, 33).unwrap();
        assert!(updated.contains("list of 33 supported languages"));
        assert!(update_summary_count("no summary here", 1).is_err());
    }

    #[test]
    fn human_list_reads_naturally() {
        assert_eq!(human_list(&[]), "");
        assert_eq!(human_list(&["native"]), "native");
        assert_eq!(human_list(&["native", "extension"]), "native and extension");
        assert_eq!(
            human_list(&["native", "extension", "extra"]),
            "native, extension, and extra"
        );
    }

    #[test]
    fn manifest_description_names_the_categories() {
        let description = manifest_description(33, &[Source::Native, Source::Extension]);
        assert!(description.starts_with("Jinja2 template support for 33 languages"));
        assert!(description.contains("native and extension categories"));
        assert!(manifest_description(0, &[]).contains("across Zed's configured ("));
    }

    #[test]
    fn manifest_patch_preserves_other_fields() {
        let manifest = "id = \"jinja-universal\"\ndescription = \"old\"\n\n[grammars.jinja2]\nrepository = \"https://example.com\"\n";
        let patched = patch_manifest_description(manifest, "new text").unwrap();
        assert!(patched.contains("description = \"new text\""));
        assert!(patched.contains("[grammars.jinja2]"));
        assert!(patch_manifest_description("id = \"x\"\n", "y").is_err());
    }
}
