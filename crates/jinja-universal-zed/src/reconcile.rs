//! Reconciliation of the local registry against what Zed reports.
//!
//! Reconciliation is split into a pure planning step and an apply step so
//! the sync command can print exactly what will change before touching the
//! registry. Three kinds of change exist: source transitions (a language
//! moved between native, extension and extra), detection backfills (a
//! token-less entry adopts upstream extensions), and additions (upstream
//! languages missing from the registry).

use crate::LanguageInfo;
use jinja_universal_registry::{LanguageDescriptor, Registry, Source};
use std::collections::{BTreeMap, BTreeSet};

/// Which upstream languages `--add` may introduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMode {
    None,
    All,
    NativeOnly,
    ExtensionOnly,
}

impl AddMode {
    fn admits(self, source: Source) -> bool {
        match self {
            AddMode::None => false,
            AddMode::All => true,
            AddMode::NativeOnly => source == Source::Native,
            AddMode::ExtensionOnly => source == Source::Extension,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: String,
    pub from: Source,
    pub to: Source,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Backfill {
    pub id: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Addition {
    pub id: String,
    pub descriptor: LanguageDescriptor,
    /// True when the upstream entry carried no detection tokens; the new
    /// registry entry needs a human to fill them in.
    pub needs_review: bool,
}

/// Everything a sync run would change, computed without mutating anything.
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub transitions: Vec<Transition>,
    pub backfills: Vec<Backfill>,
    pub additions: Vec<Addition>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.backfills.is_empty() && self.additions.is_empty()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ApplyStats {
    pub updated: usize,
    pub backfilled: usize,
    pub added: usize,
}

/// Upstream languages keyed by Zed language slug. When a slug appears
/// both natively and in an extension the native record wins.
pub fn remote_by_language(
    native: &[LanguageInfo],
    extension: &[LanguageInfo],
) -> BTreeMap<String, LanguageInfo> {
    let mut map: BTreeMap<String, LanguageInfo> = BTreeMap::new();
    for lang in native.iter().chain(extension) {
        if lang.source == Source::Native || !map.contains_key(&lang.zed_language) {
            map.insert(lang.zed_language.clone(), lang.clone());
        }
    }
    map
}

/// Source tier for a Zed language slug. Native membership wins over
/// extension membership; absence from both means locally maintained.
pub fn classify_source(
    zed_language: &str,
    native_ids: &BTreeSet<String>,
    ext_ids: &BTreeSet<String>,
) -> Source {
    if native_ids.contains(zed_language) {
        Source::Native
    } else if ext_ids.contains(zed_language) {
        Source::Extension
    } else {
        Source::Extra
    }
}

/// Compute the full reconciliation plan for a registry.
pub fn plan(
    registry: &Registry,
    native_ids: &BTreeSet<String>,
    ext_ids: &BTreeSet<String>,
    remote: &BTreeMap<String, LanguageInfo>,
    add_mode: AddMode,
) -> SyncPlan {
    let mut plan = SyncPlan::default();

    for (id, descriptor) in registry.iter() {
        let target = classify_source(&descriptor.zed_language, native_ids, ext_ids);
        if descriptor.source != target {
            plan.transitions.push(Transition {
                id: id.to_string(),
                from: descriptor.source,
                to: target,
            });
        }

        if !descriptor.has_detection_tokens() {
            if let Some(upstream) = remote.get(&descriptor.zed_language) {
                if !upstream.extensions.is_empty() {
                    plan.backfills.push(Backfill {
                        id: id.to_string(),
                        extensions: upstream.extensions.clone(),
                    });
                }
            }
        }
    }

    if add_mode != AddMode::None {
        let known: BTreeSet<&str> = registry
            .iter()
            .map(|(_, descriptor)| descriptor.zed_language.as_str())
            .collect();
        for upstream in remote.values() {
            if !add_mode.admits(upstream.source) {
                continue;
            }
            if known.contains(upstream.zed_language.as_str()) {
                continue;
            }
            plan.additions.push(Addition {
                id: upstream.id.clone(),
                descriptor: LanguageDescriptor {
                    name: upstream.name.clone(),
                    zed_language: upstream.zed_language.clone(),
                    extensions: Some(upstream.extensions.clone()),
                    suffixes: None,
                    filenames: None,
                    source: upstream.source,
                },
                needs_review: upstream.extensions.is_empty(),
            });
        }
    }

    plan
}

/// Apply a plan to the registry. Backfills re-check that the entry is
/// still token-less so a stale plan cannot clobber hand-added detections.
pub fn apply(registry: &mut Registry, plan: &SyncPlan) -> ApplyStats {
    let mut stats = ApplyStats::default();

    for transition in &plan.transitions {
        if let Some(descriptor) = registry.get_mut(&transition.id) {
            if descriptor.source != transition.to {
                descriptor.source = transition.to;
                stats.updated += 1;
            }
        }
    }

    for backfill in &plan.backfills {
        if let Some(descriptor) = registry.get_mut(&backfill.id) {
            if !descriptor.has_detection_tokens() {
                descriptor.extensions = Some(backfill.extensions.clone());
                stats.backfilled += 1;
            }
        }
    }

    for addition in &plan.additions {
        if !registry.contains_id(&addition.id) {
            registry.insert(addition.id.clone(), addition.descriptor.clone());
            stats.added += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(id: &str, source: Source, extensions: &[&str]) -> LanguageInfo {
        LanguageInfo {
            id: id.to_string(),
            name: id.to_uppercase(),
            zed_language: id.to_string(),
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            source,
            grammar_signature: String::new(),
        }
    }

    fn descriptor(zed_language: &str, source: Source) -> LanguageDescriptor {
        LanguageDescriptor {
            name: zed_language.to_uppercase(),
            zed_language: zed_language.to_string(),
            extensions: Some(vec![zed_language.to_string()]),
            suffixes: None,
            filenames: None,
            source,
        }
    }

    fn ids(slugs: &[&str]) -> BTreeSet<String> {
        slugs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn promotion_to_native_is_a_single_transition() {
        let mut registry = Registry::new();
        registry.insert("yaml".to_string(), descriptor("yaml", Source::Extra));

        let native = ids(&["yaml"]);
        let plan = plan(
            &registry,
            &native,
            &BTreeSet::new(),
            &BTreeMap::new(),
            AddMode::None,
        );
        assert_eq!(plan.transitions.len(), 1);
        assert_eq!(plan.transitions[0].from, Source::Extra);
        assert_eq!(plan.transitions[0].to, Source::Native);

        let stats = apply(&mut registry, &plan);
        assert_eq!(stats.updated, 1);
        assert_eq!(registry.get("yaml").unwrap().source, Source::Native);

        // A second pass over the reconciled registry is a no-op.
        let again = super::plan(
            &registry,
            &native,
            &BTreeSet::new(),
            &BTreeMap::new(),
            AddMode::None,
        );
        assert!(again.is_empty());
    }

    #[test]
    fn native_membership_wins_over_extension_membership() {
        let mut registry = Registry::new();
        registry.insert("toml".to_string(), descriptor("toml", Source::Extension));

        let plan = plan(
            &registry,
            &ids(&["toml"]),
            &ids(&["toml"]),
            &BTreeMap::new(),
            AddMode::None,
        );
        assert_eq!(plan.transitions.len(), 1);
        assert_eq!(plan.transitions[0].to, Source::Native);
    }

    #[test]
    fn demotion_to_extra_when_upstream_drops_a_language() {
        let mut registry = Registry::new();
        registry.insert("rst".to_string(), descriptor("rst", Source::Extension));

        let plan = plan(
            &registry,
            &BTreeSet::new(),
            &BTreeSet::new(),
            &BTreeMap::new(),
            AddMode::None,
        );
        assert_eq!(plan.transitions[0].to, Source::Extra);
    }

    #[test]
    fn backfill_only_touches_token_less_entries() {
        let mut registry = Registry::new();
        let mut bare = descriptor("nu", Source::Extension);
        bare.extensions = None;
        registry.insert("nu".to_string(), bare);
        registry.insert("yaml".to_string(), descriptor("yaml", Source::Native));

        let mut remote = BTreeMap::new();
        remote.insert("nu".to_string(), upstream("nu", Source::Extension, &["nu"]));
        remote.insert(
            "yaml".to_string(),
            upstream("yaml", Source::Native, &["yml"]),
        );

        let plan = plan(
            &registry,
            &ids(&["yaml"]),
            &ids(&["nu"]),
            &remote,
            AddMode::None,
        );
        assert_eq!(plan.backfills.len(), 1);
        assert_eq!(plan.backfills[0].id, "nu");

        let stats = apply(&mut registry, &plan);
        assert_eq!(stats.backfilled, 1);
        assert_eq!(
            registry.get("nu").unwrap().extensions,
            Some(vec!["nu".to_string()])
        );
        // yaml keeps its own tokens.
        assert_eq!(
            registry.get("yaml").unwrap().extensions,
            Some(vec!["yaml".to_string()])
        );
    }

    #[test]
    fn additions_respect_the_mode_filter() {
        let registry = Registry::new();
        let mut remote = BTreeMap::new();
        remote.insert(
            "zig".to_string(),
            upstream("zig", Source::Extension, &["zig"]),
        );
        remote.insert("rust".to_string(), upstream("rust", Source::Native, &["rs"]));

        let native_only = plan(
            &registry,
            &ids(&["rust"]),
            &ids(&["zig"]),
            &remote,
            AddMode::NativeOnly,
        );
        assert_eq!(native_only.additions.len(), 1);
        assert_eq!(native_only.additions[0].id, "rust");

        let all = plan(
            &registry,
            &ids(&["rust"]),
            &ids(&["zig"]),
            &remote,
            AddMode::All,
        );
        assert_eq!(all.additions.len(), 2);
        assert!(!all.additions[0].needs_review);
    }

    #[test]
    fn additions_skip_languages_already_tracked_under_another_id() {
        let mut registry = Registry::new();
        // Registry id differs from the upstream id but tracks the same slug.
        let mut tracked = descriptor("c++", Source::Native);
        tracked.zed_language = "c++".to_string();
        registry.insert("cpp".to_string(), tracked);

        let mut remote = BTreeMap::new();
        remote.insert("c++".to_string(), upstream("c++", Source::Native, &["cpp"]));

        let plan = plan(
            &registry,
            &ids(&["c++"]),
            &BTreeSet::new(),
            &remote,
            AddMode::All,
        );
        assert!(plan.additions.is_empty());
    }

    #[test]
    fn token_less_additions_are_flagged_for_review() {
        let registry = Registry::new();
        let mut remote = BTreeMap::new();
        remote.insert("gleam".to_string(), upstream("gleam", Source::Extension, &[]));

        let plan = plan(
            &registry,
            &BTreeSet::new(),
            &ids(&["gleam"]),
            &remote,
            AddMode::All,
        );
        assert_eq!(plan.additions.len(), 1);
        assert!(plan.additions[0].needs_review);
    }

    #[test]
    fn remote_map_prefers_native_on_slug_collision() {
        let native = vec![upstream("html", Source::Native, &["html"])];
        let extension = vec![upstream("html", Source::Extension, &["htm"])];
        let map = remote_by_language(&native, &extension);
        assert_eq!(map.len(), 1);
        assert_eq!(map["html"].source, Source::Native);

        // Order of arrival does not matter.
        let map = remote_by_language(&[], &extension);
        assert_eq!(map["html"].source, Source::Extension);
    }
}
