use casegate_core::{join_labels, Function, RuleStore};

use super::{fail, load_store, print_json};
use crate::{Globals, OutputFormat};

pub(crate) fn cmd_rules(globals: &Globals, code: Option<&str>) {
    let store = load_store(globals);
    match code {
        None => print_stats(&store, globals),
        Some(code) => print_case(&store, code.trim(), globals),
    }
}

fn print_stats(store: &RuleStore, globals: &Globals) {
    let stats = store.stats();
    match globals.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "stats": stats,
            "codes": store.codes().collect::<Vec<_>>(),
            "rules_digest": store.digest(),
        })),
        OutputFormat::Text => {
            if globals.quiet {
                return;
            }
            println!(
                "{} cases ({} strict, {} permissive), {} rules",
                stats.total_cases, stats.strict_cases, stats.permissive_cases, stats.total_rules
            );
            println!("semantic roles covered: {}", stats.semantic_roles_covered);
            for (kind, count) in &stats.rules_by_kind {
                println!("  {:<17} {}", kind, count);
            }
            println!("cases: {}", join_labels(store.codes()));
            println!("digest: {}", store.digest());
        }
    }
}

fn print_case(store: &RuleStore, code: &str, globals: &Globals) {
    let case = match store.get_case(code) {
        Some(c) => c,
        None => {
            let msg = format!(
                "unknown case '{}'; known cases: {}",
                code,
                join_labels(store.codes())
            );
            fail(globals, &msg);
        }
    };
    let rules = store.rules_for(&case.code);

    match globals.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "case": case,
            "rules": rules,
        })),
        OutputFormat::Text => {
            if globals.quiet {
                return;
            }
            println!("{} ({})", case.code, case.name);
            println!("  {}", case.description);
            println!("  roles: {}", case.roles_label());
            if let Some(citation) = &case.citation {
                println!("  citation: {}", citation);
            }
            if case.is_strict() {
                println!(
                    "  functions: {}",
                    join_labels(case.allowed_functions.iter().map(Function::as_str))
                );
            }
            for w in &case.why_not_alternatives {
                println!("  not {}: {}", w.other_case, w.distinction);
            }
            for m in &case.common_mistakes {
                println!("  mistake: {}", m);
            }
            for r in rules {
                println!(
                    "  rule {} [{}] {}: {}",
                    r.id,
                    r.kind,
                    join_labels(r.cases.iter().map(String::as_str)),
                    r.detail
                );
            }
        }
    }
}
