use casegate_eval::Retriever;

use super::{load_store, print_json};
use crate::{Globals, OutputFormat};

pub(crate) fn cmd_retrieve(globals: &Globals, description: &str, k: usize) {
    let store = load_store(globals);
    let retriever = Retriever::lexical(store);
    let hits = retriever.retrieve(description, k);

    match globals.output {
        OutputFormat::Json => {
            let cases: Vec<_> = hits
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "code": c.code,
                        "name": c.name,
                        "permitted_roles": c.permitted_roles,
                    })
                })
                .collect();
            print_json(&serde_json::json!({ "query": description, "k": k, "cases": cases }));
        }
        OutputFormat::Text => {
            if globals.quiet {
                return;
            }
            for (i, case) in hits.iter().enumerate() {
                println!(
                    "{}. {} ({}): {}",
                    i + 1,
                    case.code,
                    case.name,
                    case.roles_label()
                );
            }
        }
    }
}
