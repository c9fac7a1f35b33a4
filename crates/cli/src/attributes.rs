//! `idproxy attributes` subcommands.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use idproxy_core::attribute_map::{AttributeMap, SUBJECT_ATTRIBUTE};

use super::style;

/// Print every pair in the map.
pub fn run_list(map: &AttributeMap) -> Result<()> {
    println!();
    println!("{}", style::header("Attribute Map"));
    println!("{}", style::dim(&format!("name format: {}", map.identifier)));
    println!();

    if map.to.is_empty() {
        println!("No attribute mappings defined.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Local name", "External name"]);

    for (local, external) in &map.to {
        let local_cell = if local == SUBJECT_ATTRIBUTE {
            Cell::new(format!("{} (subject)", local)).fg(comfy_table::Color::Cyan)
        } else {
            Cell::new(local)
        };
        table.add_row(vec![local_cell, Cell::new(external)]);
    }

    println!("{}", table);
    println!();

    Ok(())
}

/// Look up one name. `reverse` looks up a local name instead of an external one.
pub fn run_lookup(map: &AttributeMap, name: &str, reverse: bool) -> Result<()> {
    let found = if reverse {
        map.to_external(name)
    } else {
        map.to_internal(name)
    };

    match found {
        Some(mapped) if reverse => {
            println!("Local name   : {}", name);
            println!("External name: {}", mapped);
        }
        Some(mapped) => {
            println!("External name: {}", name);
            println!("Local name   : {}", mapped);
        }
        None => {
            println!(
                "{}",
                style::warn(&format!("No mapping found for attribute '{}'", name))
            );
        }
    }

    Ok(())
}
