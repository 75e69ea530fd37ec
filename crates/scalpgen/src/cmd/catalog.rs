use serde::Serialize;

use scalpgen_frame::CATALOG;

use crate::cmd::CatalogArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct CommandOutput {
    code: u8,
    name: &'static str,
    keyword: &'static str,
    arity: String,
    fields: Vec<String>,
}

#[derive(Serialize)]
struct CatalogOutput {
    schema_id: &'static str,
    commands: Vec<CommandOutput>,
}

pub fn run(_args: CatalogArgs, format: OutputFormat) -> CliResult<i32> {
    let commands = CATALOG
        .iter()
        .map(|d| CommandOutput {
            code: d.code,
            name: d.name,
            keyword: d.keyword,
            arity: d.arity.to_string(),
            fields: d
                .fields
                .iter()
                .map(|f| {
                    if f.signed {
                        format!("{} (signed)", f.name)
                    } else {
                        f.name.to_string()
                    }
                })
                .collect(),
        })
        .collect();

    let out = CatalogOutput {
        schema_id: "scalpgen/cli/v1/command-catalog",
        commands,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CODE", "NAME", "KEYWORD", "ARGS", "FIELDS"]);
            for c in &out.commands {
                table.add_row(vec![
                    format!("0x{:02x}", c.code),
                    c.name.to_string(),
                    c.keyword.to_string(),
                    c.arity.clone(),
                    c.fields.join(", "),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for c in &out.commands {
                println!(
                    "0x{:02x} {:<18} {:<16} args={:<6} {}",
                    c.code,
                    c.name,
                    c.keyword,
                    c.arity,
                    c.fields.join(", ")
                );
            }
        }
        OutputFormat::Raw => {
            for c in &out.commands {
                println!("{:02x} {}", c.code, c.keyword);
            }
        }
    }
    Ok(SUCCESS)
}
