use anyhow::Result;
use std::process;

use recipebox_core::service::CatalogService;

use super::helpers::print_json;

pub(crate) fn cmd_likers(svc: &CatalogService, json: bool) -> Result<()> {
    print_names(&svc.likers()?, "No likers recorded yet", json)
}

pub(crate) fn cmd_tags(svc: &CatalogService, json: bool) -> Result<()> {
    print_names(&svc.tags()?, "No tags recorded yet", json)
}

fn print_names(names: &[String], empty_message: &str, json: bool) -> Result<()> {
    if names.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("{empty_message}");
        }
        process::exit(2);
    }

    if json {
        return print_json(names);
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
