use std::io::{self, Write};

use estimate_tool::analysis::analysis_payload;
use estimate_tool::persistence::{
    load_estimate_from_json, save_estimate_to_json, save_line_items_to_csv,
};
use estimate_tool::{
    ContractType, CostCategory, CostNode, EstimateSettings, EstimateWorkspace,
    NodeEdit, NodeId, RiskLevel, ViewMode,
};
use polars::prelude::{AnyValue, DataFrame};
use tracing_subscriber::EnvFilter;

fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::Float64(v) => format!("{v:.2}"),
        other => other.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row = columns
            .iter()
            .map(|col| col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default())
            .collect();
        cells.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |row: &[String]| {
        let mut line = String::from("|");
        for (ci, cell) in row.iter().enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names[..]));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(&row[..]));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_tree(nodes: &[CostNode], depth: usize, out: &mut String) {
    for node in nodes {
        let marker = match node.children() {
            Some(_) if node.expanded => "-",
            Some(_) => "+",
            None => " ",
        };
        out.push_str(&format!(
            "{marker} {indent}{wbs:<8} {desc:<32} {cat:<13} {total:>12.2}  [{id}]\n",
            indent = "  ".repeat(depth),
            wbs = node.wbs_code,
            desc = node.description,
            cat = node.category.as_str(),
            total = node.total,
            id = node.id,
        ));
        if let Some(children) = node.children() {
            if node.expanded {
                render_tree(children, depth + 1, out);
            }
        }
    }
}

fn show(workspace: &EstimateWorkspace) {
    let mut out = String::new();
    render_tree(&workspace.display_items(), 0, &mut out);
    println!(
        "{} ({} view)\n{}Total: {:.2} {}",
        workspace.metadata().project_name,
        workspace.mode(),
        out,
        workspace.grand_total(),
        workspace.metadata().currency
    );
}

/// Accepts either a node id or a WBS code from the active view.
fn resolve(workspace: &EstimateWorkspace, token: &str) -> Option<NodeId> {
    fn by_wbs(nodes: &[CostNode], code: &str) -> Option<NodeId> {
        for node in nodes {
            if node.wbs_code == code {
                return Some(node.id.clone());
            }
            if let Some(found) = node.children().and_then(|c| by_wbs(c, code)) {
                return Some(found);
            }
        }
        None
    }

    by_wbs(&workspace.display_items(), token)
        .or_else(|| workspace.find(&NodeId::from(token)).map(|n| n.id.clone()))
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok()
}

fn parse_edit(field: &str, value: &str) -> Result<NodeEdit, String> {
    let amount = || parse_amount(value).ok_or_else(|| format!("Invalid number '{value}'"));
    let optional = || (!value.is_empty() && value != "-").then(|| value.to_string());
    match field {
        "desc" | "description" => Ok(NodeEdit::SetDescription(value.to_string())),
        "qty" | "quantity" => Ok(NodeEdit::SetQuantity(amount()?)),
        "unit" => Ok(NodeEdit::SetUnit(value.to_string())),
        "price" | "unit_price" => Ok(NodeEdit::SetUnitPrice(amount()?)),
        "category" => CostCategory::from_str(value)
            .map(NodeEdit::SetCategory)
            .ok_or_else(|| format!("Unknown category '{value}'")),
        "contract" => match optional() {
            None => Ok(NodeEdit::SetContractType(None)),
            Some(raw) => ContractType::from_str(&raw)
                .map(|tag| NodeEdit::SetContractType(Some(tag)))
                .ok_or_else(|| format!("Unknown contract type '{raw}'")),
        },
        "risk" => match optional() {
            None => Ok(NodeEdit::SetRiskLevel(None)),
            Some(raw) => RiskLevel::from_str(&raw)
                .map(|tag| NodeEdit::SetRiskLevel(Some(tag)))
                .ok_or_else(|| format!("Unknown risk level '{raw}'")),
        },
        "notes" => Ok(NodeEdit::SetNotes(optional())),
        "duration" => Ok(NodeEdit::SetDuration(amount()?)),
        "hours" => Ok(NodeEdit::SetHoursPerDay(amount()?)),
        other => Err(format!("Unknown field '{other}'")),
    }
}

fn print_detail(workspace: &mut EstimateWorkspace, id: &NodeId) {
    let Some(draft) = workspace.open_detail(id) else {
        println!("Item {id} is not a terminal item.");
        return;
    };
    println!(
        "Duration {} d x {} h/d = {:.2} crew hours, daily output {:.2}",
        draft.duration(),
        draft.hours_per_day(),
        draft.crew_hours(),
        draft.daily_output()
    );
    for line in draft.resources() {
        println!(
            "  {:<13} {:<24} {:>8.2} {:<4} @ {:>9.2} = {:>11.2}",
            line.category.as_str(),
            line.description,
            line.quantity,
            line.unit,
            line.unit_price,
            line.total
        );
    }
    println!("Detail total: {:.2}", draft.total());
}

fn detail_command(workspace: &mut EstimateWorkspace, id: &NodeId, args: &[&str]) {
    let Some(mut draft) = workspace.open_detail(id) else {
        println!("Item {id} is not a terminal item.");
        return;
    };
    let result = match args {
        ["schedule", days, hours] => match (parse_amount(days), parse_amount(hours)) {
            (Some(days), Some(hours)) => draft
                .set_duration(days)
                .and_then(|_| draft.set_hours_per_day(hours))
                .map_err(|e| e.to_string()),
            _ => Err("Usage: detail <item> schedule <days> <hours_per_day>".to_string()),
        },
        ["add", category, rest @ ..] => match CostCategory::from_str(category) {
            Some(category) => {
                let line = draft.add_resource(category, workspace.catalog());
                match rest.first() {
                    Some(rate_id) if !draft.select_from_catalog(&line, workspace.catalog(), rate_id) => {
                        Err(format!("Unknown rate '{rate_id}'"))
                    }
                    _ => Ok(()),
                }
            }
            None => Err(format!("Unknown category '{category}'")),
        },
        _ => Err("Usage: detail <item> [schedule <days> <hours> | add <category> [rate_id]]".into()),
    };
    match result {
        Ok(()) => match workspace.save_draft(&mut draft) {
            Ok(_) => print_detail(workspace, id),
            Err(e) => println!("Error: {e}"),
        },
        Err(message) => println!("{message}"),
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show the estimate in the active view\n  mode <standard|contract|risk|category>\n                                     Switch view mode\n  add-root                           Append a new scope item\n  add <item>                         Append a sub-item under <item>\n  delete <item>                      Delete an item and everything below it\n  set <item> <field> <value...>      Edit desc|qty|unit|price|category|contract|risk|notes|duration|hours\n  toggle <item>                      Expand or collapse a group\n  detail <item> [schedule <days> <hours> | add <category> [rate_id]]\n                                     Show or edit the resource breakdown\n  total                              Print the grand total\n  summary                            Print the analysis payload\n  breakdown                          Line items, category totals and top cost drivers\n  catalog [labor|equipment] [term]   List or search rates\n  save <path> | load <path>          JSON snapshot\n  export <path>                      CSV export of line items\n  quit|exit                          Exit\n<item> is a WBS code from the current view or an item id."
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let settings = EstimateSettings::from_env();
    let mut workspace = EstimateWorkspace::from_settings(settings);

    println!("Estimate Tool (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts[0];
        let args = &parts[1..];

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => show(&workspace),
            "mode" => match args.first().and_then(|raw| ViewMode::from_str(raw)) {
                Some(mode) => {
                    workspace.set_mode(mode);
                    println!("View mode: {mode}");
                }
                None => println!("Usage: mode <standard|contract|risk|category>"),
            },
            "add-root" => match workspace.add_root() {
                Ok(id) => {
                    let wbs = workspace.find(&id).map(|n| n.wbs_code.clone()).unwrap_or_default();
                    println!("Added scope item {wbs}.");
                }
                Err(e) => println!("Error: {e}"),
            },
            "add" => {
                let Some(parent) = args.first().and_then(|t| resolve(&workspace, t)) else {
                    println!("Usage: add <item>");
                    continue;
                };
                match workspace.add_child(&parent) {
                    Ok(Some(id)) => {
                        let wbs = workspace.find(&id).map(|n| n.wbs_code.clone()).unwrap_or_default();
                        println!("Added sub-item {wbs}.");
                    }
                    Ok(None) => println!("Item not found."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "delete" => {
                let Some(token) = args.first() else {
                    println!("Usage: delete <item>");
                    continue;
                };
                let Some(id) = resolve(&workspace, token) else {
                    println!("Item {token} not found.");
                    continue;
                };
                match workspace.delete(&id) {
                    Ok(true) => println!("Deleted item {token}."),
                    Ok(false) => println!("Item {token} not found."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "set" => {
                if args.len() < 2 {
                    println!("Usage: set <item> <field> <value...>");
                    continue;
                }
                let Some(id) = resolve(&workspace, args[0]) else {
                    println!("Item {} not found.", args[0]);
                    continue;
                };
                let value = args[2..].join(" ");
                match parse_edit(args[1], &value) {
                    Ok(edit) => match workspace.update_field(&id, edit) {
                        Ok(true) => println!("Updated {}. Total: {:.2}", args[0], workspace.grand_total()),
                        Ok(false) => println!("Item {} cannot be edited in this view.", args[0]),
                        Err(e) => println!("Error: {e}"),
                    },
                    Err(message) => println!("{message}"),
                }
            }
            "toggle" => match args.first().and_then(|t| resolve(&workspace, t)) {
                Some(id) if workspace.toggle_expand(&id) => show(&workspace),
                Some(_) => println!("Expansion is fixed in the {} view.", workspace.mode()),
                None => println!("Usage: toggle <item>"),
            },
            "detail" => match args.first().and_then(|t| resolve(&workspace, t)) {
                Some(id) if args.len() == 1 => print_detail(&mut workspace, &id),
                Some(id) => detail_command(&mut workspace, &id, &args[1..]),
                None => println!("Usage: detail <item> ..."),
            },
            "total" => println!(
                "Total: {:.2} {}",
                workspace.grand_total(),
                workspace.metadata().currency
            ),
            "summary" => println!("{}", analysis_payload(workspace.items())),
            "breakdown" => {
                match workspace.line_items_frame() {
                    Ok(df) => println!("{}", render_df_as_text_table(&df)),
                    Err(e) => println!("Error: {e}"),
                }
                match workspace.category_breakdown() {
                    Ok(shares) => {
                        for share in shares {
                            println!(
                                "{:<13} {:>12.2} {:>6.1}% ({} items)",
                                share.category.as_str(),
                                share.total,
                                share.share,
                                share.items
                            );
                        }
                    }
                    Err(e) => println!("Error: {e}"),
                }
                if let Ok(drivers) = workspace.top_cost_items() {
                    println!("Top cost drivers:");
                    for driver in drivers {
                        println!("  {:<8} {:<32} {:>12.2}", driver.wbs_code, driver.description, driver.total);
                    }
                }
            }
            "catalog" => {
                let category = args.first().and_then(|raw| CostCategory::from_str(raw));
                let term = (if category.is_some() { args.get(1..) } else { Some(args) })
                    .map(|rest| rest.join(" "))
                    .unwrap_or_default();
                let categories = match category {
                    Some(category) => vec![category],
                    None => vec![CostCategory::Labor, CostCategory::Equipment],
                };
                for category in categories {
                    for entry in workspace.catalog().search(category, &term) {
                        println!(
                            "{:<6} {:<24} {:>8.2}/{}",
                            entry.id, entry.name, entry.rate, entry.unit
                        );
                    }
                }
            }
            "save" => match args.first() {
                Some(path) => match save_estimate_to_json(&workspace, path) {
                    Ok(()) => println!("Estimate saved to {path}."),
                    Err(e) => println!("Save error: {e}"),
                },
                None => println!("Usage: save <path>"),
            },
            "load" => match args.first() {
                Some(path) => match load_estimate_from_json(&mut workspace, path) {
                    Ok(()) => {
                        println!("Estimate loaded from {path}.");
                        show(&workspace);
                    }
                    Err(e) => println!("Load error: {e}"),
                },
                None => println!("Usage: load <path>"),
            },
            "export" => match args.first() {
                Some(path) => match save_line_items_to_csv(&workspace, path) {
                    Ok(()) => println!("Line items exported to {path}."),
                    Err(e) => println!("Export error: {e}"),
                },
                None => println!("Usage: export <path>"),
            },
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }
}
