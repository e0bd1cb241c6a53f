//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rollcall_core::{CandidateSet, PredicateSet, UserRecord};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn active_label(user: &UserRecord) -> String {
    match user.is_active {
        Some(true) => "yes".green().to_string(),
        Some(false) => "no".red().to_string(),
        None => "yes (unset)".dimmed().to_string(),
    }
}

/// One user as a vertical key/value table
pub fn user_detail(user: &UserRecord) -> Table {
    let mut table = create_table();
    table.add_row(vec!["Email".to_string(), user.email.clone()]);
    table.add_row(vec!["Phone".to_string(), or_dash(user.phone.as_ref())]);
    table.add_row(vec!["Name".to_string(), or_dash(user.name.as_deref())]);
    table.add_row(vec!["Role".to_string(), or_dash(user.role.as_deref())]);
    table.add_row(vec!["Assignment".to_string(), or_dash(user.assignment)]);
    table.add_row(vec!["Active".to_string(), active_label(user)]);
    table.add_row(vec!["Id".to_string(), user.id.to_string()]);
    table
}

/// Several users, one per row
pub fn user_table(users: &[UserRecord]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Email", "Phone", "Name", "Role", "Active", "Id"]);
    for user in users {
        table.add_row(vec![
            user.email.clone(),
            or_dash(user.phone.as_ref()),
            or_dash(user.name.as_deref()),
            or_dash(user.role.as_deref()),
            active_label(user),
            user.id.to_string(),
        ]);
    }
    table
}

/// Candidates and predicates derived from an identifier
pub fn plan_table(candidates: &CandidateSet, predicates: &PredicateSet) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Candidates", "Predicates"]);
    let candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    let predicates: Vec<String> = predicates.iter().map(|p| p.to_string()).collect();
    table.add_row(vec![candidates.join("\n"), predicates.join("\n")]);
    table
}
