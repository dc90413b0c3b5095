//! `nw roles`: print the role catalog.

use comfy_table::{Table, presets::UTF8_FULL};

use nw_core::Role;

/// All dealable roles, catalog order.
const CATALOG: [Role; 5] = [
    Role::Godfather,
    Role::Mobster,
    Role::Doctor,
    Role::Detective,
    Role::Villager,
];

/// Print the catalog as a table.
pub fn run() -> Result<(), String> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Role", "Team", "Night ability", "Notes"]);
    for role in CATALOG {
        let ability = role
            .ability()
            .map_or_else(|| "none".to_string(), |a| a.to_string());
        table.add_row(vec![
            role.title().to_string(),
            role.team().to_string(),
            ability,
            role.blurb().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
