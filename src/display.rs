//! Output formatting and display utilities.

use std::net::IpAddr;
use std::path::Path;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table, TableComponent};
use serde::Serialize;

use localports::{Owner, PidAddressMap, PidPortMap, Port, Settings};

/// Creates a table with clean styling: solid borders, no row separators.
fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    // Use solid vertical bars instead of dotted
    table.set_style(TableComponent::VerticalLines, '│');
    // Use single-line header separator instead of double
    table.set_style(TableComponent::MiddleHeaderIntersections, '┼');
    table.set_style(TableComponent::HeaderLines, '─');
    table.set_style(TableComponent::LeftHeaderIntersection, '├');
    table.set_style(TableComponent::RightHeaderIntersection, '┤');
    table
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_string_pretty(value).expect("Failed to serialize to JSON");
    println!("{json}");
}

fn owner_cell(owner: &Owner) -> Cell {
    match owner {
        Owner::Pid(pid) => Cell::new(pid),
        Owner::Unknown => Cell::new("unknown").fg(Color::DarkGrey),
    }
}

/// Probe result for JSON output.
#[derive(Debug, Serialize)]
pub struct ProbeResult {
    pub host: IpAddr,
    pub port: Port,
    pub free: bool,
}

/// Displays a single probe result as `free` or `busy`.
pub fn display_probe(result: &ProbeResult) {
    println!("{}", if result.free { "free" } else { "busy" });
}

pub fn display_probe_json(result: &ProbeResult) {
    print_json(result);
}

/// Displays a single port number.
pub fn display_port(port: Port) {
    println!("{port}");
}

pub fn display_port_json(port: Port) {
    print_json(&port);
}

/// Displays a port list, one per line.
pub fn display_ports(ports: &[Port]) {
    for port in ports {
        println!("{port}");
    }
}

/// Displays a port list as a JSON array.
pub fn display_ports_json(ports: &[Port]) {
    print_json(ports);
}

/// Displays the PID to ports table.
pub fn display_pid_ports(map: &PidPortMap) {
    if map.is_empty() {
        println!("No localhost sockets detected.");
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["PID", "PORTS"]);

    for (owner, ports) in map {
        let ports: Vec<String> = ports.iter().map(Port::to_string).collect();
        table.add_row(vec![owner_cell(owner), Cell::new(ports.join(", "))]);
    }

    println!("{table}");
}

/// Displays the PID to addresses table.
pub fn display_pid_addresses(map: &PidAddressMap) {
    if map.is_empty() {
        println!("No localhost sockets detected.");
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["PID", "ADDRESSES"]);

    for (owner, addresses) in map {
        table.add_row(vec![owner_cell(owner), Cell::new(addresses.join("\n"))]);
    }

    println!("{table}");
}

/// Displays an ownership map as a JSON object keyed by PID.
pub fn display_pid_map_json<V: Serialize>(map: &std::collections::BTreeMap<Owner, V>) {
    print_json(map);
}

/// Configuration info for JSON output.
#[derive(Debug, Serialize)]
pub struct ConfigInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
    #[serde(flatten)]
    pub settings: &'a Settings,
}

/// Displays configuration information.
pub fn display_config(settings: &Settings, path: Option<&Path>) {
    if let Some(p) = path {
        println!("Config file: {}", p.display());
        println!();
    }

    let mut table = create_table();
    table.set_header(vec!["SETTING", "VALUE"]);
    table.add_row(vec![
        Cell::new("default_range"),
        Cell::new(settings.default_range),
    ]);
    table.add_row(vec![Cell::new("host"), Cell::new(&settings.host)]);
    table.add_row(vec![
        Cell::new("table_timeout_ms"),
        Cell::new(settings.table_timeout_ms),
    ]);

    println!("{table}");
}

/// Displays configuration as JSON.
pub fn display_config_json(settings: &Settings, path: Option<&Path>) {
    let config = ConfigInfo {
        config_file: path.map(|p| p.display().to_string()),
        settings,
    };
    print_json(&config);
}
