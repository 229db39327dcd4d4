//! lports CLI - inspect free, busy and owned ports on localhost.

mod cli;
mod display;

use clap::Parser;

use cli::{Cli, Command};
use display::{
    display_config, display_config_json, display_pid_addresses, display_pid_map_json,
    display_pid_ports, display_port, display_port_json, display_ports, display_ports_json,
    display_probe, display_probe_json, ProbeResult,
};
use localports::persistence::{load_settings, settings_path, with_settings_mut};
use localports::{
    parse_host, Candidates, Port, PortRange, PortReconciler, Result, Settings, SystemNetwork,
};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Probe { port, host, json } => cmd_probe(port, host.as_deref(), json),

        Command::Random { host, json } => cmd_random(host.as_deref(), json),

        Command::Busy { ports, range, json } => cmd_busy(ports, range, json),

        Command::Free { range, json } => cmd_free(range, json),

        Command::Min {
            ports,
            range,
            host,
            json,
        } => cmd_min(ports, range, host.as_deref(), json),

        Command::Pids { addresses, json } => cmd_pids(addresses, json),

        Command::Config {
            path,
            set_range,
            set_host,
            json,
        } => cmd_config(path, set_range, set_host, json),
    }
}

/// Builds a reconciler from saved settings, with an optional host override.
fn reconciler(settings: &Settings, host: Option<&str>) -> Result<PortReconciler<SystemNetwork>> {
    let reconciler = match host {
        Some(host) => PortReconciler::new(settings.network())
            .with_default_range(settings.default_range)
            .with_host(parse_host(host)?),
        None => settings.reconciler()?,
    };
    Ok(reconciler)
}

/// Turns positional ports or `--range` into a candidate set, if either was given.
fn candidates(ports: Vec<u16>, range: Option<PortRange>) -> Result<Option<Candidates>> {
    if let Some(range) = range {
        return Ok(Some(Candidates::from(range)));
    }
    if ports.is_empty() {
        return Ok(None);
    }
    Ok(Some(Candidates::from_ports(ports)?))
}

fn cmd_probe(port: Port, host: Option<&str>, json: bool) -> Result<()> {
    let settings = load_settings()?;
    let reconciler = reconciler(&settings, host)?;

    let result = ProbeResult {
        host: reconciler.host(),
        port,
        free: reconciler.is_port_free(port)?,
    };

    if json {
        display_probe_json(&result);
    } else {
        display_probe(&result);
    }
    Ok(())
}

fn cmd_random(host: Option<&str>, json: bool) -> Result<()> {
    let settings = load_settings()?;
    let port = reconciler(&settings, host)?.get_random_free_port()?;

    if json {
        display_port_json(port);
    } else {
        display_port(port);
    }
    Ok(())
}

fn cmd_busy(ports: Vec<u16>, range: Option<PortRange>, json: bool) -> Result<()> {
    let candidates = candidates(ports, range)?;
    let settings = load_settings()?;
    let reconciler = settings.reconciler()?;

    let busy = match candidates {
        Some(candidates) => reconciler.get_busy_ports(&candidates)?,
        None => reconciler.get_all_busy_ports()?,
    };

    if json {
        display_ports_json(&busy);
    } else {
        display_ports(&busy);
    }
    Ok(())
}

fn cmd_free(range: Option<PortRange>, json: bool) -> Result<()> {
    let settings = load_settings()?;
    let free = settings.reconciler()?.get_free_ports(range)?;

    if json {
        display_ports_json(&free);
    } else {
        display_ports(&free);
    }
    Ok(())
}

fn cmd_min(ports: Vec<u16>, range: Option<PortRange>, host: Option<&str>, json: bool) -> Result<()> {
    let candidates = candidates(ports, range)?;
    let settings = load_settings()?;
    let port = reconciler(&settings, host)?.get_minimum_free_port(candidates.as_ref())?;

    if json {
        display_port_json(port);
    } else {
        display_port(port);
    }
    Ok(())
}

fn cmd_pids(addresses: bool, json: bool) -> Result<()> {
    let settings = load_settings()?;
    let mapper = settings.mapper();

    if addresses {
        let map = mapper.get_pid_to_addresses()?;
        if json {
            display_pid_map_json(&map);
        } else {
            display_pid_addresses(&map);
        }
    } else {
        let map = mapper.get_pid_to_ports()?;
        if json {
            display_pid_map_json(&map);
        } else {
            display_pid_ports(&map);
        }
    }
    Ok(())
}

fn cmd_config(
    show_path: bool,
    set_range: Option<String>,
    set_host: Option<String>,
    json: bool,
) -> Result<()> {
    let path = settings_path()?;

    if set_range.is_some() || set_host.is_some() {
        let (range, host) = with_settings_mut(&path, |settings| {
            let range = set_range
                .as_deref()
                .map(|spec| settings.set_range(spec))
                .transpose()?;
            if let Some(host) = &set_host {
                settings.set_host(host)?;
            }
            Ok((range, set_host.is_some().then(|| settings.host.clone())))
        })?;

        if let Some(range) = range {
            println!("Set default range to {range}");
        }
        if let Some(host) = host {
            println!("Set host to {host}");
        }
        return Ok(());
    }

    let settings = load_settings()?;
    let shown_path = show_path.then_some(path.as_path());
    if json {
        display_config_json(&settings, shown_path);
    } else {
        display_config(&settings, shown_path);
    }
    Ok(())
}
