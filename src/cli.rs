//! CLI command definitions using clap.

use clap::{Parser, Subcommand};

use localports::{Port, PortRange};

/// lports - query free, busy and owned ports on localhost.
#[derive(Parser, Debug)]
#[command(name = "lports")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether a port can be bound right now.
    #[command(visible_alias = "p")]
    Probe {
        /// Port to probe (1-65535)
        port: Port,

        /// Host to bind on (default from config, usually localhost)
        #[arg(long)]
        host: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print a free ephemeral port chosen by the OS.
    #[command(visible_alias = "r")]
    Random {
        /// Host to bind on (default from config, usually localhost)
        #[arg(long)]
        host: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List busy localhost ports.
    ///
    /// Without ports or a range, lists every busy localhost port.
    #[command(visible_alias = "b")]
    Busy {
        /// Candidate ports to check
        ports: Vec<u16>,

        /// Candidate range (format: start-end, e.g. 8000-8999)
        #[arg(long, short = 'r', conflicts_with = "ports")]
        range: Option<PortRange>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List free ports in a range.
    #[command(visible_alias = "f")]
    Free {
        /// Range to scan (default from config)
        #[arg(long, short = 'r')]
        range: Option<PortRange>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print the smallest port that binds right now.
    #[command(visible_alias = "m")]
    Min {
        /// Candidate ports to try
        ports: Vec<u16>,

        /// Candidate range (default from config)
        #[arg(long, short = 'r', conflicts_with = "ports")]
        range: Option<PortRange>,

        /// Host to bind on (default from config, usually localhost)
        #[arg(long)]
        host: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show which processes hold which localhost ports.
    #[command(visible_alias = "ps")]
    Pids {
        /// Show ip:port addresses instead of bare ports
        #[arg(long, short = 'a')]
        addresses: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show or edit configuration.
    #[command(visible_alias = "c")]
    Config {
        /// Show the config file path
        #[arg(long)]
        path: bool,

        /// Set the default range (format: start-end, e.g. "1024-49151")
        #[arg(long)]
        set_range: Option<String>,

        /// Set the default host (localhost or an IP address)
        #[arg(long)]
        set_host: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
