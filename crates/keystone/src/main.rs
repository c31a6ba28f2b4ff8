// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keystone - a workload identity trust server.
//!
//! This is the binary entry point for the server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use keystone_catalog::BuiltInRegistry;
use keystone_core::PluginKind;

/// Keystone - a workload identity trust server.
#[derive(Parser, Debug)]
#[command(name = "keystone", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the plugin catalog and serve until interrupted.
    Run {
        /// Path to the server configuration file.
        #[arg(short, long, default_value = "keystone.toml")]
        config: PathBuf,
    },
    /// Check a configuration file without starting the server.
    Validate {
        #[arg(short, long, default_value = "keystone.toml")]
        config: PathBuf,
    },
    /// List the plugins compiled into this binary.
    Plugins,
}

fn load_config(path: &std::path::Path) -> Option<keystone_config::KeystoneConfig> {
    match keystone_config::load_and_validate(path) {
        Ok(config) => Some(config),
        Err(errors) => {
            keystone_config::render_errors(&errors);
            None
        }
    }
}

fn list_plugins() {
    println!("{:<18} {:<12} DESCRIPTION", "KIND", "NAME");
    println!(
        "{:<18} {:<12} SQLite datastore (built in, not loadable)",
        PluginKind::DataStore,
        keystone_datastore::SQL_PLUGIN_NAME
    );
    let registry: BuiltInRegistry = keystone_plugins::builtins().into_iter().collect();
    for builtin in registry.list_all() {
        println!(
            "{:<18} {:<12} {}",
            builtin.kind(),
            builtin.name,
            builtin.description
        );
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let Some(config) = load_config(&config) else {
                return ExitCode::FAILURE;
            };
            match serve::run_server(config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("keystone: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Validate { config: path } => match load_config(&path) {
            Some(config) => {
                let plugins: usize = config.plugins.values().map(|entries| entries.len()).sum();
                println!(
                    "{}: ok (trust_domain={}, {plugins} plugin entries)",
                    path.display(),
                    config.server.trust_domain
                );
                ExitCode::SUCCESS
            }
            None => ExitCode::FAILURE,
        },
        Commands::Plugins => {
            list_plugins();
            ExitCode::SUCCESS
        }
    }
}
