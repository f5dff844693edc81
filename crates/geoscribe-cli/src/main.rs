//! Geoscribe command line entry point.

mod commands;
mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geoscribe_core::{EditorConfig, LatLng};
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "geoscribe", version, about = "Geographic polygon editing tools")]
struct Cli {
    /// Editor configuration file (JSON). Missing keys use defaults.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Parse WKT and print it back in canonical form. Reads stdin when no WKT is given.
    Normalize {
        #[arg(value_name = "WKT")]
        wkt: Option<String>,
    },
    /// Show where a coordinate lands in world, viewport and tile space.
    Project {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
        /// Also report the containing tile at this zoom.
        #[arg(long, value_name = "ZOOM")]
        tile: Option<u8>,
    },
    /// Render WKT polygons as an SVG overlay.
    Render {
        #[arg(value_name = "WKT", required = true)]
        wkt: Vec<String>,
        /// Render every polygon as an inverted (outside) area.
        #[arg(long, action = clap::ArgAction::SetTrue)]
        inverted: bool,
        /// Write the SVG here instead of stdout.
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Replay a JSON script of pointer, viewport and command steps.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
        /// Also write the final overlay as SVG.
        #[arg(long, value_name = "PATH")]
        svg: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EditorConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        CliCommand::Normalize { wkt } => {
            let text = match wkt {
                Some(text) => text,
                None => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("Failed to read WKT from stdin")?;
                    text
                }
            };
            println!("{}", commands::normalize(&text)?);
        }
        CliCommand::Project { lat, lng, tile } => {
            println!("{}", commands::project(LatLng::new(lat, lng), &config, tile));
        }
        CliCommand::Render {
            wkt,
            inverted,
            output,
        } => {
            let svg = commands::render(&wkt, inverted, config)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, svg)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    log::info!("Wrote {}", path.display());
                }
                None => print!("{}", svg),
            }
        }
        CliCommand::Replay { script, svg } => {
            println!("{}", commands::replay(&script, config, svg.as_deref())?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_project_with_negative_coordinates() {
        let cli = Cli::try_parse_from(["geoscribe", "project", "-33.9", "151.2", "--tile", "5"])
            .unwrap();
        match cli.command {
            CliCommand::Project { lat, lng, tile } => {
                assert_eq!((lat, lng, tile), (-33.9, 151.2, Some(5)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"initial_zoom": 7.0}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.initial_zoom, 7.0);
        assert!(load_config(Some(&dir.path().join("nope.json"))).is_err());
    }
}
