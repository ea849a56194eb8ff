use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use vibe_choreo::catalog::{self, TemplateCatalog};
use vibe_choreo::compile::{compile_section, SectionRequest};
use vibe_choreo::curves::{self, CurveId};
use vibe_choreo::files::{read_json, write_json};
use vibe_choreo::model::{CurveParams, Preset, Rig, Template, TemplateDraft, TimingContext};
use vibe_choreo::{ChoreoError, CompilerSettings, DeviceCodec, HandlerRegistry, Result};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vibechoreo-cli", about = "VibeChoreo template compiler", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Compiler settings JSON (defaults when omitted)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Extra template JSON files registered on top of the builtin catalog
    #[arg(long = "template-file", global = true)]
    templates: Vec<PathBuf>,

    /// Extra preset JSON files
    #[arg(long = "preset-file", global = true)]
    presets: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List templates with their steps and aliases
    Templates,
    /// List presets
    Presets,
    /// Print a resolved template (optionally with a preset applied)
    Show {
        template: String,
        #[arg(long)]
        preset: Option<String>,
    },
    /// Compile one section and print its composed timelines or placements
    Compile {
        /// Section request JSON
        #[arg(long)]
        section: PathBuf,
        /// Rig JSON
        #[arg(long)]
        rig: PathBuf,
        /// Timing context JSON (constant fallback tempo when omitted)
        #[arg(long)]
        timing: Option<PathBuf>,
        /// Emit effect placements instead of channel segments
        #[arg(long)]
        placements: bool,
        /// Layer assigned to emitted placements
        #[arg(long, default_value = "0")]
        layer: u32,
        /// Write the result here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Sample a curve generator
    Curve {
        /// Curve id, e.g. `sine` or `ease_in_out_cubic`
        id: String,
        #[arg(long, default_value = "16")]
        samples: usize,
        /// Parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
    /// Print the JSON schema of an authoring format
    Schema {
        /// template, preset, rig, timing, section or settings
        kind: String,
    },
}

// ── Catalog & settings ───────────────────────────────────────────

fn load_settings(path: Option<&Path>) -> Result<CompilerSettings> {
    let settings = match path {
        Some(p) => CompilerSettings::load(p)?,
        None => CompilerSettings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

fn load_catalog(templates: &[PathBuf], presets: &[PathBuf]) -> Result<Arc<TemplateCatalog>> {
    let mut builder = catalog::builtin::builder()?;
    for path in templates {
        let template: Template = read_json(path)?;
        info!("registered template '{}' from {}", template.template_id(), path.display());
        builder.register_template(template)?;
    }
    for path in presets {
        let preset: Preset = read_json(path)?;
        info!("registered preset '{}' from {}", preset.preset_id, path.display());
        builder.register_preset(preset)?;
    }
    Ok(builder.build())
}

// ── Commands ─────────────────────────────────────────────────────

fn print_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            write_json(path, value)?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn schema(kind: &str) -> Result<serde_json::Value> {
    let schema = match kind {
        "template" => schemars::schema_for!(TemplateDraft),
        "preset" => schemars::schema_for!(Preset),
        "rig" => schemars::schema_for!(Rig),
        "timing" => schemars::schema_for!(TimingContext),
        "section" => schemars::schema_for!(SectionRequest),
        "settings" => schemars::schema_for!(CompilerSettings),
        other => {
            return Err(ChoreoError::not_found(
                "schema",
                other,
                ["template", "preset", "rig", "timing", "section", "settings"]
                    .map(String::from)
                    .to_vec(),
            ))
        }
    };
    Ok(serde_json::to_value(schema)?)
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.settings.as_deref())?;
    match cli.command {
        Commands::Templates => {
            let catalog = load_catalog(&cli.templates, &cli.presets)?;
            for s in catalog.summaries() {
                println!("{:<20} v{} [{}] {}", s.template_id, s.version, s.category, s.name);
                println!("    steps: {}", s.steps.join(", "));
                if !s.aliases.is_empty() {
                    println!("    aliases: {}", s.aliases.join(", "));
                }
            }
        }
        Commands::Presets => {
            let catalog = load_catalog(&cli.templates, &cli.presets)?;
            for p in catalog.presets() {
                let steps: Vec<&str> = p.step_patches.keys().map(String::as_str).collect();
                println!("{:<20} {} (patches: {})", p.preset_id, p.name, steps.join(", "));
            }
        }
        Commands::Show { template, preset } => {
            let catalog = load_catalog(&cli.templates, &cli.presets)?;
            let resolved = catalog.resolve(&template, preset.as_deref())?;
            print_json(&resolved, None)?;
        }
        Commands::Compile {
            section,
            rig,
            timing,
            placements,
            layer,
            out,
        } => {
            let catalog = load_catalog(&cli.templates, &cli.presets)?;
            let handlers = HandlerRegistry::builtin()?;
            let request: SectionRequest = read_json(&section)?;
            let rig: Rig = read_json(&rig)?;
            let timing = match timing {
                Some(path) => read_json::<TimingContext>(&path)?,
                None => settings.fallback_timing()?,
            };
            let compiled = compile_section(&catalog, &handlers, &request, &rig, &timing, &settings)?;
            info!(
                "compiled '{}' with {} ({:.0}..{:.0} ms)",
                compiled.section_id, compiled.template_id, compiled.start_ms, compiled.end_ms
            );
            if placements {
                let codec = DeviceCodec::new(&settings);
                let mut encoded = codec.placements(&compiled, &rig)?;
                for p in &mut encoded {
                    p.layer = layer;
                }
                print_json(&encoded, out.as_deref())?;
            } else {
                print_json(&compiled, out.as_deref())?;
            }
        }
        Commands::Curve { id, samples, params } => {
            let id = CurveId::parse(&id)?;
            let params: CurveParams = match params {
                Some(raw) => serde_json::from_str(&raw)?,
                None => CurveParams::new(),
            };
            curves::validate_params(id, &params)?;
            for p in curves::generate(id, samples, &params)? {
                println!("{:.4}\t{:.4}", p.t(), p.v());
            }
        }
        Commands::Schema { kind } => print_json(&schema(&kind)?, None)?,
    }
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
