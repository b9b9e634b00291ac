//! kb: inspect and convert URDF robot descriptions
//!
//! # Commands
//!
//! - `kb inspect <file>` - Print the kinematic tree, mass properties and warnings
//! - `kb convert <input> -o <output>` - Import, optionally optimize, and write
//!   URDF (or the converted model as RON when the output ends in `.ron`)
//! - `kb settings <path>` - Write default settings as RON

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kb_core::{
    AxisConvention, ImportResult, KinematicModel, LengthUnit, LinkId, Settings,
    UuidMeshResolver, export_model, import_robot_file, load_settings, save_model, save_settings,
    symmetric_eigen, write_robot_file,
};

#[derive(Parser)]
#[command(name = "kb")]
#[command(about = "URDF inspection and conversion", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tree, per-link mass properties and warnings
    Inspect {
        file: PathBuf,

        /// Settings file (RON)
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Import a URDF and write it back out
    Convert {
        input: PathBuf,

        /// Output path; `.ron` writes the converted model instead of URDF
        #[arg(short, long)]
        output: PathBuf,

        /// Merge bodies across fixed joints
        #[arg(long)]
        optimize: bool,

        /// Settings file (RON)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Target axis convention (flu, enu, ned, ruf)
        #[arg(long)]
        target: Option<AxisConvention>,

        /// Target length unit (m, mm, cm, in)
        #[arg(long)]
        unit: Option<LengthUnit>,
    },

    /// Write default settings to a file
    Settings { path: PathBuf },
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kb_cli=info,kb_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { file, settings } => {
            let settings = read_settings(settings.as_deref())?;
            inspect(&file, &settings)
        }
        Commands::Convert {
            input,
            output,
            optimize,
            settings,
            target,
            unit,
        } => {
            let mut settings = read_settings(settings.as_deref())?;
            if let Some(target) = target {
                settings.import.conversion.target = target;
            }
            if let Some(unit) = unit {
                settings.import.conversion.length_unit = unit;
            }
            settings.import.optimize_fixed_joints |= optimize;
            convert(&input, &output, &settings)
        }
        Commands::Settings { path } => {
            save_settings(&Settings::default(), &path)
                .with_context(|| format!("writing {}", path.display()))?;
            Ok(())
        }
    }
}

fn read_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => load_settings(path).with_context(|| format!("reading {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn import(path: &Path, settings: &Settings) -> Result<ImportResult> {
    let mut meshes = UuidMeshResolver::new();
    let result = import_robot_file(path, &settings.import, &mut meshes)
        .with_context(|| format!("importing {}", path.display()))?;
    tracing::info!(
        "{} distinct mesh files referenced",
        meshes.handles().len()
    );
    Ok(result)
}

fn inspect(path: &Path, settings: &Settings) -> Result<()> {
    let result = import(path, settings)?;
    let model = &result.model;

    println!(
        "robot '{}' ({} -> {}, {})",
        model.name,
        model.conversion.source,
        model.conversion.target,
        model.conversion.length_unit
    );
    println!("root: {}", model.link(model.root).name);
    print_tree(model, model.root, 0);

    println!();
    for link in &model.links {
        match &link.body {
            Some(body) => {
                let (closed_form, _) =
                    symmetric_eigen(&body.inertia_tensor(), settings.eigen_tolerance);
                println!(
                    "{}: mass {} moments [{} {} {}] closed-form [{} {} {}]",
                    link.name,
                    body.mass,
                    body.principal.moments.x,
                    body.principal.moments.y,
                    body.principal.moments.z,
                    closed_form.x,
                    closed_form.y,
                    closed_form.z
                );
            }
            None => match link.merged_into {
                Some(target) => println!("{}: merged into {}", link.name, model.link(target).name),
                None => println!("{}: no inertial", link.name),
            },
        }
    }
    println!("total mass: {}", model.total_mass());

    if !result.warnings.is_empty() {
        println!();
        println!("{} warning(s):", result.warnings.len());
        for warning in &result.warnings {
            println!("  {warning}");
        }
    }

    Ok(())
}

fn print_tree(model: &KinematicModel, link: LinkId, depth: usize) {
    let entry = model.link(link);
    let joint = entry
        .joint
        .map(|j| {
            let joint = model.joint(j);
            format!(" <- {} ({})", joint.name, joint.joint_type)
        })
        .unwrap_or_default();
    println!("{}{}{}", "  ".repeat(depth + 1), entry.name, joint);

    for child in model.children(link) {
        print_tree(model, child, depth + 1);
    }
}

fn convert(input: &Path, output: &Path, settings: &Settings) -> Result<()> {
    let result = import(input, settings)?;

    if let Some(report) = &result.optimization {
        tracing::info!(
            "Merged {} bodies across rigid joints ({} links without a body)",
            report.merges.len(),
            report.skipped_without_body.len()
        );
    }
    for warning in &result.warnings {
        tracing::debug!("{}", warning);
    }

    if output.extension().is_some_and(|ext| ext == "ron") {
        save_model(&result.model, output)
            .with_context(|| format!("writing {}", output.display()))?;
    } else {
        let robot = export_model(&result.model, &settings.export)?;
        write_robot_file(&robot, output)?;
    }

    println!(
        "{} -> {} ({} warning(s))",
        input.display(),
        output.display(),
        result.warnings.len()
    );
    Ok(())
}
