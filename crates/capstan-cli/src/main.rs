//! Capstan CLI - Reusable deployment capabilities for Kubernetes

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use commands::{reconcile::ReconcileArgs, render::RenderArgs};

#[derive(Parser)]
#[command(name = "capstan")]
#[command(author = "Capstan Contributors")]
#[command(version)]
#[command(about = "Reusable deployment capabilities for Kubernetes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an app locally without a cluster
    Render {
        /// Capability or ClusterCapability file
        #[arg(short, long)]
        capability: PathBuf,

        /// App file
        #[arg(short, long)]
        app: PathBuf,

        /// CapabilityDependency file(s) referenced by the capability
        #[arg(long = "dependency")]
        dependencies: Vec<PathBuf>,

        /// Extra overrides applied over fixed values (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Output directory (if not set, outputs to stdout)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Show resolved values
        #[arg(long)]
        show_values: bool,

        /// Also substitute placeholders inside lists
        #[arg(long)]
        descend_into_sequences: bool,
    },

    /// Check whether an app provides every required input
    Validate {
        /// Capability or ClusterCapability file
        #[arg(short, long)]
        capability: PathBuf,

        /// App file
        #[arg(short, long)]
        app: PathBuf,

        /// Output the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile apps in the current cluster
    Reconcile {
        /// App name
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,

        /// Namespace of the app (with --all, limits the listing)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Reconcile every app
        #[arg(long)]
        all: bool,

        /// Limit in seconds for each cluster call
        #[arg(long, env = "CAPSTAN_TIMEOUT")]
        timeout: Option<u64>,

        /// Extra overrides applied over fixed values (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Also substitute placeholders inside lists
        #[arg(long)]
        descend_into_sequences: bool,
    },

    /// Print the CustomResourceDefinitions for capstan resources
    Crds,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("CAPSTAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Render {
            capability,
            app,
            dependencies,
            set,
            output_dir,
            show_values,
            descend_into_sequences,
        } => commands::render::run(RenderArgs {
            capability: &capability,
            app: &app,
            dependencies: &dependencies,
            set_values: &set,
            output_dir: output_dir.as_deref(),
            show_values,
            descend_into_sequences,
            debug: cli.debug,
        }),

        Commands::Validate {
            capability,
            app,
            json,
        } => commands::validate::run(&capability, &app, json),

        Commands::Reconcile {
            name,
            namespace,
            all,
            timeout,
            set,
            descend_into_sequences,
        } => {
            commands::reconcile::run(ReconcileArgs {
                name: name.as_deref(),
                namespace: namespace.as_deref(),
                all,
                timeout,
                set_values: &set,
                descend_into_sequences,
            })
            .await
        }

        Commands::Crds => commands::crds::run(),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }

    Ok(())
}
