use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use tenderlens_lib::analysis::{
    new_analysis_id, AnalysisOptions, AnalysisStatus, JsonFileStore, TenderAnalysisEngine, TracingNotifier,
};
use tenderlens_lib::config::{self, EngineConfig};
use tenderlens_lib::pipeline::datapool::{chunk_pool, DataPoolBuild, DataPoolBuilder};
use tenderlens_lib::pipeline::llm::{LlmClient, OllamaClient};
use tenderlens_lib::pipeline::types::ProcessingOptions;

#[derive(Parser)]
#[command(name = "tenderlens", version = config::APP_VERSION)]
#[command(about = "Analyze public tender documents for catering bids")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a DataPool from the files and run the full analysis
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Skip the LLM contextual stage
        #[arg(long)]
        no_contextual: bool,

        /// Skip the market/cost stage
        #[arg(long)]
        no_market: bool,

        /// Run the stages one after the other
        #[arg(long)]
        sequential: bool,

        /// Attach a markdown report to the result
        #[arg(long)]
        report: bool,

        /// Do not persist the result under the store directory
        #[arg(long)]
        no_save: bool,
    },
    /// Only extract: print the DataPool (or its chunks) as JSON
    Extract {
        #[command(flatten)]
        input: InputArgs,

        /// Emit section-aware chunks instead of the pool
        #[arg(long)]
        chunks: bool,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Tender documents (PDF, DOCX, XLSX, CSV, HTML, TXT or ZIP)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tenderlens_lib::init_tracing();
    let cli = Cli::parse();
    let config = EngineConfig::from_env();

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &EngineConfig) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Command::Extract { input, chunks } => {
            let build = build_pool(config, &input.files)?;
            let json = if chunks {
                serde_json::to_string_pretty(&chunk_pool(&build.pool, &config.chunk))?
            } else {
                serde_json::to_string_pretty(&build)?
            };
            write_output(input.output.as_deref(), &json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze {
            input,
            no_contextual,
            no_market,
            sequential,
            report,
            no_save,
        } => {
            let build = build_pool(config, &input.files)?;
            let options = AnalysisOptions {
                enable_contextual: !no_contextual,
                enable_market: !no_market,
                parallel_processing: !sequential,
                generate_report: report,
                save_to_db: !no_save,
                ..AnalysisOptions::default()
            };

            // The blocking HTTP client must be created and dropped outside
            // the async runtime.
            let llm = OllamaClient::new(&config.ollama_url, config.llm_timeout_secs)?;
            if options.enable_contextual {
                match llm.is_model_available(&config.model) {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!(model = %config.model, "Model not pulled in Ollama — contextual stage will degrade"),
                    Err(e) => tracing::warn!(error = %e, "Ollama not reachable — contextual stage will degrade"),
                }
            }
            let engine = TenderAnalysisEngine::new(config, Arc::new(llm))
                .with_store(Arc::new(JsonFileStore::new(&config.store_dir)))
                .with_notifier(Arc::new(TracingNotifier));

            let runtime = tokio::runtime::Runtime::new()?;
            let analysis_id = new_analysis_id();
            let result = runtime.block_on(engine.run(&analysis_id, build.pool, &options));
            drop(runtime);

            write_output(input.output.as_deref(), &serde_json::to_string_pretty(&result)?)?;
            if let Some(markdown) = &result.report {
                eprintln!("{markdown}");
            }

            Ok(if result.status == AnalysisStatus::Failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn build_pool(config: &EngineConfig, files: &[PathBuf]) -> Result<DataPoolBuild, Box<dyn Error>> {
    let build = DataPoolBuilder::new(config).build_from_paths(files, &ProcessingOptions::default())?;
    for error in &build.errors {
        tracing::warn!(
            stage = %error.stage,
            doc_id = ?error.doc_id,
            message = %error.message,
            "Extraction error"
        );
    }
    tracing::info!(
        documents = build.pool.documents.len(),
        blocks = build.pool.text_blocks.len(),
        tables = build.pool.tables.len(),
        duration_ms = build.duration_ms,
        "DataPool built"
    );
    Ok(build)
}

fn write_output(path: Option<&Path>, json: &str) -> Result<(), Box<dyn Error>> {
    match path {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "Output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
