use crate::codegen::GeneratorOptions;
use crate::config::{ConfigOverrides, DumpConfig};
use crate::dialect::Dialect;
use crate::migration::{validate_label, MigrationEmitter};
use crate::progress::{table_progress_bar, update_table_progress};
use crate::provider::{self, SchemaProvider};
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// JSON output for a dump run
#[derive(Serialize)]
pub(crate) struct DumpJsonOutput {
    migration: String,
    path: String,
    source: String,
    dialect: String,
    options: GeneratorOptions,
    statistics: DumpStatistics,
    tables: Vec<String>,
}

#[derive(Serialize)]
pub(crate) struct DumpStatistics {
    tables: usize,
    rows: usize,
    foreign_keys_emitted: bool,
    elapsed_secs: f64,
}

pub fn run(
    label: String,
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    progress: bool,
    json: bool,
) -> anyhow::Result<()> {
    let base = match &config_path {
        Some(path) => DumpConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => DumpConfig::default(),
    };
    let config = base.merge(overrides);
    debug!(?config, "effective configuration");

    // Everything that can be checked without a connection is checked first
    let emitter = MigrationEmitter::new(config.migration_dir())?
        .with_options(config.generator_options());
    validate_label(&label)?;
    let dialect = config
        .dialect
        .as_deref()
        .map(str::parse::<Dialect>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let descriptor = config.connection_descriptor().to_string();
    if !json {
        println!("Connecting to '{}'", descriptor);
    }
    let source = provider::open(&descriptor, dialect)?;

    let start_time = Instant::now();
    let filter = config.table_filter();

    let report = if progress && !json {
        let pb = table_progress_bar()?;
        let pb_clone = pb.clone();
        let emitter = emitter.with_progress(move |done, total, table| {
            update_table_progress(&pb_clone, done, total, table);
        });

        let report = emitter.emit(source.as_ref(), &filter, &label)?;
        pb.finish_with_message("done");
        report
    } else {
        emitter.emit(source.as_ref(), &filter, &label)?
    };

    let elapsed = start_time.elapsed();

    if json {
        let output = DumpJsonOutput {
            migration: report.id.clone(),
            path: report.path.display().to_string(),
            source: descriptor,
            dialect: source.dialect().to_string(),
            options: config.generator_options(),
            statistics: DumpStatistics {
                tables: report.tables.len(),
                rows: report.rows,
                foreign_keys_emitted: report.foreign_keys_emitted,
                elapsed_secs: elapsed.as_secs_f64(),
            },
            tables: report.tables,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Dumped {} tables ({} rows) in {:.3?}",
            report.tables.len(),
            report.rows,
            elapsed
        );
        println!();
        println!("Migration class successfully created at");
        println!("{}", report.path.display());

        if report.foreign_keys_emitted {
            println!();
            println!("Note: the migration adds foreign keys after all tables are created.");
            println!("If applying it fails on constraint errors, regenerate with --foreign-key-checks 0.");
        }
    }

    Ok(())
}
