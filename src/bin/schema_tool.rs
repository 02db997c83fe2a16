use anyhow::{Context, Result, anyhow};
use clap::Parser;
use relmap::command::SqlServerDialect;
use relmap::mapping::{MappingDocument, validate_mapping};
use relmap::model::PersistenceModelLoader;
use relmap::provider::{StorageConfiguration, StorageProviderDefinition};
use relmap::schema::{SchemaScripts, ScriptGenerator};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "relmap-schema")]
#[command(about = "Generates setup and teardown scripts for mapped storage providers")]
struct Cli {
    /// Mapping document (JSON)
    #[arg(long)]
    mapping: PathBuf,

    /// Storage configuration (JSON)
    #[arg(long)]
    storage: PathBuf,

    /// Only generate scripts for this provider
    #[arg(long)]
    provider: Option<String>,

    /// Write SetupDB_<provider>.sql and TearDownDB_<provider>.sql here instead of printing
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let document = MappingDocument::from_file(&cli.mapping)
        .with_context(|| format!("Failed to read mapping '{}'", cli.mapping.display()))?;
    let mapping = document
        .into_configuration()
        .with_context(|| format!("Invalid mapping '{}'", cli.mapping.display()))?;

    let errors = validate_mapping(&mapping);
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  {}", error);
        }
        return Err(anyhow!("Mapping validation failed with {} error(s)", errors.len()));
    }

    let storage = StorageConfiguration::from_file(&cli.storage)
        .with_context(|| format!("Failed to read storage configuration '{}'", cli.storage.display()))?;

    let providers: Vec<&StorageProviderDefinition> = match &cli.provider {
        Some(name) => vec![storage.provider(name)?],
        None => storage.providers.iter().collect(),
    };

    let mapping = Arc::new(mapping);
    for definition in providers {
        let scripts = generate_scripts(definition, mapping.clone())?;
        match &cli.output_dir {
            Some(dir) => write_scripts(dir, &definition.name, &scripts)?,
            None => {
                println!("-- Setup: {}", definition.name);
                println!("{}", scripts.setup);
                println!("-- Teardown: {}", definition.name);
                println!("{}", scripts.teardown);
            }
        }
    }

    Ok(())
}

fn generate_scripts(
    definition: &StorageProviderDefinition,
    mapping: Arc<relmap::mapping::MappingConfiguration>,
) -> Result<SchemaScripts> {
    let mut loader = PersistenceModelLoader::new(definition, mapping);
    loader
        .load_all()
        .with_context(|| format!("Failed to resolve persistence model for '{}'", definition.name))?;
    let model = loader.build();

    let errors = model.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  {}", error);
        }
        return Err(anyhow!(
            "Persistence model for '{}' has {} unsupported propert(ies)",
            definition.name,
            errors.len()
        ));
    }

    let dialect = SqlServerDialect;
    Ok(ScriptGenerator::new(&dialect).generate(&model))
}

fn write_scripts(dir: &Path, provider: &str, scripts: &SchemaScripts) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;

    let setup = dir.join(format!("SetupDB_{}.sql", provider));
    fs::write(&setup, &scripts.setup)
        .with_context(|| format!("Failed to write setup script to '{}'", setup.display()))?;

    let teardown = dir.join(format!("TearDownDB_{}.sql", provider));
    fs::write(&teardown, &scripts.teardown)
        .with_context(|| format!("Failed to write teardown script to '{}'", teardown.display()))?;

    println!("Generated {} and {}", setup.display(), teardown.display());
    Ok(())
}
