use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fescodec::tree::{self, NamespaceMap};
use fescodec::{Filter, FilterCodecs, NestedIdPolicy, Version};

use crate::config::CodecConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Codec configuration file (YAML)
    #[arg(short, long, global = true, env = "FESCODEC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the nested identifier policy (rewrite, reject)
    #[arg(long, global = true)]
    pub nested_ids: Option<NestedIdPolicy>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encode a filter model (JSON or YAML) as Filter Encoding XML
    Encode {
        /// Target revision (1.0.0, 1.1.0, 2.0.0)
        #[arg(short, long)]
        revision: Option<String>,

        /// Filter model file, or - for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, or - for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Model format (auto-detected from the input extension if omitted)
        #[arg(long, value_enum)]
        format: Option<ModelFormat>,
    },

    /// Decode Filter Encoding XML into a filter model
    Decode {
        /// Source revision (1.0.0, 1.1.0, 2.0.0)
        #[arg(short, long)]
        revision: Option<String>,

        /// XML file, or - for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, or - for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "json")]
        format: ModelFormat,
    },

    /// Re-encode a filter document for another revision
    Translate {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// XML file, or - for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, or - for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Print the Filter_Capabilities of a revision
    Capabilities {
        #[arg(short, long)]
        revision: Option<String>,

        /// Print the capability table as JSON instead of XML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum ModelFormat {
    #[value(name = "json")]
    Json,
    #[value(name = "yaml", alias = "yml")]
    Yaml,
}

pub fn model_format_label(format: ModelFormat) -> &'static str {
    match format {
        ModelFormat::Json => "json",
        ModelFormat::Yaml => "yaml",
    }
}

/// Detect the model format from a file extension; JSON otherwise.
pub fn detect_model_format(path: &Path) -> ModelFormat {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("yaml") | Some("yml") => ModelFormat::Yaml,
        _ => ModelFormat::Json,
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

pub fn read_input(path: &Path) -> Result<String> {
    if is_stdio(path) {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("CLI: Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("CLI: Failed to read {}", path.display()))
}

pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if is_stdio(path) {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(content.as_bytes())
            .context("CLI: Failed to write stdout")?;
        if !content.ends_with('\n') {
            stdout.write_all(b"\n").context("CLI: Failed to write stdout")?;
        }
        return Ok(());
    }
    std::fs::write(path, content).with_context(|| format!("CLI: Failed to write {}", path.display()))
}

pub fn parse_model(text: &str, format: ModelFormat) -> Result<Filter> {
    match format {
        ModelFormat::Json => serde_json::from_str(text).context("CLI: Invalid JSON filter model"),
        ModelFormat::Yaml => serde_yaml::from_str(text).context("CLI: Invalid YAML filter model"),
    }
}

pub fn render_model(filter: &Filter, format: ModelFormat) -> Result<String> {
    match format {
        ModelFormat::Json => serde_json::to_string_pretty(filter).context("CLI: Failed to render JSON"),
        ModelFormat::Yaml => serde_yaml::to_string(filter).context("CLI: Failed to render YAML"),
    }
}

pub struct App {
    codecs: FilterCodecs,
    default_version: Version,
    namespaces: NamespaceMap,
}

impl App {
    pub fn new(config: &CodecConfig) -> Result<Self> {
        let registry = config.registry()?;
        Ok(App {
            codecs: FilterCodecs::new(config.options(), Arc::new(registry)),
            default_version: config.default_version()?,
            namespaces: config.namespaces.clone(),
        })
    }

    fn version(&self, revision: Option<&str>) -> Result<Version> {
        match revision {
            Some(token) => token
                .parse()
                .with_context(|| format!("CLI: Unsupported revision '{}'", token)),
            None => Ok(self.default_version),
        }
    }

    pub fn run(&self, command: &Command) -> Result<()> {
        match command {
            Command::Encode {
                revision,
                input,
                output,
                format,
            } => {
                let version = self.version(revision.as_deref())?;
                let format = format.unwrap_or_else(|| detect_model_format(input));
                tracing::info!("Encoding {} model as {}", model_format_label(format), version);
                let filter = parse_model(&read_input(input)?, format)?;
                write_output(output, &self.encode(version, &filter)?)
            }
            Command::Decode {
                revision,
                input,
                output,
                format,
            } => {
                let version = self.version(revision.as_deref())?;
                tracing::info!("Decoding {} document", version);
                let filter = self.decode(version, &read_input(input)?)?;
                write_output(output, &render_model(&filter, *format)?)
            }
            Command::Translate {
                from,
                to,
                input,
                output,
            } => {
                let from = self.version(Some(from.as_str()))?;
                let to = self.version(Some(to.as_str()))?;
                tracing::info!("Translating {} document to {}", from, to);
                let filter = self.decode(from, &read_input(input)?)?;
                write_output(output, &self.encode(to, &filter)?)
            }
            Command::Capabilities { revision, json } => {
                let version = self.version(revision.as_deref())?;
                let caps = self.codecs.capabilities_for(version);
                let rendered = if *json {
                    serde_json::to_string_pretty(caps).context("CLI: Failed to render capabilities")?
                } else {
                    tree::to_xml_string(&caps.to_element())?
                };
                write_output(&PathBuf::from("-"), &rendered)
            }
        }
    }

    pub fn encode(&self, version: Version, filter: &Filter) -> Result<String> {
        let element = self
            .codecs
            .codec(version)
            .encoder()
            .encode(filter)
            .with_context(|| format!("Codec: Failed to encode filter for {}", version))?;
        Ok(tree::to_xml_string(&element)?)
    }

    /// Decode XML text. Document prefixes win over configured ones.
    pub fn decode(&self, version: Version, xml: &str) -> Result<Filter> {
        let document = tree::parse_document(xml).context("CLI: Invalid XML document")?;
        let mut namespaces = self.namespaces.clone();
        namespaces.extend(document.namespaces);
        self.codecs
            .codec(version)
            .decoder()
            .decode(&document.root, Some(&namespaces))
            .with_context(|| format!("Codec: Failed to decode {} filter", version))
    }
}
