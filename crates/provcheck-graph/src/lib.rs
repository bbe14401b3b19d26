//! Provenance graph loading.
//!
//! A provenance document (typically an RO-Crate `ro-crate-metadata.json`) is
//! parsed into an immutable [`ProvenanceGraph`]. Supported serializations:
//!
//! - JSON-LD (`.json`, `.jsonld`), with the RO-Crate context bundled
//! - N-Triples (`.nt`), Turtle (`.ttl`), N-Quads (`.nq`), TriG (`.trig`)
//! - RDF/XML (`.rdf`, `.owl`, `.xml`)
//!
//! All of them are parsed by **Sophia** into an in-memory dataset, which
//! [`ProvenanceGraph::select`] queries with SPARQL.
//!
//! Loading a directory yields one graph per matching document. Graphs are never
//! merged: every downstream consumer queries them independently.

mod graph;
mod jsonld;
mod rdf;
pub mod term;

pub use graph::{ProvenanceGraph, SelectError, Solutions};
pub use term::{Literal, Term};

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default provenance document name inside an RO-Crate.
pub const DEFAULT_DOCUMENT_NAME: &str = "ro-crate-metadata.json";

const MEMORY_LOCATOR: &str = "<memory>";
const MEMORY_DOCUMENT_IRI: &str = "urn:provcheck:memory/document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    JsonLd,
    NTriples,
    Turtle,
    NQuads,
    TriG,
    RdfXml,
}

impl RdfFormat {
    /// Detect the serialization from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "json" | "jsonld" => Some(Self::JsonLd),
            "nt" | "ntriples" => Some(Self::NTriples),
            "ttl" | "turtle" => Some(Self::Turtle),
            "nq" | "nquads" => Some(Self::NQuads),
            "trig" => Some(Self::TriG),
            "rdf" | "owl" | "xml" => Some(Self::RdfXml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::JsonLd => "json-ld",
            Self::NTriples => "ntriples",
            Self::Turtle => "turtle",
            Self::NQuads => "nquads",
            Self::TriG => "trig",
            Self::RdfXml => "rdfxml",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("provenance document not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported provenance format for {} (extension `{extension}`)", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },
    #[error("failed to parse {locator} as {format}: {message}")]
    Parse {
        locator: String,
        format: &'static str,
        message: String,
    },
    #[error("no `{document_name}` found under {}", root.display())]
    NoDocuments { root: PathBuf, document_name: String },
}

/// Parse an in-memory document.
///
/// `locator` is used for error messages and, for JSON-LD, as the base IRI of
/// relative `@id`s (pass `None` for `<memory>`).
pub fn load_from_bytes(
    bytes: &[u8],
    format: RdfFormat,
    locator: Option<&str>,
) -> Result<ProvenanceGraph, LoadError> {
    let locator = locator.unwrap_or(MEMORY_LOCATOR).to_string();
    let document_iri = if locator == MEMORY_LOCATOR {
        MEMORY_DOCUMENT_IRI.to_string()
    } else {
        locator.clone()
    };
    parse(bytes, format, locator, &document_iri, None)
}

fn parse(
    bytes: &[u8],
    format: RdfFormat,
    locator: String,
    document_iri: &str,
    path: Option<PathBuf>,
) -> Result<ProvenanceGraph, LoadError> {
    let dataset = match format {
        RdfFormat::JsonLd => jsonld::parse_jsonld(bytes, document_iri),
        other => rdf::parse_dataset(bytes, other),
    }
    .map_err(|message| LoadError::Parse {
        locator: locator.clone(),
        format: format.name(),
        message,
    })?;

    let graph = ProvenanceGraph::new(locator, path, format, dataset);
    tracing::debug!(
        locator = %graph.locator(),
        format = format.name(),
        quads = graph.len(),
        "loaded provenance graph"
    );
    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!(locator = %graph.locator(), types = ?graph.type_summary(), "node types");
    }
    Ok(graph)
}

fn file_iri(path: &Path) -> String {
    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let text = absolute
        .to_string_lossy()
        .replace('\\', "/")
        .replace(' ', "%20");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}

/// Load a single provenance document; the format comes from the extension.
pub fn load(path: &Path) -> Result<ProvenanceGraph, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let format = RdfFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })?;
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(
        &bytes,
        format,
        path.display().to_string(),
        &file_iri(path),
        Some(path.to_path_buf()),
    )
}

/// Every file named `document_name` beneath `root`, sorted by full path.
pub fn discover_documents(root: &Path, document_name: &str) -> Result<Vec<PathBuf>, LoadError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| LoadError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error")),
        })?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy() == document_name {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Load one document, or every `document_name` document under a directory.
///
/// Directory results are ordered lexicographically by full path, one graph per
/// document.
pub fn load_all(path: &Path, document_name: &str) -> Result<Vec<ProvenanceGraph>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if path.is_file() {
        return Ok(vec![load(path)?]);
    }

    let documents = discover_documents(path, document_name)?;
    if documents.is_empty() {
        return Err(LoadError::NoDocuments {
            root: path.to_path_buf(),
            document_name: document_name.to_string(),
        });
    }
    tracing::info!(
        root = %path.display(),
        documents = documents.len(),
        "discovered provenance documents"
    );
    documents.iter().map(|doc| load(doc)).collect()
}
