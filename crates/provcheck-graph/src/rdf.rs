//! RDF serializations parsed with Sophia into an in-memory dataset.

use std::io::{BufReader, Cursor};

use sophia::api::source::{QuadSource, TripleSource};
use sophia::inmem::dataset::FastDataset;

use crate::RdfFormat;

pub(crate) fn collect<S>(source: S) -> Result<FastDataset, String>
where
    S: QuadSource,
{
    source.collect_quads().map_err(|e| e.to_string())
}

pub(crate) fn parse_dataset(bytes: &[u8], format: RdfFormat) -> Result<FastDataset, String> {
    let reader = BufReader::new(Cursor::new(bytes));
    match format {
        RdfFormat::NTriples => collect(sophia::turtle::parser::nt::parse_bufread(reader).to_quads())
            .map_err(|e| format!("failed to parse N-Triples: {e}")),
        RdfFormat::Turtle => {
            collect(sophia::turtle::parser::turtle::parse_bufread(reader).to_quads())
                .map_err(|e| format!("failed to parse Turtle: {e}"))
        }
        RdfFormat::NQuads => collect(sophia::turtle::parser::nq::parse_bufread(reader))
            .map_err(|e| format!("failed to parse N-Quads: {e}")),
        RdfFormat::TriG => collect(sophia::turtle::parser::trig::parse_bufread(reader))
            .map_err(|e| format!("failed to parse TriG: {e}")),
        RdfFormat::RdfXml => collect(sophia::xml::parser::parse_bufread(reader).to_quads())
            .map_err(|e| format!("failed to parse RDF/XML: {e}")),
        RdfFormat::JsonLd => Err("JSON-LD goes through the JSON-LD parser".into()),
    }
}
