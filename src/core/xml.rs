//! SUMO plain-XML output for butterfly-sumo
//!
//! Renders the node file (`.nod.xml`), edge file (`.edg.xml`) and simulation
//! configuration (`.sumocfg`) consumed by `netconvert` and `sumo-gui`.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use log::info;

use crate::core::config::PathsConfig;
use crate::core::error::{Error, Result};
use crate::core::graph::{Edge, Network, Node};

/// Escape a value for use inside a double-quoted attribute
fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(|c: char| matches!(c, '&' | '<' | '>' | '"' | '\'')) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn node_element(node: &Node) -> String {
    format!(
        "    <node id=\"{}\" x=\"{}\" y=\"{}\" type=\"{}\"/>\n",
        escape_attr(&node.id),
        node.x,
        node.y,
        node.node_type
    )
}

fn edge_element(edge: &Edge) -> String {
    format!(
        "    <edge id=\"{}\" from=\"{}\" to=\"{}\" priority=\"{}\" numLanes=\"{}\" speed=\"{}\"/>\n",
        escape_attr(&edge.id),
        escape_attr(&edge.from),
        escape_attr(&edge.to),
        edge.priority,
        edge.num_lanes,
        edge.speed
    )
}

/// Render the `<nodes>` document
pub fn render_nodes(nodes: &[Node]) -> String {
    let mut out = String::from("<nodes>\n");
    for node in nodes {
        out.push_str(&node_element(node));
    }
    out.push_str("</nodes>\n");
    out
}

/// Render the `<edges>` document
pub fn render_edges(edges: &[Edge]) -> String {
    let mut out = String::from("<edges>\n");
    for edge in edges {
        out.push_str(&edge_element(edge));
    }
    out.push_str("</edges>\n");
    out
}

/// Render a SUMO configuration pointing at a network and route file
pub fn render_sumo_config(net_file: &str, route_files: &str, begin: u64, end: u64) -> String {
    format!(
        r#"<configuration>
    <input>
        <net-file value="{}"/>
        <route-files value="{}"/>
    </input>
    <time>
        <begin value="{}"/>
        <end value="{}"/>
    </time>
</configuration>
"#,
        escape_attr(net_file),
        escape_attr(route_files),
        begin,
        end
    )
}

/// Write a document, replacing any existing file
pub fn write_document(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| {
        Error::IoError(io::Error::new(
            e.kind(),
            format!("Cannot write {}: {e}", path.display()),
        ))
    })
}

/// Write the node and edge files for `network` into the output directory
pub fn write_network_files(network: &Network, paths: &PathsConfig) -> Result<()> {
    fs::create_dir_all(&paths.output_dir)?;

    let nodes_path = paths.nodes_path();
    info!("Creating {}...", nodes_path.display());
    write_document(&nodes_path, &render_nodes(network.nodes()))?;

    let edges_path = paths.edges_path();
    info!("Creating {}...", edges_path.display());
    write_document(&edges_path, &render_edges(network.edges()))?;

    Ok(())
}
