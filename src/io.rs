use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use phylotree::tree::Tree;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Which trees of a file to keep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Drop the first N trees.
    pub burnin_trees: usize,
    /// Keep only NEXUS trees whose `STATE_` number exceeds this value.
    pub burnin_states: usize,
    /// Rename leaves through a NEXUS `TRANSLATE` block when present.
    pub use_real_taxa: bool,
}

/// Strip `[&...]` annotations (BEAST rates, `[&R]` rooting flags) from a Newick string.
///
/// Branch lengths after an annotation are kept: `:[&rate=0.1]2.45` becomes `:2.45`.
fn strip_annotations(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut in_annotation = false;
    let mut chars = newick.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '[' && chars.peek() == Some(&'&') {
            in_annotation = true;
        } else if ch == ']' && in_annotation {
            in_annotation = false;
        } else if !in_annotation {
            result.push(ch);
        }
    }

    result
}

/// Read a whole file, gunzipping it when the name ends in `.gz`.
fn read_to_string(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut content = String::new();
    if path.to_string_lossy().ends_with(".gz") {
        GzDecoder::new(file).read_to_string(&mut content)?;
    } else {
        io::BufReader::new(file).read_to_string(&mut content)?;
    }
    Ok(content)
}

/// Read named trees from a NEXUS `.trees` file or a plain Newick file.
///
/// NEXUS files are recognised by their `#NEXUS` header; every `tree NAME = ...`
/// line of the trees block is read. Any other file is taken as Newick with
/// `;` ending each tree, and trees are named `<file stem>_<index>`.
///
/// # Errors
/// I/O errors, and [`Error::Parse`] for the first tree that fails to parse.
pub fn read_trees<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Vec<(String, Tree)>> {
    let path = path.as_ref();
    let content = read_to_string(path)?;

    let base_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".gz").trim_end_matches(".trees").trim_end_matches(".nwk"))
        .unwrap_or("tree");

    let is_nexus = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim().eq_ignore_ascii_case("#NEXUS"));

    let trees = if is_nexus {
        read_nexus(&content, base_name, options)?
    } else {
        read_newick(&content, base_name, options)?
    };
    debug!(path = %path.display(), trees = trees.len(), nexus = is_nexus, "read tree file");
    Ok(trees)
}

fn parse_newick(newick: &str, name: &str) -> Result<Tree> {
    Tree::from_newick(strip_annotations(newick).trim()).map_err(|e| Error::Parse(format!("{name}: {e}")))
}

fn read_newick(content: &str, base_name: &str, options: ReadOptions) -> Result<Vec<(String, Tree)>> {
    content
        .split_inclusive(';')
        .map(str::trim)
        .filter(|s| s.ends_with(';'))
        .enumerate()
        .skip(options.burnin_trees)
        .map(|(idx, newick)| {
            let name = format!("{base_name}_{idx}");
            let tree = parse_newick(newick, &name)?;
            Ok((name, tree))
        })
        .collect()
}

fn read_nexus(content: &str, base_name: &str, options: ReadOptions) -> Result<Vec<(String, Tree)>> {
    let taxons = parse_translate_block(content);

    collect_tree_blocks(content)
        .into_iter()
        .enumerate()
        // generate tree name & extract state number
        .map(|(idx, tree)| {
            let state = extract_state(tree.header);
            (idx, tree, state, format!("{base_name}_tree_STATE{state}"))
        })
        // burn-in by count and/or state number; 0 disables either
        .filter(|(idx, _tree, state, _name)| {
            (options.burnin_trees == 0 && options.burnin_states == 0)
                || (options.burnin_trees > 0 && *idx >= options.burnin_trees)
                || (options.burnin_states > 0 && *state > options.burnin_states)
        })
        .map(|(_idx, tree, _state, name)| {
            let mut phylo_tree = parse_newick(&tree.body, &name)?;
            if options.use_real_taxa && !taxons.is_empty() {
                rename_leaf_nodes(&mut phylo_tree, &taxons);
            }
            Ok((name, phylo_tree))
        })
        .collect()
}

fn extract_state(header: &str) -> usize {
    if let Some(start) = header.to_ascii_uppercase().find("STATE_") {
        let rest = &header[start + "STATE_".len()..];
        let state = rest.chars().take_while(|c| c.is_ascii_digit()).collect::<String>();
        if let Ok(num) = state.parse::<usize>() {
            return num;
        }
    }
    0
}

struct TreeBlock<'a> {
    header: &'a str,
    body: String,
}

fn collect_tree_blocks(content: &str) -> Vec<TreeBlock<'_>> {
    content
        .lines()
        .skip_while(|line| !line.trim_start().to_ascii_uppercase().starts_with("TREE "))
        .take_while(|line| !line.trim().to_ascii_uppercase().starts_with("END;"))
        .filter_map(|line| {
            let (header, body) = line.split_once('=')?;
            Some(TreeBlock { header: header.trim(), body: body.trim().to_string() })
        })
        .collect()
}

fn parse_translate_block(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .skip_while(|line| !line.trim().to_ascii_uppercase().starts_with("TRANSLATE"))
        .skip(1)
        .take_while(|line| !line.trim().starts_with(';'))
        // 1 '1959.M.CD.59.ZR59',
        .filter_map(|line| {
            let line = line.trim().trim_end_matches(',').trim_end_matches(';');
            let mut parts = line.split_whitespace();
            let id = parts.next()?.to_string();
            let label = parts.next()?.trim_matches('\'').to_string();
            Some((id, label))
        })
        .collect()
}

/// Rename leaves through a `TRANSLATE` map; unknown ids keep their name.
pub fn rename_leaf_nodes(phylo_tree: &mut Tree, translate: &HashMap<String, String>) {
    for leaf_id in phylo_tree.get_leaves() {
        if let Ok(node) = phylo_tree.get_mut(&leaf_id) {
            match node.name.as_ref().and_then(|n| translate.get(n)) {
                Some(label) => node.name = Some(label.clone()),
                None => warn!(leaf = ?node.name, "leaf has no TRANSLATE entry"),
            }
        }
    }
}

/// Open `path` for writing: `-` is stdout, a `.gz` suffix compresses.
fn create_output(path: &Path) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path)?;
    if path.to_string_lossy().ends_with(".gz") {
        Ok(Box::new(BufWriter::new(GzEncoder::new(file, Compression::default()))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Write a labeled square matrix as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the matrix is written to stdout (uncompressed).
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    mat: &[Vec<T>],
) -> Result<()> {
    let mut out = create_output(path.as_ref())?;

    // Header row
    write!(&mut out, "\t")?;
    for (k, name) in names.iter().enumerate() {
        if k > 0 {
            write!(&mut out, "\t")?;
        }
        write!(&mut out, "{name}")?;
    }
    writeln!(&mut out)?;

    for (name, row) in names.iter().zip(mat) {
        write!(&mut out, "{name}")?;
        for val in row {
            write!(&mut out, "\t{val}")?;
        }
        writeln!(&mut out)?;
    }

    out.flush()?;
    Ok(())
}

/// Write Newick strings, one per line, to a file or stdout.
pub fn write_newick<P: AsRef<Path>>(path: P, newicks: &[String]) -> Result<()> {
    let mut out = create_output(path.as_ref())?;
    for newick in newicks {
        writeln!(&mut out, "{newick}")?;
    }
    out.flush()?;
    Ok(())
}
