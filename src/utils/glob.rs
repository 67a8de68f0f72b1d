// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use walkdir::WalkDir;

const META: [char; 4] = ['*', '?', '[', '{'];

pub fn is_pattern(path: &str) -> bool {
    path.contains(META)
}

/// Expands `pattern` to the existing paths it matches, sorted. A path
/// without glob metacharacters is returned as is, whether it exists or not.
pub fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    if !is_pattern(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::Query {
            kind: "glob".to_string(),
            message: e.to_string(),
        })?
        .compile_matcher();

    // Walk from the longest literal directory prefix.
    let components: Vec<&str> = pattern.split('/').collect();
    let literal = components
        .iter()
        .take_while(|c| !is_pattern(c))
        .count();
    let rest = &components[literal..];
    let base = match components[..literal].join("/") {
        b if b.is_empty() && pattern.starts_with('/') => "/".to_string(),
        b if b.is_empty() => ".".to_string(),
        b => b,
    };
    let implicit_base = literal == 0;
    let max_depth = if rest.iter().any(|c| c.contains("**")) {
        usize::MAX
    } else {
        rest.len()
    };

    // Symlinked directories are traversed; walkdir reports loops as errors.
    let mut matches: Vec<PathBuf> = WalkDir::new(&base)
        .follow_links(true)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .map(|p| match implicit_base {
            true => p.strip_prefix(".").map(Path::to_path_buf).unwrap_or(p),
            false => p,
        })
        .filter(|p| glob.is_match(p))
        .collect();
    matches.sort();
    Ok(matches)
}
