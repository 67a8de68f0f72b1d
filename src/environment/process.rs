// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{Error, Result};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Access to the command lines of running processes.
pub trait ProcessLookup {
    /// Argument vectors of every process whose executable is named `name`.
    fn cmdlines(&self, name: &str) -> Result<Vec<Vec<String>>>;
}

/// Reads processes from a procfs mount, e.g. `/proc` or `/host/proc`.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_cmdline(dir: &Path) -> Option<Vec<String>> {
        let raw = fs::read(dir.join("cmdline")).ok()?;
        let args: Vec<String> = raw
            .split(|b| *b == 0)
            .filter(|a| !a.is_empty())
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();
        if args.is_empty() {
            None
        } else {
            Some(args)
        }
    }

    fn read_comm(dir: &Path) -> Option<String> {
        fs::read_to_string(dir.join("comm"))
            .ok()
            .map(|s| s.trim_end().to_string())
    }
}

impl ProcessLookup for ProcFs {
    fn cmdlines(&self, name: &str) -> Result<Vec<Vec<String>>> {
        let entries = fs::read_dir(&self.root).map_err(|e| Error::io(self.root.display(), e))?;

        let mut pids: Vec<(u32, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let pid = e.file_name().to_str()?.parse::<u32>().ok()?;
                Some((pid, e.path()))
            })
            .collect();
        pids.sort_by_key(|(pid, _)| *pid);

        let mut found = vec![];
        for (_, dir) in pids {
            // Processes may exit while the table is walked.
            let Some(cmdline) = Self::read_cmdline(&dir) else {
                continue;
            };
            let exe = Path::new(&cmdline[0])
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            if exe.as_deref() == Some(name) || Self::read_comm(&dir).as_deref() == Some(name) {
                found.push(cmdline);
            }
        }
        Ok(found)
    }
}

/// Splits command-line arguments into `flag -> value`. Both `--flag=value`
/// and `--flag value` are recognized; a flag without a value maps to "".
pub fn parse_flags(args: &[String]) -> BTreeMap<String, String> {
    let mut flags = BTreeMap::new();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        if !arg.starts_with('-') {
            continue;
        }
        if let Some((flag, value)) = arg.split_once('=') {
            flags.insert(flag.to_string(), value.to_string());
            continue;
        }
        let value = match iter.peek() {
            Some(next) if !next.starts_with('-') => iter.next().cloned().unwrap_or_default(),
            _ => String::new(),
        };
        flags.insert(arg.clone(), value);
    }
    flags
}
