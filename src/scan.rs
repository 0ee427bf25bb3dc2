use std::{borrow::Cow, fs, panic, path::Path, thread};

use anyhow::Context;
use just_class_file::{AttributeRegistry, ClassFile, Diagnostics};
use just_jimage::Archive;

/// jimage modules holding directory listings instead of classes.
const PSEUDO_MODULES: [&str; 3] = ["", "modules", "packages"];

/// One class file to scan. Inputs that could not be loaded carry the reason
/// instead of bytes.
pub struct Input<'a> {
    pub name: String,
    pub bytes: Result<Cow<'a, [u8]>, String>,
}

pub enum Outcome {
    Fatal(String),
    Parsed {
        diagnostics: Diagnostics,
        dependencies: Vec<String>,
    },
}

pub struct Report {
    pub name: String,
    pub outcome: Outcome,
}

/// Adds `path` if it is a file, or every `*.class` below it if it is a
/// directory. Directory entries are visited in name order.
pub fn collect_class_files(path: &Path, inputs: &mut Vec<Input<'_>>) -> anyhow::Result<()> {
    if !path.is_dir() {
        let bytes = fs::read(path)
            .map(Cow::Owned)
            .map_err(|err| format!("failed to read: {}", err));
        inputs.push(Input {
            name: path.display().to_string(),
            bytes,
        });
        return Ok(());
    }

    let mut entries = Vec::new();
    for entry in
        fs::read_dir(path).with_context(|| format!("failed to read directory {}", path.display()))?
    {
        let entry =
            entry.with_context(|| format!("failed to read entry under {}", path.display()))?;
        entries.push(entry.path());
    }
    entries.sort();

    for entry in entries {
        if entry.is_dir() || entry.extension().map_or(false, |ext| ext == "class") {
            collect_class_files(&entry, inputs)?;
        }
    }

    Ok(())
}

/// Adds the class resources of a jimage. The bytes stay borrowed from the
/// mapped image.
pub fn collect_jimage_classes<'a>(
    image: &Path,
    archive: &'a Archive<'a>,
    inputs: &mut Vec<Input<'a>>,
) {
    let before = inputs.len();
    for resource in archive.resources() {
        match resource {
            Ok(resource) => {
                if !resource.is_class() || PSEUDO_MODULES.contains(&resource.module()) {
                    continue;
                }
                inputs.push(Input {
                    name: format!("{}:{}", image.display(), resource.full_name()),
                    bytes: resource
                        .bytes()
                        .map(Cow::Borrowed)
                        .map_err(|err| err.to_string()),
                });
            }
            Err(err) => inputs.push(Input {
                name: image.display().to_string(),
                bytes: Err(err.to_string()),
            }),
        }
    }
    log::debug!("{}: {} classes", image.display(), inputs.len() - before);
}

/// Parses every input on up to `jobs` threads. Inputs are split into
/// contiguous chunks so the reports come back in input order.
pub fn scan(
    inputs: &[Input<'_>],
    registry: &AttributeRegistry,
    jobs: usize,
    deps: bool,
) -> Vec<Report> {
    if inputs.is_empty() {
        return Vec::new();
    }

    let jobs = jobs.max(1);
    let chunk_size = (inputs.len() + jobs - 1) / jobs;

    thread::scope(|s| {
        let workers = inputs
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|input| scan_input(input, registry, deps))
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap_or_else(|err| panic::resume_unwind(err)))
            .collect()
    })
}

fn scan_input(input: &Input<'_>, registry: &AttributeRegistry, deps: bool) -> Report {
    let outcome = match &input.bytes {
        Err(message) => Outcome::Fatal(message.clone()),
        Ok(bytes) => match ClassFile::parse_with(bytes, registry) {
            Ok((class_file, diagnostics)) => {
                log::trace!("{}: {} diagnostics", input.name, diagnostics.len());
                let dependencies = if deps {
                    class_file
                        .resolver()
                        .referenced_classes()
                        .into_iter()
                        .map(str::to_owned)
                        .collect()
                } else {
                    Vec::new()
                };
                Outcome::Parsed {
                    diagnostics,
                    dependencies,
                }
            }
            Err(err) => Outcome::Fatal(err.to_string()),
        },
    };

    Report {
        name: input.name.clone(),
        outcome,
    }
}
