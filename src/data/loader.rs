//! Master-file resolution, sub-file reading and key linking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use log::{debug, info, trace, warn};

use super::catalog::{Catalog, Tables};
use super::model::{
    CollisionTable, CrossSection, Element, InnerShellEdge, Ion, Level, Line, PhotoEdge,
};
use super::parser::{
    parse_record, CollisionRecord, ElementRecord, InnerShellRecord, IonRecord, LevelRecord,
    LineRecord, PhotoRecord, Record, RecordKind,
};
use crate::config::LoadConfig;
use crate::error::{LoadError, MissingTarget};
use crate::physics;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared flag that aborts an in-flight load. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    /// Checks left before the token cancels itself.
    #[cfg(test)]
    trip_after: Option<Arc<AtomicUsize>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that cancels itself on its `checks`-th check, to stop a load
    /// partway through.
    #[cfg(test)]
    pub(crate) fn tripping_after(checks: usize) -> Self {
        Self {
            trip_after: Some(Arc::new(AtomicUsize::new(checks))),
            ..Self::default()
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), LoadError> {
        #[cfg(test)]
        if let Some(left) = &self.trip_after {
            if left.fetch_sub(1, Ordering::Relaxed) <= 1 {
                self.cancel();
            }
        }
        if self.is_cancelled() {
            Err(LoadError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the catalog named by `master` with the default configuration.
pub fn load(master: impl AsRef<Path>) -> Result<Catalog, LoadError> {
    load_with(master, &LoadConfig::default(), &CancelToken::new())
}

/// Load the catalog named by `master`.
///
/// The master file lists one sub-file per line with its record kind:
///
/// ```text
/// # path            kind
/// elements.dat      element
/// ions.dat          ion
/// levels.dat        level
/// lines.dat         line
/// photo.dat         photo
/// ```
///
/// Every sub-file is parsed in full, then a linking pass resolves the natural
/// keys to table indices. Any error aborts the whole load; nothing partial is
/// returned. Validation problems do not abort, they flag the catalog invalid.
pub fn load_with(
    master: impl AsRef<Path>,
    config: &LoadConfig,
    cancel: &CancelToken,
) -> Result<Catalog, LoadError> {
    let master_path = resolve_master(master.as_ref(), config)?;
    let base_dir = match &config.base_dir {
        Some(dir) => dir.clone(),
        None => master_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    let manifest = read_manifest(&master_path, &base_dir, config)?;

    let mut staged = Staged::default();
    for (path, kind) in manifest {
        cancel.check()?;
        let count = read_sub_file(&path, kind, config, cancel, &mut staged)?;
        debug!("read {count} {kind} record(s) from {}", path.display());
    }

    cancel.check()?;
    let tables = staged.link()?;
    let catalog = Catalog::assemble(master_path, tables);

    info!(
        "loaded {}: {} elements, {} ions, {} levels, {} lines, {} photo edges, {} inner-shell edges, {} collision tables",
        catalog.source().display(),
        catalog.elements().len(),
        catalog.ions().len(),
        catalog.levels().len(),
        catalog.lines().len(),
        catalog.photo_edges().len(),
        catalog.inner_edges().len(),
        catalog.collisions().len(),
    );
    for problem in catalog.problems() {
        warn!("{}: {problem}", catalog.source().display());
    }

    Ok(catalog)
}

// ---------------------------------------------------------------------------
// Master file
// ---------------------------------------------------------------------------

fn resolve_master(master: &Path, config: &LoadConfig) -> Result<PathBuf, LoadError> {
    let candidates = config.master_candidates(master);
    for candidate in &candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }
    Err(LoadError::MasterNotFound {
        name: master.display().to_string(),
        searched: candidates,
    })
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::LoadIoFailure {
        path: path.to_path_buf(),
        source,
    })
}

/// Iterate `(1-based line number, content)` over lines that carry data.
fn data_lines(text: &str, comment: char) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(move |(i, raw)| {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(comment) {
            None
        } else {
            Some((i + 1, trimmed))
        }
    })
}

fn read_manifest(
    master: &Path,
    base_dir: &Path,
    config: &LoadConfig,
) -> Result<Vec<(PathBuf, RecordKind)>, LoadError> {
    let text = read_text(master)?;
    let malformed = |line: usize, reason: String| LoadError::MalformedManifest {
        path: master.to_path_buf(),
        line,
        reason,
    };

    let mut entries = Vec::new();
    for (line, content) in data_lines(&text, config.comment_char) {
        let mut tokens = content.split_whitespace();
        let file = tokens
            .next()
            .ok_or_else(|| malformed(line, "missing sub-file path".into()))?;
        let tag = tokens
            .next()
            .ok_or_else(|| malformed(line, format!("missing record kind for '{file}'")))?;
        let kind = tag.parse::<RecordKind>().map_err(|e| malformed(line, e))?;

        let path = base_dir.join(file);
        trace!("manifest entry {}: {kind}", path.display());
        entries.push((path, kind));
    }
    Ok(entries)
}

fn read_sub_file(
    path: &Path,
    kind: RecordKind,
    config: &LoadConfig,
    cancel: &CancelToken,
    staged: &mut Staged,
) -> Result<usize, LoadError> {
    let text = read_text(path)?;
    let file = staged.files.len();
    staged.files.push(path.to_path_buf());

    let mut count = 0;
    for (line, content) in data_lines(&text, config.comment_char) {
        cancel.check()?;
        let record =
            parse_record(kind, content, line).map_err(|source| LoadError::MalformedRecord {
                path: path.to_path_buf(),
                source,
            })?;
        staged.push(Origin { file, line }, record);
        count += 1;
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Staging and linking
// ---------------------------------------------------------------------------

/// Where a record came from, for error reports.
#[derive(Debug, Clone, Copy)]
struct Origin {
    file: usize,
    line: usize,
}

/// Parsed records per kind, still keyed by natural keys.
#[derive(Debug, Default)]
struct Staged {
    files: Vec<PathBuf>,
    elements: Vec<(Origin, ElementRecord)>,
    ions: Vec<(Origin, IonRecord)>,
    levels: Vec<(Origin, LevelRecord)>,
    lines: Vec<(Origin, LineRecord)>,
    photo: Vec<(Origin, PhotoRecord)>,
    inner: Vec<(Origin, InnerShellRecord)>,
    collisions: Vec<(Origin, CollisionRecord)>,
}

impl Staged {
    fn push(&mut self, origin: Origin, record: Record) {
        match record {
            Record::Element(r) => self.elements.push((origin, r)),
            Record::Ion(r) => self.ions.push((origin, r)),
            Record::Level(r) => self.levels.push((origin, r)),
            Record::Line(r) => self.lines.push((origin, r)),
            Record::Photo(r) => self.photo.push((origin, r)),
            Record::InnerShell(r) => self.inner.push((origin, r)),
            Record::Collision(r) => self.collisions.push((origin, r)),
        }
    }

    fn path(&self, origin: Origin) -> PathBuf {
        self.files.get(origin.file).cloned().unwrap_or_default()
    }

    fn broken(&self, origin: Origin, kind: RecordKind, target: MissingTarget) -> LoadError {
        LoadError::BrokenReference {
            path: self.path(origin),
            line: origin.line,
            kind,
            target,
        }
    }

    fn duplicate(&self, origin: Origin, kind: RecordKind, key: String) -> LoadError {
        LoadError::DuplicateKey {
            path: self.path(origin),
            line: origin.line,
            kind,
            key,
        }
    }

    /// Resolve every natural key to a table index.
    fn link(self) -> Result<Tables, LoadError> {
        let mut tables = Tables::default();

        // Elements: z -> index
        let mut element_by_z: HashMap<u32, usize> = HashMap::new();
        for (origin, rec) in &self.elements {
            if element_by_z.insert(rec.z, tables.elements.len()).is_some() {
                let key = format!("z={}", rec.z);
                return Err(self.duplicate(*origin, RecordKind::Element, key));
            }
            tables.elements.push(Element {
                z: rec.z,
                name: rec.name.clone(),
                abundance: rec.abundance,
            });
        }

        // Ions: (z, stage) -> index
        let mut ion_by_key: HashMap<(u32, u32), usize> = HashMap::new();
        for (origin, rec) in &self.ions {
            let element = *element_by_z.get(&rec.z).ok_or_else(|| {
                self.broken(*origin, RecordKind::Ion, MissingTarget::Element { z: rec.z })
            })?;
            if ion_by_key.insert((rec.z, rec.stage), tables.ions.len()).is_some() {
                return Err(self.duplicate(
                    *origin,
                    RecordKind::Ion,
                    format!("z={} stage={}", rec.z, rec.stage),
                ));
            }
            tables.ions.push(Ion {
                element,
                z: rec.z,
                stage: rec.stage,
                ionization_potential: rec.ionization_potential,
                g: rec.g,
                level_start: 0,
                level_end: 0,
            });
        }

        let find_ion = |origin: Origin, kind: RecordKind, z: u32, stage: u32| {
            ion_by_key
                .get(&(z, stage))
                .copied()
                .ok_or_else(|| self.broken(origin, kind, MissingTarget::Ion { z, stage }))
        };

        // Levels: grouped by ion (stable), (ion, level number) -> index
        let mut levels = Vec::with_capacity(self.levels.len());
        for (origin, rec) in &self.levels {
            let ion = find_ion(*origin, RecordKind::Level, rec.z, rec.stage)?;
            levels.push((ion, *origin, rec));
        }
        levels.sort_by_key(|(ion, _, _)| *ion);

        let mut level_by_key: HashMap<(usize, u32), usize> = HashMap::new();
        for (ion, origin, rec) in levels {
            let index = tables.levels.len();
            if level_by_key.insert((ion, rec.level), index).is_some() {
                return Err(self.duplicate(
                    origin,
                    RecordKind::Level,
                    format!("level {} of z={} stage={}", rec.level, rec.z, rec.stage),
                ));
            }
            let owner = &mut tables.ions[ion];
            if owner.level_end == owner.level_start {
                owner.level_start = index;
            }
            owner.level_end = index + 1;
            tables.levels.push(Level {
                ion,
                level: rec.level,
                energy: rec.energy,
                g: rec.g,
                config: rec.config.clone(),
            });
        }

        // Lines
        let mut line_by_key: HashMap<(usize, u32, u32), usize> = HashMap::new();
        for (origin, rec) in &self.lines {
            let ion = find_ion(*origin, RecordKind::Line, rec.z, rec.stage)?;
            let find_level = |level: u32| {
                level_by_key.get(&(ion, level)).copied().ok_or_else(|| {
                    self.broken(
                        *origin,
                        RecordKind::Line,
                        MissingTarget::Level {
                            z: rec.z,
                            stage: rec.stage,
                            level,
                        },
                    )
                })
            };
            let lower = find_level(rec.lower)?;
            let upper = find_level(rec.upper)?;

            line_by_key
                .entry((ion, rec.lower, rec.upper))
                .or_insert(tables.lines.len());

            let mut line = Line {
                ion,
                lower,
                upper,
                frequency: rec.frequency,
                gf: rec.gf,
                g_lower: tables.levels[lower].g,
                g_upper: tables.levels[upper].g,
                a21: 0.0,
            };
            line.a21 = physics::einstein_a(&line);
            tables.lines.push(line);
        }

        // Photoionization edges
        for (origin, rec) in &self.photo {
            let ion = find_ion(*origin, RecordKind::Photo, rec.z, rec.stage)?;
            tables.photo_edges.push(PhotoEdge {
                ion,
                z: rec.z,
                stage: rec.stage,
                threshold: rec.threshold,
                table: CrossSection::from_samples(&rec.samples),
            });
        }

        // Inner-shell edges
        for (origin, rec) in &self.inner {
            let ion = find_ion(*origin, RecordKind::InnerShell, rec.z, rec.stage)?;
            tables.inner_edges.push(InnerShellEdge {
                element: tables.ions[ion].element,
                ion,
                z: rec.z,
                stage: rec.stage,
                shell_n: rec.shell_n,
                shell_l: rec.shell_l,
                threshold: rec.threshold,
                table: CrossSection::from_samples(&rec.samples),
            });
        }

        // Collision strengths, attached to lines
        for (origin, rec) in &self.collisions {
            let ion = find_ion(*origin, RecordKind::Collision, rec.z, rec.stage)?;
            let line = line_by_key
                .get(&(ion, rec.lower, rec.upper))
                .copied()
                .ok_or_else(|| {
                    self.broken(
                        *origin,
                        RecordKind::Collision,
                        MissingTarget::Line {
                            z: rec.z,
                            stage: rec.stage,
                            lower: rec.lower,
                            upper: rec.upper,
                        },
                    )
                })?;
            let (energy, upsilon) = rec.samples.iter().copied().unzip();
            tables.collisions.push(CollisionTable {
                line,
                transition: rec.transition,
                energy,
                upsilon,
            });
        }

        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    /// Writes a small but complete catalog and returns the master path.
    fn small_catalog(dir: &Path) -> PathBuf {
        write(
            dir,
            "master.dat",
            "# test catalog\nelem.dat element\nions.dat ion\nlev.dat level\nlines.dat line\n",
        );
        write(dir, "elem.dat", "1 H 12.0\n2 He 10.99\n");
        write(dir, "ions.dat", "1 1 13.6 2\n2 1 24.6 1\n");
        // He levels first, then H, to exercise grouping.
        write(
            dir,
            "lev.dat",
            "2 1 1 0.0 1 1s2\n1 1 1 0.0 2 1s\n1 1 2 10.2 8 2p\n2 1 2 21.2 3 1s2p\n",
        );
        write(
            dir,
            "lines.dat",
            "# z stage lo up freq gf\n1 1 1 2 2.466e15 0.8328\n2 1 1 2 5.13e15 0.83\n",
        );
        dir.join("master.dat")
    }

    #[test]
    fn loads_and_groups_levels_by_ion() {
        let dir = tempfile::tempdir().unwrap();
        let cat = load(small_catalog(dir.path())).unwrap();

        assert!(cat.is_valid());
        assert_eq!(cat.elements().len(), 2);
        let h = &cat.ions()[0];
        let he = &cat.ions()[1];
        assert_eq!(h.levels(), 0..2);
        assert_eq!(he.levels(), 2..4);
        assert_eq!(cat.levels()[2].config, "1s2");

        let lya = &cat.lines()[0];
        assert_eq!((lya.lower, lya.upper), (0, 1));
        assert_eq!(lya.g_upper, 8.0);
        assert!(lya.a21 > 0.0);
    }

    #[test]
    fn master_extension_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        small_catalog(dir.path());
        let cat = load(dir.path().join("master")).unwrap();
        assert_eq!(cat.source(), dir.path().join("master.dat"));
    }

    #[test]
    fn master_found_through_search_dirs() {
        let dir = tempfile::tempdir().unwrap();
        small_catalog(dir.path());
        let config = LoadConfig {
            search_dirs: vec![dir.path().join("missing"), dir.path().to_path_buf()],
            ..LoadConfig::default()
        };
        let cat = load_with("master", &config, &CancelToken::new()).unwrap();
        assert_eq!(cat.lines().len(), 2);
    }

    #[test]
    fn missing_master_lists_searched_paths() {
        let err = load("/definitely/not/here/master").unwrap_err();
        match err {
            LoadError::MasterNotFound { searched, .. } => {
                assert_eq!(searched, vec![PathBuf::from("/definitely/not/here/master.dat")])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_sub_file_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "master.dat", "nope.dat element\n");
        let err = load(dir.path().join("master.dat")).unwrap_err();
        assert!(matches!(
            err,
            LoadError::LoadIoFailure { ref path, .. } if path.ends_with("nope.dat")
        ));
    }

    #[test]
    fn bad_manifest_tag() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "master.dat", "\n\nelem.dat elements\n");
        let err = load(dir.path().join("master.dat")).unwrap_err();
        assert!(matches!(err, LoadError::MalformedManifest { line: 3, .. }));
    }

    #[test]
    fn malformed_record_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        let master = small_catalog(dir.path());
        write(dir.path(), "ions.dat", "1 1 13.6 2\n2 x 24.6 1\n");
        match load(master).unwrap_err() {
            LoadError::MalformedRecord { path, source } => {
                assert!(path.ends_with("ions.dat"));
                assert_eq!(source.line, 2);
                assert_eq!(source.kind, RecordKind::Ion);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dangling_level_reference() {
        let dir = tempfile::tempdir().unwrap();
        let master = small_catalog(dir.path());
        write(dir.path(), "lines.dat", "1 1 1 999 2.466e15 0.8328\n");
        match load(master).unwrap_err() {
            LoadError::BrokenReference {
                line, kind, target, ..
            } => {
                assert_eq!(line, 1);
                assert_eq!(kind, RecordKind::Line);
                assert_eq!(
                    target,
                    MissingTarget::Level {
                        z: 1,
                        stage: 1,
                        level: 999
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dangling_element_reference() {
        let dir = tempfile::tempdir().unwrap();
        let master = small_catalog(dir.path());
        write(dir.path(), "ions.dat", "1 1 13.6 2\n2 1 24.6 1\n8 1 13.6 9\n");
        assert!(matches!(
            load(master).unwrap_err(),
            LoadError::BrokenReference {
                target: MissingTarget::Element { z: 8 },
                line: 3,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_ion_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let master = small_catalog(dir.path());
        write(dir.path(), "ions.dat", "1 1 13.6 2\n2 1 24.6 1\n1 1 13.6 2\n");
        assert!(matches!(
            load(master).unwrap_err(),
            LoadError::DuplicateKey {
                kind: RecordKind::Ion,
                line: 3,
                ..
            }
        ));
    }

    #[test]
    fn collision_needs_matching_line() {
        let dir = tempfile::tempdir().unwrap();
        let master = small_catalog(dir.path());
        fs::write(
            &master,
            "elem.dat element\nions.dat ion\nlev.dat level\nlines.dat line\ncoll.dat collision\n",
        )
        .unwrap();
        write(dir.path(), "coll.dat", "1 1 1 2 allowed 2 1.0 0.3 2.0 0.4\n");
        let cat = load(&master).unwrap();
        assert_eq!(cat.collisions()[0].line, 0);

        write(dir.path(), "coll.dat", "1 1 2 1 allowed 2 1.0 0.3 2.0 0.4\n");
        assert!(matches!(
            load(&master).unwrap_err(),
            LoadError::BrokenReference {
                target: MissingTarget::Line { lower: 2, upper: 1, .. },
                ..
            }
        ));
    }

    #[test]
    fn cancelled_load_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let master = small_catalog(dir.path());
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            load_with(master, &LoadConfig::default(), &token),
            Err(LoadError::Cancelled)
        ));
    }

    #[test]
    fn cancel_between_sub_files_and_mid_file() {
        let dir = tempfile::tempdir().unwrap();
        let master = small_catalog(dir.path());

        // Checks run before each sub-file and on each data line: element file
        // (3 checks), ion file (3), then the fourth level line is the 11th.
        for checks in [4, 8, 11, 14] {
            let token = CancelToken::tripping_after(checks);
            assert!(
                matches!(
                    load_with(&master, &LoadConfig::default(), &token),
                    Err(LoadError::Cancelled)
                ),
                "not cancelled after {checks} checks"
            );
            assert!(token.is_cancelled());
        }

        let token = CancelToken::tripping_after(100);
        assert!(load_with(&master, &LoadConfig::default(), &token).is_ok());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn custom_comment_char() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "master.dat", "! manifest\nelem.dat element\n");
        write(dir.path(), "elem.dat", "! z name abundance\n1 H 12.0\n");
        let config = LoadConfig {
            comment_char: '!',
            ..LoadConfig::default()
        };
        let master = dir.path().join("master.dat");
        let cat = load_with(master, &config, &CancelToken::new()).unwrap();
        assert_eq!(cat.elements().len(), 1);
    }
}
